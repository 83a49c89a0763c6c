//! # messagebus
//!
//! A Kafka message bus for services that exchange Avro records framed in the
//! schema-registry wire format. It publishes records, dispatches subscribed
//! topics to handlers from a single consume loop, and layers request/reply on
//! top of plain topics by correlation id.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use messagebus::{
//!     AvroPayload, ConsumerConfig, MessageBus, MessageBusConfig, MessageContext, MessageKey,
//!     ProducerRecord, handler_fn,
//! };
//! use serde::Serialize;
//!
//! const PING: &str = r#"{"type":"record","name":"Ping","fields":[{"name":"n","type":"int"}]}"#;
//!
//! #[derive(Serialize)]
//! struct Ping {
//!     n: i32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MessageBusConfig::new(["localhost:9092"], "http://localhost:8081")
//!         .consumer(ConsumerConfig::new("pinger"));
//!     let bus = MessageBus::connect(config)?;
//!
//!     bus.register_handler(
//!         "pings",
//!         handler_fn(|context: MessageContext| async move {
//!             let reply = ProducerRecord::new(
//!                 MessageKey::new("pong-service"),
//!                 AvroPayload::new(PING, Ping { n: 1 })?,
//!             );
//!             context.reply(reply).await?;
//!             Ok(())
//!         }),
//!     )
//!     .await;
//!     bus.subscribe("pings").await?;
//!
//!     let request = ProducerRecord::new(
//!         MessageKey::new("pinger").with_reply_topic("pings-reply"),
//!         AvroPayload::new(PING, Ping { n: 0 })?,
//!     );
//!     let reply = bus.request("pings", request).await?;
//!     println!("got {:?}", reply.value);
//!
//!     bus.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`messagebus::kafka`]: broker capability, rdkafka and in-memory brokers
//! - [`messagebus::schema`]: schema registry client with id and subject caches
//! - [`messagebus::serialization`]: Avro codec, subject naming and wire framing
//! - [`messagebus::bus`]: the bus itself, handlers and request/reply

pub mod messagebus;

pub use messagebus::bus::{
    FnHandler, Handler, MessageBus, MessageBusBuilder, MessageContext, handler_fn,
};
pub use messagebus::config::{DEFAULT_RPC_TIMEOUT, MessageBusConfig, RegistryCredentials};
pub use messagebus::error::{ErrorKind, MessageBusError, MessageBusResult};
pub use messagebus::kafka::{
    AckMode, BrokerConsumer, BrokerError, BrokerMessage, BrokerProducer, CompressionType,
    ConsumerConfig, DeliveryReport, InMemoryBroker, InMemoryConsumer, InMemoryProducer,
    KafkaBrokerConsumer, KafkaBrokerProducer, OffsetReset, ProducerConfig,
};
pub use messagebus::record::{
    AvroPayload, AvroRecord, ConsumerRecord, MESSAGE_KEY_SCHEMA, MessageKey, ProducerRecord,
};
pub use messagebus::schema::{
    InMemorySchemaRegistry, Schema, SchemaRegistry, SchemaRegistryClient, SchemaRegistryError,
    SchemaType,
};
pub use messagebus::serialization::{
    AvroCodec, SerializationError, SubjectNameStrategy, WireCodec,
};
