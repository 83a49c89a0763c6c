// Common fixtures for the unit tests: payload schemas and buses wired to an
// in-memory broker and schema registry.

pub use messagebus::messagebus::serialization::decode_frame;
pub use messagebus::{
    AvroPayload, AvroRecord, ErrorKind, Handler, InMemoryBroker, InMemoryConsumer,
    InMemorySchemaRegistry, MessageBus, MessageBusError, MessageBusResult, MessageContext,
    MessageKey, ProducerRecord, SchemaRegistry, SubjectNameStrategy, WireCodec, handler_fn,
};
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
pub use std::time::Duration;

pub const PING_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Ping",
    "namespace": "messagebus.test",
    "fields": [{"name": "text", "type": "string"}]
}"#;

pub const PONG_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Pong",
    "namespace": "messagebus.test",
    "fields": [
        {"name": "text", "type": "string"},
        {"name": "served_by", "type": "string"}
    ]
}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pong {
    pub text: String,
    pub served_by: String,
}

pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ping(text: &str) -> AvroPayload<Ping> {
    AvroPayload::new(
        PING_SCHEMA,
        Ping {
            text: text.to_string(),
        },
    )
    .expect("ping schema compiles")
}

pub fn pong(text: &str, served_by: &str) -> AvroPayload<Pong> {
    AvroPayload::new(
        PONG_SCHEMA,
        Pong {
            text: text.to_string(),
            served_by: served_by.to_string(),
        },
    )
    .expect("pong schema compiles")
}

pub fn ping_record(source: &str, text: &str) -> ProducerRecord<AvroPayload<Ping>> {
    ProducerRecord::new(MessageKey::new(source), ping(text))
}

pub fn codec(registry: &Arc<InMemorySchemaRegistry>) -> WireCodec {
    WireCodec::new(registry.clone(), SubjectNameStrategy::TopicName)
}

/// A bus with both a producer and a consumer, plus a handle on the consumer
/// for inspecting its subscriptions
pub struct TestBus {
    pub bus: MessageBus,
    pub consumer: Arc<InMemoryConsumer>,
}

pub fn consumer_bus(
    broker: &InMemoryBroker,
    registry: &Arc<InMemorySchemaRegistry>,
    group_id: &str,
) -> TestBus {
    consumer_bus_with_timeout(broker, registry, group_id, Duration::from_secs(2))
}

pub fn consumer_bus_with_timeout(
    broker: &InMemoryBroker,
    registry: &Arc<InMemorySchemaRegistry>,
    group_id: &str,
    rpc_timeout: Duration,
) -> TestBus {
    let consumer = Arc::new(broker.consumer(group_id));
    let bus = MessageBus::builder(codec(registry))
        .producer(Arc::new(broker.producer()))
        .consumer(consumer.clone())
        .poll_interval(POLL_INTERVAL)
        .rpc_timeout(rpc_timeout)
        .build();
    TestBus { bus, consumer }
}

pub fn producer_bus(broker: &InMemoryBroker, registry: &Arc<InMemorySchemaRegistry>) -> MessageBus {
    MessageBus::builder(codec(registry))
        .producer(Arc::new(broker.producer()))
        .build()
}

/// Wait until `group_id` has committed `offset` on `topic`
pub async fn wait_for_commit(
    broker: &InMemoryBroker,
    group_id: &str,
    topic: &str,
    offset: i64,
) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if broker.committed_offset(group_id, topic).await == Some(offset) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
