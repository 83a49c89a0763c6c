//! Broker capability and its Kafka and in-memory implementations.

pub mod broker;
pub mod client_config_builder;
pub mod common_config;
pub mod consumer_config;
pub mod kafka_consumer;
pub mod kafka_error;
pub mod kafka_producer;
pub mod memory;
pub mod producer_config;
pub mod utils;

pub use broker::{BrokerConsumer, BrokerMessage, BrokerProducer, DeliveryReport};
pub use client_config_builder::ClientConfigBuilder;
pub use common_config::{
    BrokerAddressFamily, CommonKafkaConfig, HasCommonConfig, SaslAuth, SaslMechanism,
    SecurityProtocol, get_broker_address_family,
};
pub use consumer_config::{ConsumerConfig, DEFAULT_POLL_INTERVAL, OffsetReset};
pub use kafka_consumer::KafkaBrokerConsumer;
pub use kafka_error::{BrokerError, BrokerResult};
pub use kafka_producer::{DeliveryContext, KafkaBrokerProducer};
pub use memory::{InMemoryBroker, InMemoryConsumer, InMemoryProducer};
pub use producer_config::{AckMode, CompressionType, ProducerConfig};
pub use utils::{LoggingClientContext, convert_kafka_log_level};
