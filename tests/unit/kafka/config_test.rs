//! Connect-time configuration: client property rendering and validation.

use crate::unit::common::*;
use messagebus::{
    AckMode, CompressionType, ConsumerConfig, MessageBusConfig, OffsetReset, ProducerConfig,
};
use serial_test::serial;

#[test]
fn test_producer_client_config() {
    let config = ProducerConfig::new()
        .client_id("billing")
        .acks(AckMode::All)
        .compression(CompressionType::Lz4)
        .linger(Duration::from_millis(5))
        .custom_property("enable.idempotence", "true");

    let client = config.to_client_config(&["k1:9092", "k2:9092"]);
    assert_eq!(client.get("bootstrap.servers"), Some("k1:9092,k2:9092"));
    assert_eq!(client.get("client.id"), Some("billing"));
    assert_eq!(client.get("acks"), Some("all"));
    assert_eq!(client.get("compression.type"), Some("lz4"));
    assert_eq!(client.get("linger.ms"), Some("5"));
    assert_eq!(client.get("enable.idempotence"), Some("true"));
}

#[test]
fn test_consumer_client_config() {
    let config = ConsumerConfig::new("billing")
        .auto_offset_reset(OffsetReset::Latest)
        .session_timeout(Duration::from_secs(30));

    let client = config.to_client_config(&["k1:9092"]);
    assert_eq!(client.get("group.id"), Some("billing"));
    assert_eq!(client.get("enable.auto.commit"), Some("false"));
    assert_eq!(client.get("auto.offset.reset"), Some("latest"));
    assert_eq!(client.get("session.timeout.ms"), Some("30000"));
}

#[test]
fn test_connect_requires_brokers() {
    let config = MessageBusConfig::new(Vec::<String>::new(), "http://localhost:8081");
    let err = MessageBus::connect(config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
#[serial]
async fn test_connect_builds_clients_without_contacting_them() {
    // client creation is lazy; nothing listens on these addresses
    let config = MessageBusConfig::new(["127.0.0.1:1"], "http://127.0.0.1:1")
        .consumer(ConsumerConfig::new("connect-test"))
        .rpc_timeout(Duration::from_millis(250));

    let bus = MessageBus::connect(config).unwrap();
    assert_eq!(bus.rpc_timeout(), Duration::from_millis(250));
    assert!(bus.subscriptions().await.is_empty());
}

#[tokio::test]
#[serial]
async fn test_connect_rejects_invalid_client_property() {
    let config = MessageBusConfig::new(["127.0.0.1:1"], "http://127.0.0.1:1")
        .producer(ProducerConfig::new().custom_property("acks", "sometimes"));

    let err = MessageBus::connect(config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}
