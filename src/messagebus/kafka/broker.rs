use super::kafka_error::BrokerResult;
use async_trait::async_trait;
use std::time::Duration;

/// Where the broker stored a produced message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub partition: i32,
    pub offset: i64,
}

/// A message received from the broker, detached from the client's poll buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    /// Milliseconds since the Unix epoch, when the broker reported one
    pub timestamp: Option<i64>,
}

/// Publishing side of a broker.
#[async_trait]
pub trait BrokerProducer: Send + Sync {
    /// Publish one message and resolve once the broker acknowledged exactly
    /// this message. The partition is chosen by the broker.
    async fn produce(
        &self,
        topic: &str,
        key: Vec<u8>,
        value: Vec<u8>,
        timestamp_ms: i64,
    ) -> BrokerResult<DeliveryReport>;

    /// Wait for outstanding deliveries, bounded by `timeout`
    async fn flush(&self, timeout: Duration) -> BrokerResult<()>;

    async fn close(&self) -> BrokerResult<()>;
}

/// Consuming side of a broker, bound to one consumer group.
#[async_trait]
pub trait BrokerConsumer: Send + Sync {
    /// Replace the whole subscription set. An empty list leaves the consumer
    /// unsubscribed.
    async fn set_subscriptions(&self, topics: &[String]) -> BrokerResult<()>;

    /// Wait up to `timeout` for the next message. `Ok(None)` means nothing
    /// arrived in time.
    async fn poll(&self, timeout: Duration) -> BrokerResult<Option<BrokerMessage>>;

    /// Mark `message` as processed for the consumer group
    async fn commit_message(&self, message: &BrokerMessage) -> BrokerResult<()>;

    async fn close(&self) -> BrokerResult<()>;
}
