use rdkafka::error::KafkaError;

/// Errors raised by a broker capability (produce, poll, commit, close).
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Underlying librdkafka error
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// The producer or consumer has already been closed
    #[error("Broker client is closed")]
    Closed,

    /// The broker rejected a specific message
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The delivery report was dropped before it could be observed
    #[error("Delivery report was cancelled before completion")]
    DeliveryCancelled,

    /// A blocking librdkafka call could not be joined
    #[error("Background task failed: {0}")]
    Task(String),
}

pub type BrokerResult<T> = Result<T, BrokerError>;
