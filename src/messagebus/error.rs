//! Top-level error type for message bus operations

use crate::messagebus::kafka::BrokerError;
use crate::messagebus::schema::SchemaRegistryError;
use crate::messagebus::serialization::SerializationError;
use std::time::Duration;

/// Coarse classification used when deciding how to react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing handler, reply topic, producer or consumer
    Configuration,
    /// Broker or schema registry could not be reached or refused the call
    Transport,
    /// Bytes, JSON or a schema could not be interpreted
    Decode,
    /// An RPC reply did not arrive in time
    Timeout,
    /// Application handler reported a failure
    Handler,
}

#[derive(Debug, thiserror::Error)]
pub enum MessageBusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Registry(#[from] SchemaRegistryError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("Request timed out after {} ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    #[error("Handler failed: {0}")]
    Handler(String),
}

impl MessageBusError {
    pub fn config(message: impl Into<String>) -> Self {
        MessageBusError::Config(message.into())
    }

    pub fn handler(message: impl Into<String>) -> Self {
        MessageBusError::Handler(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MessageBusError::Config(_) => ErrorKind::Configuration,
            MessageBusError::Broker(_) => ErrorKind::Transport,
            MessageBusError::Registry(e) => registry_kind(e),
            MessageBusError::Serialization(SerializationError::Registry(e)) => registry_kind(e),
            MessageBusError::Serialization(_) => ErrorKind::Decode,
            MessageBusError::Timeout { .. } => ErrorKind::Timeout,
            MessageBusError::Handler(_) => ErrorKind::Handler,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

fn registry_kind(error: &SchemaRegistryError) -> ErrorKind {
    if error.is_transport() {
        ErrorKind::Transport
    } else {
        ErrorKind::Decode
    }
}

pub type MessageBusResult<T> = Result<T, MessageBusError>;
