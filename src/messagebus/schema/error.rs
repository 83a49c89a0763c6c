//! Schema registry error types

/// Errors raised while talking to the schema registry or compiling what it returned
#[derive(Debug, thiserror::Error)]
pub enum SchemaRegistryError {
    /// Network failure, timeout, or an unreadable response body
    #[error("Schema registry request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The registry answered with a status outside 2xx
    #[error("{status_line}{}", detail(.message))]
    Http {
        status: u16,
        status_line: String,
        error_code: Option<i32>,
        message: Option<String>,
    },

    #[error("Invalid schema registry response: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema could not be compiled into an Avro codec
    #[error("Failed to compile schema: {0}")]
    Codec(String),

    #[error("Invalid schema type '{0}', valid values are AVRO, JSON or PROTOBUF")]
    UnknownSchemaType(String),

    #[error("Schema registry response carried no schema id")]
    MissingId,
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

impl SchemaRegistryError {
    /// HTTP status of a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            SchemaRegistryError::Http { status, .. } => Some(*status),
            SchemaRegistryError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for failures reaching or answered by the registry, as opposed to
    /// failures interpreting what it sent back
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SchemaRegistryError::Transport(_) | SchemaRegistryError::Http { .. }
        )
    }
}

pub type SchemaResult<T> = Result<T, SchemaRegistryError>;
