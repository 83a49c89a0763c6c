use crate::messagebus::schema::SchemaRegistryError;

/// Errors raised while framing, encoding or decoding records
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Unknown magic byte {0:#04x}, expected 0x00")]
    InvalidMagicByte(u8),

    #[error("Wire frame is {len} bytes, at least {min} required")]
    FrameTooShort { len: usize, min: usize },

    #[error("Invalid Avro schema: {0}")]
    InvalidSchema(String),

    #[error("Avro encoding failed: {0}")]
    Encode(String),

    #[error("Avro decoding failed: {0}")]
    Decode(String),

    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Registry(#[from] SchemaRegistryError),

    #[error("Unknown subject name strategy '{0}'")]
    UnknownSubjectStrategy(String),

    #[error("Schema does not declare a record name: {0}")]
    MissingRecordName(String),
}

impl SerializationError {
    pub(crate) fn encode(e: apache_avro::Error) -> Self {
        SerializationError::Encode(e.to_string())
    }

    pub(crate) fn decode(e: apache_avro::Error) -> Self {
        SerializationError::Decode(e.to_string())
    }
}

pub type SerializationResult<T> = Result<T, SerializationError>;
