//! Avro datum codec compiled from a schema string

use super::error::{SerializationError, SerializationResult};
use apache_avro::{Schema as AvroSchema, types::Value as AvroValue};
use serde::Serialize;

/// Encodes and decodes raw Avro datums (no container header) for one schema.
#[derive(Debug, Clone)]
pub struct AvroCodec {
    schema: AvroSchema,
}

impl AvroCodec {
    /// Compile a codec from the schema JSON
    pub fn new(schema_json: &str) -> SerializationResult<Self> {
        let schema = AvroSchema::parse_str(schema_json)
            .map_err(|e| SerializationError::InvalidSchema(e.to_string()))?;
        Ok(AvroCodec { schema })
    }

    pub fn with_schema(schema: AvroSchema) -> Self {
        AvroCodec { schema }
    }

    pub fn schema(&self) -> &AvroSchema {
        &self.schema
    }

    /// Encode any serde value that matches the schema
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> SerializationResult<Vec<u8>> {
        let value = apache_avro::to_value(value).map_err(SerializationError::encode)?;
        self.encode_value(value)
    }

    /// Encode an Avro value, resolving it against the schema first so unions
    /// and promotions line up
    pub fn encode_value(&self, value: AvroValue) -> SerializationResult<Vec<u8>> {
        let resolved = value
            .resolve(&self.schema)
            .map_err(SerializationError::encode)?;
        apache_avro::to_avro_datum(&self.schema, resolved).map_err(SerializationError::encode)
    }

    pub fn decode(&self, bytes: &[u8]) -> SerializationResult<AvroValue> {
        apache_avro::from_avro_datum(&self.schema, &mut &bytes[..], None)
            .map_err(SerializationError::decode)
    }

    /// Decode a datum and render it as JSON
    pub fn decode_json(&self, bytes: &[u8]) -> SerializationResult<serde_json::Value> {
        let value = self.decode(bytes)?;
        serde_json::Value::try_from(value).map_err(SerializationError::decode)
    }
}
