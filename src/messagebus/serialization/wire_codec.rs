//! Schema-registry wire format.
//!
//! Keys and values are framed independently as
//! `[0x00][schema id: u32 big-endian][Avro binary datum]`.

use super::avro_codec::AvroCodec;
use super::error::{SerializationError, SerializationResult};
use super::subject_strategy::SubjectNameStrategy;
use crate::messagebus::kafka::BrokerMessage;
use crate::messagebus::record::{AvroRecord, ConsumerRecord, MessageKey, ProducerRecord};
use crate::messagebus::schema::types::full_name;
use crate::messagebus::schema::{SchemaRegistry, SchemaType};
use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

pub const MAGIC_BYTE: u8 = 0x00;
/// Magic byte plus schema id
pub const HEADER_LEN: usize = 5;

/// Prefix an encoded payload with the magic byte and schema id
pub fn encode_frame(schema_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(MAGIC_BYTE);
    frame.extend_from_slice(&schema_id.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Split a frame into its schema id and payload
pub fn decode_frame(frame: &[u8]) -> SerializationResult<(u32, &[u8])> {
    match frame.first() {
        None => {
            return Err(SerializationError::FrameTooShort {
                len: 0,
                min: HEADER_LEN,
            });
        }
        Some(&magic) if magic != MAGIC_BYTE => {
            return Err(SerializationError::InvalidMagicByte(magic));
        }
        Some(_) => {}
    }
    if frame.len() < HEADER_LEN {
        return Err(SerializationError::FrameTooShort {
            len: frame.len(),
            min: HEADER_LEN,
        });
    }
    let id = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
    Ok((id, &frame[HEADER_LEN..]))
}

/// Framed key and value ready to hand to the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Turns producer records into framed bytes and broker messages back into
/// consumer records, registering and resolving schemas on the way.
pub struct WireCodec {
    registry: Arc<dyn SchemaRegistry>,
    strategy: SubjectNameStrategy,
}

impl WireCodec {
    pub fn new(registry: Arc<dyn SchemaRegistry>, strategy: SubjectNameStrategy) -> Self {
        Self { registry, strategy }
    }

    pub fn registry(&self) -> &Arc<dyn SchemaRegistry> {
        &self.registry
    }

    pub fn strategy(&self) -> SubjectNameStrategy {
        self.strategy
    }

    /// Serialize the value, record its subject on the key, then serialize the
    /// key. The key is modified in place.
    pub async fn serialize<V: AvroRecord>(
        &self,
        topic: &str,
        record: &mut ProducerRecord<V>,
    ) -> SerializationResult<SerializedRecord> {
        let (value, value_subject) = self.serialize_payload(topic, &record.value, false).await?;
        record.key.value_subject = value_subject;
        let (key, _) = self.serialize_payload(topic, &record.key, true).await?;
        Ok(SerializedRecord { key, value })
    }

    async fn serialize_payload(
        &self,
        topic: &str,
        payload: &dyn AvroRecord,
        is_key: bool,
    ) -> SerializationResult<(Vec<u8>, String)> {
        let schema_json = payload.schema();
        let record_name = full_name(schema_json);
        let subject = self
            .strategy
            .subject(topic, record_name.as_deref(), is_key)?;

        // every call registers; the registry returns the existing id for a known schema
        let schema = self
            .registry
            .create_schema(&subject, schema_json, SchemaType::Avro, is_key)
            .await?;

        let mut datum = Vec::new();
        payload.serialize(&mut datum)?;
        Ok((encode_frame(schema.id(), &datum), subject))
    }

    /// Decode a broker message. Absent key or value bytes stay absent.
    pub async fn deserialize(
        &self,
        message: &BrokerMessage,
    ) -> SerializationResult<ConsumerRecord> {
        let key = match &message.key {
            Some(bytes) => Some(serde_json::from_value::<MessageKey>(
                self.decode_json(bytes).await?,
            )?),
            None => None,
        };

        let value = match &message.value {
            Some(bytes) => match self.decode_json(bytes).await? {
                Value::Object(fields) => Some(fields),
                other => {
                    return Err(SerializationError::Decode(format!(
                        "expected a record value on topic '{}', got {}",
                        message.topic, other
                    )));
                }
            },
            None => None,
        };

        debug!(
            "Decoded {}[{}]@{}",
            message.topic, message.partition, message.offset
        );

        Ok(ConsumerRecord {
            key,
            topic: message.topic.clone(),
            value,
            partition: message.partition,
            offset: message.offset,
            timestamp: message
                .timestamp
                .and_then(DateTime::<Utc>::from_timestamp_millis),
        })
    }

    async fn decode_json(&self, frame: &[u8]) -> SerializationResult<Value> {
        let (id, payload) = decode_frame(frame)?;
        let schema = self.registry.get_schema(id).await?;
        match schema.codec() {
            Some(codec) => codec.decode_json(payload),
            None => AvroCodec::new(schema.schema())?.decode_json(payload),
        }
    }
}
