//! Records exchanged through the bus: the routing key every message carries,
//! outbound records and decoded inbound records.

use crate::messagebus::serialization::{AvroCodec, SerializationError, SerializationResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use uuid::Uuid;

pub const MESSAGE_KEY_SCHEMA: &str = r#"{
    "type": "record",
    "name": "MessageKey",
    "namespace": "messagebus.record",
    "fields": [
        {"name": "source", "type": "string"},
        {"name": "correlationId", "type": "string"},
        {"name": "conversationId", "type": "string"},
        {"name": "replyTopic", "type": "string", "default": ""},
        {"name": "valueSubject", "type": "string", "default": ""},
        {"name": "headers", "type": {"type": "map", "values": "string"}, "default": {}}
    ]
}"#;

static MESSAGE_KEY_CODEC: LazyLock<AvroCodec> = LazyLock::new(|| {
    AvroCodec::new(MESSAGE_KEY_SCHEMA).expect("Failed to compile message key schema")
});

/// A payload that knows its Avro schema and can encode itself
pub trait AvroRecord: Send + Sync {
    fn schema(&self) -> &str;

    /// Append the Avro binary encoding of this record to `buf`
    fn serialize(&self, buf: &mut Vec<u8>) -> SerializationResult<()>;
}

/// Routing metadata carried as the key of every message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    /// Name of the sending service
    pub source: String,
    pub correlation_id: String,
    pub conversation_id: String,
    /// Topic the receiver should answer on, empty for one-way messages
    #[serde(default)]
    pub reply_topic: String,
    /// Registry subject of the paired value, filled in on serialization
    #[serde(default)]
    pub value_subject: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl MessageKey {
    /// New key with a random correlation id that also starts the conversation
    pub fn new(source: impl Into<String>) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        Self {
            source: source.into(),
            conversation_id: correlation_id.clone(),
            correlation_id,
            reply_topic: String::new(),
            value_subject: String::new(),
            headers: HashMap::new(),
        }
    }

    pub fn with_reply_topic(mut self, reply_topic: impl Into<String>) -> Self {
        self.reply_topic = reply_topic.into();
        self
    }

    /// Replace the correlation id. The conversation restarts from it.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self.conversation_id = self.correlation_id.clone();
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn has_reply_topic(&self) -> bool {
        !self.reply_topic.is_empty()
    }
}

impl AvroRecord for MessageKey {
    fn schema(&self) -> &str {
        MESSAGE_KEY_SCHEMA
    }

    fn serialize(&self, buf: &mut Vec<u8>) -> SerializationResult<()> {
        buf.extend(MESSAGE_KEY_CODEC.encode(self)?);
        Ok(())
    }
}

/// Any serde value paired with the Avro schema it is written with.
///
/// ```rust
/// use messagebus::{AvroPayload, AvroRecord};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Greeting {
///     text: String,
/// }
///
/// let payload = AvroPayload::new(
///     r#"{"type":"record","name":"Greeting","fields":[{"name":"text","type":"string"}]}"#,
///     Greeting { text: "hi".into() },
/// )
/// .unwrap();
/// let mut buf = Vec::new();
/// payload.serialize(&mut buf).unwrap();
/// assert_eq!(buf, vec![0x04, b'h', b'i']);
/// ```
#[derive(Debug, Clone)]
pub struct AvroPayload<T> {
    schema: String,
    codec: AvroCodec,
    value: T,
}

impl<T: Serialize> AvroPayload<T> {
    /// Fails when `schema` is not valid Avro
    pub fn new(schema: impl Into<String>, value: T) -> SerializationResult<Self> {
        let schema = schema.into();
        let codec = AvroCodec::new(&schema)?;
        Ok(Self {
            schema,
            codec,
            value,
        })
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Serialize + Send + Sync> AvroRecord for AvroPayload<T> {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn serialize(&self, buf: &mut Vec<u8>) -> SerializationResult<()> {
        buf.extend(self.codec.encode(&self.value)?);
        Ok(())
    }
}

/// Outbound message: routing key plus payload
#[derive(Debug, Clone)]
pub struct ProducerRecord<V> {
    pub key: MessageKey,
    pub value: V,
}

impl<V: AvroRecord> ProducerRecord<V> {
    pub fn new(key: MessageKey, value: V) -> Self {
        Self { key, value }
    }
}

/// Inbound message as decoded by the wire codec
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerRecord {
    pub key: Option<MessageKey>,
    pub topic: String,
    /// Decoded value rendered as a JSON object
    pub value: Option<Map<String, Value>>,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConsumerRecord {
    pub fn correlation_id(&self) -> Option<&str> {
        self.key.as_ref().map(|k| k.correlation_id.as_str())
    }

    pub fn reply_topic(&self) -> Option<&str> {
        self.key
            .as_ref()
            .map(|k| k.reply_topic.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.as_ref().and_then(|v| v.get(name))
    }

    /// Deserialize the value into a concrete type
    pub fn value_as<T: DeserializeOwned>(&self) -> SerializationResult<T> {
        let value = self
            .value
            .clone()
            .map(Value::Object)
            .unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(SerializationError::from)
    }
}
