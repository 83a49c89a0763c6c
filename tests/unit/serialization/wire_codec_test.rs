//! WireCodec against the in-memory registry: subjects, framing and decoding
//! of broker messages.

use crate::unit::common::*;
use messagebus::messagebus::serialization::encode_frame;
use messagebus::{BrokerMessage, SchemaRegistryError, SchemaType, SerializationError};

fn broker_message(key: Option<Vec<u8>>, value: Option<Vec<u8>>) -> BrokerMessage {
    BrokerMessage {
        topic: "orders".to_string(),
        partition: 3,
        offset: 42,
        key,
        value,
        timestamp: Some(1_700_000_000_000),
    }
}

#[tokio::test]
async fn test_serialize_then_deserialize() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let codec = codec(&registry);
    let mut record = ProducerRecord::new(
        MessageKey::new("svc").with_header("tenant", "acme"),
        ping("hello"),
    );

    let serialized = codec.serialize("orders", &mut record).await.unwrap();
    assert_eq!(record.key.value_subject, "orders-value");

    let decoded = codec
        .deserialize(&broker_message(Some(serialized.key), Some(serialized.value)))
        .await
        .unwrap();

    assert_eq!(decoded.key.as_ref(), Some(&record.key));
    assert_eq!(decoded.value_as::<Ping>().unwrap().text, "hello");
    assert_eq!(decoded.partition, 3);
    assert_eq!(decoded.offset, 42);
    assert_eq!(
        decoded.timestamp.map(|t| t.timestamp_millis()),
        Some(1_700_000_000_000)
    );
}

#[tokio::test]
async fn test_value_frame_wraps_avro_datum() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let codec = codec(&registry);
    let payload = ping("hello");
    let mut datum = Vec::new();
    AvroRecord::serialize(&payload, &mut datum).unwrap();

    let serialized = codec
        .serialize("orders", &mut ProducerRecord::new(MessageKey::new("svc"), payload))
        .await
        .unwrap();

    let schema = registry
        .get_latest_schema("orders-value", false)
        .await
        .unwrap();
    assert_eq!(serialized.value, encode_frame(schema.id(), &datum));
}

#[tokio::test]
async fn test_same_schema_reuses_id() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let codec = codec(&registry);

    let first = codec
        .serialize("orders", &mut ping_record("svc", "a"))
        .await
        .unwrap();
    let second = codec
        .serialize("orders", &mut ping_record("svc", "b"))
        .await
        .unwrap();

    assert_eq!(&first.value[..5], &second.value[..5]);
    assert_eq!(&first.key[..5], &second.key[..5]);
    assert_eq!(
        registry.get_schema_versions("orders-value", false).await.unwrap(),
        vec![1]
    );
}

#[tokio::test]
async fn test_topic_record_name_strategy() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let codec = WireCodec::new(registry.clone(), SubjectNameStrategy::TopicRecordName);
    let mut record = ping_record("svc", "a");

    codec.serialize("orders", &mut record).await.unwrap();

    assert_eq!(record.key.value_subject, "orders-messagebus.test.Ping");
    assert_eq!(
        registry.subjects().await,
        vec![
            "orders-messagebus.record.MessageKey".to_string(),
            "orders-messagebus.test.Ping".to_string()
        ]
    );
}

#[tokio::test]
async fn test_absent_key_and_value_stay_absent() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let codec = codec(&registry);

    let decoded = codec.deserialize(&broker_message(None, None)).await.unwrap();

    assert!(decoded.key.is_none());
    assert!(decoded.value.is_none());
    assert_eq!(decoded.correlation_id(), None);
}

#[tokio::test]
async fn test_empty_value_is_too_short() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let codec = codec(&registry);

    let err = codec
        .deserialize(&broker_message(None, Some(Vec::new())))
        .await
        .unwrap_err();
    assert!(matches!(err, SerializationError::FrameTooShort { len: 0, .. }));
}

#[tokio::test]
async fn test_unknown_schema_id() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let codec = codec(&registry);

    let err = codec
        .deserialize(&broker_message(None, Some(encode_frame(99, &[0x02]))))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SerializationError::Registry(SchemaRegistryError::Http { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_non_record_value_is_rejected() {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let codec = codec(&registry);
    let schema = registry
        .create_schema("orders-value", r#""string""#, SchemaType::Avro, false)
        .await
        .unwrap();

    // Avro string "hi": zigzag length 2 then the bytes
    let frame = encode_frame(schema.id(), &[0x04, b'h', b'i']);
    let err = codec
        .deserialize(&broker_message(None, Some(frame)))
        .await
        .unwrap_err();
    assert!(matches!(err, SerializationError::Decode(_)));
}
