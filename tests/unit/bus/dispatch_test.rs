//! The dispatch loop: decoding, handler invocation and commit rules.

use crate::unit::common::*;
use messagebus::{BrokerProducer, ConsumerRecord, SerializationError};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(2);

/// Handler that forwards every record it sees
fn forwarding(tx: mpsc::UnboundedSender<ConsumerRecord>) -> impl Handler {
    handler_fn(move |context: MessageContext| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(context.incoming);
            Ok(())
        }
    })
}

#[tokio::test]
async fn test_handler_receives_decoded_message() {
    init_logging();
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, .. } = consumer_bus(&broker, &registry, "workers");
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register_handler("orders", forwarding(tx)).await;
    bus.subscribe("orders").await.unwrap();

    let record = ping_record("svc", "hello");
    let correlation_id = record.key.correlation_id.clone();
    producer_bus(&broker, &registry)
        .send("orders", record)
        .await
        .unwrap();

    let incoming = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(incoming.topic, "orders");
    assert_eq!(incoming.offset, 0);
    assert_eq!(incoming.correlation_id(), Some(correlation_id.as_str()));
    assert_eq!(incoming.value_as::<Ping>().unwrap().text, "hello");
    assert!(incoming.timestamp.is_some());

    assert!(wait_for_commit(&broker, "workers", "orders", 1).await);
    bus.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_messages_are_handled_in_order() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, .. } = consumer_bus(&broker, &registry, "workers");
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register_handler("orders", forwarding(tx)).await;
    bus.subscribe("orders").await.unwrap();

    let sender = producer_bus(&broker, &registry);
    for text in ["a", "b", "c"] {
        sender.send("orders", ping_record("svc", text)).await.unwrap();
    }

    let mut seen = Vec::new();
    for _ in 0..3 {
        let incoming = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        seen.push(incoming.value_as::<Ping>().unwrap().text);
    }
    assert_eq!(seen, vec!["a", "b", "c"]);
    bus.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_failed_handler_leaves_message_uncommitted() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, .. } = consumer_bus(&broker, &registry, "workers");
    let mut errors = bus.error_stream();
    bus.register_handler(
        "orders",
        handler_fn(|_context: MessageContext| async {
            Err(MessageBusError::handler("downstream unavailable"))
        }),
    )
    .await;
    bus.subscribe("orders").await.unwrap();

    producer_bus(&broker, &registry)
        .send("orders", ping_record("svc", "retry me"))
        .await
        .unwrap();

    let err = tokio::time::timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert_eq!(err.kind(), ErrorKind::Handler);
    assert_eq!(broker.committed_offset("workers", "orders").await, None);
    bus.disconnect().await.unwrap();

    // the next member of the group gets the message again
    let TestBus { bus: retry, .. } = consumer_bus(&broker, &registry, "workers");
    let (tx, mut rx) = mpsc::unbounded_channel();
    retry.register_handler("orders", forwarding(tx)).await;
    retry.subscribe("orders").await.unwrap();

    let incoming = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(incoming.offset, 0);
    assert_eq!(incoming.value_as::<Ping>().unwrap().text, "retry me");
    retry.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_panicking_handler_is_reported() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, .. } = consumer_bus(&broker, &registry, "workers");
    let mut errors = bus.error_stream();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    bus.register_handler(
        "orders",
        handler_fn(move |context: MessageContext| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("bad record at {}", context.incoming.offset);
                }
                Ok(())
            }
        }),
    )
    .await;
    bus.subscribe("orders").await.unwrap();

    let sender = producer_bus(&broker, &registry);
    sender.send("orders", ping_record("svc", "first")).await.unwrap();

    let err = tokio::time::timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert_eq!(err.kind(), ErrorKind::Handler);
    assert!(err.to_string().contains("panicked"));

    // the loop survives and keeps dispatching
    sender.send("orders", ping_record("svc", "second")).await.unwrap();
    assert!(wait_for_commit(&broker, "workers", "orders", 2).await);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    bus.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_undecodable_message_is_skipped_and_committed() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, .. } = consumer_bus(&broker, &registry, "workers");
    let mut errors = bus.error_stream();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register_handler("orders", forwarding(tx)).await;
    bus.subscribe("orders").await.unwrap();

    broker
        .producer()
        .produce("orders", vec![0x07, 1, 2], vec![0x00], 0)
        .await
        .unwrap();
    producer_bus(&broker, &registry)
        .send("orders", ping_record("svc", "good"))
        .await
        .unwrap();

    let err = tokio::time::timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert!(matches!(
        err,
        MessageBusError::Serialization(SerializationError::InvalidMagicByte(0x07))
    ));
    assert_eq!(err.kind(), ErrorKind::Decode);

    let incoming = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(incoming.offset, 1);
    assert!(wait_for_commit(&broker, "workers", "orders", 2).await);
    bus.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_replaced_handler_takes_over() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, .. } = consumer_bus(&broker, &registry, "workers");
    let (first_tx, mut first_rx) = mpsc::unbounded_channel();
    let (second_tx, mut second_rx) = mpsc::unbounded_channel();
    bus.register_handler("orders", forwarding(first_tx)).await;
    bus.subscribe("orders").await.unwrap();

    let sender = producer_bus(&broker, &registry);
    sender.send("orders", ping_record("svc", "one")).await.unwrap();
    tokio::time::timeout(WAIT, first_rx.recv()).await.unwrap().unwrap();

    bus.register_handler("orders", forwarding(second_tx)).await;
    sender.send("orders", ping_record("svc", "two")).await.unwrap();

    let incoming = tokio::time::timeout(WAIT, second_rx.recv()).await.unwrap().unwrap();
    assert_eq!(incoming.value_as::<Ping>().unwrap().text, "two");
    assert!(first_rx.try_recv().is_err());
    bus.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_stops_dispatching() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, .. } = consumer_bus(&broker, &registry, "workers");
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register_handler("orders", forwarding(tx)).await;
    bus.subscribe("orders").await.unwrap();

    bus.disconnect().await.unwrap();
    producer_bus(&broker, &registry)
        .send("orders", ping_record("svc", "after"))
        .await
        .unwrap();

    tokio::time::sleep(POLL_INTERVAL * 5).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(broker.committed_offset("workers", "orders").await, None);
}
