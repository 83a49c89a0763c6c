//! Subscription bookkeeping: handler prerequisites, idempotence and
//! unsubscribe.

use crate::unit::common::*;

fn noop() -> impl Handler {
    handler_fn(|_context: MessageContext| async { Ok(()) })
}

#[tokio::test]
async fn test_subscribe_without_handler_fails() {
    init_logging();
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, consumer } = consumer_bus(&broker, &registry, "g");

    let err = bus.subscribe("orders").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("orders"));
    assert!(consumer.subscriptions().await.is_empty());
    assert!(bus.subscriptions().await.is_empty());
}

#[tokio::test]
async fn test_subscribe_without_consumer_fails() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let bus = producer_bus(&broker, &registry);
    bus.register_handler("orders", noop()).await;

    let err = bus.subscribe("orders").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_subscribe_adds_topic_once() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, consumer } = consumer_bus(&broker, &registry, "g");
    bus.register_handler("orders", noop()).await;
    bus.register_handler("payments", noop()).await;

    bus.subscribe("orders").await.unwrap();
    bus.subscribe("orders").await.unwrap();
    bus.subscribe("payments").await.unwrap();

    assert_eq!(bus.subscriptions().await, vec!["orders", "payments"]);
    assert_eq!(consumer.subscriptions().await, vec!["orders", "payments"]);

    bus.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_unsubscribe_unknown_topic_is_noop() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, consumer } = consumer_bus(&broker, &registry, "g");
    bus.register_handler("orders", noop()).await;
    bus.subscribe("orders").await.unwrap();

    bus.unsubscribe("never-subscribed").await.unwrap();

    assert_eq!(consumer.subscriptions().await, vec!["orders"]);
    bus.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_unsubscribe_keeps_handler() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, consumer } = consumer_bus(&broker, &registry, "g");
    bus.register_handler("orders", noop()).await;
    bus.register_handler("payments", noop()).await;
    bus.subscribe("orders").await.unwrap();
    bus.subscribe("payments").await.unwrap();

    bus.unsubscribe("orders").await.unwrap();

    assert_eq!(bus.subscriptions().await, vec!["payments"]);
    assert_eq!(consumer.subscriptions().await, vec!["payments"]);
    assert!(bus.has_handler("orders").await);

    // a registered handler is enough to subscribe again
    bus.subscribe("orders").await.unwrap();
    assert_eq!(consumer.subscriptions().await, vec!["payments", "orders"]);
    bus.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_clears_subscriptions() {
    let broker = InMemoryBroker::new();
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let TestBus { bus, consumer } = consumer_bus(&broker, &registry, "g");
    bus.register_handler("orders", noop()).await;
    bus.subscribe("orders").await.unwrap();

    bus.disconnect().await.unwrap();

    assert!(bus.subscriptions().await.is_empty());
    assert!(consumer.subscriptions().await.is_empty());
    assert!(bus.subscribe("orders").await.is_err());
}
