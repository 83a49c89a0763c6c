//! In-process broker used by tests and by embedders that want the bus
//! semantics without a Kafka cluster.
//!
//! Every topic is a single partition. Offsets are committed per consumer
//! group, and a topic newly added to a consumer's subscription starts at the
//! group's committed offset, so uncommitted messages are redelivered to the
//! next consumer of the same group.

use super::broker::{BrokerConsumer, BrokerMessage, BrokerProducer, DeliveryReport};
use super::kafka_error::{BrokerError, BrokerResult};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

#[derive(Default)]
struct BrokerState {
    topics: HashMap<String, Vec<BrokerMessage>>,
    /// (group, topic) -> next offset to consume
    committed: HashMap<(String, String), i64>,
    failed_deliveries: Vec<String>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<BrokerState>,
    notify: Notify,
}

/// Handle to an in-memory broker. Clones share the same topics.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn producer(&self) -> InMemoryProducer {
        InMemoryProducer {
            broker: self.clone(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn consumer(&self, group_id: impl Into<String>) -> InMemoryConsumer {
        InMemoryConsumer {
            broker: self.clone(),
            group_id: group_id.into(),
            state: Mutex::new(ConsumerState::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Everything published to `topic` so far, in offset order
    pub async fn messages(&self, topic: &str) -> Vec<BrokerMessage> {
        let state = self.shared.state.lock().await;
        state.topics.get(topic).cloned().unwrap_or_default()
    }

    pub async fn committed_offset(&self, group_id: &str, topic: &str) -> Option<i64> {
        let state = self.shared.state.lock().await;
        state
            .committed
            .get(&(group_id.to_string(), topic.to_string()))
            .copied()
    }

    /// Make the next produce call fail with a delivery error
    pub async fn fail_next_delivery(&self, reason: impl Into<String>) {
        self.shared
            .state
            .lock()
            .await
            .failed_deliveries
            .push(reason.into());
    }
}

pub struct InMemoryProducer {
    broker: InMemoryBroker,
    closed: AtomicBool,
}

#[async_trait]
impl BrokerProducer for InMemoryProducer {
    async fn produce(
        &self,
        topic: &str,
        key: Vec<u8>,
        value: Vec<u8>,
        timestamp_ms: i64,
    ) -> BrokerResult<DeliveryReport> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }

        let report = {
            let mut state = self.broker.shared.state.lock().await;
            if !state.failed_deliveries.is_empty() {
                let reason = state.failed_deliveries.remove(0);
                return Err(BrokerError::Delivery(reason));
            }
            let log = state.topics.entry(topic.to_string()).or_default();
            let offset = log.len() as i64;
            log.push(BrokerMessage {
                topic: topic.to_string(),
                partition: 0,
                offset,
                key: Some(key),
                value: Some(value),
                timestamp: Some(timestamp_ms),
            });
            DeliveryReport {
                partition: 0,
                offset,
            }
        };

        debug!("In-memory broker stored {}[0]@{}", topic, report.offset);
        self.broker.shared.notify.notify_waiters();
        Ok(report)
    }

    async fn flush(&self, _timeout: Duration) -> BrokerResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }
        Ok(())
    }

    async fn close(&self) -> BrokerResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[derive(Default)]
struct ConsumerState {
    subscriptions: Vec<String>,
    positions: HashMap<String, i64>,
    /// Subscription index the next poll starts scanning from
    next_topic: usize,
}

pub struct InMemoryConsumer {
    broker: InMemoryBroker,
    group_id: String,
    state: Mutex<ConsumerState>,
    closed: AtomicBool,
}

impl InMemoryConsumer {
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Topics this consumer is currently subscribed to
    pub async fn subscriptions(&self) -> Vec<String> {
        self.state.lock().await.subscriptions.clone()
    }

    async fn next_message(&self) -> Option<BrokerMessage> {
        let mut consumer = self.state.lock().await;
        let broker = self.broker.shared.state.lock().await;
        let ConsumerState {
            subscriptions,
            positions,
            next_topic,
        } = &mut *consumer;

        // rotate the starting topic so a busy topic cannot starve the others
        let count = subscriptions.len();
        for step in 0..count {
            let index = (*next_topic + step) % count;
            let topic = &subscriptions[index];
            let position = positions.entry(topic.clone()).or_insert(0);
            if let Some(message) = broker
                .topics
                .get(topic)
                .and_then(|log| log.get(*position as usize))
            {
                *position += 1;
                *next_topic = (index + 1) % count;
                return Some(message.clone());
            }
        }
        None
    }
}

#[async_trait]
impl BrokerConsumer for InMemoryConsumer {
    async fn set_subscriptions(&self, topics: &[String]) -> BrokerResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }

        let mut consumer = self.state.lock().await;
        let broker = self.broker.shared.state.lock().await;

        let mut positions = HashMap::with_capacity(topics.len());
        for topic in topics {
            let position = consumer.positions.get(topic).copied().unwrap_or_else(|| {
                broker
                    .committed
                    .get(&(self.group_id.clone(), topic.clone()))
                    .copied()
                    .unwrap_or(0)
            });
            positions.insert(topic.clone(), position);
        }

        consumer.positions = positions;
        consumer.subscriptions = topics.to_vec();
        Ok(())
    }

    async fn poll(&self, timeout: Duration) -> BrokerResult<Option<BrokerMessage>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.broker.shared.notify.notified();
            tokio::pin!(notified);
            // register before checking so a concurrent produce is not missed
            notified.as_mut().enable();

            if self.closed.load(Ordering::Acquire) {
                return Err(BrokerError::Closed);
            }
            if let Some(message) = self.next_message().await {
                return Ok(Some(message));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn commit_message(&self, message: &BrokerMessage) -> BrokerResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }
        let mut broker = self.broker.shared.state.lock().await;
        broker.committed.insert(
            (self.group_id.clone(), message.topic.clone()),
            message.offset + 1,
        );
        Ok(())
    }

    async fn close(&self) -> BrokerResult<()> {
        self.closed.store(true, Ordering::Release);
        self.state.lock().await.subscriptions.clear();
        self.broker.shared.notify.notify_waiters();
        Ok(())
    }
}
