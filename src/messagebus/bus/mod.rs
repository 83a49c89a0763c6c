//! The message bus: publishing, topic handlers, the dispatch loop and
//! request/reply.

pub mod context;
pub mod dispatch;
pub mod handler;
pub mod rpc;

pub use context::MessageContext;
pub use handler::{FnHandler, Handler, handler_fn};

use crate::messagebus::config::{DEFAULT_RPC_TIMEOUT, MessageBusConfig};
use crate::messagebus::error::{MessageBusError, MessageBusResult};
use crate::messagebus::kafka::{
    BrokerConsumer, BrokerProducer, ConsumerConfig, DEFAULT_POLL_INTERVAL, KafkaBrokerConsumer,
    KafkaBrokerProducer, ProducerConfig,
};
use crate::messagebus::record::{AvroRecord, ProducerRecord};
use crate::messagebus::schema::SchemaRegistryClient;
use crate::messagebus::serialization::WireCodec;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

pub(crate) struct Inner {
    codec: WireCodec,
    producer: Option<Arc<dyn BrokerProducer>>,
    consumer: Option<Arc<dyn BrokerConsumer>>,
    flush_timeout: Duration,
    poll_interval: Duration,
    rpc_timeout: Duration,
    handlers: std::sync::RwLock<HashMap<String, Arc<dyn Handler>>>,
    subscriptions: Mutex<Vec<String>>,
    pending_replies: std::sync::Mutex<HashSet<String>>,
    stop: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    errors: std::sync::Mutex<Option<mpsc::UnboundedSender<MessageBusError>>>,
}

impl Inner {
    fn handlers(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Handler>>> {
        self.handlers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn handlers_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Handler>>> {
        self.handlers.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Log an asynchronous failure and forward it to the error stream, if any
    pub(crate) fn report(&self, err: MessageBusError) {
        error!("Message bus error: {}", err);
        let errors = self.errors.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = errors.as_ref() {
            let _ = tx.send(err);
        }
    }
}

/// Kafka message bus with schema-registry framed Avro payloads.
///
/// Cloning is cheap; clones share the same connections, handlers and
/// dispatch loop.
#[derive(Clone)]
pub struct MessageBus {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("producer", &self.inner.producer.is_some())
            .field("consumer", &self.inner.consumer.is_some())
            .field("rpc_timeout", &self.inner.rpc_timeout)
            .finish()
    }
}

impl MessageBus {
    /// Connect to Kafka and the schema registry described by `config`.
    ///
    /// ```rust,no_run
    /// use messagebus::{ConsumerConfig, MessageBus, MessageBusConfig};
    ///
    /// # fn main() -> Result<(), messagebus::MessageBusError> {
    /// let config = MessageBusConfig::new(["localhost:9092"], "http://localhost:8081")
    ///     .consumer(ConsumerConfig::new("orders"));
    /// let bus = MessageBus::connect(config)?;
    /// # let _ = bus;
    /// # Ok(())
    /// # }
    /// ```
    pub fn connect(config: MessageBusConfig) -> MessageBusResult<Self> {
        if config.brokers.is_empty() {
            return Err(MessageBusError::config("at least one broker is required"));
        }

        let mut registry = SchemaRegistryClient::new(&config.schema_registry_url)?
            .with_timeout(config.registry_timeout);
        if let Some(credentials) = &config.registry_credentials {
            registry.set_credentials(&credentials.username, &credentials.password);
        }
        let codec = WireCodec::new(Arc::new(registry), config.subject_strategy);

        let mut builder = MessageBus::builder(codec).rpc_timeout(config.rpc_timeout);
        if let Some(producer_config) = &config.producer {
            let producer = KafkaBrokerProducer::new(&config.brokers, producer_config)?;
            builder = builder
                .producer(Arc::new(producer))
                .producer_config(producer_config);
        }
        if let Some(consumer_config) = &config.consumer {
            let consumer = KafkaBrokerConsumer::new(&config.brokers, consumer_config)?;
            builder = builder
                .consumer(Arc::new(consumer))
                .consumer_config(consumer_config);
        }

        info!(
            "Message bus connected to {} (registry {})",
            config.brokers.join(","),
            config.schema_registry_url
        );
        Ok(builder.build())
    }

    /// Assemble a bus from explicit parts, e.g. an in-memory broker
    pub fn builder(codec: WireCodec) -> MessageBusBuilder {
        MessageBusBuilder::new(codec)
    }

    pub fn codec(&self) -> &WireCodec {
        &self.inner.codec
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.inner.rpc_timeout
    }

    /// Topics currently subscribed through this bus
    pub async fn subscriptions(&self) -> Vec<String> {
        self.inner.subscriptions.lock().await.clone()
    }

    pub async fn has_handler(&self, topic: &str) -> bool {
        self.inner.handlers().contains_key(topic)
    }

    /// Receiver for failures that happen inside the dispatch loop: poll,
    /// decode, commit and handler errors. A new call replaces the previous
    /// receiver.
    pub fn error_stream(&self) -> mpsc::UnboundedReceiver<MessageBusError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.errors.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        rx
    }

    /// Serialize and publish `record`, returning the offset the broker
    /// assigned once it acknowledged the message.
    pub async fn send<V: AvroRecord>(
        &self,
        topic: &str,
        mut record: ProducerRecord<V>,
    ) -> MessageBusResult<i64> {
        let producer = self
            .inner
            .producer
            .as_ref()
            .ok_or_else(|| MessageBusError::config("no producer configured"))?;

        let serialized = self.inner.codec.serialize(topic, &mut record).await?;
        let report = producer
            .produce(
                topic,
                serialized.key,
                serialized.value,
                Utc::now().timestamp_millis(),
            )
            .await?;

        debug!(
            "Delivered {} to {}[{}]@{}",
            record.key.correlation_id, topic, report.partition, report.offset
        );
        Ok(report.offset)
    }

    /// Register `handler` for `topic`, replacing any previous one. Takes
    /// effect for the next message dispatched.
    pub async fn register_handler<H>(&self, topic: impl Into<String>, handler: H)
    where
        H: Handler + 'static,
    {
        let topic = topic.into();
        debug!("Registering handler for '{}'", topic);
        self.inner.handlers_mut().insert(topic, Arc::new(handler));
    }

    /// Add `topic` to the consumer's subscriptions and make sure the dispatch
    /// loop runs. A handler must be registered first. Subscribing twice is a
    /// no-op.
    pub async fn subscribe(&self, topic: &str) -> MessageBusResult<()> {
        let consumer = self
            .inner
            .consumer
            .clone()
            .ok_or_else(|| MessageBusError::config("no consumer configured"))?;

        if !self.has_handler(topic).await {
            return Err(MessageBusError::config(format!(
                "handler for topic '{}' is not registered",
                topic
            )));
        }

        {
            let mut subscriptions = self.inner.subscriptions.lock().await;
            if !subscriptions.iter().any(|t| t == topic) {
                let mut updated = subscriptions.clone();
                updated.push(topic.to_string());
                consumer.set_subscriptions(&updated).await?;
                *subscriptions = updated;
                info!("Subscribed to '{}'", topic);
            }
        }

        self.ensure_dispatch_loop(consumer).await;
        Ok(())
    }

    /// Remove `topic` from the subscriptions. Unknown topics are ignored. The
    /// handler stays registered.
    pub async fn unsubscribe(&self, topic: &str) -> MessageBusResult<()> {
        let mut subscriptions = self.inner.subscriptions.lock().await;
        let Some(position) = subscriptions.iter().position(|t| t == topic) else {
            debug!("Not subscribed to '{}', nothing to do", topic);
            return Ok(());
        };

        let mut updated = subscriptions.clone();
        updated.remove(position);
        if let Some(consumer) = &self.inner.consumer {
            consumer.set_subscriptions(&updated).await?;
        }
        *subscriptions = updated;
        info!("Unsubscribed from '{}'", topic);
        Ok(())
    }

    async fn ensure_dispatch_loop(&self, consumer: Arc<dyn BrokerConsumer>) {
        let mut worker = self.inner.worker.lock().await;
        if self.inner.stop.load(Ordering::Acquire) {
            return;
        }
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        *worker = Some(tokio::spawn(dispatch::run_dispatch_loop(
            Arc::downgrade(&self.inner),
            consumer,
            self.inner.poll_interval,
        )));
    }

    /// Flush and close the producer, stop the dispatch loop and close the
    /// consumer.
    ///
    /// Called from inside a handler, the loop is only signalled; it exits
    /// once that handler returns.
    pub async fn disconnect(&self) -> MessageBusResult<()> {
        if let Some(producer) = &self.inner.producer {
            if let Err(e) = producer.flush(self.inner.flush_timeout).await {
                warn!("Flush before disconnect failed: {}", e);
            }
            producer.close().await?;
        }

        if let Some(consumer) = &self.inner.consumer {
            self.inner.stop.store(true, Ordering::Release);
            let worker = self.inner.worker.lock().await.take();
            if let Some(worker) = worker {
                if dispatch::in_dispatch_task() {
                    debug!("Disconnect from a handler, dispatch loop will stop on return");
                } else if let Err(e) = worker.await {
                    warn!("Dispatch loop ended abnormally: {}", e);
                }
            }
            if !dispatch::in_dispatch_task() {
                consumer.close().await?;
            }
        }

        self.inner.subscriptions.lock().await.clear();
        info!("Message bus disconnected");
        Ok(())
    }
}

/// Builder for [`MessageBus`] when the parts are not created from a
/// [`MessageBusConfig`].
pub struct MessageBusBuilder {
    codec: WireCodec,
    producer: Option<Arc<dyn BrokerProducer>>,
    consumer: Option<Arc<dyn BrokerConsumer>>,
    flush_timeout: Duration,
    poll_interval: Duration,
    rpc_timeout: Duration,
}

impl MessageBusBuilder {
    pub fn new(codec: WireCodec) -> Self {
        Self {
            codec,
            producer: None,
            consumer: None,
            flush_timeout: ProducerConfig::default().flush_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    pub fn producer(mut self, producer: Arc<dyn BrokerProducer>) -> Self {
        self.producer = Some(producer);
        self
    }

    pub fn consumer(mut self, consumer: Arc<dyn BrokerConsumer>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Take the flush timeout from a producer configuration
    pub fn producer_config(self, config: &ProducerConfig) -> Self {
        self.flush_timeout(config.flush_timeout)
    }

    /// Take the poll interval from a consumer configuration
    pub fn consumer_config(self, config: &ConsumerConfig) -> Self {
        self.poll_interval(config.poll_interval)
    }

    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn build(self) -> MessageBus {
        MessageBus {
            inner: Arc::new(Inner {
                codec: self.codec,
                producer: self.producer,
                consumer: self.consumer,
                flush_timeout: self.flush_timeout,
                poll_interval: self.poll_interval,
                rpc_timeout: self.rpc_timeout,
                handlers: std::sync::RwLock::new(HashMap::new()),
                subscriptions: Mutex::new(Vec::new()),
                pending_replies: std::sync::Mutex::new(HashSet::new()),
                stop: AtomicBool::new(false),
                worker: Mutex::new(None),
                errors: std::sync::Mutex::new(None),
            }),
        }
    }
}
