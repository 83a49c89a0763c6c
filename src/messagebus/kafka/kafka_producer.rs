use super::broker::{BrokerProducer, DeliveryReport};
use super::kafka_error::{BrokerError, BrokerResult};
use super::producer_config::ProducerConfig;
use super::utils::LoggingClientContext;
use async_trait::async_trait;
use log::{debug, error, info};
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::error::KafkaError;
use rdkafka::message::DeliveryResult;
use rdkafka::producer::{BaseRecord, Producer, ProducerContext, ThreadedProducer};
use rdkafka::util::Timeout;
use rdkafka::{ClientContext, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, oneshot};

type DeliverySender = oneshot::Sender<Result<DeliveryReport, KafkaError>>;

/// Producer context that routes each delivery report back to the caller
/// that produced the message.
#[derive(Default)]
pub struct DeliveryContext {
    logging: LoggingClientContext,
}

impl ClientContext for DeliveryContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, message: &str) {
        self.logging.log(level, fac, message);
    }

    fn error(&self, error: KafkaError, reason: &str) {
        self.logging.error(error, reason);
    }
}

impl ProducerContext for DeliveryContext {
    type DeliveryOpaque = Box<DeliverySender>;

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, sender: Self::DeliveryOpaque) {
        let outcome = match delivery_result {
            Ok(message) => Ok(DeliveryReport {
                partition: message.partition(),
                offset: message.offset(),
            }),
            Err((err, message)) => {
                error!(
                    "Delivery to topic '{}' failed: {}",
                    message.topic(),
                    err
                );
                Err(err.clone())
            }
        };
        if sender.send(outcome).is_err() {
            debug!("Delivery report dropped, caller no longer waiting");
        }
    }
}

/// `BrokerProducer` backed by an rdkafka `ThreadedProducer`.
///
/// The producer's background thread polls delivery callbacks, so `produce`
/// only has to await its own oneshot.
pub struct KafkaBrokerProducer {
    producer: RwLock<Option<Arc<ThreadedProducer<DeliveryContext>>>>,
}

impl KafkaBrokerProducer {
    pub fn new<S: AsRef<str>>(brokers: &[S], config: &ProducerConfig) -> BrokerResult<Self> {
        let producer: ThreadedProducer<DeliveryContext> = config
            .to_client_config(brokers)
            .create_with_context(DeliveryContext::default())?;

        info!(
            "Created Kafka producer for brokers {}",
            brokers
                .iter()
                .map(|b| b.as_ref())
                .collect::<Vec<_>>()
                .join(",")
        );

        Ok(Self {
            producer: RwLock::new(Some(Arc::new(producer))),
        })
    }

    async fn handle(&self) -> BrokerResult<Arc<ThreadedProducer<DeliveryContext>>> {
        self.producer.read().await.clone().ok_or(BrokerError::Closed)
    }
}

#[async_trait]
impl BrokerProducer for KafkaBrokerProducer {
    async fn produce(
        &self,
        topic: &str,
        key: Vec<u8>,
        value: Vec<u8>,
        timestamp_ms: i64,
    ) -> BrokerResult<DeliveryReport> {
        let producer = self.handle().await?;
        let (tx, rx) = oneshot::channel();

        let record = BaseRecord::with_opaque_to(topic, Box::new(tx))
            .key(key.as_slice())
            .payload(value.as_slice())
            .timestamp(timestamp_ms);
        producer.send(record).map_err(|(err, _)| BrokerError::from(err))?;

        match rx.await {
            Ok(Ok(report)) => {
                debug!(
                    "Message delivered to {}[{}] at offset {}",
                    topic, report.partition, report.offset
                );
                Ok(report)
            }
            Ok(Err(err)) => Err(BrokerError::Delivery(err.to_string())),
            Err(_) => Err(BrokerError::DeliveryCancelled),
        }
    }

    async fn flush(&self, timeout: Duration) -> BrokerResult<()> {
        let producer = self.handle().await?;
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| BrokerError::Task(e.to_string()))??;
        Ok(())
    }

    async fn close(&self) -> BrokerResult<()> {
        let taken = self.producer.write().await.take();
        if let Some(producer) = taken {
            // dropping joins the polling thread
            tokio::task::spawn_blocking(move || drop(producer))
                .await
                .map_err(|e| BrokerError::Task(e.to_string()))?;
            info!("Kafka producer closed");
        }
        Ok(())
    }
}
