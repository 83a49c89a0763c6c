use super::broker::{BrokerConsumer, BrokerMessage};
use super::consumer_config::ConsumerConfig;
use super::kafka_error::{BrokerError, BrokerResult};
use super::utils::LoggingClientContext;
use async_trait::async_trait;
use log::{debug, info};
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// `BrokerConsumer` backed by an rdkafka `StreamConsumer`.
pub struct KafkaBrokerConsumer {
    consumer: RwLock<Option<Arc<StreamConsumer<LoggingClientContext>>>>,
    group_id: String,
}

impl KafkaBrokerConsumer {
    pub fn new<S: AsRef<str>>(brokers: &[S], config: &ConsumerConfig) -> BrokerResult<Self> {
        let consumer: StreamConsumer<LoggingClientContext> = config
            .to_client_config(brokers)
            .create_with_context(LoggingClientContext)?;

        info!("Created Kafka consumer for group '{}'", config.group_id);

        Ok(Self {
            consumer: RwLock::new(Some(Arc::new(consumer))),
            group_id: config.group_id.clone(),
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    async fn handle(&self) -> BrokerResult<Arc<StreamConsumer<LoggingClientContext>>> {
        self.consumer.read().await.clone().ok_or(BrokerError::Closed)
    }
}

fn detach(message: &BorrowedMessage<'_>) -> BrokerMessage {
    BrokerMessage {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(|k| k.to_vec()),
        value: message.payload().map(|p| p.to_vec()),
        timestamp: message.timestamp().to_millis(),
    }
}

#[async_trait]
impl BrokerConsumer for KafkaBrokerConsumer {
    async fn set_subscriptions(&self, topics: &[String]) -> BrokerResult<()> {
        let consumer = self.handle().await?;
        consumer.unsubscribe();
        if !topics.is_empty() {
            let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
            consumer.subscribe(&topics)?;
        }
        debug!(
            "Group '{}' subscribed to [{}]",
            self.group_id,
            topics.join(", ")
        );
        Ok(())
    }

    async fn poll(&self, timeout: Duration) -> BrokerResult<Option<BrokerMessage>> {
        let consumer = self.handle().await?;
        match tokio::time::timeout(timeout, consumer.recv()).await {
            Err(_) => Ok(None),
            Ok(Ok(message)) => Ok(Some(detach(&message))),
            Ok(Err(err)) => Err(err.into()),
        }
    }

    async fn commit_message(&self, message: &BrokerMessage) -> BrokerResult<()> {
        let consumer = self.handle().await?;
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )?;
        consumer.commit(&offsets, CommitMode::Sync)?;
        Ok(())
    }

    async fn close(&self) -> BrokerResult<()> {
        if let Some(consumer) = self.consumer.write().await.take() {
            consumer.unsubscribe();
            info!("Kafka consumer for group '{}' closed", self.group_id);
        }
        Ok(())
    }
}
