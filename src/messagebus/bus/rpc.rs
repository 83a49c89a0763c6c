//! Request/reply over two topics.
//!
//! A request installs a one-shot handler on its reply topic, publishes the
//! request and waits for the first reply whose correlation id matches. Only
//! one request may wait on a given reply topic at a time.

use super::context::MessageContext;
use super::handler::Handler;
use super::{Inner, MessageBus};
use crate::messagebus::error::{MessageBusError, MessageBusResult};
use crate::messagebus::record::{AvroRecord, ConsumerRecord, ProducerRecord};
use async_trait::async_trait;
use log::debug;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, oneshot};

/// Completes a pending request with the first reply carrying its correlation id
pub(crate) struct ReplyHandler {
    correlation_id: String,
    reply: Mutex<Option<oneshot::Sender<ConsumerRecord>>>,
}

impl ReplyHandler {
    pub(crate) fn new(correlation_id: String, reply: oneshot::Sender<ConsumerRecord>) -> Self {
        Self {
            correlation_id,
            reply: Mutex::new(Some(reply)),
        }
    }
}

#[async_trait]
impl Handler for ReplyHandler {
    async fn handle(&self, context: MessageContext) -> MessageBusResult<()> {
        if context.incoming.correlation_id() != Some(self.correlation_id.as_str()) {
            debug!(
                "Dropping reply on '{}' with correlation id {:?}, waiting for {}",
                context.incoming.topic,
                context.incoming.correlation_id(),
                self.correlation_id
            );
            return Ok(());
        }

        if let Some(reply) = self.reply.lock().await.take() {
            // the requester may have timed out already
            let _ = reply.send(context.incoming);
        }
        Ok(())
    }
}

/// Holds a reply topic for one request: the topic is reserved and the
/// request's reply handler installed on creation, and both are undone on
/// drop, so a cancelled request frees the topic as well.
struct PendingReply {
    inner: Arc<Inner>,
    reply_topic: String,
    reply_handler: Weak<dyn Handler>,
    previous: Option<Arc<dyn Handler>>,
}

impl PendingReply {
    fn install(
        inner: &Arc<Inner>,
        reply_topic: &str,
        reply_handler: Arc<dyn Handler>,
    ) -> MessageBusResult<Self> {
        let reserved = inner
            .pending_replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(reply_topic.to_string());
        if !reserved {
            return Err(MessageBusError::config(format!(
                "a request is already waiting on reply topic '{}'",
                reply_topic
            )));
        }

        let weak = Arc::downgrade(&reply_handler);
        let previous = inner
            .handlers_mut()
            .insert(reply_topic.to_string(), reply_handler);
        Ok(Self {
            inner: Arc::clone(inner),
            reply_topic: reply_topic.to_string(),
            reply_handler: weak,
            previous,
        })
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        {
            let mut handlers = self.inner.handlers_mut();
            // a handler registered while the request was in flight stays
            let still_ours = handlers
                .get(&self.reply_topic)
                .is_some_and(|current| Arc::downgrade(current).ptr_eq(&self.reply_handler));
            if still_ours {
                match self.previous.take() {
                    Some(handler) => {
                        handlers.insert(self.reply_topic.clone(), handler);
                    }
                    None => {
                        handlers.remove(&self.reply_topic);
                    }
                }
            }
        }
        self.inner
            .pending_replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.reply_topic);
    }
}

impl MessageBus {
    /// Publish `record` to `topic` and wait for the reply on the record's
    /// reply topic.
    ///
    /// The reply topic stays subscribed afterwards; whatever handler was
    /// registered on it before the call is put back, unless another handler
    /// was registered there while the request was waiting. Dropping the
    /// future releases the reply topic as well. Fails with
    /// [`MessageBusError::Timeout`] when no matching reply arrives within the
    /// configured RPC timeout.
    pub async fn request<V: AvroRecord>(
        &self,
        topic: &str,
        record: ProducerRecord<V>,
    ) -> MessageBusResult<ConsumerRecord> {
        if self.inner.consumer.is_none() {
            return Err(MessageBusError::config(
                "request needs a consumer to receive the reply",
            ));
        }
        if !record.key.has_reply_topic() {
            return Err(MessageBusError::config("message should have a reply topic"));
        }
        let reply_topic = record.key.reply_topic.clone();

        let (tx, rx) = oneshot::channel();
        let reply_handler: Arc<dyn Handler> =
            Arc::new(ReplyHandler::new(record.key.correlation_id.clone(), tx));
        let pending = PendingReply::install(&self.inner, &reply_topic, reply_handler)?;

        let outcome = self.exchange(topic, &reply_topic, record, rx).await;
        drop(pending);
        outcome
    }

    async fn exchange<V: AvroRecord>(
        &self,
        topic: &str,
        reply_topic: &str,
        record: ProducerRecord<V>,
        reply: oneshot::Receiver<ConsumerRecord>,
    ) -> MessageBusResult<ConsumerRecord> {
        self.subscribe(reply_topic).await?;

        let correlation_id = record.key.correlation_id.clone();
        self.send(topic, record).await?;
        debug!(
            "Sent request {} to '{}', waiting on '{}'",
            correlation_id, topic, reply_topic
        );

        let timeout = self.inner.rpc_timeout;
        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(_)) => Err(MessageBusError::config(format!(
                "reply handler on '{}' was replaced before a reply arrived",
                reply_topic
            ))),
            Err(_) => Err(MessageBusError::Timeout { timeout }),
        }
    }
}
