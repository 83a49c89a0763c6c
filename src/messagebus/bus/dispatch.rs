//! The single consume loop that feeds every subscribed topic to its handler.
//!
//! Messages are handled one at a time. Offsets are committed after the handler
//! succeeds, after a message fails to decode, and when no handler is
//! registered for the topic. A failing handler leaves its message uncommitted.

use super::context::MessageContext;
use super::{Inner, MessageBus};
use crate::messagebus::error::MessageBusError;
use crate::messagebus::kafka::{BrokerConsumer, BrokerError, BrokerMessage};
use futures::FutureExt;
use log::{debug, info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

tokio::task_local! {
    /// Set while a handler runs on the dispatch task
    static DISPATCHING: ();
}

/// True when called from inside a handler invoked by the dispatch loop
pub(crate) fn in_dispatch_task() -> bool {
    DISPATCHING.try_with(|_| ()).is_ok()
}

pub(crate) async fn run_dispatch_loop(
    bus: Weak<Inner>,
    consumer: Arc<dyn BrokerConsumer>,
    poll_interval: Duration,
) {
    info!("Dispatch loop started");

    loop {
        let Some(inner) = bus.upgrade() else {
            debug!("Message bus dropped, leaving dispatch loop");
            break;
        };
        if inner.stop.load(Ordering::Acquire) {
            if let Err(e) = consumer.close().await {
                warn!("Closing consumer on stop failed: {}", e);
            }
            break;
        }

        match consumer.poll(poll_interval).await {
            Ok(Some(message)) => dispatch(&inner, consumer.as_ref(), message).await,
            Ok(None) => {}
            Err(BrokerError::Closed) => break,
            Err(e) => {
                inner.report(MessageBusError::from(e));
                tokio::time::sleep(poll_interval).await;
            }
        }
    }

    info!("Dispatch loop stopped");
}

async fn dispatch(inner: &Arc<Inner>, consumer: &dyn BrokerConsumer, message: BrokerMessage) {
    let record = match inner.codec.deserialize(&message).await {
        Ok(record) => record,
        Err(e) => {
            warn!(
                "Skipping undecodable message {}[{}]@{}",
                message.topic, message.partition, message.offset
            );
            inner.report(MessageBusError::from(e));
            commit(inner, consumer, &message).await;
            return;
        }
    };

    let handler = inner.handlers().get(&message.topic).cloned();
    let Some(handler) = handler else {
        warn!(
            "No handler for topic '{}', skipping offset {}",
            message.topic, message.offset
        );
        commit(inner, consumer, &message).await;
        return;
    };

    let context = MessageContext {
        incoming: record,
        sender: MessageBus {
            inner: Arc::clone(inner),
        },
    };

    let outcome = DISPATCHING
        .scope((), AssertUnwindSafe(handler.handle(context)).catch_unwind())
        .await;

    match outcome {
        Ok(Ok(())) => commit(inner, consumer, &message).await,
        Ok(Err(e)) => {
            debug!(
                "Handler for '{}' failed at offset {}, leaving it uncommitted",
                message.topic, message.offset
            );
            inner.report(e);
        }
        Err(_) => inner.report(MessageBusError::handler(format!(
            "handler for topic '{}' panicked at offset {}",
            message.topic, message.offset
        ))),
    }
}

async fn commit(inner: &Inner, consumer: &dyn BrokerConsumer, message: &BrokerMessage) {
    if let Err(e) = consumer.commit_message(message).await {
        inner.report(MessageBusError::from(e));
    }
}
