use super::context::MessageContext;
use crate::messagebus::error::MessageBusResult;
use async_trait::async_trait;
use std::future::Future;

/// Receives the messages of one topic.
///
/// Returning an error leaves the message uncommitted, so the consumer group
/// sees it again after a restart or rebalance.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, context: MessageContext) -> MessageBusResult<()>;
}

/// Handler backed by an async closure, see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(MessageContext) -> Fut + Send + Sync,
    Fut: Future<Output = MessageBusResult<()>> + Send,
{
    async fn handle(&self, context: MessageContext) -> MessageBusResult<()> {
        (self.f)(context).await
    }
}

/// Wrap an async closure as a [`Handler`].
///
/// ```rust
/// use messagebus::{MessageContext, handler_fn};
///
/// let handler = handler_fn(|context: MessageContext| async move {
///     log::info!("got offset {}", context.incoming.offset);
///     Ok(())
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(MessageContext) -> Fut + Send + Sync,
    Fut: Future<Output = MessageBusResult<()>> + Send,
{
    FnHandler { f }
}
