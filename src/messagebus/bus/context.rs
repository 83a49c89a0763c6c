use super::MessageBus;
use crate::messagebus::error::{MessageBusError, MessageBusResult};
use crate::messagebus::record::{AvroRecord, ConsumerRecord, ProducerRecord};

/// What a handler receives: the decoded message and the bus it arrived on
#[derive(Clone)]
pub struct MessageContext {
    pub incoming: ConsumerRecord,
    pub sender: MessageBus,
}

impl MessageContext {
    /// Answer the incoming message on its reply topic.
    ///
    /// The outgoing key is a copy of the incoming one, so the requester can
    /// match the reply by correlation id. Fails with a configuration error
    /// when the incoming message has no reply topic.
    pub async fn reply<V: AvroRecord>(
        &self,
        mut record: ProducerRecord<V>,
    ) -> MessageBusResult<i64> {
        let key = self
            .incoming
            .key
            .as_ref()
            .filter(|key| key.has_reply_topic())
            .ok_or_else(|| MessageBusError::config("reply topic undefined"))?;

        record.key = key.clone();
        self.sender.send(&key.reply_topic, record).await
    }
}
