use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_nats::jetstream::consumer::pull::Stream as PullStream;
use async_nats::jetstream::Message as JsMessage;
use async_trait::async_trait;
use futures::StreamExt;
use mqclient_core::adapter::{AdapterError, Consumer, RawQueue};
use mqclient_core::{Message, MessageId};
use tracing::{error, warn};

use crate::error::NatsError;

/// A subscriber pulling from a durable JetStream consumer, tracking every
/// delivered-but-unresolved [`JsMessage`] under a locally minted sequence
/// number so `ack_message`/`reject_message` can look the delivery back up by
/// the [`MessageId`] this crate handed out.
pub struct NatsConsumer {
    stream: PullStream,
    pending: HashMap<i64, JsMessage>,
    next_id: AtomicI64,
    closed: bool,
}

impl NatsConsumer {
    pub(crate) fn new(stream: PullStream) -> Self {
        Self {
            stream,
            pending: HashMap::new(),
            next_id: AtomicI64::new(0),
            closed: false,
        }
    }

    fn id_of(msg: &Message) -> Result<i64, AdapterError> {
        match msg.msg_id() {
            MessageId::Int(id) => Ok(*id),
            other => Err(Box::new(NatsError::UnknownDelivery(other.clone()))),
        }
    }
}

#[async_trait]
impl RawQueue for NatsConsumer {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        if self.closed {
            return Err(Box::new(mqclient_core::error::AlreadyClosedException));
        }
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl Consumer for NatsConsumer {
    async fn get_message(&mut self, timeout: Duration) -> Result<Option<Message>, AdapterError> {
        let next = tokio::time::timeout(timeout, self.stream.next()).await;

        let js_msg = match next {
            Err(_elapsed) => return Ok(None),
            Ok(None) => return Ok(None),
            Ok(Some(Err(error))) => return Err(Box::new(NatsError::Message(error.to_string()))),
            Ok(Some(Ok(js_msg))) => js_msg,
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = js_msg.message.payload.to_vec();
        self.pending.insert(id, js_msg);

        Ok(Some(Message::new(id, payload)))
    }

    async fn ack_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        let id = Self::id_of(msg)?;
        let js_msg = self
            .pending
            .remove(&id)
            .ok_or_else(|| Box::new(NatsError::UnknownDelivery(msg.msg_id().clone())) as AdapterError)?;

        if let Err(error) = js_msg.ack().await {
            error!(?error, error_message = %error, "failed to acknowledge an incoming JetStream message");
            return Err(Box::new(NatsError::Message(error.to_string())));
        }

        Ok(())
    }

    async fn reject_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        let id = Self::id_of(msg)?;
        let js_msg = self
            .pending
            .remove(&id)
            .ok_or_else(|| Box::new(NatsError::UnknownDelivery(msg.msg_id().clone())) as AdapterError)?;

        if let Err(error) = js_msg.ack_with(async_nats::jetstream::AckKind::Nak(None)).await {
            warn!(?error, error_message = %error, "failed to reject an incoming JetStream message");
            return Err(Box::new(NatsError::Message(error.to_string())));
        }

        Ok(())
    }
}
