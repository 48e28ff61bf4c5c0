use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use mqclient_core::adapter::{AdapterError, Consumer, RawQueue};
use mqclient_core::{Message, MessageId};
use pulsar::consumer::Consumer as PulsarConsumer;
use pulsar::TokioExecutor;
use tracing::{error, warn};

use crate::error::PulsarError;

/// A subscriber on a single shared subscription, tracking every
/// delivered-but-unresolved message's broker
/// [`MessageID`](pulsar::proto::MessageIdData) under a locally minted id, the
/// way `apachepulsar.py`'s `ack_message`/`reject_message` operate on the
/// `msg_id` handed back by `get_message`.
pub struct PulsarSub {
    consumer: PulsarConsumer<Vec<u8>, TokioExecutor>,
    pending: HashMap<i64, pulsar::proto::MessageIdData>,
    next_id: AtomicI64,
    closed: bool,
}

impl PulsarSub {
    pub(crate) fn new(consumer: PulsarConsumer<Vec<u8>, TokioExecutor>) -> Self {
        Self {
            consumer,
            pending: HashMap::new(),
            next_id: AtomicI64::new(0),
            closed: false,
        }
    }

    fn id_of(msg: &Message) -> Result<i64, AdapterError> {
        match msg.msg_id() {
            MessageId::Int(id) => Ok(*id),
            other => Err(Box::new(PulsarError::UnknownDelivery(other.clone()))),
        }
    }
}

#[async_trait]
impl RawQueue for PulsarSub {
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
impl Consumer for PulsarSub {
    async fn get_message(&mut self, timeout: Duration) -> Result<Option<Message>, AdapterError> {
        let next = tokio::time::timeout(timeout, self.consumer.next()).await;

        let delivery = match next {
            Err(_elapsed) => return Ok(None),
            Ok(None) => return Ok(None),
            Ok(Some(Err(error))) => return Err(Box::new(PulsarError::from(error))),
            Ok(Some(Ok(delivery))) => delivery,
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = delivery.payload.data.clone();
        self.pending.insert(id, delivery.message_id().clone());

        Ok(Some(Message::new(id, payload)))
    }

    async fn ack_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        let id = Self::id_of(msg)?;
        let message_id = self
            .pending
            .remove(&id)
            .ok_or_else(|| Box::new(PulsarError::UnknownDelivery(msg.msg_id().clone())) as AdapterError)?;

        if let Err(error) = self.consumer.ack_with_id(self.consumer.topic(), message_id).await {
            error!(?error, error_message = %error, "failed to acknowledge an incoming Pulsar message");
            return Err(Box::new(PulsarError::from(error)));
        }

        Ok(())
    }

    async fn reject_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        let id = Self::id_of(msg)?;
        let message_id = self
            .pending
            .remove(&id)
            .ok_or_else(|| Box::new(PulsarError::UnknownDelivery(msg.msg_id().clone())) as AdapterError)?;

        if let Err(error) = self.consumer.nack_with_id(self.consumer.topic(), message_id).await {
            warn!(?error, error_message = %error, "failed to reject an incoming Pulsar message");
            return Err(Box::new(PulsarError::from(error)));
        }

        Ok(())
    }
}
