use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use google_cloud_pubsub::subscriber::ReceivedMessage;
use google_cloud_pubsub::subscription::Subscription;
use mqclient_core::adapter::{AdapterError, Consumer, RawQueue};
use mqclient_core::{Message, MessageId};
use tracing::{error, warn};

use crate::error::GcpError;

/// A subscriber pulling one message at a time, tracking every
/// delivered-but-unresolved [`ReceivedMessage`] under a locally minted id,
/// mirroring `gcp.py::get_msg`'s `msg_id` round trip through `ack_msg`.
pub struct GcpSub {
    subscription: Subscription,
    pending: HashMap<i64, ReceivedMessage>,
    next_id: AtomicI64,
    closed: bool,
}

impl GcpSub {
    pub(crate) fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            pending: HashMap::new(),
            next_id: AtomicI64::new(0),
            closed: false,
        }
    }

    fn id_of(msg: &Message) -> Result<i64, AdapterError> {
        match msg.msg_id() {
            MessageId::Int(id) => Ok(*id),
            other => Err(Box::new(GcpError::UnknownDelivery(other.clone()))),
        }
    }
}

#[async_trait]
impl RawQueue for GcpSub {
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
impl Consumer for GcpSub {
    async fn get_message(&mut self, timeout: Duration) -> Result<Option<Message>, AdapterError> {
        let pulled = tokio::time::timeout(timeout, self.subscription.pull(1, None)).await;

        let mut messages = match pulled {
            Err(_elapsed) => return Ok(None),
            Ok(Err(error)) => return Err(Box::new(GcpError::Message(error.to_string()))),
            Ok(Ok(messages)) => messages,
        };

        let received = match messages.pop() {
            Some(received) => received,
            None => return Ok(None),
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = received.message.data.clone();
        self.pending.insert(id, received);

        Ok(Some(Message::new(id, payload)))
    }

    async fn ack_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        let id = Self::id_of(msg)?;
        let received = self
            .pending
            .remove(&id)
            .ok_or_else(|| Box::new(GcpError::UnknownDelivery(msg.msg_id().clone())) as AdapterError)?;

        if let Err(error) = received.ack().await {
            error!(?error, error_message = %error, "failed to acknowledge an incoming Pub/Sub message");
            return Err(Box::new(GcpError::Message(error.to_string())));
        }

        Ok(())
    }

    async fn reject_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        let id = Self::id_of(msg)?;
        let received = self
            .pending
            .remove(&id)
            .ok_or_else(|| Box::new(GcpError::UnknownDelivery(msg.msg_id().clone())) as AdapterError)?;

        if let Err(error) = received.nack().await {
            warn!(?error, error_message = %error, "failed to reject an incoming Pub/Sub message");
            return Err(Box::new(GcpError::Message(error.to_string())));
        }

        Ok(())
    }
}
