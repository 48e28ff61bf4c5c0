//! `open_sub_manual_acking` (C7.4): same machinery as [`super::sub`], but
//! acknowledgement is the caller's responsibility.
//!
//! Grounded on `spec.md` §4.7.4; there is no direct Python precedent (the
//! original only ships the auto-acking generator context), so the bookkeeping
//! is modeled the way `mqclient_core::context::sub::SubIterator` tracks
//! `current_msg`, generalized to a set of concurrently in-flight messages
//! bounded by `ack_pending_limit`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::warn;

use crate::ack;
use crate::adapter::{AdapterError, Consumer};
use crate::error::{Error, TooManyMessagesPendingAckException};
use crate::message::{AckStatus, Message};

/// The object yielded inside an `open_sub_manual_acking` block.
pub struct ManualAckContext {
    consumer: Mutex<Box<dyn Consumer>>,
    timeout: Duration,
    ack_pending_limit: usize,
    ack_pending: AtomicUsize,
    pending: Mutex<Vec<Arc<Message>>>,
}

impl ManualAckContext {
    pub(crate) fn new(consumer: Box<dyn Consumer>, timeout: Duration, ack_pending_limit: usize) -> Self {
        Self {
            consumer: Mutex::new(consumer),
            timeout,
            ack_pending_limit,
            ack_pending: AtomicUsize::new(0),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Returns a handle whose `next()` pulls the next message, enforcing
    /// `ack_pending_limit`.
    pub fn iter_messages(&self) -> ManualMessages<'_> {
        ManualMessages { ctx: self }
    }

    /// Fetches the next message, or `None` once the broker goes idle.
    /// Raises [`TooManyMessagesPendingAckException`] instead of yielding if
    /// `ack_pending` is already at `ack_pending_limit`.
    pub async fn next_message(&self) -> Result<Option<Arc<Message>>, Error> {
        let pending = self.ack_pending.load(Ordering::Acquire);
        if pending >= self.ack_pending_limit {
            return Err(TooManyMessagesPendingAckException {
                pending,
                limit: self.ack_pending_limit,
            }
            .into());
        }

        let mut consumer = self.consumer.lock().await;
        match consumer
            .get_message(self.timeout)
            .await
            .map_err(Error::Adapter)?
        {
            None => Ok(None),
            Some(msg) => {
                let msg = Arc::new(msg);
                self.ack_pending.fetch_add(1, Ordering::AcqRel);
                self.pending.lock().await.push(Arc::clone(&msg));
                Ok(Some(msg))
            }
        }
    }

    /// Acks a message yielded from this context. Order with respect to other
    /// in-flight messages is unconstrained.
    pub async fn ack(&self, msg: &Message) -> Result<(), Error> {
        let was_pending = msg.ack_status() == AckStatus::None;

        {
            let mut consumer = self.consumer.lock().await;
            ack::ack(msg, &mut **consumer).await?;
        }

        if was_pending {
            self.resolve_pending(msg).await;
        }

        Ok(())
    }

    /// Nacks a message yielded from this context.
    pub async fn nack(&self, msg: &Message) -> Result<(), Error> {
        let was_pending = msg.ack_status() == AckStatus::None;

        {
            let mut consumer = self.consumer.lock().await;
            ack::nack(msg, &mut **consumer).await?;
        }

        if was_pending {
            self.resolve_pending(msg).await;
        }

        Ok(())
    }

    async fn resolve_pending(&self, msg: &Message) {
        let mut pending = self.pending.lock().await;
        if let Some(idx) = pending.iter().position(|m| std::ptr::eq(m.as_ref(), msg)) {
            pending.remove(idx);
        }
        self.ack_pending.fetch_sub(1, Ordering::AcqRel);
    }

    /// Nacks every still-unresolved message, in no particular order, per
    /// the "exit with an exception" branch of `spec.md` §4.7.4. Individual
    /// nack failures are logged and otherwise ignored, since this runs
    /// during teardown of an already-failing block.
    pub(crate) async fn nack_all_pending(&self) {
        let pending: Vec<Arc<Message>> = std::mem::take(&mut *self.pending.lock().await);
        let mut consumer = self.consumer.lock().await;

        for msg in pending {
            if msg.ack_status() == AckStatus::None {
                if let Err(error) = ack::nack(&msg, &mut **consumer).await {
                    warn!(%error, "failed to nack a pending message while tearing down a manual-acking context");
                }
            }
        }

        self.ack_pending.store(0, Ordering::Release);
    }

    pub(crate) async fn close(&self) -> Result<(), AdapterError> {
        self.consumer.lock().await.close().await
    }
}

/// A handle for pulling messages out of a [`ManualAckContext`] one at a
/// time.
pub struct ManualMessages<'a> {
    ctx: &'a ManualAckContext,
}

impl<'a> ManualMessages<'a> {
    /// Fetches the next message. See [`ManualAckContext::next_message`].
    pub async fn next(&self) -> Result<Option<Arc<Message>>, Error> {
        self.ctx.next_message().await
    }
}
