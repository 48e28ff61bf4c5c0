//! The `Queue` façade (C6): the user-facing object holding configuration and
//! minting scoped contexts.
//!
//! Grounded on `mqclient/queue.py::Queue`, generalized from a single cached
//! `Producer` property into a broker-agnostic object that creates a fresh
//! `Producer`/`Consumer` per scoped context via a resolved
//! [`BrokerClient`], per `spec.md` §4.6/§4.7.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::adapter::BrokerClient;
use crate::config::Config;
use crate::context::manual::ManualAckContext;
use crate::context::publisher::PubHandle;
use crate::context::sub::SubIterator;
use crate::context::sub_one;
use crate::error::{EmptyQueueException, Error, UserError};

/// The return type of a scoped-context closure that borrows its argument: a
/// boxed, pinned future tied to the borrow's lifetime `'a`. A plain generic
/// `Fut: Future` parameter cannot express this, since `Fut` would have to be
/// a single concrete type independent of the per-call borrow lifetime;
/// boxing sidesteps that with one dynamic dispatch per scoped-context call.
pub type ScopedFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UserError>> + Send + 'a>>;

/// The user-facing entry point: configuration plus a resolved broker client,
/// able to mint any of the four scoped contexts.
pub struct Queue {
    broker_client: Arc<dyn BrokerClient>,
    config: Config,
}

impl Queue {
    /// Builds a `Queue` against an already-resolved [`BrokerClient`]. If
    /// `config.name` is empty, a fresh name is generated via
    /// [`Queue::make_name`].
    pub fn new(broker_client: Arc<dyn BrokerClient>, mut config: Config) -> Self {
        if config.name.is_empty() {
            config.name = Self::make_name();
        }

        Self {
            broker_client,
            config,
        }
    }

    /// Returns a pseudo-unique string that is a legal queue identifier for
    /// every supported broker: `"a"` followed by 20 lowercase hex
    /// characters, matching `Queue.make_name`'s `"a" + uuid4().hex[:20]`.
    pub fn make_name() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("a{}", &hex[..20])
    }

    /// This queue's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn auth_token(&self) -> Option<&str> {
        self.config.auth_token.as_ref().map(|t| t.unsecure())
    }

    /// Runs `f` against a freshly connected publisher, closing it on every
    /// exit path (success, user error, or adapter error), per `spec.md`
    /// §4.7.1.
    pub async fn open_pub<F, T>(&self, f: F) -> Result<T, Error>
    where
        F: for<'a> FnOnce(PubHandle<'a>) -> ScopedFuture<'a, T>,
    {
        let mut producer = self
            .broker_client
            .create_pub_queue(
                &self.config.address,
                &self.config.name,
                self.auth_token(),
                self.config.ack_timeout,
            )
            .await
            .map_err(Error::Adapter)?;

        let handle = PubHandle::new(&mut *producer);
        let result = f(handle).await;

        let close_result = producer.close().await;
        if let Err(close_err) = close_result {
            return Err(Error::Adapter(close_err));
        }

        result.map_err(Error::User)
    }

    /// Runs `f` against the single next message, acking on success or
    /// nacking on failure, per `spec.md` §4.7.2. Fails with
    /// [`EmptyQueueException`] if no message arrives within `timeout`.
    pub async fn open_sub_one<F, Fut>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = Result<(), UserError>>,
    {
        let mut consumer = self
            .broker_client
            .create_sub_queue(
                &self.config.address,
                &self.config.name,
                self.config.prefetch,
                self.auth_token(),
                self.config.ack_timeout,
            )
            .await
            .map_err(Error::Adapter)?;

        let received = consumer
            .get_message(self.config.timeout)
            .await
            .map_err(Error::Adapter)?;

        let msg = match received {
            Some(msg) => msg,
            None => {
                if let Err(error) = consumer.close().await {
                    debug!(%error, "failed to close an idle consumer after an empty open_sub_one");
                }
                return Err(EmptyQueueException.into());
            }
        };

        let run_result = sub_one::run(&mut *consumer, msg, self.config.except_errors, f).await;

        if let Err(close_err) = consumer.close().await {
            return Err(Error::Adapter(close_err));
        }

        run_result
    }

    /// Runs `f` against a [`SubIterator`] driving one broker-delivery-order
    /// stream of messages, per `spec.md` §4.7.3.
    pub async fn open_sub<F>(&self, f: F) -> Result<(), Error>
    where
        F: for<'a> FnOnce(&'a mut SubIterator) -> ScopedFuture<'a, ()>,
    {
        let consumer = self
            .broker_client
            .create_sub_queue(
                &self.config.address,
                &self.config.name,
                self.config.prefetch,
                self.auth_token(),
                self.config.ack_timeout,
            )
            .await
            .map_err(Error::Adapter)?;

        let mut iter = SubIterator::new(consumer, self.config.timeout);

        let user_result = f(&mut iter).await;

        let cleanup_result = match &user_result {
            Ok(()) => iter.finish_clean().await,
            Err(_) => iter.notify_error().await,
        };

        let close_result = iter.close().await;

        if let Err(close_err) = close_result {
            return Err(Error::Adapter(close_err));
        }
        if let Err(cleanup_err) = cleanup_result {
            return Err(cleanup_err);
        }

        match user_result {
            Ok(()) => Ok(()),
            Err(user_err) => {
                if self.config.except_errors {
                    Ok(())
                } else {
                    Err(Error::User(user_err))
                }
            }
        }
    }

    /// Runs `f` against a [`ManualAckContext`] bounded by `ack_pending_limit`
    /// in-flight, unresolved messages, per `spec.md` §4.7.4.
    pub async fn open_sub_manual_acking<F>(
        &self,
        ack_pending_limit: usize,
        f: F,
    ) -> Result<(), Error>
    where
        F: for<'a> FnOnce(&'a ManualAckContext) -> ScopedFuture<'a, ()>,
    {
        let consumer = self
            .broker_client
            .create_sub_queue(
                &self.config.address,
                &self.config.name,
                self.config.prefetch,
                self.auth_token(),
                self.config.ack_timeout,
            )
            .await
            .map_err(Error::Adapter)?;

        let ctx = ManualAckContext::new(consumer, self.config.timeout, ack_pending_limit);

        let user_result = f(&ctx).await;

        if user_result.is_err() {
            ctx.nack_all_pending().await;
        }

        let close_result = ctx.close().await;
        if let Err(close_err) = close_result {
            return Err(Error::Adapter(close_err));
        }

        match user_result {
            Ok(()) => Ok(()),
            Err(user_err) => {
                if self.config.except_errors {
                    Ok(())
                } else {
                    Err(Error::User(user_err))
                }
            }
        }
    }
}
