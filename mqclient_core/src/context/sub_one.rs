//! `open_sub_one` (C7.2): a scoped single-message consumer.
//!
//! Grounded on `mqclient/queue.py::Queue.recv_one`. The user block here
//! cannot hand a value back out the way Python's generator-based context
//! manager yields `data`; instead the caller's closure is run purely for its
//! side effects (`Result<(), UserError>`), matching every other scoped
//! context in this crate and avoiding a `Default`-on-suppression hack for
//! the `except_errors = true` path.

use std::future::Future;

use crate::adapter::Consumer;
use crate::ack;
use crate::error::{Error, UserError};
use crate::message::Message;

/// Runs `f` against the deserialized `data` of `msg`, then acks on success or
/// nacks on failure, per `spec.md` §4.7.2. Does not close `consumer`; the
/// caller (`Queue::open_sub_one`) does that once this returns, in every exit
/// path.
pub(crate) async fn run<F, Fut>(
    consumer: &mut dyn Consumer,
    msg: Message,
    except_errors: bool,
    f: F,
) -> Result<(), Error>
where
    F: FnOnce(serde_json::Value) -> Fut,
    Fut: Future<Output = Result<(), UserError>>,
{
    let data = msg.deserialize_data()?;

    match f(data).await {
        Ok(()) => {
            ack::ack(&msg, consumer).await?;
            Ok(())
        }
        Err(user_err) => {
            ack::nack(&msg, consumer).await?;
            if except_errors {
                Ok(())
            } else {
                Err(Error::User(user_err))
            }
        }
    }
}
