//! `open_sub` (C7.3): the iterator context — the heart of the design.
//!
//! Grounded on `mqclient/queue.py::MessageGeneratorContext`. Python expresses
//! `message_generator` as a coroutine observing exceptions thrown back into
//! it; this corpus has no generators, so the state machine is made explicit
//! (`spec.md` §9's "Generators as the sub iterator" design note) as
//! `SubIterator` with inherent `next`/`notify_error`/`finish_clean` methods
//! instead of `futures::Stream`, keeping the "ack previous before fetching
//! next" ordering visible at the call site.

use std::time::Duration;

use crate::ack;
use crate::adapter::{AdapterError, Consumer};
use crate::error::{Error, ReuseException};
use crate::message::{AckStatus, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Open,
    Exhausted,
    Aborted,
}

/// Drives one `open_sub` block's consumer and ack bookkeeping.
///
/// Tracks `current_msg`: the most recently yielded message whose ack status
/// is still `None`. Each [`SubIterator::next`] acks `current_msg` (if still
/// unresolved) before fetching the next one, per `spec.md` §4.7.3.
pub struct SubIterator {
    consumer: Box<dyn Consumer>,
    timeout: Duration,
    current_msg: Option<Message>,
    state: IterState,
}

impl SubIterator {
    pub(crate) fn new(consumer: Box<dyn Consumer>, timeout: Duration) -> Self {
        Self {
            consumer,
            timeout,
            current_msg: None,
            state: IterState::Open,
        }
    }

    /// Acks `current_msg` if still unresolved, then fetches and returns the
    /// next message's deserialized `data`, or `None` once the broker has
    /// gone idle for `timeout`.
    pub async fn next(&mut self) -> Result<Option<serde_json::Value>, Error> {
        if self.state != IterState::Open {
            return Err(ReuseException("SubIterator").into());
        }

        if let Some(msg) = self.current_msg.take() {
            if msg.ack_status() == AckStatus::None {
                ack::ack(&msg, &mut *self.consumer).await?;
            }
        }

        match self
            .consumer
            .get_message(self.timeout)
            .await
            .map_err(Error::Adapter)?
        {
            None => {
                self.state = IterState::Exhausted;
                Ok(None)
            }
            Some(msg) => {
                let data = msg.deserialize_data()?;
                self.current_msg = Some(msg);
                Ok(Some(data))
            }
        }
    }

    /// Handles a user exception raised mid-iteration: nacks `current_msg`
    /// and moves to the `Aborted` state. Mirrors
    /// `MessageGeneratorContext.__exit__`'s "Exception Was Raised" branch.
    pub(crate) async fn notify_error(&mut self) -> Result<(), Error> {
        self.state = IterState::Aborted;

        if let Some(msg) = self.current_msg.take() {
            ack::nack(&msg, &mut *self.consumer).await?;
        }

        Ok(())
    }

    /// Handles a clean exit (loop ran to exhaustion, or the user `break`s
    /// out) with `current_msg` still live: acks it, per the spec's mandate
    /// that `break` is a good exit.
    pub(crate) async fn finish_clean(&mut self) -> Result<(), Error> {
        if let Some(msg) = self.current_msg.take() {
            if msg.ack_status() == AckStatus::None {
                ack::ack(&msg, &mut *self.consumer).await?;
            }
        }

        Ok(())
    }

    pub(crate) async fn close(&mut self) -> Result<(), AdapterError> {
        self.consumer.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::RawQueue;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;

    struct ScriptedConsumer {
        queue: VecDeque<Message>,
        acks: Vec<i64>,
        nacks: Vec<i64>,
    }

    fn id_of(msg: &Message) -> i64 {
        match msg.msg_id() {
            crate::message::MessageId::Int(i) => *i,
            _ => unreachable!(),
        }
    }

    #[async_trait]
    impl RawQueue for ScriptedConsumer {
        async fn connect(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }
        async fn close(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Consumer for ScriptedConsumer {
        async fn get_message(&mut self, _timeout: Duration) -> Result<Option<Message>, AdapterError> {
            Ok(self.queue.pop_front())
        }
        async fn ack_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
            self.acks.push(id_of(msg));
            Ok(())
        }
        async fn reject_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
            self.nacks.push(id_of(msg));
            Ok(())
        }
    }

    fn seeded(values: &[i64]) -> ScriptedConsumer {
        let queue = values
            .iter()
            .map(|v| Message::new(*v, Message::serialize(json!(v), None).unwrap()))
            .collect();
        ScriptedConsumer {
            queue,
            acks: Vec::new(),
            nacks: Vec::new(),
        }
    }

    #[tokio::test]
    async fn good_exit_acks_every_yielded_message() {
        let consumer = seeded(&[1, 2, 3]);
        let mut iter = SubIterator::new(Box::new(consumer), Duration::from_millis(10));

        let mut seen = Vec::new();
        while let Some(v) = iter.next().await.unwrap() {
            seen.push(v);
        }
        iter.finish_clean().await.unwrap();

        assert_eq!(seen, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn exception_mid_iteration_nacks_current_and_acks_prior() {
        let consumer = seeded(&[1, 2, 3, 4, 5, 6]);
        let mut iter = SubIterator::new(Box::new(consumer), Duration::from_millis(10));

        iter.next().await.unwrap(); // msg 1
        iter.next().await.unwrap(); // acks 1, yields msg 2
        iter.next().await.unwrap(); // acks 2, yields msg 3

        iter.notify_error().await.unwrap(); // nacks 3

        assert_eq!(iter.state, IterState::Aborted);
    }

    #[tokio::test]
    async fn reentry_after_exhaustion_is_refused() {
        let consumer = seeded(&[]);
        let mut iter = SubIterator::new(Box::new(consumer), Duration::from_millis(10));

        assert_eq!(iter.next().await.unwrap(), None);
        let err = iter.next().await.unwrap_err();
        assert!(matches!(err, Error::Reuse(_)));
    }
}
