//! The acknowledgement state machine shared by every scoped sub context.
//!
//! Mirrors `mqclient/queue.py::Queue.ack`/`.nack`, generalized from a method
//! on the Python `Queue` into two free functions that any context module in
//! [`crate::context`] can drive against a `dyn Consumer`.

use tracing::debug;

use crate::adapter::Consumer;
use crate::error::{AckException, NackException};
use crate::message::{AckStatus, Message};

/// Transitions `msg` towards [`AckStatus::Acked`].
///
/// | current state | effect                                    |
/// |----------------|-------------------------------------------|
/// | `None`         | calls `consumer.ack_message`, then `Acked` |
/// | `Acked`        | no-op                                      |
/// | `Nacked`       | [`AckException::AlreadyNacked`]            |
///
/// A failure from the adapter leaves `msg`'s state unchanged and is wrapped
/// in [`AckException::Backend`].
pub async fn ack(msg: &Message, consumer: &mut dyn Consumer) -> Result<(), AckException> {
    match msg.ack_status() {
        AckStatus::None => {
            consumer
                .ack_message(msg)
                .await
                .map_err(AckException::Backend)?;
            msg.ack_cell().set(AckStatus::Acked);
            Ok(())
        }
        AckStatus::Acked => {
            debug!("message already acked, ack() is a no-op");
            Ok(())
        }
        AckStatus::Nacked => Err(AckException::AlreadyNacked),
    }
}

/// Transitions `msg` towards [`AckStatus::Nacked`].
///
/// | current state | effect                                         |
/// |----------------|------------------------------------------------|
/// | `None`         | calls `consumer.reject_message`, then `Nacked`  |
/// | `Acked`        | [`NackException::AlreadyAcked`]                 |
/// | `Nacked`       | no-op                                           |
///
/// A failure from the adapter leaves `msg`'s state unchanged and is wrapped
/// in [`NackException::Backend`].
pub async fn nack(msg: &Message, consumer: &mut dyn Consumer) -> Result<(), NackException> {
    match msg.ack_status() {
        AckStatus::None => {
            consumer
                .reject_message(msg)
                .await
                .map_err(NackException::Backend)?;
            msg.ack_cell().set(AckStatus::Nacked);
            Ok(())
        }
        AckStatus::Acked => Err(NackException::AlreadyAcked),
        AckStatus::Nacked => {
            debug!("message already nacked, nack() is a no-op");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterError, RawQueue};
    use async_trait::async_trait;
    use std::time::Duration;

    struct CountingConsumer {
        acks: usize,
        nacks: usize,
        fail_next: bool,
    }

    impl CountingConsumer {
        fn new() -> Self {
            Self {
                acks: 0,
                nacks: 0,
                fail_next: false,
            }
        }
    }

    #[async_trait]
    impl RawQueue for CountingConsumer {
        async fn connect(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Consumer for CountingConsumer {
        async fn get_message(&mut self, _timeout: Duration) -> Result<Option<Message>, AdapterError> {
            Ok(None)
        }

        async fn ack_message(&mut self, _msg: &Message) -> Result<(), AdapterError> {
            if self.fail_next {
                return Err("ack failed".into());
            }
            self.acks += 1;
            Ok(())
        }

        async fn reject_message(&mut self, _msg: &Message) -> Result<(), AdapterError> {
            if self.fail_next {
                return Err("nack failed".into());
            }
            self.nacks += 1;
            Ok(())
        }
    }

    fn test_message() -> Message {
        Message::new(1i64, Message::serialize(serde_json::json!(1), None).unwrap())
    }

    #[tokio::test]
    async fn ack_from_none_transitions_to_acked() {
        let msg = test_message();
        let mut consumer = CountingConsumer::new();

        ack(&msg, &mut consumer).await.unwrap();

        assert_eq!(msg.ack_status(), AckStatus::Acked);
        assert_eq!(consumer.acks, 1);
    }

    #[tokio::test]
    async fn ack_is_idempotent_once_acked() {
        let msg = test_message();
        let mut consumer = CountingConsumer::new();

        ack(&msg, &mut consumer).await.unwrap();
        ack(&msg, &mut consumer).await.unwrap();

        assert_eq!(consumer.acks, 1);
    }

    #[tokio::test]
    async fn ack_after_nack_is_illegal() {
        let msg = test_message();
        let mut consumer = CountingConsumer::new();

        nack(&msg, &mut consumer).await.unwrap();
        let err = ack(&msg, &mut consumer).await.unwrap_err();

        assert!(matches!(err, AckException::AlreadyNacked));
        assert_eq!(msg.ack_status(), AckStatus::Nacked);
    }

    #[tokio::test]
    async fn nack_after_ack_is_illegal() {
        let msg = test_message();
        let mut consumer = CountingConsumer::new();

        ack(&msg, &mut consumer).await.unwrap();
        let err = nack(&msg, &mut consumer).await.unwrap_err();

        assert!(matches!(err, NackException::AlreadyAcked));
    }

    #[tokio::test]
    async fn nack_is_idempotent_once_nacked() {
        let msg = test_message();
        let mut consumer = CountingConsumer::new();

        nack(&msg, &mut consumer).await.unwrap();
        nack(&msg, &mut consumer).await.unwrap();

        assert_eq!(consumer.nacks, 1);
    }

    #[tokio::test]
    async fn failed_adapter_ack_leaves_state_unchanged() {
        let msg = test_message();
        let mut consumer = CountingConsumer::new();
        consumer.fail_next = true;

        let err = ack(&msg, &mut consumer).await.unwrap_err();

        assert!(matches!(err, AckException::Backend(_)));
        assert_eq!(msg.ack_status(), AckStatus::None);
    }

    #[tokio::test]
    async fn failed_adapter_nack_leaves_state_unchanged() {
        let msg = test_message();
        let mut consumer = CountingConsumer::new();
        consumer.fail_next = true;

        let err = nack(&msg, &mut consumer).await.unwrap_err();

        assert!(matches!(err, NackException::Backend(_)));
        assert_eq!(msg.ack_status(), AckStatus::None);
    }
}
