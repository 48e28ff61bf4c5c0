use async_nats::jetstream::context::Context as JetStreamContext;
use async_trait::async_trait;
use mqclient_core::adapter::{AdapterError, Producer, RawQueue};

use crate::error::NatsError;

/// A publisher bound to a single JetStream subject.
pub struct NatsProducer {
    jetstream: JetStreamContext,
    subject: String,
    closed: bool,
}

impl NatsProducer {
    pub(crate) fn new(jetstream: JetStreamContext, subject: String) -> Self {
        Self {
            jetstream,
            subject,
            closed: false,
        }
    }
}

#[async_trait]
impl RawQueue for NatsProducer {
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
impl Producer for NatsProducer {
    async fn send_message(&mut self, payload: Vec<u8>) -> Result<(), AdapterError> {
        let ack = self
            .jetstream
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|error| NatsError::Publish(error.to_string()))?;

        ack.await.map_err(|error| NatsError::Publish(error.to_string()))?;

        Ok(())
    }
}
