use async_trait::async_trait;
use mqclient_core::adapter::{AdapterError, Producer, RawQueue};
use pulsar::producer::Producer as PulsarProducer;
use pulsar::TokioExecutor;

use crate::error::PulsarError;

/// A publisher bound to a single Pulsar topic.
pub struct PulsarPub {
    producer: PulsarProducer<TokioExecutor>,
    closed: bool,
}

impl PulsarPub {
    pub(crate) fn new(producer: PulsarProducer<TokioExecutor>) -> Self {
        Self {
            producer,
            closed: false,
        }
    }
}

#[async_trait]
impl RawQueue for PulsarPub {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        if self.closed {
            return Err(Box::new(mqclient_core::error::AlreadyClosedException));
        }
        self.producer.close().await.map_err(PulsarError::from)?;
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl Producer for PulsarPub {
    async fn send_message(&mut self, payload: Vec<u8>) -> Result<(), AdapterError> {
        self.producer
            .send_non_blocking(payload)
            .await
            .map_err(PulsarError::from)?
            .await
            .map_err(PulsarError::from)?;

        Ok(())
    }
}
