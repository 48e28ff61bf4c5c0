use async_trait::async_trait;
use google_cloud_pubsub::publisher::Publisher;
use mqclient_core::adapter::{AdapterError, Producer, RawQueue};

use crate::error::GcpError;

/// A publisher bound to a single Pub/Sub topic.
pub struct GcpPub {
    publisher: Publisher,
    closed: bool,
}

impl GcpPub {
    pub(crate) fn new(publisher: Publisher) -> Self {
        Self {
            publisher,
            closed: false,
        }
    }
}

#[async_trait]
impl RawQueue for GcpPub {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        if self.closed {
            return Err(Box::new(mqclient_core::error::AlreadyClosedException));
        }
        self.publisher.shutdown().await;
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl Producer for GcpPub {
    async fn send_message(&mut self, payload: Vec<u8>) -> Result<(), AdapterError> {
        use google_cloud_googleapis::pubsub::v1::PubsubMessage;

        let awaiter = self.publisher.publish(PubsubMessage {
            data: payload,
            ..Default::default()
        }).await;

        awaiter
            .get()
            .await
            .map_err(|error| Box::new(GcpError::Publish(error.to_string())) as AdapterError)?;

        Ok(())
    }
}
