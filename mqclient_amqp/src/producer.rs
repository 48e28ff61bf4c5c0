use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection};
use mqclient_core::adapter::{AdapterError, Producer, RawQueue};

use crate::error::AmqpError;

/// A publisher bound to a single durable queue, declared on construction.
pub struct AmqpProducer {
    connection: Connection,
    channel: Channel,
    queue_name: String,
    closed: bool,
}

impl AmqpProducer {
    pub(crate) async fn connect(
        connection: Connection,
        queue_name: String,
    ) -> Result<Self, AmqpError> {
        let channel = connection.create_channel().await?;
        channel
            .queue_declare(
                &queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        Ok(Self {
            connection,
            channel,
            queue_name,
            closed: false,
        })
    }
}

#[async_trait]
impl RawQueue for AmqpProducer {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        if self.closed {
            return Err(Box::new(mqclient_core::error::AlreadyClosedException));
        }

        self.channel.close(200, "closing").await.map_err(AmqpError::from)?;
        self.connection.close(200, "closing").await.map_err(AmqpError::from)?;
        self.closed = true;

        Ok(())
    }
}

#[async_trait]
impl Producer for AmqpProducer {
    async fn send_message(&mut self, payload: Vec<u8>) -> Result<(), AdapterError> {
        self.channel
            .basic_publish(
                "",
                &self.queue_name,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(AmqpError::from)?
            .await
            .map_err(AmqpError::from)?;

        Ok(())
    }
}
