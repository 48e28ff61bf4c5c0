use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection};
use mqclient_core::adapter::{AdapterError, Consumer, RawQueue};
use mqclient_core::{Message, MessageId};
use tracing::{error, warn};

use crate::error::AmqpError;

/// The delivery tag a [`lapin::acker::Acker`] is tracked under, distinct from
/// the `i64` wire representation so a debug print doesn't get confused for a
/// [`MessageId::Int`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct DeliveryKey(pub u64);

/// A subscriber bound to a single durable queue, tracking the
/// [`Acker`](lapin::acker::Acker) of every delivery it has handed out but not
/// yet finalized, the way `strut_rabbitmq::transport::inbound::delivery`
/// finalizes a [`lapin::message::Delivery`] exactly once via its own acker.
pub struct AmqpConsumer {
    connection: Connection,
    channel: Channel,
    consumer: lapin::Consumer,
    ackers: HashMap<DeliveryKey, Acker>,
    closed: bool,
}

impl AmqpConsumer {
    pub(crate) async fn connect(
        connection: Connection,
        queue_name: String,
        prefetch: u32,
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
        channel
            .basic_qos(prefetch as u16, BasicQosOptions::default())
            .await?;

        let consumer = channel
            .basic_consume(
                &queue_name,
                "mqclient",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(Self {
            connection,
            channel,
            consumer,
            ackers: HashMap::new(),
            closed: false,
        })
    }

    fn tag_of(msg: &Message) -> Result<DeliveryKey, AdapterError> {
        match msg.msg_id() {
            MessageId::Int(tag) => Ok(DeliveryKey(*tag as u64)),
            other => Err(Box::new(AmqpError::InvalidAddress(format!(
                "unexpected message id shape for an AMQP delivery: {other:?}"
            )))),
        }
    }
}

#[async_trait]
impl RawQueue for AmqpConsumer {
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
impl Consumer for AmqpConsumer {
    async fn get_message(&mut self, timeout: Duration) -> Result<Option<Message>, AdapterError> {
        let next = tokio::time::timeout(timeout, self.consumer.next()).await;

        let delivery = match next {
            Err(_elapsed) => return Ok(None),
            Ok(None) => return Ok(None),
            Ok(Some(Err(error))) => return Err(Box::new(AmqpError::from(error))),
            Ok(Some(Ok(delivery))) => delivery,
        };

        let tag = DeliveryKey(delivery.delivery_tag);
        self.ackers.insert(tag, delivery.acker.clone());

        Ok(Some(Message::new(delivery.delivery_tag, delivery.data)))
    }

    async fn ack_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        let tag = Self::tag_of(msg)?;
        let acker = self
            .ackers
            .remove(&tag)
            .ok_or_else(|| Box::new(AmqpError::UnknownDelivery(tag)) as AdapterError)?;

        if let Err(error) = acker.ack(BasicAckOptions { multiple: false }).await {
            error!(?error, error_message = %error, "failed to acknowledge an incoming AMQP message");
            return Err(Box::new(AmqpError::from(error)));
        }

        Ok(())
    }

    async fn reject_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        let tag = Self::tag_of(msg)?;
        let acker = self
            .ackers
            .remove(&tag)
            .ok_or_else(|| Box::new(AmqpError::UnknownDelivery(tag)) as AdapterError)?;

        if let Err(error) = acker.reject(BasicRejectOptions { requeue: true }).await {
            warn!(?error, error_message = %error, "failed to reject an incoming AMQP message");
            return Err(Box::new(AmqpError::from(error)));
        }

        Ok(())
    }
}
