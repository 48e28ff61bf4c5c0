use thiserror::Error;

/// Adapter-local failures for the NATS JetStream adapter.
#[derive(Error, Debug)]
pub enum NatsError {
    /// Failed to connect to the NATS server.
    #[error("failed to connect to NATS: {0}")]
    Connect(#[from] async_nats::ConnectError),
    /// Failed to resolve or create the backing JetStream stream.
    #[error("failed to resolve the JetStream stream: {0}")]
    Stream(String),
    /// Failed to resolve or create the durable pull consumer.
    #[error("failed to resolve the JetStream consumer: {0}")]
    Consumer(String),
    /// Failed to publish a message.
    #[error("failed to publish a message: {0}")]
    Publish(String),
    /// Failed to pull, ack, or nack a message.
    #[error("JetStream operation failed: {0}")]
    Message(String),
    /// `ack_message`/`reject_message` was called with a message this
    /// consumer never delivered.
    #[error("no pending delivery for message id {0:?}")]
    UnknownDelivery(mqclient_core::MessageId),
}

impl NatsError {
    /// A failed dial is assumed transient (DNS hiccup, server still coming
    /// up); everything else reflects a broker-side state mismatch that a
    /// reconnect won't fix.
    pub(crate) fn is_fatal(&self) -> bool {
        !matches!(self, NatsError::Connect(_))
    }
}
