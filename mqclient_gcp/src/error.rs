use thiserror::Error;

/// Adapter-local failures for the GCP Pub/Sub adapter.
#[derive(Error, Debug)]
pub enum GcpError {
    /// Failed to authenticate or construct the Pub/Sub client.
    #[error("failed to construct a Pub/Sub client: {0}")]
    Client(String),
    /// Failed to create or resolve the topic.
    #[error("failed to resolve the Pub/Sub topic: {0}")]
    Topic(String),
    /// Failed to create or resolve the subscription.
    #[error("failed to resolve the Pub/Sub subscription: {0}")]
    Subscription(String),
    /// Failed to publish a message.
    #[error("failed to publish a message: {0}")]
    Publish(String),
    /// Failed to pull, ack, or nack a message.
    #[error("Pub/Sub operation failed: {0}")]
    Message(String),
    /// `address` did not match `project_id[/topic_id]`.
    #[error("invalid GCP address: {0}")]
    InvalidAddress(String),
    /// `ack_message`/`reject_message` was called with a message this
    /// consumer never delivered.
    #[error("no pending delivery for message id {0:?}")]
    UnknownDelivery(mqclient_core::MessageId),
}

impl GcpError {
    /// An address/credential shape that's wrong once is wrong every time;
    /// anything else (client construction, topic/subscription RPCs) is
    /// assumed to be a transient API hiccup.
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(self, GcpError::InvalidAddress(_) | GcpError::UnknownDelivery(_))
    }
}
