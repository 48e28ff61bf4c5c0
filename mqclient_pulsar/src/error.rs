use thiserror::Error;

/// Adapter-local failures for the Pulsar adapter.
#[derive(Error, Debug)]
pub enum PulsarError {
    /// The `pulsar` client itself failed (connect, produce, consume, or ack).
    #[error("pulsar error: {0}")]
    Pulsar(#[from] pulsar::Error),
    /// `ack_message`/`reject_message` was called with a message this
    /// consumer never delivered.
    #[error("no pending delivery for message id {0:?}")]
    UnknownDelivery(mqclient_core::MessageId),
}

impl PulsarError {
    /// A bad authentication token will never succeed on retry; every other
    /// `pulsar::Error` (broken socket, broker unavailable) is assumed
    /// transient.
    pub(crate) fn is_fatal(&self) -> bool {
        match self {
            PulsarError::UnknownDelivery(_) => true,
            PulsarError::Pulsar(error) => {
                let message = error.to_string().to_lowercase();
                message.contains("auth") || message.contains("unauthorized")
            }
        }
    }
}
