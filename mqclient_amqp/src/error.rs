use thiserror::Error;

/// Adapter-local failures that do not already arrive as a [`lapin::Error`].
#[derive(Error, Debug)]
pub enum AmqpError {
    /// The broker address could not be parsed or resolved into credentials.
    #[error("invalid AMQP address: {0}")]
    InvalidAddress(String),
    /// The underlying lapin connection or channel failed.
    #[error("lapin error: {0}")]
    Lapin(#[from] lapin::Error),
    /// `ack_message`/`reject_message` was called with a message this
    /// consumer never delivered (its delivery tag has no known [`lapin::acker::Acker`]).
    #[error("no pending delivery for message id {0:?}")]
    UnknownDelivery(crate::consumer::DeliveryKey),
}

impl AmqpError {
    /// An invalid address or an unrecognized delivery can never be fixed by
    /// reconnecting; every other failure is assumed to be a transient broker
    /// or network hiccup, matching `mqclient/broker_clients/rabbitmq.py`'s
    /// narrow `nonretriable_conditions` (only a bad URL is non-retriable).
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(self, AmqpError::InvalidAddress(_) | AmqpError::UnknownDelivery(_))
    }
}
