use thiserror::Error;

use crate::message::CodecError;

/// The error type a scoped context's user-supplied closure fails with.
/// Boxed so every context shares one signature regardless of what library
/// the caller's own code uses internally.
pub type UserError = Box<dyn std::error::Error + Send + Sync>;

/// Raised by `open_sub_one` when no message arrives within the configured
/// timeout.
#[derive(Error, Debug)]
#[error("no message arrived within the configured timeout")]
pub struct EmptyQueueException;

/// Raised when acking a [`crate::Message`](crate::message::Message) is
/// illegal (already nacked) or the adapter's ack call itself fails.
#[derive(Error, Debug)]
pub enum AckException {
    /// The message had already been negatively acknowledged.
    #[error("message has already been rejected/nacked, it cannot be acked")]
    AlreadyNacked,
    /// The adapter failed to carry out the ack.
    #[error("acking failed on the broker adapter")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Raised when nacking a [`crate::Message`](crate::message::Message) is
/// illegal (already acked) or the adapter's nack call itself fails.
#[derive(Error, Debug)]
pub enum NackException {
    /// The message had already been positively acknowledged.
    #[error("message has already been acked, it cannot be rejected/nacked")]
    AlreadyAcked,
    /// The adapter failed to carry out the nack.
    #[error("nacking failed on the broker adapter")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Raised by `close()` when there is no live connection to close.
#[derive(Error, Debug)]
#[error("attempted to close a connection with no live connection to close")]
pub struct ClosingFailedException;

/// A distinct subtype of [`ClosingFailedException`] raised when `close()` is
/// invoked on an instance that was already closed.
#[derive(Error, Debug)]
#[error("attempted to close an already-closed connection")]
pub struct AlreadyClosedException;

/// Raised when `connect()` cannot establish the prerequisite state for an
/// adapter (e.g. malformed address, missing credentials).
#[derive(Error, Debug)]
#[error("failed to establish the prerequisite connection state: {0}")]
pub struct ConnectingFailedException(pub String);

/// Raised from `iter_messages()` in the manual-acking context when yielding
/// another message would push `ack_pending` past `ack_pending_limit`.
#[derive(Error, Debug)]
#[error("too many messages pending acknowledgement: {pending} already in flight (limit {limit})")]
pub struct TooManyMessagesPendingAckException {
    /// Number of messages currently yielded-but-unresolved.
    pub pending: usize,
    /// The configured ceiling.
    pub limit: usize,
}

/// Raised when a scoped sub context (or its iterator) is entered/iterated a
/// second time after it has already been exited.
#[derive(Error, Debug)]
#[error("{0} cannot be re-entered or re-iterated after it has exited")]
pub struct ReuseException(pub &'static str);

/// The union of every error this crate's core (C1+C2+C4+C5+C6+C7) can
/// surface to a caller. Concrete adapters (C3) surface their own errors
/// through the [`crate::adapter::AdapterError`] trait object embedded here.
#[derive(Error, Debug)]
pub enum Error {
    /// See [`EmptyQueueException`].
    #[error(transparent)]
    EmptyQueue(#[from] EmptyQueueException),
    /// See [`AckException`].
    #[error(transparent)]
    Ack(#[from] AckException),
    /// See [`NackException`].
    #[error(transparent)]
    Nack(#[from] NackException),
    /// See [`ClosingFailedException`].
    #[error(transparent)]
    ClosingFailed(#[from] ClosingFailedException),
    /// See [`AlreadyClosedException`].
    #[error(transparent)]
    AlreadyClosed(#[from] AlreadyClosedException),
    /// See [`ConnectingFailedException`].
    #[error(transparent)]
    ConnectingFailed(#[from] ConnectingFailedException),
    /// See [`TooManyMessagesPendingAckException`].
    #[error(transparent)]
    TooManyMessagesPendingAck(#[from] TooManyMessagesPendingAckException),
    /// See [`ReuseException`].
    #[error(transparent)]
    Reuse(#[from] ReuseException),
    /// A message's envelope failed to encode or decode.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A broker-fatal error surfaced by the adapter, unabsorbed by the retry
    /// harness.
    #[error("broker adapter reported a fatal error: {0}")]
    Adapter(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The user's own code, running inside a scoped sub context, failed.
    #[error(transparent)]
    User(#[from] UserError),
}
