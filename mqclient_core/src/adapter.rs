use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;

use crate::message::Message;

/// The error type every broker adapter surfaces. Kept as a boxed
/// `std::error::Error` (rather than a generic parameter threaded through
/// every trait in this module) so that [`RawQueue`]/[`Producer`]/[`Consumer`]
/// remain object-safe and a [`crate::queue::Queue`] can hold
/// `Box<dyn Producer>`/`Box<dyn Consumer>` without knowing the concrete
/// adapter crate.
pub type AdapterError = Box<dyn StdError + Send + Sync>;

/// Base lifecycle shared by [`Producer`] and [`Consumer`]: connect once,
/// close once. Both calls are idempotent with respect to an
/// already-matching state; a second `close()` on an already-closed instance
/// is a distinct, reportable condition (see
/// [`crate::error::AlreadyClosedException`]) rather than a silent no-op, so
/// that programming errors surface instead of being swallowed.
#[async_trait]
pub trait RawQueue: Send + Sync {
    /// Establishes the connection. A no-op if already connected.
    async fn connect(&mut self) -> Result<(), AdapterError>;

    /// Tears the connection down. Fails with a dedicated error kind if there
    /// is no live connection to close (see
    /// [`crate::error::ClosingFailedException`] /
    /// [`crate::error::AlreadyClosedException`]).
    async fn close(&mut self) -> Result<(), AdapterError>;
}

/// A broker-side publishing endpoint.
#[async_trait]
pub trait Producer: RawQueue {
    /// Sends one message and confirms durability at the broker's own
    /// granularity. The core requires at-least-once delivery on success.
    async fn send_message(&mut self, payload: Vec<u8>) -> Result<(), AdapterError>;
}

/// A broker-side consumption endpoint.
///
/// Carries a `prefetch` value fixed at construction time, meaning "maximum
/// number of unacknowledged messages the broker may send ahead of time."
/// Adapters without native prefetch support must emulate it by pacing
/// [`Consumer::get_message`].
#[async_trait]
pub trait Consumer: RawQueue {
    /// Returns the next message within `timeout`, or `None` on idle timeout
    /// (which is the normal signal, not an error). Must not lose a message
    /// if cancelled mid-receive; redelivery on cancellation is acceptable.
    async fn get_message(&mut self, timeout: Duration) -> Result<Option<Message>, AdapterError>;

    /// Marks a delivered message as successfully processed.
    async fn ack_message(&mut self, msg: &Message) -> Result<(), AdapterError>;

    /// Negatively acknowledges a delivered message. The broker may redeliver
    /// it; adapters that support a fast redelivery deadline should request
    /// one.
    async fn reject_message(&mut self, msg: &Message) -> Result<(), AdapterError>;
}

/// A broker-specific factory for [`Producer`]s and [`Consumer`]s, resolved by
/// name through [`crate::registry`].
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Creates and connects a [`Producer`] for the given pub queue.
    async fn create_pub_queue(
        &self,
        address: &str,
        name: &str,
        auth_token: Option<&str>,
        ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Producer>, AdapterError>;

    /// Creates and connects a [`Consumer`] for the given sub queue.
    async fn create_sub_queue(
        &self,
        address: &str,
        name: &str,
        prefetch: u32,
        auth_token: Option<&str>,
        ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Consumer>, AdapterError>;
}
