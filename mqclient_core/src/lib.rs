//! Broker-agnostic building blocks for a message-queue client: the message
//! envelope and codec, the ack state machine, the retry/reconnect harness,
//! the scoped pub/sub contexts, and the `Queue` façade that ties them
//! together. Concrete broker adapters (RabbitMQ, NATS, Pulsar, GCP Pub/Sub)
//! live in their own crates and implement the [`adapter`] traits.

pub mod ack;
pub mod adapter;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod queue;
pub mod retry;

pub use adapter::{AdapterError, BrokerClient, Consumer, Producer, RawQueue};
pub use config::{Config, ConfigBuilder};
pub use context::{ManualAckContext, PubHandle, SubIterator};
pub use error::Error;
pub use message::{AckStatus, Headers, Message, MessageId};
pub use queue::{Queue, ScopedFuture};
