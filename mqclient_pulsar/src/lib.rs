//! Apache Pulsar broker adapter (C3).
//!
//! Grounded on `MQClient/backends/apachepulsar.py`: a shared subscription
//! named `"<topic>-subscription"` (single consumer group per queue name,
//! matching `spec.md`'s one-`Consumer`-per-`Queue` shape), `receiver_queue_size`
//! for prefetch, and explicit per-message `ack`/`negative_acknowledge`.

mod client;
mod consumer;
mod error;
mod producer;

pub use client::PulsarBrokerClient;
pub use error::PulsarError;
