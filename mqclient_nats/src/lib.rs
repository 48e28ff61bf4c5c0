//! NATS JetStream broker adapter (C3).
//!
//! Grounded on `armature-messaging::nats::NatsBroker` for the
//! `async_nats::ConnectOptions` connection shape, generalized from
//! core-NATS fire-and-forget publish/subscribe to a JetStream stream with a
//! durable pull consumer, since `spec.md`'s ack/nack model needs an
//! explicit, broker-tracked unacknowledged state that core NATS has no
//! notion of.

mod client;
mod consumer;
mod error;
mod producer;

pub use client::NatsBrokerClient;
pub use error::NatsError;
