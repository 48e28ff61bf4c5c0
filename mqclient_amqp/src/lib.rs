//! RabbitMQ/AMQP broker adapter (C3).
//!
//! Grounded on `strut_rabbitmq`'s `Connector`/`Gateway` for connection setup
//! (`ConnectionProperties` wired to the Tokio executor/reactor) and on
//! `strut_rabbitmq::transport::inbound::delivery`'s `complete_delivery`/
//! `backwash_delivery` for the ack/reject call shape. Address parsing and
//! credential resolution are shared with every address-based adapter via
//! `mqclient_core::config`.

mod client;
mod consumer;
mod error;
mod producer;

pub use client::AmqpBrokerClient;
pub use error::AmqpError;
