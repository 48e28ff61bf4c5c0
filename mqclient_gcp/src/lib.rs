//! Google Cloud Pub/Sub broker adapter (C3).
//!
//! Grounded on `MQClient/backends/gcp.py`: the topic is created eagerly on
//! first publish (`create_topic`) and a single subscription named
//! `"<topic>-subscription"` is created eagerly on first subscribe, matching
//! `spec.md`'s one-`Consumer`-per-`Queue` shape. Pub/Sub has no broker host
//! to dial, so unlike the other three adapters `address` plays no role here;
//! the project id instead comes from `ClientConfig::with_auth`'s own
//! ambient-credential discovery (see `client.rs`).

mod client;
mod consumer;
mod error;
mod producer;

pub use client::GcpBrokerClient;
pub use error::GcpError;
