//! The broker registry (C8): resolves a `Config::broker_client` name into a
//! concrete [`BrokerClient`], the way `mqclient/backend_manager.py::get_backend`
//! matches a lowercased name against the four built-in backend modules,
//! surfacing a distinct error when the matching Cargo feature was not
//! enabled (the Python equivalent of its `ModuleNotFoundError` branch).

use std::sync::Arc;

use mqclient_core::adapter::BrokerClient;
use thiserror::Error;

/// Failure to resolve a broker client by name.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No adapter is registered under this name.
    #[error("unknown broker client: {0}")]
    Unknown(String),
    /// The adapter is known but its Cargo feature was not enabled at build
    /// time.
    #[error("the '{0}' broker client is not available; enable the '{1}' feature")]
    BackendNotAvailable(String, &'static str),
}

/// Resolves `name` (case-insensitively) into a freshly constructed
/// [`BrokerClient`]. Recognized names: `"rabbitmq"`/`"amqp"`, `"nats"`,
/// `"pulsar"`, `"gcp"`/`"pubsub"`.
pub fn resolve(name: &str) -> Result<Arc<dyn BrokerClient>, RegistryError> {
    match name.to_lowercase().as_str() {
        "rabbitmq" | "amqp" => rabbitmq(),
        "nats" => nats(),
        "pulsar" => pulsar(),
        "gcp" | "pubsub" => gcp(),
        other => Err(RegistryError::Unknown(other.to_string())),
    }
}

#[cfg(feature = "rabbitmq")]
fn rabbitmq() -> Result<Arc<dyn BrokerClient>, RegistryError> {
    Ok(Arc::new(mqclient_amqp::AmqpBrokerClient::new()))
}

#[cfg(not(feature = "rabbitmq"))]
fn rabbitmq() -> Result<Arc<dyn BrokerClient>, RegistryError> {
    Err(RegistryError::BackendNotAvailable(
        "rabbitmq".to_string(),
        "rabbitmq",
    ))
}

#[cfg(feature = "nats")]
fn nats() -> Result<Arc<dyn BrokerClient>, RegistryError> {
    Ok(Arc::new(mqclient_nats::NatsBrokerClient::new()))
}

#[cfg(not(feature = "nats"))]
fn nats() -> Result<Arc<dyn BrokerClient>, RegistryError> {
    Err(RegistryError::BackendNotAvailable("nats".to_string(), "nats"))
}

#[cfg(feature = "pulsar")]
fn pulsar() -> Result<Arc<dyn BrokerClient>, RegistryError> {
    Ok(Arc::new(mqclient_pulsar::PulsarBrokerClient::new()))
}

#[cfg(not(feature = "pulsar"))]
fn pulsar() -> Result<Arc<dyn BrokerClient>, RegistryError> {
    Err(RegistryError::BackendNotAvailable(
        "pulsar".to_string(),
        "pulsar",
    ))
}

#[cfg(feature = "gcp")]
fn gcp() -> Result<Arc<dyn BrokerClient>, RegistryError> {
    Ok(Arc::new(mqclient_gcp::GcpBrokerClient::new()))
}

#[cfg(not(feature = "gcp"))]
fn gcp() -> Result<Arc<dyn BrokerClient>, RegistryError> {
    Err(RegistryError::BackendNotAvailable("gcp".to_string(), "gcp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_is_rejected() {
        let err = resolve("carrier-pigeon").unwrap_err();
        assert!(matches!(err, RegistryError::Unknown(_)));
    }

    #[test]
    #[cfg(feature = "rabbitmq")]
    fn names_are_case_insensitive() {
        assert!(resolve("RabbitMQ").is_ok());
        assert!(resolve("RABBITMQ").is_ok());
    }
}
