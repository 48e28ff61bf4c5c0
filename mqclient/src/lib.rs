//! A broker-agnostic message-queue client.
//!
//! Ties [`mqclient_core`]'s `Queue`/`Config`/scoped contexts to a concrete
//! broker adapter resolved by name through [`registry::resolve`], so callers
//! depend on this crate alone rather than on a specific adapter crate.
//! Mirrors the top-level `mqclient` package's `Queue(get_backend(name), ...)`
//! composition from `mqclient/queue.py` plus `backend_manager.py`.

pub mod registry;

pub use mqclient_core::adapter::{AdapterError, BrokerClient, Consumer, Producer, RawQueue};
pub use mqclient_core::{
    AckStatus, Config, ConfigBuilder, Error, Headers, ManualAckContext, Message, MessageId,
    PubHandle, Queue, ScopedFuture, SubIterator,
};
pub use registry::RegistryError;

/// Resolves `config.broker_client` through the registry and builds a
/// [`Queue`] against it in one call.
pub fn connect(config: Config) -> Result<Queue, RegistryError> {
    let broker_client = registry::resolve(&config.broker_client)?;
    Ok(Queue::new(broker_client, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_an_unknown_broker_client() {
        let config = Config::builder("carrier-pigeon").build().unwrap();
        let err = connect(config).unwrap_err();
        assert!(matches!(err, RegistryError::Unknown(_)));
    }
}
