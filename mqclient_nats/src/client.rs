use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::consumer::pull;
use async_nats::jetstream::stream;
use async_trait::async_trait;
use mqclient_core::adapter::{AdapterError, BrokerClient, Consumer, Producer};

use crate::consumer::NatsConsumer;
use crate::error::NatsError;
use crate::producer::NatsProducer;

/// `mqclient/broker_client_interface.py::TRY_ATTEMPTS`.
const TRY_ATTEMPTS: u32 = 3;
/// `mqclient/broker_client_interface.py::RETRY_DELAY`.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Resolves `"nats"` in the broker registry. `name` doubles as the JetStream
/// stream name, the subject, and the durable consumer name, mirroring how
/// `spec.md`'s `Queue` treats a single `name` as the one broker-side
/// identifier every adapter needs.
#[derive(Debug, Default)]
pub struct NatsBrokerClient;

impl NatsBrokerClient {
    pub fn new() -> Self {
        Self
    }

    async fn connect(address: &str, auth_token: Option<&str>) -> Result<jetstream::Context, NatsError> {
        let mut options = async_nats::ConnectOptions::new();
        if let Some(token) = auth_token {
            options = options.token(token.to_string());
        }

        let client = options.connect(address).await?;
        Ok(jetstream::new(client))
    }

    async fn ensure_stream(
        jetstream: &jetstream::Context,
        name: &str,
    ) -> Result<stream::Stream, NatsError> {
        jetstream
            .get_or_create_stream(stream::Config {
                name: name.to_string(),
                subjects: vec![name.to_string()],
                ..Default::default()
            })
            .await
            .map_err(|error| NatsError::Stream(error.to_string()))
    }
}

#[async_trait]
impl BrokerClient for NatsBrokerClient {
    async fn create_pub_queue(
        &self,
        address: &str,
        name: &str,
        auth_token: Option<&str>,
        _ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Producer>, AdapterError> {
        let jetstream = mqclient_core::retry::auto_retry(
            || Self::connect(address, auth_token),
            TRY_ATTEMPTS - 1,
            RETRY_DELAY,
            || async { Ok(()) },
            || async { Ok(()) },
            NatsError::is_fatal,
        )
        .await?;
        Self::ensure_stream(&jetstream, name).await?;

        Ok(Box::new(NatsProducer::new(jetstream, name.to_string())))
    }

    async fn create_sub_queue(
        &self,
        address: &str,
        name: &str,
        prefetch: u32,
        auth_token: Option<&str>,
        ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Consumer>, AdapterError> {
        let jetstream = mqclient_core::retry::auto_retry(
            || Self::connect(address, auth_token),
            TRY_ATTEMPTS - 1,
            RETRY_DELAY,
            || async { Ok(()) },
            || async { Ok(()) },
            NatsError::is_fatal,
        )
        .await?;
        let nats_stream = Self::ensure_stream(&jetstream, name).await?;

        let consumer = nats_stream
            .get_or_create_consumer(
                name,
                pull::Config {
                    durable_name: Some(name.to_string()),
                    ack_wait: ack_timeout.unwrap_or(Duration::from_secs(30)),
                    ..Default::default()
                },
            )
            .await
            .map_err(|error| NatsError::Consumer(error.to_string()))?;

        let stream = consumer
            .messages()
            .await
            .map_err(|error| NatsError::Consumer(error.to_string()))?;

        let _ = prefetch;

        Ok(Box::new(NatsConsumer::new(stream)))
    }
}
