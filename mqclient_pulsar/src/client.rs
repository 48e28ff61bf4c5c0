use std::time::Duration;

use async_trait::async_trait;
use mqclient_core::adapter::{AdapterError, BrokerClient, Consumer, Producer};
use pulsar::{Authentication, Pulsar, SubType, TokioExecutor};

use crate::consumer::PulsarSub;
use crate::error::PulsarError;
use crate::producer::PulsarPub;

/// `mqclient/broker_client_interface.py::TRY_ATTEMPTS`.
const TRY_ATTEMPTS: u32 = 3;
/// `mqclient/broker_client_interface.py::RETRY_DELAY`.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Resolves `"pulsar"` in the broker registry.
#[derive(Debug, Default)]
pub struct PulsarBrokerClient;

impl PulsarBrokerClient {
    pub fn new() -> Self {
        Self
    }

    async fn connect(
        address: &str,
        auth_token: Option<&str>,
    ) -> Result<Pulsar<TokioExecutor>, PulsarError> {
        let address = if address.starts_with("pulsar") {
            address.to_string()
        } else {
            format!("pulsar://{address}")
        };

        let mut builder = Pulsar::builder(address, TokioExecutor);
        if let Some(token) = auth_token {
            builder = builder.with_auth(Authentication {
                name: "token".to_string(),
                data: token.as_bytes().to_vec(),
            });
        }

        let client = builder.build().await?;
        Ok(client)
    }
}

#[async_trait]
impl BrokerClient for PulsarBrokerClient {
    async fn create_pub_queue(
        &self,
        address: &str,
        name: &str,
        auth_token: Option<&str>,
        _ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Producer>, AdapterError> {
        let client = mqclient_core::retry::auto_retry(
            || Self::connect(address, auth_token),
            TRY_ATTEMPTS - 1,
            RETRY_DELAY,
            || async { Ok(()) },
            || async { Ok(()) },
            PulsarError::is_fatal,
        )
        .await?;
        let producer = client
            .producer()
            .with_topic(name)
            .build()
            .await
            .map_err(PulsarError::from)?;

        Ok(Box::new(PulsarPub::new(producer)))
    }

    async fn create_sub_queue(
        &self,
        address: &str,
        name: &str,
        prefetch: u32,
        auth_token: Option<&str>,
        _ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Consumer>, AdapterError> {
        let client = mqclient_core::retry::auto_retry(
            || Self::connect(address, auth_token),
            TRY_ATTEMPTS - 1,
            RETRY_DELAY,
            || async { Ok(()) },
            || async { Ok(()) },
            PulsarError::is_fatal,
        )
        .await?;
        let consumer = client
            .consumer()
            .with_topic(name)
            .with_subscription_type(SubType::Shared)
            .with_subscription(format!("{name}-subscription"))
            .with_consumer_options(pulsar::ConsumerOptions {
                receiver_queue_size: Some(prefetch),
                ..Default::default()
            })
            .build::<Vec<u8>>()
            .await
            .map_err(PulsarError::from)?;

        Ok(Box::new(PulsarSub::new(consumer)))
    }
}
