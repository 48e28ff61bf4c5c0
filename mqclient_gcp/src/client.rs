use std::time::Duration;

use async_trait::async_trait;
use google_cloud_pubsub::client::{Client, ClientConfig};
use google_cloud_pubsub::subscription::SubscriptionConfig;
use mqclient_core::adapter::{AdapterError, BrokerClient, Consumer, Producer};

use crate::consumer::GcpSub;
use crate::error::GcpError;
use crate::producer::GcpPub;

/// `mqclient/broker_client_interface.py::TRY_ATTEMPTS`.
const TRY_ATTEMPTS: u32 = 3;
/// `mqclient/broker_client_interface.py::RETRY_DELAY`.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Resolves `"gcp"`/`"pubsub"` in the broker registry. Pub/Sub has no broker
/// host to dial, so unlike the other three adapters `address` plays no role
/// here; the project id is instead resolved by `ClientConfig::with_auth`
/// from the ambient credentials, matching the `google-cloud-pubsub` crate's
/// own auto-discovery. `name` is the topic id, and `"<name>-subscription"`
/// is the single shared subscription, per `MQClient/backends/gcp.py`.
#[derive(Debug, Default)]
pub struct GcpBrokerClient;

impl GcpBrokerClient {
    pub fn new() -> Self {
        Self
    }

    async fn connect() -> Result<Client, GcpError> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|error| GcpError::Client(error.to_string()))?;

        Client::new(config)
            .await
            .map_err(|error| GcpError::Client(error.to_string()))
    }
}

#[async_trait]
impl BrokerClient for GcpBrokerClient {
    async fn create_pub_queue(
        &self,
        _address: &str,
        name: &str,
        _auth_token: Option<&str>,
        _ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Producer>, AdapterError> {
        let client = mqclient_core::retry::auto_retry(
            Self::connect,
            TRY_ATTEMPTS - 1,
            RETRY_DELAY,
            || async { Ok(()) },
            || async { Ok(()) },
            GcpError::is_fatal,
        )
        .await?;
        let topic = client.topic(name);

        if !topic
            .exists(None)
            .await
            .map_err(|error| GcpError::Topic(error.to_string()))?
        {
            topic
                .create(None, None)
                .await
                .map_err(|error| GcpError::Topic(error.to_string()))?;
        }

        let publisher = topic.new_publisher(None);
        Ok(Box::new(GcpPub::new(publisher)))
    }

    async fn create_sub_queue(
        &self,
        _address: &str,
        name: &str,
        _prefetch: u32,
        _auth_token: Option<&str>,
        ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Consumer>, AdapterError> {
        let client = mqclient_core::retry::auto_retry(
            Self::connect,
            TRY_ATTEMPTS - 1,
            RETRY_DELAY,
            || async { Ok(()) },
            || async { Ok(()) },
            GcpError::is_fatal,
        )
        .await?;
        let topic = client.topic(name);

        if !topic
            .exists(None)
            .await
            .map_err(|error| GcpError::Topic(error.to_string()))?
        {
            topic
                .create(None, None)
                .await
                .map_err(|error| GcpError::Topic(error.to_string()))?;
        }

        let subscription_id = format!("{name}-subscription");
        let subscription = client.subscription(&subscription_id);

        if !subscription
            .exists(None)
            .await
            .map_err(|error| GcpError::Subscription(error.to_string()))?
        {
            let mut config = SubscriptionConfig::default();
            if let Some(ack_timeout) = ack_timeout {
                config.ack_deadline_seconds = ack_timeout.as_secs() as i32;
            }

            subscription
                .create(topic.fully_qualified_name(), config, None)
                .await
                .map_err(|error| GcpError::Subscription(error.to_string()))?;
        }

        Ok(Box::new(GcpSub::new(subscription)))
    }
}
