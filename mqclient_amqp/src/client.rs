use std::time::Duration;

use async_trait::async_trait;
use lapin::{Connection, ConnectionProperties};
use mqclient_core::adapter::{AdapterError, BrokerClient, Consumer, Producer};
use mqclient_core::config::{amqp_credentials, parse_amqp_address};

use crate::consumer::AmqpConsumer;
use crate::error::AmqpError;
use crate::producer::AmqpProducer;

/// `mqclient/broker_client_interface.py::TRY_ATTEMPTS` (1 initial try + 2 retries).
const TRY_ATTEMPTS: u32 = 3;
/// `mqclient/broker_client_interface.py::RETRY_DELAY`.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Resolves `"rabbitmq"`/`"amqp"` in the broker registry. Every call opens
/// its own [`lapin::Connection`], the way each scoped context gets a fresh
/// `Producer`/`Consumer` per `spec.md` §4.7 rather than sharing a
/// long-lived, app-wide connector.
#[derive(Debug, Default)]
pub struct AmqpBrokerClient;

impl AmqpBrokerClient {
    pub fn new() -> Self {
        Self
    }

    async fn connect(address: &str, auth_token: Option<&str>) -> Result<Connection, AmqpError> {
        let parsed = parse_amqp_address(address)
            .map_err(|error| AmqpError::InvalidAddress(error.0))?;
        let credentials = amqp_credentials(
            parsed.username.as_deref(),
            parsed.password.as_deref(),
            auth_token,
        )
        .map_err(|error| AmqpError::InvalidAddress(error.0))?;

        let scheme = if parsed.scheme.is_empty() {
            "amqp"
        } else {
            &parsed.scheme
        };
        let port = parsed.port.unwrap_or(5672);
        let vhost = if parsed.virtual_host.is_empty() {
            "%2F".to_string()
        } else {
            parsed.virtual_host
        };

        let dsn = match credentials {
            Some((user, pass)) => format!(
                "{scheme}://{user}:{pass}@{}:{port}/{vhost}",
                parsed.host
            ),
            None => format!("{scheme}://{}:{port}/{vhost}", parsed.host),
        };

        let connection_properties = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);

        let connection = Connection::connect(&dsn, connection_properties).await?;

        Ok(connection)
    }
}

#[async_trait]
impl BrokerClient for AmqpBrokerClient {
    async fn create_pub_queue(
        &self,
        address: &str,
        name: &str,
        auth_token: Option<&str>,
        _ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Producer>, AdapterError> {
        let connection = mqclient_core::retry::auto_retry(
            || Self::connect(address, auth_token),
            TRY_ATTEMPTS - 1,
            RETRY_DELAY,
            || async { Ok(()) },
            || async { Ok(()) },
            AmqpError::is_fatal,
        )
        .await?;
        let producer = AmqpProducer::connect(connection, name.to_string()).await?;
        Ok(Box::new(producer))
    }

    async fn create_sub_queue(
        &self,
        address: &str,
        name: &str,
        prefetch: u32,
        auth_token: Option<&str>,
        _ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Consumer>, AdapterError> {
        let connection = mqclient_core::retry::auto_retry(
            || Self::connect(address, auth_token),
            TRY_ATTEMPTS - 1,
            RETRY_DELAY,
            || async { Ok(()) },
            || async { Ok(()) },
            AmqpError::is_fatal,
        )
        .await?;
        let consumer = AmqpConsumer::connect(connection, name.to_string(), prefetch).await?;
        Ok(Box::new(consumer))
    }
}
