//! RabbitMQ broker speaking AMQP 0-9-1 through `lapin`.
//!
//! - queues are declared non-durable, like a plain `queue_declare`
//! - messages go through the default exchange, routed by queue name, as
//!   `mandatory` publishes with publisher confirms, so an unroutable message
//!   is reported instead of dropped
//! - each queue gets one consumer on a dedicated channel, limited by
//!   `prefetch`; a delivery is acknowledged when it is handed to the caller,
//!   so prefetched but unreceived messages are redelivered if the process dies
//!
//! ## Example
//!
//! ```rust,no_run
//! use pv_simulator::broker::{MessageBroker, RabbitMqBroker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = RabbitMqBroker::builder()
//!         .host("localhost")
//!         .port(5672)
//!         .credentials("guest", "guest")
//!         .vhost("/")
//!         .connect()
//!         .await?;
//!
//!     broker.declare_queue("pv_meter").await?;
//!     broker.publish("pv_meter", r#"{"value":"STOP"}"#).await?;
//!     let body = broker.receive("pv_meter").await?;
//!     println!("{body:?}");
//!     Ok(())
//! }
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    ConfirmSelectOptions, QueueDeclareOptions, QueuePurgeOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use super::{BrokerError, MessageBroker};

const CONSUMER_TAG_PREFIX: &str = "pv-simulator";

/// RabbitMQ broker over a single AMQP connection
pub struct RabbitMqBroker {
    endpoint: String,
    vhost: String,
    connection: Connection,
    publisher: Channel,
    consumer_channel: Channel,
    consumers: Mutex<HashMap<String, Consumer>>,
}

impl fmt::Debug for RabbitMqBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitMqBroker")
            .field("endpoint", &self.endpoint)
            .field("vhost", &self.vhost)
            .finish_non_exhaustive()
    }
}

impl RabbitMqBroker {
    /// Create a new builder for configuring the broker.
    pub fn builder() -> RabbitMqBrokerBuilder {
        RabbitMqBrokerBuilder::default()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Close the connection. Deliveries received but not yet handed out are
    /// returned to the queue by the server.
    pub async fn close(&self) -> Result<(), BrokerError> {
        self.connection.close(200, "closing").await?;
        info!(endpoint = %self.endpoint, "disconnected from RabbitMQ");
        Ok(())
    }
}

#[async_trait]
impl MessageBroker for RabbitMqBroker {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.publisher
            .queue_declare(queue, QueueDeclareOptions::default(), FieldTable::default())
            .await?;
        debug!(queue, endpoint = %self.endpoint, "queue declared");
        Ok(())
    }

    async fn purge_queue(&self, queue: &str) -> Result<u64, BrokerError> {
        let purged = self
            .publisher
            .queue_purge(queue, QueuePurgeOptions::default())
            .await?;
        Ok(u64::from(purged))
    }

    async fn publish(&self, queue: &str, body: &str) -> Result<(), BrokerError> {
        let confirmation = self
            .publisher
            .basic_publish(
                "",
                queue,
                BasicPublishOptions {
                    mandatory: true,
                    ..BasicPublishOptions::default()
                },
                body.as_bytes(),
                BasicProperties::default(),
            )
            .await?
            .await?;

        match confirmation {
            Confirmation::Ack(None) | Confirmation::NotRequested => {
                trace!(queue, bytes = body.len(), "published");
                Ok(())
            }
            Confirmation::Ack(Some(_)) => Err(BrokerError::Unroutable(queue.to_string())),
            Confirmation::Nack(_) => Err(BrokerError::Amqp(format!(
                "broker refused message for '{queue}'"
            ))),
        }
    }

    async fn receive(&self, queue: &str) -> Result<Option<String>, BrokerError> {
        let mut consumers = self.consumers.lock().await;
        let consumer = match consumers.entry(queue.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let consumer = self
                    .consumer_channel
                    .basic_consume(
                        queue,
                        &format!("{CONSUMER_TAG_PREFIX}-{queue}"),
                        BasicConsumeOptions::default(),
                        FieldTable::default(),
                    )
                    .await?;
                debug!(queue, "consumer started");
                entry.insert(consumer)
            }
        };

        let Some(delivery) = consumer.next().await else {
            return Ok(None);
        };
        let delivery = delivery?;
        delivery.ack(BasicAckOptions::default()).await?;

        String::from_utf8(delivery.data)
            .map(Some)
            .map_err(|e| BrokerError::Parse(format!("non UTF-8 payload on '{queue}': {e}")))
    }

    fn describe(&self) -> String {
        format!("{} (vhost {})", self.endpoint, self.vhost)
    }
}

/// Builder for RabbitMqBroker.
#[derive(Debug, Default)]
pub struct RabbitMqBrokerBuilder {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    vhost: Option<String>,
    timeout: Option<Duration>,
    prefetch: Option<u16>,
}

impl RabbitMqBrokerBuilder {
    /// Set the broker host (default: "127.0.0.1").
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the AMQP port (default: 5672).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the username and password for authentication.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the vhost (default: "/").
    pub fn vhost(mut self, vhost: impl Into<String>) -> Self {
        self.vhost = Some(vhost.into());
        self
    }

    /// Set the connection timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Unacknowledged deliveries per consumer (default: 500).
    pub fn prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = Some(prefetch.max(1));
        self
    }

    fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or("127.0.0.1")
    }

    fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(5672)
    }

    fn vhost_or_default(&self) -> &str {
        self.vhost.as_deref().unwrap_or("/")
    }

    /// `amqp://` URI with credentials and vhost percent-encoded
    fn uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            urlencoding::encode(self.username.as_deref().unwrap_or("guest")),
            urlencoding::encode(self.password.as_deref().unwrap_or("guest")),
            self.host_or_default(),
            self.port_or_default(),
            urlencoding::encode(self.vhost_or_default()),
        )
    }

    /// Location for logs, without credentials
    fn endpoint(&self) -> String {
        format!("amqp://{}:{}", self.host_or_default(), self.port_or_default())
    }

    /// Open the connection and its publishing and consuming channels.
    pub async fn connect(self) -> Result<RabbitMqBroker, BrokerError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let endpoint = self.endpoint();

        let connection = tokio::time::timeout(
            timeout,
            Connection::connect(&self.uri(), ConnectionProperties::default()),
        )
        .await
        .map_err(|_| BrokerError::Timeout)??;

        let publisher = connection.create_channel().await?;
        publisher
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        let consumer_channel = connection.create_channel().await?;
        consumer_channel
            .basic_qos(self.prefetch.unwrap_or(500), BasicQosOptions::default())
            .await?;

        info!(endpoint = %endpoint, vhost = %self.vhost_or_default(), "connected to RabbitMQ");

        Ok(RabbitMqBroker {
            endpoint,
            vhost: self.vhost_or_default().to_string(),
            connection,
            publisher,
            consumer_channel,
            consumers: Mutex::new(HashMap::new()),
        })
    }
}
