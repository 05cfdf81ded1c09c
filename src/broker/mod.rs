//! # Message Brokers
//!
//! Producer and consumer only see [`MessageBroker`]: named FIFO queues with
//! at-least-once delivery. Two implementations exist:
//!
//! - [`InMemoryBroker`]: in-process queues, the default and what tests use
//! - [`RabbitMqBroker`]: RabbitMQ over AMQP (`rabbitmq` feature)

mod error;
pub mod memory;
#[cfg(feature = "rabbitmq")]
pub mod rabbitmq;

use std::sync::Arc;
#[cfg(feature = "rabbitmq")]
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use error::BrokerError;
pub use memory::InMemoryBroker;
#[cfg(feature = "rabbitmq")]
pub use rabbitmq::RabbitMqBroker;

use crate::config::BrokerConfig;

#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Create the queue if it does not exist yet
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    /// Drop every waiting message, returning how many were dropped
    async fn purge_queue(&self, queue: &str) -> Result<u64, BrokerError>;

    async fn publish(&self, queue: &str, body: &str) -> Result<(), BrokerError>;

    /// Wait for the next message on `queue`.
    ///
    /// `None` means the broker was closed and the queue is drained.
    async fn receive(&self, queue: &str) -> Result<Option<String>, BrokerError>;

    /// Human readable location, for logs
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BrokerKind {
    #[default]
    Memory,
    Rabbitmq,
}

/// Build the broker selected in the configuration
pub async fn connect(cfg: &BrokerConfig) -> Result<Arc<dyn MessageBroker>, BrokerError> {
    match cfg.kind {
        BrokerKind::Memory => Ok(Arc::new(InMemoryBroker::new())),
        #[cfg(feature = "rabbitmq")]
        BrokerKind::Rabbitmq => {
            let broker = RabbitMqBroker::builder()
                .host(cfg.host.clone())
                .port(cfg.port)
                .credentials(cfg.username.clone(), cfg.password.clone())
                .vhost(cfg.vhost.clone())
                .timeout(Duration::from_secs(cfg.timeout_seconds))
                .prefetch(cfg.prefetch)
                .connect()
                .await?;
            Ok(Arc::new(broker))
        }
        #[cfg(not(feature = "rabbitmq"))]
        BrokerKind::Rabbitmq => Err(BrokerError::Unsupported(
            "built without the `rabbitmq` feature".to_string(),
        )),
    }
}
