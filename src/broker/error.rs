//! Error types for brokers.

use thiserror::Error;

/// Errors that can occur while talking to a message broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// AMQP protocol or channel error.
    #[error("AMQP error: {0}")]
    Amqp(String),

    /// Failed to parse a broker response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The queue has not been declared.
    #[error("Queue '{0}' not found")]
    QueueNotFound(String),

    /// The broker accepted the message but no queue received it.
    #[error("Message to '{0}' was not routed to any queue")]
    Unroutable(String),

    /// The broker was shut down.
    #[error("Broker closed")]
    Closed,

    /// Broker kind not compiled into this build.
    #[error("Broker not supported: {0}")]
    Unsupported(String),
}

#[cfg(feature = "rabbitmq")]
impl From<lapin::Error> for BrokerError {
    fn from(err: lapin::Error) -> Self {
        match err {
            lapin::Error::IOError(_) => BrokerError::Connection(err.to_string()),
            lapin::Error::InvalidConnectionState(_) | lapin::Error::InvalidChannelState(_) => {
                BrokerError::Closed
            }
            other => BrokerError::Amqp(other.to_string()),
        }
    }
}
