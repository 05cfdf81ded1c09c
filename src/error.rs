use thiserror::Error;

use crate::broker::BrokerError;

/// Errors raised while loading and validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("configuration file not found: {}", .0.display())]
    MissingFile(std::path::PathBuf),

    #[error("unknown timezone: {0}")]
    Timezone(String),

    #[error("start time {0} does not exist in timezone {1}")]
    NonexistentStart(chrono::NaiveDateTime, chrono_tz::Tz),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Figment(Box::new(err))
    }
}

/// Errors raised by the producer, the consumer, or the run that drives them
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("malformed queue message {body:?}: {source}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("run interrupted, {} is incomplete", .0.display())]
    Interrupted(std::path::PathBuf),
}
