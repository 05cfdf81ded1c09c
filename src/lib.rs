//! # PV Simulator
//!
//! Generates a synthetic 24 hour PV production series for a fixed site and
//! module configuration, publishes simulated household consumption readings
//! onto a queue, and joins every reading with the PV value for the same
//! timestamp into a result file.
//!
//! - [`simulation`]: clear-sky irradiance and Sandia module model
//! - [`meter`]: consumption reading sources
//! - [`broker`]: message queue abstraction (in-memory, RabbitMQ)
//! - [`pipeline`]: producer, consumer and the run orchestration
//! - [`cli`], [`config`], [`telemetry`]: the binary's ambient plumbing

pub mod broker;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod meter;
pub mod pipeline;
pub mod simulation;
pub mod telemetry;

pub use error::{ConfigError, PipelineError};
