use std::fs::OpenOptions;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::Parser;

use crate::broker::BrokerKind;
use crate::config::{BrokerOverrides, ConfigOverrides, OutputOverrides, SimulationOverrides};
use crate::domain::START_FORMAT;
use crate::meter::MeterKind;
use crate::pipeline::OutputFormat;

pub const MIN_FREQUENCY_SECONDS: i64 = 1;
pub const MAX_FREQUENCY_SECONDS: i64 = 3600;

/// Simulate a day of household consumption and PV output, joined over a
/// message queue.
///
/// Options left unset fall back to the configuration file and `PVSIM__*`
/// environment variables.
#[derive(Debug, Parser)]
#[command(name = "pv-simulator", version, about)]
pub struct Cli {
    /// Simulation start, "YYYY-mm-dd HH:MM:SS"
    #[arg(value_parser = parse_start_date)]
    pub start_date: NaiveDateTime,

    /// Result file, created or truncated
    #[arg(value_parser = parse_output_file)]
    pub output: PathBuf,

    /// Seconds between samples, 1 to 3600 [default: 3]
    #[arg(short, long, value_parser = parse_frequency, allow_negative_numbers = true)]
    pub frequency: Option<u32>,

    /// Message broker [default: memory]
    #[arg(long)]
    pub broker: Option<BrokerKind>,

    /// Queue carrying the meter readings [default: pv_meter]
    #[arg(long)]
    pub queue: Option<String>,

    /// RabbitMQ host [default: 127.0.0.1]
    #[arg(long, alias = "rabbit_host")]
    pub rabbit_host: Option<String>,

    /// RabbitMQ AMQP port [default: 5672]
    #[arg(long, alias = "rabbit_port")]
    pub rabbit_port: Option<u16>,

    /// RabbitMQ virtual host [default: /]
    #[arg(long, alias = "rabbit_vhost")]
    pub rabbit_vhost: Option<String>,

    /// [default: guest]
    #[arg(long, alias = "rabbit_username")]
    pub rabbit_username: Option<String>,

    /// [default: guest]
    #[arg(long, alias = "rabbit_password")]
    pub rabbit_password: Option<String>,

    /// Consumption model [default: uniform]
    #[arg(long)]
    pub meter: Option<MeterKind>,

    /// Result file layout [default: text]
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Seed for reproducible meter readings
    #[arg(long)]
    pub seed: Option<u64>,

    /// Configuration file [default: config/default.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            simulation: SimulationOverrides {
                frequency_seconds: self.frequency,
                meter: self.meter,
                seed: self.seed,
            },
            broker: BrokerOverrides {
                kind: self.broker,
                queue: self.queue.clone(),
                host: self.rabbit_host.clone(),
                port: self.rabbit_port,
                vhost: self.rabbit_vhost.clone(),
                username: self.rabbit_username.clone(),
                password: self.rabbit_password.clone(),
            },
            output: OutputOverrides {
                format: self.format,
            },
        }
    }
}

pub fn parse_start_date(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, START_FORMAT).map_err(|_| format!("Not a valid date: '{s}'."))
}

/// Accepts the path only if it can be opened for writing; the file is
/// created or truncated as a side effect.
pub fn parse_output_file(s: &str) -> Result<PathBuf, String> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(s)
        .map(|_| PathBuf::from(s))
        .map_err(|_| "Not a writable file".to_string())
}

pub fn parse_frequency(s: &str) -> Result<u32, String> {
    let value: i64 = s
        .trim()
        .parse()
        .map_err(|_| "Cannot convert to int".to_string())?;
    if !(MIN_FREQUENCY_SECONDS..=MAX_FREQUENCY_SECONDS).contains(&value) {
        return Err("Not valid frequency".to_string());
    }
    u32::try_from(value).map_err(|_| "Not valid frequency".to_string())
}
