use anyhow::{Context, Result};
use clap::Parser;
use pv_simulator::{broker, cli::Cli, config::Config, pipeline, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref(), &cli.overrides())
        .context("failed to load configuration")?;

    let settings = pipeline::RunSettings::from_config(&cfg, cli.start_date, &cli.output)
        .context("invalid simulation start")?;
    let broker = broker::connect(&cfg.broker)
        .await
        .context("failed to set up message broker")?;

    info!(broker = %broker.describe(), "starting PV simulator");

    let summary = pipeline::run_until(settings, broker, telemetry::shutdown_signal())
        .await
        .context("simulation run failed")?;
    println!("Please find the result in {}", summary.output.display());

    Ok(())
}
