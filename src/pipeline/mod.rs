//! # Pipeline
//!
//! One run of the simulator: the producer publishes a day of meter readings
//! onto the queue while the consumer simulates the PV array for the same day
//! and joins every reading with the PV output at its timestamp.
//!
//! ```text
//!   meter ──> produce ──> [ broker queue ] ──> consume ──> result file
//!                                                 ^
//!                              PvSystem::simulate_day
//! ```

mod consumer;
mod producer;
mod sink;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::io::BufWriter;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn};

pub use consumer::{consume, ConsumerReport};
pub use producer::{produce, ProducerReport};
pub use sink::{OutputFormat, RecordSink};

use crate::broker::MessageBroker;
use crate::config::Config;
use crate::domain::{format_timestamp, SampleClock};
use crate::error::{ConfigError, PipelineError};
use crate::meter::{build_meter, MeterKind};
use crate::simulation::PvSystem;

/// Everything a run needs, resolved from configuration
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub clock: SampleClock,
    pub queue: String,
    pub system: PvSystem,
    pub meter: MeterKind,
    pub seed: Option<u64>,
    pub format: OutputFormat,
    pub output: PathBuf,
}

impl RunSettings {
    /// `start` is wall-clock time in the configured timezone
    pub fn from_config(
        cfg: &Config,
        start: NaiveDateTime,
        output: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let tz = cfg.timezone()?;
        let clock = SampleClock::localize(start, tz, cfg.simulation.frequency_seconds)
            .ok_or(ConfigError::NonexistentStart(start, tz))?;

        Ok(Self {
            clock,
            queue: cfg.broker.queue.clone(),
            system: cfg.pv_system(),
            meter: cfg.simulation.meter,
            seed: cfg.simulation.seed,
            format: cfg.output.format,
            output: output.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Stale messages dropped from the queue before the run
    pub purged: u64,
    pub published: u64,
    pub written: u64,
    pub skipped: u64,
    /// Energy produced by the array over the day, Wh
    pub pv_energy_wh: f64,
    pub output: PathBuf,
}

async fn flatten<T>(handle: JoinHandle<Result<T, PipelineError>>) -> Result<T, PipelineError> {
    handle.await?
}

/// Aborts the task when dropped, so neither side outlives the run
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// [`run`], cut short with [`PipelineError::Interrupted`] once `shutdown`
/// completes. Producer and consumer are aborted and the result file is left
/// partial.
pub async fn run_until<F>(
    settings: RunSettings,
    broker: Arc<dyn MessageBroker>,
    shutdown: F,
) -> Result<RunSummary, PipelineError>
where
    F: Future<Output = ()>,
{
    let output = settings.output.clone();
    tokio::select! {
        summary = run(settings, broker) => summary,
        _ = shutdown => {
            warn!(path = %output.display(), "run interrupted, result file is incomplete");
            Err(PipelineError::Interrupted(output))
        }
    }
}

/// Run producer and consumer concurrently over `broker` and write the result
/// file. If either side fails, or the returned future is dropped, both are
/// aborted.
pub async fn run(
    settings: RunSettings,
    broker: Arc<dyn MessageBroker>,
) -> Result<RunSummary, PipelineError> {
    let RunSettings {
        clock,
        queue,
        system,
        meter,
        seed,
        format,
        output,
    } = settings;

    broker.declare_queue(&queue).await?;
    let purged = broker.purge_queue(&queue).await?;
    info!(
        broker = %broker.describe(),
        queue = %queue,
        purged,
        start = %format_timestamp(&clock.start()),
        frequency_seconds = clock.frequency_seconds(),
        samples = clock.sample_count(),
        "starting run"
    );

    let producer = {
        let broker = broker.clone();
        let queue = queue.clone();
        let clock = clock.clone();
        let mut meter = build_meter(meter, seed);
        tokio::spawn(async move { produce(broker.as_ref(), &queue, &clock, meter.as_mut()).await })
    };

    let consumer = {
        let broker = broker.clone();
        let queue = queue.clone();
        let output = output.clone();
        tokio::spawn(async move {
            info!(site = %system.site.name, "generating PV data");
            let series_clock = clock.clone();
            let series =
                tokio::task::spawn_blocking(move || system.simulate_day(&series_clock)).await?;
            let energy_wh = series.energy_wh(clock.frequency_seconds());

            let file = tokio::fs::File::create(&output).await?;
            let mut sink = RecordSink::new(BufWriter::new(file), format);
            let report = consume(broker.as_ref(), &queue, &series, &mut sink).await?;
            sink.finish().await?;
            Ok::<_, PipelineError>((report, energy_wh))
        })
    };

    let _guards = [
        AbortOnDrop(producer.abort_handle()),
        AbortOnDrop(consumer.abort_handle()),
    ];
    let (produced, (consumed, pv_energy_wh)) =
        tokio::try_join!(flatten(producer), flatten(consumer))?;

    info!(
        path = %output.display(),
        written = consumed.written,
        skipped = consumed.skipped,
        pv_energy_kwh = pv_energy_wh / 1000.0,
        "result written"
    );

    Ok(RunSummary {
        purged,
        published: produced.published,
        written: consumed.written,
        skipped: consumed.skipped,
        pv_energy_wh,
        output,
    })
}
