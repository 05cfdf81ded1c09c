use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use pv_simulator::broker::{BrokerError, InMemoryBroker, MessageBroker};
use pv_simulator::config::Config;
use pv_simulator::domain::{CombinedRecord, QueueMessage};
use pv_simulator::pipeline::{run, run_until, OutputFormat, RunSettings};
use pv_simulator::PipelineError;
use tempfile::TempDir;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 4, 22)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn hourly_config(seed: u64) -> Config {
    let mut cfg = Config::default();
    cfg.simulation.frequency_seconds = 3600;
    cfg.simulation.seed = Some(seed);
    cfg
}

#[tokio::test]
async fn test_day_over_memory_broker() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("result.txt");
    let settings = RunSettings::from_config(&hourly_config(1), start(), &path).unwrap();

    let summary = run(settings, Arc::new(InMemoryBroker::new())).await.unwrap();
    assert_eq!(summary.published, 24);
    assert_eq!(summary.written, 24);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.purged, 0);
    assert!(summary.pv_energy_wh > 0.0);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 24);
    assert!(lines[0].starts_with("2017-04-22 00:00:00+02:00 "));
    assert!(lines[23].starts_with("2017-04-22 23:00:00+02:00 "));

    for line in &lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields.len(), 5, "unexpected line {line:?}");
        let consumption: f64 = fields[2].parse().unwrap();
        let pv: f64 = fields[3].parse().unwrap();
        let total: f64 = fields[4].parse().unwrap();
        assert!((1.0..9000.0).contains(&consumption));
        assert!(pv >= 0.0);
        assert!((total - (consumption + pv)).abs() < 0.011, "{line:?}");
    }

    // midnight is dark, early afternoon is not
    assert!(lines[0].contains(" 0.00 "));
    let pv_at_one: f64 = lines[13].split_whitespace().nth(3).unwrap().parse().unwrap();
    assert!(pv_at_one > 1000.0);
}

#[tokio::test]
async fn test_stale_messages_are_purged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("result.txt");
    let settings = RunSettings::from_config(&hourly_config(2), start(), &path).unwrap();

    let broker = Arc::new(InMemoryBroker::new());
    broker.declare_queue("pv_meter").await.unwrap();
    broker
        .publish("pv_meter", &QueueMessage::stop().encode().unwrap())
        .await
        .unwrap();

    let summary = run(settings, broker.clone()).await.unwrap();
    assert_eq!(summary.purged, 1);
    assert_eq!(summary.written, 24);
    assert_eq!(broker.depth("pv_meter"), Some(0));
}

#[tokio::test]
async fn test_jsonl_output() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("result.jsonl");
    let mut cfg = hourly_config(3);
    cfg.output.format = OutputFormat::Jsonl;
    let settings = RunSettings::from_config(&cfg, start(), &path).unwrap();

    run(settings, Arc::new(InMemoryBroker::new())).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let records: Vec<CombinedRecord> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 24);
    for record in &records {
        assert!((record.total_w - (f64::from(record.consumption_w) + record.pv_w)).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");

    for path in [&a, &b] {
        let settings = RunSettings::from_config(&hourly_config(42), start(), path).unwrap();
        run(settings, Arc::new(InMemoryBroker::new())).await.unwrap();
    }

    assert_eq!(
        std::fs::read_to_string(&a).unwrap(),
        std::fs::read_to_string(&b).unwrap()
    );
}

/// Accepts the queue but refuses every publish
struct RefusingBroker;

#[async_trait]
impl MessageBroker for RefusingBroker {
    async fn declare_queue(&self, _queue: &str) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn purge_queue(&self, _queue: &str) -> Result<u64, BrokerError> {
        Ok(0)
    }

    async fn publish(&self, _queue: &str, _body: &str) -> Result<(), BrokerError> {
        Err(BrokerError::Connection("connection refused".to_string()))
    }

    async fn receive(&self, _queue: &str) -> Result<Option<String>, BrokerError> {
        std::future::pending().await
    }

    fn describe(&self) -> String {
        "refusing://".to_string()
    }
}

#[tokio::test]
async fn test_producer_failure_stops_the_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("result.txt");
    let settings = RunSettings::from_config(&hourly_config(4), start(), &path).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), run(settings, Arc::new(RefusingBroker)))
        .await
        .expect("run should not hang when the producer fails");

    assert!(matches!(
        result,
        Err(PipelineError::Broker(BrokerError::Connection(_)))
    ));
}

/// Publishes hang forever; receiving fails straight away
#[derive(Default)]
struct StallingBroker {
    publishing: Arc<AtomicUsize>,
    attempts: AtomicUsize,
    fail_receive: bool,
}

/// Counts a publish as in flight until its future is dropped
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageBroker for StallingBroker {
    async fn declare_queue(&self, _queue: &str) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn purge_queue(&self, _queue: &str) -> Result<u64, BrokerError> {
        Ok(0)
    }

    async fn publish(&self, _queue: &str, _body: &str) -> Result<(), BrokerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.publishing.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight(self.publishing.clone());
        std::future::pending().await
    }

    async fn receive(&self, _queue: &str) -> Result<Option<String>, BrokerError> {
        if self.fail_receive {
            // let the producer get its first publish going
            tokio::time::sleep(Duration::from_millis(50)).await;
            return Err(BrokerError::Connection("connection reset".to_string()));
        }
        std::future::pending().await
    }

    fn describe(&self) -> String {
        "stalling://".to_string()
    }
}

#[tokio::test]
async fn test_consumer_failure_aborts_the_producer() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("result.txt");
    let settings = RunSettings::from_config(&hourly_config(6), start(), &path).unwrap();
    let broker = Arc::new(StallingBroker {
        fail_receive: true,
        ..Default::default()
    });

    let result = tokio::time::timeout(Duration::from_secs(10), run(settings, broker.clone()))
        .await
        .expect("run should not hang when the consumer fails");
    assert!(matches!(
        result,
        Err(PipelineError::Broker(BrokerError::Connection(_)))
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(broker.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(broker.publishing.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_shutdown_interrupts_the_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("result.txt");
    let settings = RunSettings::from_config(&hourly_config(7), start(), &path).unwrap();
    let broker = Arc::new(StallingBroker::default());

    let shutdown = tokio::time::sleep(Duration::from_millis(200));
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        run_until(settings, broker.clone(), shutdown),
    )
    .await
    .expect("run should end on shutdown");
    assert!(matches!(result, Err(PipelineError::Interrupted(ref p)) if *p == path));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(broker.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(broker.publishing.load(Ordering::SeqCst), 0);
}
