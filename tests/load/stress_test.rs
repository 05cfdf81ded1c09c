//! Load tests for the simulator
//!
//! - A full day at one-second resolution (86 400 readings) through the
//!   in-memory broker
//! - Several runs sharing one broker on separate queues
//! - PV simulation throughput on its own

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use pv_simulator::broker::InMemoryBroker;
use pv_simulator::config::Config;
use pv_simulator::domain::SampleClock;
use pv_simulator::pipeline::{run, RunSettings};
use pv_simulator::simulation::PvSystem;
use tempfile::TempDir;
use tokio::task::JoinSet;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 6, 21)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn config(frequency_seconds: u32, queue: &str) -> Config {
    let mut cfg = Config::default();
    cfg.simulation.frequency_seconds = frequency_seconds;
    cfg.simulation.seed = Some(7);
    cfg.broker.queue = queue.to_string();
    cfg
}

/// Test: a full day at the finest resolution finishes in reasonable time
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore] // Ignore by default as this is a slow test
async fn test_full_day_one_second_resolution() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("day.txt");
    let settings = RunSettings::from_config(&config(1, "pv_meter"), start(), &path).unwrap();

    let started = Instant::now();
    let summary = run(settings, Arc::new(InMemoryBroker::new())).await.unwrap();
    let elapsed = started.elapsed();

    println!("86400 readings in {elapsed:?}");
    assert_eq!(summary.published, 86_400);
    assert_eq!(summary.written, 86_400);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 86_400);
    assert!(elapsed < Duration::from_secs(60), "run took {elapsed:?}");
}

/// Test: concurrent runs on one broker do not see each other's messages
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Ignore by default as this is a slow test
async fn test_concurrent_runs_share_broker() {
    let dir = TempDir::new().unwrap();
    let broker = Arc::new(InMemoryBroker::new());
    let mut runs = JoinSet::new();

    for i in 0..8 {
        let path = dir.path().join(format!("run-{i}.txt"));
        let settings =
            RunSettings::from_config(&config(10, &format!("pv_meter_{i}")), start(), &path)
                .unwrap();
        let broker = broker.clone();
        runs.spawn(async move { run(settings, broker).await });
    }

    while let Some(result) = runs.join_next().await {
        let summary = result.unwrap().unwrap();
        assert_eq!(summary.published, 8640);
        assert_eq!(summary.written, 8640);
        assert_eq!(summary.skipped, 0);
    }
}

/// Test: the PV model chain alone handles a day per second with room to spare
#[test]
#[ignore] // Ignore by default as this is a slow test
fn test_pv_simulation_throughput() {
    let system = PvSystem::default();
    let clock = SampleClock::localize(start(), Tz::CET, 1).unwrap();

    let started = Instant::now();
    let series = system.simulate_day(&clock);
    let elapsed = started.elapsed();

    println!("simulated {} samples in {elapsed:?}", series.len());
    assert_eq!(series.len(), 86_400);
    assert!(elapsed < Duration::from_secs(10));
}
