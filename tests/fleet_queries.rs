//! Fleet query behavior over a real records directory.
//!
//! Each test builds a throwaway records dir, writes worker records the way
//! the workers themselves do, and exercises the coordinator's public API.

use botfleet::{
    BotControl, BotStatus, FleetConfig, FleetCoordinator, LivenessPolicy, RecordStore,
    RetryConfig, ScannerConfig, WorkerLaunchConfig, WorkerRecord,
};
use chrono::{Duration, Local};
use std::fs;
use std::path::Path;

fn test_config(dir: &Path) -> FleetConfig {
    FleetConfig {
        records_dir: dir.to_path_buf(),
        logs_dir: dir.join("logs"),
        scanner: ScannerConfig::default(),
        retry: RetryConfig {
            max_read_attempts: 2,
            read_retry_delay_ms: 5,
            max_stop_attempts: 3,
            stop_retry_delay_ms: 5,
        },
        liveness: LivenessPolicy::default(),
        worker: WorkerLaunchConfig {
            program: "true".into(),
            args: Vec::new(),
        },
    }
}

fn write_worker(
    dir: &Path,
    pair: &str,
    status: &str,
    started_secs_ago: i64,
    ping_secs_ago: Option<i64>,
    margin: &str,
) {
    let now = Local::now().naive_local();
    let mut control = BotControl::new(
        BotStatus::from(status),
        now - Duration::seconds(started_secs_ago),
    );
    control.watchdog_ping = ping_secs_ago.map(|secs| now - Duration::seconds(secs));
    let record = WorkerRecord {
        exchange: "binance".into(),
        margin: Some(margin.into()),
        botcontrol: Some(control),
        extra: Default::default(),
    };
    RecordStore::new(dir).write(pair, &record).unwrap();
}

#[tokio::test]
async fn all_lists_readable_records_sorted_and_skips_reserved() {
    let dir = tempfile::tempdir().unwrap();
    write_worker(dir.path(), "ETH-USD", "active", 60, Some(10), " ");
    write_worker(dir.path(), "BTC-USD", "inactive", 60, Some(10), " ");
    fs::write(dir.path().join("data.json"), "{}").unwrap();
    fs::write(dir.path().join("scanner_output.json"), "{}").unwrap();
    fs::write(dir.path().join("screener.csv"), "pair,price").unwrap();

    let coordinator = FleetCoordinator::new(test_config(dir.path()));
    assert_eq!(coordinator.all().await, vec!["BTC-USD", "ETH-USD"]);
}

#[tokio::test]
async fn unreadable_record_is_omitted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_worker(dir.path(), "ETH-USD", "active", 60, Some(10), " ");
    fs::write(dir.path().join("BAD-PAIR.json"), "{ not json").unwrap();

    let coordinator = FleetCoordinator::new(test_config(dir.path()));
    assert_eq!(coordinator.all().await, vec!["ETH-USD"]);
    assert_eq!(coordinator.active(&BotStatus::Active).await, vec!["ETH-USD"]);
}

#[tokio::test]
async fn active_and_hung_are_disjoint() {
    let dir = tempfile::tempdir().unwrap();
    // Fresh heartbeat: live
    write_worker(dir.path(), "BTC-USD", "active", 900, Some(10), " ");
    // Heartbeat stalled past the 600s window
    write_worker(dir.path(), "ETH-USD", "active", 900, Some(700), " ");
    // Young worker, no heartbeat yet, inside the 300s grace window
    write_worker(dir.path(), "SOL-USD", "active", 120, None, " ");
    // Different status altogether
    write_worker(dir.path(), "XRP-USD", "paused", 60, Some(10), " ");
    // No control section: indeterminate, excluded everywhere
    RecordStore::new(dir.path())
        .write(
            "ADA-USD",
            &WorkerRecord {
                exchange: "binance".into(),
                ..Default::default()
            },
        )
        .unwrap();

    let coordinator = FleetCoordinator::new(test_config(dir.path()));
    let active = coordinator.active(&BotStatus::Active).await;
    let hung = coordinator.hung(&BotStatus::Active).await;

    assert_eq!(active, vec!["BTC-USD", "SOL-USD"]);
    assert_eq!(hung, vec!["ETH-USD", "XRP-USD"]);
    assert!(active.iter().all(|pair| !hung.contains(pair)));
}

#[tokio::test]
async fn open_position_query_requires_non_blank_margin() {
    let dir = tempfile::tempdir().unwrap();
    write_worker(dir.path(), "BTC-USD", "active", 60, Some(10), "5.2%");
    write_worker(dir.path(), "ETH-USD", "active", 60, Some(10), " ");

    let coordinator = FleetCoordinator::new(test_config(dir.path()));
    assert_eq!(
        coordinator.active(&BotStatus::Active).await,
        vec!["BTC-USD", "ETH-USD"]
    );
    assert_eq!(
        coordinator.active_with_open_position(&BotStatus::Active).await,
        vec!["BTC-USD"]
    );
}

#[tokio::test]
async fn single_record_lookups() {
    let dir = tempfile::tempdir().unwrap();
    write_worker(dir.path(), "BTC-USD", "active", 60, Some(10), " ");

    let coordinator = FleetCoordinator::new(test_config(dir.path()));
    assert!(coordinator.is_running("BTC-USD"));
    assert!(!coordinator.is_running("ETH-USD"));
    assert_eq!(
        coordinator.exchange_of("BTC-USD").await.as_deref(),
        Some("binance")
    );
    assert_eq!(coordinator.exchange_of("ETH-USD").await, None);
}

#[tokio::test]
async fn empty_fleet_queries_return_empty_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = FleetCoordinator::new(test_config(dir.path()));
    assert!(coordinator.all().await.is_empty());
    assert!(coordinator.active(&BotStatus::Active).await.is_empty());
    assert!(coordinator.hung(&BotStatus::Active).await.is_empty());
}
