//! Worker process lifecycle
//!
//! Starting enforces the fleet's uniqueness guarantee through record
//! presence, never by inspecting the process table. Stopping does not signal
//! the process either: it flips `botcontrol.status` in the worker's own
//! record and lets the worker wind itself down.

use chrono::Local;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{RetryConfig, WorkerLaunchConfig};
use crate::error::{FleetError, Result};
use crate::record::BotStatus;
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    store: RecordStore,
    launch: WorkerLaunchConfig,
    retry: RetryConfig,
    logs_dir: PathBuf,
}

impl ProcessSupervisor {
    pub fn new(
        store: RecordStore,
        launch: WorkerLaunchConfig,
        retry: RetryConfig,
        logs_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            launch,
            retry,
            logs_dir,
        }
    }

    /// Spawn a detached worker process for `pair`.
    ///
    /// Refuses with `DuplicateWorker` when a record for `pair` already
    /// exists: at most one worker per identifier, enforced before any
    /// process is created. The `overrides` string is appended verbatim.
    pub fn start(
        &self,
        pair: &str,
        exchange: &str,
        overrides: &str,
        start_method: &str,
    ) -> Result<()> {
        if self.store.exists(pair) {
            return Err(FleetError::DuplicateWorker(pair.to_string()));
        }

        let log_file = self.logs_dir.join(format!(
            "{exchange}-{pair}-{}.log",
            Local::now().date_naive()
        ));

        let mut cmd = Command::new(&self.launch.program);
        cmd.args(&self.launch.args);
        cmd.arg("--startmethod").arg(start_method);
        if !pair.is_empty() {
            cmd.arg("--market").arg(pair);
        }
        if !exchange.is_empty() {
            cmd.arg("--exchange").arg(exchange);
        }
        cmd.arg("--logfile").arg(&log_file);
        for arg in overrides.split_whitespace() {
            cmd.arg(arg);
        }

        spawn_detached(cmd, pair)?;
        info!(pair, exchange, start_method, "worker started");
        Ok(())
    }

    /// Ask a running worker to wind down by mutating its control status.
    ///
    /// The worker's own heartbeat writes race with ours, so the
    /// read-modify-write is retried, with a bound: after
    /// `max_stop_attempts` the request is abandoned and `false` returned.
    /// With `only_if_flat`, a worker reporting an open position is left
    /// untouched.
    pub async fn request_stop(
        &self,
        pair: &str,
        desired: &BotStatus,
        only_if_flat: bool,
    ) -> bool {
        if !self.store.exists(pair) {
            return false;
        }

        for attempt in 1..=self.retry.max_stop_attempts {
            match self.try_stop_once(pair, desired, only_if_flat) {
                Ok(outcome) => return outcome,
                Err(e) if e.is_retryable() => {
                    warn!(pair, attempt, error = %e, "stop request attempt failed");
                    tokio::time::sleep(Duration::from_millis(self.retry.stop_retry_delay_ms))
                        .await;
                }
                Err(e) => {
                    warn!(pair, error = %e, "stop request failed");
                    return false;
                }
            }
        }

        warn!(
            pair,
            attempts = self.retry.max_stop_attempts,
            "stop request abandoned after retries"
        );
        false
    }

    fn try_stop_once(&self, pair: &str, desired: &BotStatus, only_if_flat: bool) -> Result<bool> {
        let mut record = self.store.read(pair)?;

        if record.botcontrol.is_none() {
            warn!(pair, "record has no control section, cannot stop");
            return Ok(false);
        }
        if only_if_flat && record.has_open_position() {
            info!(pair, "open position reported, leaving status untouched");
            return Ok(false);
        }

        if let Some(control) = record.botcontrol.as_mut() {
            control.status = desired.clone();
        }
        self.store.write(pair, &record)?;
        info!(pair, status = %desired, "stop requested");
        Ok(true)
    }
}

/// Spawn without ever waiting on the child; the worker outlives us.
#[cfg(unix)]
fn spawn_detached(mut cmd: Command, pair: &str) -> Result<()> {
    use std::os::unix::process::CommandExt;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    // New session, so the worker survives the coordinator's terminal
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid().map_err(std::io::Error::from)?;
            Ok(())
        });
    }
    cmd.spawn().map_err(|e| FleetError::Spawn {
        pair: pair.to_string(),
        source: e,
    })?;
    Ok(())
}

/// On Windows the worker gets its own console window, titled with the pair,
/// and `start` returns immediately.
#[cfg(not(unix))]
fn spawn_detached(cmd: Command, pair: &str) -> Result<()> {
    let mut wrapper = Command::new("cmd");
    wrapper
        .arg("/C")
        .arg("start")
        .arg(pair)
        .arg(cmd.get_program());
    wrapper.args(cmd.get_args());
    wrapper.stdin(Stdio::null());
    wrapper.spawn().map_err(|e| FleetError::Spawn {
        pair: pair.to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BotControl, WorkerRecord};
    use chrono::NaiveDate;
    use std::path::Path;

    fn supervisor(dir: &Path) -> ProcessSupervisor {
        ProcessSupervisor::new(
            RecordStore::new(dir),
            WorkerLaunchConfig {
                program: "true".into(),
                args: Vec::new(),
            },
            RetryConfig {
                max_stop_attempts: 3,
                stop_retry_delay_ms: 5,
                ..Default::default()
            },
            dir.join("logs"),
        )
    }

    fn write_record(dir: &Path, pair: &str, status: BotStatus, margin: &str) {
        let started = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let record = WorkerRecord {
            exchange: "binance".into(),
            margin: Some(margin.into()),
            botcontrol: Some(BotControl::new(status, started)),
            extra: Default::default(),
        };
        RecordStore::new(dir).write(pair, &record).unwrap();
    }

    #[test]
    fn test_start_refuses_duplicate_worker() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "BTC-USD", BotStatus::Active, " ");

        let supervisor = supervisor(dir.path());
        let err = supervisor
            .start("BTC-USD", "binance", "", "telegram")
            .unwrap_err();
        assert!(matches!(err, FleetError::DuplicateWorker(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_start_spawns_when_no_record_exists() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        // `true` swallows the worker arguments and exits immediately
        supervisor
            .start("ETH-USD", "binance", "--live 0", "scanner")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_respects_open_position() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "ETH-USD", BotStatus::Active, "12.5%");

        let supervisor = supervisor(dir.path());
        let stopped = supervisor
            .request_stop("ETH-USD", &BotStatus::Exit, true)
            .await;
        assert!(!stopped);

        let record = RecordStore::new(dir.path()).read("ETH-USD").unwrap();
        assert_eq!(record.botcontrol.unwrap().status, BotStatus::Active);
    }

    #[tokio::test]
    async fn test_stop_flips_status_when_flat() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "ETH-USD", BotStatus::Active, " ");

        let supervisor = supervisor(dir.path());
        let stopped = supervisor
            .request_stop("ETH-USD", &BotStatus::Exit, true)
            .await;
        assert!(stopped);

        let record = RecordStore::new(dir.path()).read("ETH-USD").unwrap();
        assert_eq!(record.botcontrol.unwrap().status, BotStatus::Exit);
    }

    #[tokio::test]
    async fn test_stop_ignores_missing_record_and_missing_control() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        assert!(!supervisor.request_stop("GHOST", &BotStatus::Exit, false).await);

        let bare = WorkerRecord {
            exchange: "binance".into(),
            ..Default::default()
        };
        RecordStore::new(dir.path()).write("BARE", &bare).unwrap();
        assert!(!supervisor.request_stop("BARE", &BotStatus::Exit, false).await);
    }
}
