//! Record persistence
//!
//! Readers and the record's writer (the worker itself, or the coordinator
//! during a stop request) are never synchronized with locks. A read may
//! observe a half-written or transiently absent file; `read_with_retry`
//! absorbs that with bounded attempts and a short cooperative sleep.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, warn};

use crate::config::RetryConfig;
use crate::error::{FleetError, Result};
use crate::record::WorkerRecord;

/// File extension of worker records.
pub const RECORD_EXT: &str = "json";

/// Typed read/write access to one worker's record file.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records_dir: PathBuf,
}

impl RecordStore {
    pub fn new(records_dir: impl Into<PathBuf>) -> Self {
        Self {
            records_dir: records_dir.into(),
        }
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    /// Path of the record file for one worker.
    pub fn path_for(&self, pair: &str) -> PathBuf {
        self.records_dir.join(format!("{pair}.{RECORD_EXT}"))
    }

    /// Record presence is the fleet's "is running" test.
    pub fn exists(&self, pair: &str) -> bool {
        self.path_for(pair).is_file()
    }

    /// Read one record. Fails softly: a missing file is a transient read
    /// failure, unparseable content a malformed record. Both are expected
    /// while the worker is mid-write and are safe to retry.
    pub fn read(&self, pair: &str) -> Result<WorkerRecord> {
        let path = self.path_for(pair);
        let raw = fs::read_to_string(&path).map_err(|e| {
            warn!(pair, error = %e, "record not readable");
            FleetError::TransientRead {
                pair: pair.to_string(),
                reason: e.to_string(),
            }
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            warn!(pair, error = %e, "record not parseable");
            FleetError::MalformedRecord {
                pair: pair.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Write the full record. Best-effort: a partial write is neither
    /// detected nor rolled back.
    pub fn write(&self, pair: &str, record: &WorkerRecord) -> Result<()> {
        let path = self.path_for(pair);
        let body = to_pretty_json(record).map_err(|e| FleetError::WriteFailure {
            pair: pair.to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&path, body).map_err(|e| {
            warn!(pair, error = %e, "record write failed");
            FleetError::WriteFailure {
                pair: pair.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Read with bounded retry; `None` once attempts are exhausted, so a
    /// fleet query degrades to "worker absent" instead of failing.
    pub async fn read_with_retry(&self, pair: &str, retry: &RetryConfig) -> Option<WorkerRecord> {
        for attempt in 1..=retry.max_read_attempts {
            match self.read(pair) {
                Ok(record) => return Some(record),
                Err(e) if e.is_retryable() && attempt < retry.max_read_attempts => {
                    tokio::time::sleep(Duration::from_millis(retry.read_retry_delay_ms)).await;
                }
                Err(e) => {
                    error!(
                        pair,
                        attempts = retry.max_read_attempts,
                        error = %e,
                        "record unreadable after retries"
                    );
                    return None;
                }
            }
        }
        None
    }
}

/// Records are written with 4-space indentation, matching what the workers
/// themselves produce.
fn to_pretty_json(record: &WorkerRecord) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    record.serialize(&mut ser)?;
    Ok(buf)
}
