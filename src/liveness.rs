//! Liveness classification
//!
//! Decides whether a worker that claims a given status is actually alive,
//! from its record alone. Pure in `(record, target, now)` so the same
//! function feeds both the active and hung fleet queries.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::record::{BotStatus, WorkerRecord};

/// Time windows governing hung detection.
#[derive(Debug, Clone, Deserialize)]
pub struct LivenessPolicy {
    /// Seconds since the last watchdog ping before a worker in the target
    /// status counts as hung (default: 600s / 10 min).
    #[serde(default = "default_watchdog_timeout")]
    pub watchdog_timeout_secs: i64,
    /// Startup grace in seconds for workers that have not reached their
    /// first heartbeat yet (default: 300s / 5 min).
    #[serde(default = "default_startup_grace")]
    pub startup_grace_secs: i64,
}

fn default_watchdog_timeout() -> i64 {
    600
}

fn default_startup_grace() -> i64 {
    300
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            watchdog_timeout_secs: default_watchdog_timeout(),
            startup_grace_secs: default_startup_grace(),
        }
    }
}

/// Classification of one worker record against a target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// In the target status and inside its liveness window.
    Active,
    /// Stalled past its window, or not in the target status at all.
    Hung,
    /// Record has no control section; excluded from both result sets.
    Indeterminate,
}

impl std::fmt::Display for Liveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Liveness::Active => write!(f, "active"),
            Liveness::Hung => write!(f, "hung"),
            Liveness::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// Classify one record relative to `target` at time `now`.
///
/// A worker with a heartbeat is live while `now - watchdog_ping` stays under
/// the watchdog timeout. A worker without one is still inside its startup
/// grace window measured from `started`; absence of a ping there never means
/// hung. Deltas are whole seconds, boundaries strict `<`.
pub fn classify(
    record: &WorkerRecord,
    target: &BotStatus,
    now: NaiveDateTime,
    policy: &LivenessPolicy,
) -> Liveness {
    let Some(control) = &record.botcontrol else {
        return Liveness::Indeterminate;
    };

    let (delta, window) = match control.watchdog_ping {
        Some(ping) => (
            now.signed_duration_since(ping).num_seconds(),
            policy.watchdog_timeout_secs,
        ),
        None => (
            now.signed_duration_since(control.started).num_seconds(),
            policy.startup_grace_secs,
        ),
    };

    if control.status == *target && delta < window {
        Liveness::Active
    } else {
        Liveness::Hung
    }
}
