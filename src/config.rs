use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::liveness::LivenessPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// Directory holding one JSON record per worker
    pub records_dir: PathBuf,
    /// Directory for coordinator and per-worker log files
    pub logs_dir: PathBuf,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub liveness: LivenessPolicy,
    #[serde(default)]
    pub worker: WorkerLaunchConfig,
}

/// Global fleet settings, consumed as plain values and never mutated here.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Allow workers to use leverage markets
    #[serde(default)]
    pub enable_leverage: bool,
    /// Maximum concurrent workers (0 = unlimited)
    #[serde(default)]
    pub max_bot_count: u32,
    /// Delay between automatic scans, in minutes (0 = disabled)
    #[serde(default)]
    pub auto_scan_delay: u32,
    /// Permit a buy immediately after a sell
    #[serde(default = "default_true")]
    pub enable_buy_next: bool,
    /// ATR(72) percentage threshold used by the scanner
    #[serde(default = "default_atr72_pcnt")]
    pub atr72_pcnt: f64,
}

fn default_true() -> bool {
    true
}

fn default_atr72_pcnt() -> f64 {
    2.0
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enable_leverage: false,
            max_bot_count: 0,
            auto_scan_delay: 0,
            enable_buy_next: true,
            atr72_pcnt: default_atr72_pcnt(),
        }
    }
}

/// Bounds for the retry loops absorbing read-during-write races.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum record read attempts per query (default: 5)
    #[serde(default = "default_read_attempts")]
    pub max_read_attempts: u32,
    /// Delay between read attempts (default: 150ms)
    #[serde(default = "default_read_delay")]
    pub read_retry_delay_ms: u64,
    /// Maximum read-modify-write attempts for a stop request (default: 20)
    #[serde(default = "default_stop_attempts")]
    pub max_stop_attempts: u32,
    /// Delay between stop attempts (default: 250ms)
    #[serde(default = "default_stop_delay")]
    pub stop_retry_delay_ms: u64,
}

fn default_read_attempts() -> u32 {
    5
}

fn default_read_delay() -> u64 {
    150
}

fn default_stop_attempts() -> u32 {
    20
}

fn default_stop_delay() -> u64 {
    250
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_read_attempts: default_read_attempts(),
            read_retry_delay_ms: default_read_delay(),
            max_stop_attempts: default_stop_attempts(),
            stop_retry_delay_ms: default_stop_delay(),
        }
    }
}

/// How to invoke a new worker process.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerLaunchConfig {
    /// Worker executable (default: "cryptobot" on PATH)
    #[serde(default = "default_program")]
    pub program: String,
    /// Fixed arguments placed before the per-worker ones
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "cryptobot".to_string()
}

impl Default for WorkerLaunchConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}

impl FleetConfig {
    /// Load configuration from `fleet.toml` and environment
    pub fn load() -> Result<Self> {
        Self::load_from("fleet.toml")
    }

    /// Load configuration from a specific file
    pub fn load_from<P: AsRef<Path>>(config_file: P) -> Result<Self> {
        let builder = Config::builder()
            // Start with default values
            .set_default("records_dir", "fleet_data")?
            .set_default("logs_dir", "logs")?
            // Load config file if present
            .add_source(File::from(config_file.as_ref()).required(false))
            // Override with environment variables (BOTFLEET_SCANNER__MAX_BOT_COUNT, etc.)
            .add_source(
                Environment::with_prefix("BOTFLEET")
                    .separator("__")
                    .try_parsing(true),
            );

        Ok(builder.build()?.try_deserialize()?)
    }
}
