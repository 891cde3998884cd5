use thiserror::Error;

/// Main error type for the fleet coordinator
#[derive(Error, Debug)]
pub enum FleetError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Record protocol errors
    #[error("Transient read failure for '{pair}': {reason}")]
    TransientRead { pair: String, reason: String },

    #[error("Malformed record for '{pair}': {reason}")]
    MalformedRecord { pair: String, reason: String },

    #[error("Write failure for '{pair}': {reason}")]
    WriteFailure { pair: String, reason: String },

    // Lifecycle errors
    #[error("Worker already running for '{0}'")]
    DuplicateWorker(String),

    #[error("Failed to spawn worker for '{pair}': {source}")]
    Spawn {
        pair: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FleetError {
    /// Errors expected under concurrent record writers, worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FleetError::TransientRead { .. }
                | FleetError::MalformedRecord { .. }
                | FleetError::WriteFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
