pub mod callback;
pub mod config;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod liveness;
pub mod record;
pub mod store;
pub mod supervisor;

pub use callback::CallbackData;
pub use config::{FleetConfig, RetryConfig, ScannerConfig, WorkerLaunchConfig};
pub use coordinator::FleetCoordinator;
pub use directory::FleetDirectory;
pub use error::{FleetError, Result};
pub use liveness::{classify, Liveness, LivenessPolicy};
pub use record::{BotControl, BotStatus, WorkerRecord};
pub use store::{RecordStore, RECORD_EXT};
pub use supervisor::ProcessSupervisor;
