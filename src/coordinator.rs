//! Fleet coordinator
//!
//! Composition root for the fleet: wires the directory, record store,
//! liveness classifier and process supervisor into the fleet query and
//! lifecycle API. Every query runs candidates → bounded-retry read →
//! classify → sorted identifiers; unreadable workers are silently omitted
//! so one corrupt record never fails a whole query.

use chrono::{Local, NaiveDateTime};
use tracing::{error, info};

use crate::config::FleetConfig;
use crate::directory::FleetDirectory;
use crate::error::FleetError;
use crate::liveness::{classify, Liveness};
use crate::record::{BotStatus, WorkerRecord};
use crate::store::RecordStore;
use crate::supervisor::ProcessSupervisor;

pub struct FleetCoordinator {
    config: FleetConfig,
    store: RecordStore,
    directory: FleetDirectory,
    supervisor: ProcessSupervisor,
}

impl FleetCoordinator {
    pub fn new(config: FleetConfig) -> Self {
        let store = RecordStore::new(&config.records_dir);
        let directory = FleetDirectory::new(&config.records_dir);
        let supervisor = ProcessSupervisor::new(
            store.clone(),
            config.worker.clone(),
            config.retry.clone(),
            config.logs_dir.clone(),
        );
        Self {
            config,
            store,
            directory,
            supervisor,
        }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Every worker with a readable record, sorted.
    pub async fn all(&self) -> Vec<String> {
        let mut pairs = Vec::new();
        for pair in self.directory.list_candidates() {
            if self
                .store
                .read_with_retry(&pair, &self.config.retry)
                .await
                .is_some()
            {
                pairs.push(pair);
            }
        }
        pairs
    }

    /// Workers in `status` and inside their liveness window.
    pub async fn active(&self, status: &BotStatus) -> Vec<String> {
        self.filtered(status, |liveness, _| liveness == Liveness::Active)
            .await
    }

    /// Live workers additionally holding an open position.
    pub async fn active_with_open_position(&self, status: &BotStatus) -> Vec<String> {
        self.filtered(status, |liveness, record| {
            liveness == Liveness::Active && record.has_open_position()
        })
        .await
    }

    /// Workers claiming `status` whose heartbeat or start time says they
    /// have stalled. Disjoint from `active` for the same status and time.
    pub async fn hung(&self, status: &BotStatus) -> Vec<String> {
        self.filtered(status, |liveness, _| liveness == Liveness::Hung)
            .await
    }

    /// Record presence is the existence test for "is running".
    pub fn is_running(&self, pair: &str) -> bool {
        self.store.exists(pair)
    }

    /// Which exchange a worker targets; `None` when unknown or unreadable.
    pub async fn exchange_of(&self, pair: &str) -> Option<String> {
        self.store
            .read_with_retry(pair, &self.config.retry)
            .await
            .map(|record| record.exchange)
            .filter(|exchange| !exchange.is_empty())
    }

    /// Start a worker process; false when one already exists or the spawn
    /// fails. The front end turns the boolean into a human reply.
    pub fn start(&self, pair: &str, exchange: &str, overrides: &str, start_method: &str) -> bool {
        match self.supervisor.start(pair, exchange, overrides, start_method) {
            Ok(()) => true,
            Err(FleetError::DuplicateWorker(_)) => {
                info!(pair, "worker already running, refusing duplicate start");
                false
            }
            Err(e) => {
                error!(pair, error = %e, "failed to start worker");
                false
            }
        }
    }

    /// Request a graceful stop; false when the worker is missing, reports an
    /// open position under `only_if_flat`, or the record stays unwritable.
    pub async fn stop(&self, pair: &str, desired: &BotStatus, only_if_flat: bool) -> bool {
        self.supervisor
            .request_stop(pair, desired, only_if_flat)
            .await
    }

    async fn filtered<F>(&self, status: &BotStatus, keep: F) -> Vec<String>
    where
        F: Fn(Liveness, &WorkerRecord) -> bool,
    {
        // Workers stamp records with naive local time; compare in kind
        let now = Local::now().naive_local();
        self.filtered_at(status, now, keep).await
    }

    async fn filtered_at<F>(&self, status: &BotStatus, now: NaiveDateTime, keep: F) -> Vec<String>
    where
        F: Fn(Liveness, &WorkerRecord) -> bool,
    {
        let mut pairs = Vec::new();
        for pair in self.directory.list_candidates() {
            let Some(record) = self.store.read_with_retry(&pair, &self.config.retry).await
            else {
                continue;
            };
            let liveness = classify(&record, status, now, &self.config.liveness);
            if keep(liveness, &record) {
                pairs.push(pair);
            }
        }
        pairs
    }
}
