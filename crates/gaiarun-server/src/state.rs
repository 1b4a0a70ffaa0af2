//! Shared application state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use gaiarun_core::TaskUpdate;

use crate::catalog::TaskCatalog;
use crate::runner::TaskRunner;
use crate::store::TaskRunStore;

/// Default capacity of the run update channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Shared application state.
pub struct AppState {
    /// Tasks loaded at startup.
    pub catalog: TaskCatalog,

    /// Executes tasks.
    pub runner: Arc<dyn TaskRunner>,

    /// Run history.
    pub runs: Arc<dyn TaskRunStore>,

    /// Broadcast channel for run updates.
    pub updates: broadcast::Sender<TaskUpdate>,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(
        catalog: TaskCatalog,
        runner: Arc<dyn TaskRunner>,
        runs: Arc<dyn TaskRunStore>,
        event_capacity: usize,
    ) -> Arc<Self> {
        let (updates, _) = broadcast::channel(event_capacity.max(1));
        Arc::new(Self {
            catalog,
            runner,
            runs,
            updates,
        })
    }

    /// Publish a run update to every subscriber.
    pub fn notify(&self, update: TaskUpdate) {
        // Ignore send errors (no subscribers)
        if self.updates.send(update).is_err() {
            debug!("No update subscribers");
        }
    }

    /// Register a new update subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskUpdate> {
        self.updates.subscribe()
    }
}
