//! Per-location refresh coordination
//!
//! One [`RefreshCoordinator`] exists per configured location. It owns the only
//! copy of that location's current snapshot and publishes every refresh
//! outcome through a `watch` channel so sensors can read synchronously.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument};

use super::{PollenFetcher, UpdateFailed};
use crate::models::{Location, PollenSnapshot};

/// What observers see of a coordinator
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    /// Last good snapshot; `None` until the first successful refresh
    pub snapshot: Option<Arc<PollenSnapshot>>,
    /// Outcome of the most recent refresh attempt
    pub last_update_success: bool,
    /// Time of the last successful refresh
    pub last_updated: Option<DateTime<Utc>>,
    /// Cause of the most recent failure, cleared on success
    pub last_error: Option<String>,
}

/// Refresh counters for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshStats {
    pub attempts: u64,
    pub failures: u64,
}

pub struct RefreshCoordinator {
    location: Location,
    fetcher: Arc<dyn PollenFetcher>,
    state: watch::Sender<CoordinatorState>,
    // Held for the whole fetch: at most one refresh in flight per location
    refresh_gate: Mutex<()>,
    attempts: AtomicU64,
    failures: AtomicU64,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(location: Location, fetcher: Arc<dyn PollenFetcher>) -> Self {
        let (state, _) = watch::channel(CoordinatorState::default());
        Self {
            location,
            fetcher,
            state,
            refresh_gate: Mutex::new(()),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Name used in logs and task names
    #[must_use]
    pub fn name(&self) -> String {
        format!("google_pollen_{}", self.location.id)
    }

    /// Current cached snapshot, readable at any time
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<PollenSnapshot>> {
        self.state.borrow().snapshot.clone()
    }

    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    /// Subscribe to refresh outcomes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refresh_gate.try_lock().is_err()
    }

    #[must_use]
    pub fn stats(&self) -> RefreshStats {
        RefreshStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Run one refresh cycle.
    ///
    /// On success the new snapshot replaces the cached one. On failure the
    /// cached snapshot is left untouched and the cause is logged at debug
    /// level; a single failed cycle is expected and not worth an error log.
    #[instrument(name = "refresh", level = "debug", skip(self), fields(location = %self.location.id))]
    pub async fn refresh(&self) -> Result<Arc<PollenSnapshot>, UpdateFailed> {
        let _guard = match self.refresh_gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Refresh already in flight, waiting for it to finish");
                self.refresh_gate.lock().await
            }
        };
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let result = self
            .fetcher
            .fetch(self.location.latitude, self.location.longitude)
            .await;

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.state.send_modify(|state| {
                    state.snapshot = Some(Arc::clone(&snapshot));
                    state.last_update_success = true;
                    state.last_updated = Some(snapshot.fetched_at);
                    state.last_error = None;
                });
                debug!(
                    index = ?snapshot.index,
                    types = snapshot.types.len(),
                    "Pollen data refreshed"
                );
                Ok(snapshot)
            }
            Err(source) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                debug!(kind = source.kind(), "Cannot fetch pollen data: {}", source);
                self.state.send_modify(|state| {
                    state.last_update_success = false;
                    state.last_error = Some(source.to_string());
                });
                Err(UpdateFailed {
                    location_id: self.location.id.clone(),
                    source,
                })
            }
        }
    }
}
