use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use super::RefreshCoordinator;

/// Default cadence for scheduled refreshes
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Drives a coordinator on a fixed interval.
pub struct RefreshScheduler;

impl RefreshScheduler {
    /// Spawn the periodic refresh task for one coordinator.
    ///
    /// The first tick fires one full interval after spawning. Manual refreshes
    /// go straight to the coordinator and leave this schedule alone.
    #[must_use]
    pub fn spawn(coordinator: Arc<RefreshCoordinator>, period: Duration) -> SchedulerHandle {
        let name = coordinator.name();
        info!("Scheduling {} every {}s", name, period.as_secs());

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!("Scheduled refresh for {}", coordinator.name());
                // Failures are already logged and published by the coordinator
                let _ = coordinator.refresh().await;
            }
        });

        SchedulerHandle { name, handle }
    }
}

/// Owns the scheduled task; dropping it stops the schedule
pub struct SchedulerHandle {
    name: String,
    handle: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        if !self.handle.is_finished() {
            debug!("Stopping schedule for {}", self.name);
            self.handle.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
