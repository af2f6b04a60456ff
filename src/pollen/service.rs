//! Runtime data for one configured integration: a coordinator, its sensors and
//! its schedule for every tracked location.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::sensor::{PollenSensor, available_sensors};
use super::{PollenFetcher, RefreshCoordinator, RefreshScheduler, SchedulerHandle, UpdateFailed};
use crate::models::{Location, PollenSnapshot};

/// Everything kept alive for a single tracked location
pub struct LocationRuntime {
    coordinator: Arc<RefreshCoordinator>,
    sensors: Vec<PollenSensor>,
    schedule: Option<SchedulerHandle>,
}

impl LocationRuntime {
    #[must_use]
    pub fn location(&self) -> &Location {
        self.coordinator.location()
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn sensors(&self) -> &[PollenSensor] {
        &self.sensors
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.schedule.as_ref().is_some_and(SchedulerHandle::is_running)
    }
}

pub struct PollenService {
    locations: RwLock<BTreeMap<String, Arc<LocationRuntime>>>,
}

impl PollenService {
    /// Set up every location: first refresh (concurrently), sensor creation, schedule.
    ///
    /// A location whose first refresh fails still starts; it exposes only the
    /// overall index and category sensors until data arrives.
    pub async fn start(
        locations: Vec<Location>,
        fetcher: Arc<dyn PollenFetcher>,
        interval: Duration,
    ) -> Self {
        if locations.is_empty() {
            warn!("No locations configured, nothing will be polled");
        }
        let service = Self::build(locations, fetcher, Some(interval)).await;
        info!(
            "Pollen service started with {} location(s)",
            service.locations.read().await.len()
        );
        service
    }

    /// Set up every location once without scheduling further refreshes
    pub async fn run_once(locations: Vec<Location>, fetcher: Arc<dyn PollenFetcher>) -> Self {
        Self::build(locations, fetcher, None).await
    }

    async fn build(
        locations: Vec<Location>,
        fetcher: Arc<dyn PollenFetcher>,
        interval: Option<Duration>,
    ) -> Self {
        let runtimes = join_all(
            locations
                .into_iter()
                .map(|location| Self::setup_location(location, Arc::clone(&fetcher), interval)),
        )
        .await;

        Self {
            locations: RwLock::new(
                runtimes
                    .into_iter()
                    .map(|runtime| (runtime.location().id.clone(), Arc::new(runtime)))
                    .collect(),
            ),
        }
    }

    async fn setup_location(
        location: Location,
        fetcher: Arc<dyn PollenFetcher>,
        interval: Option<Duration>,
    ) -> LocationRuntime {
        let coordinator = Arc::new(RefreshCoordinator::new(location, fetcher));

        let first = match coordinator.refresh().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(
                    "Initial pollen refresh failed for '{}', starting without data: {}",
                    coordinator.location().id,
                    e
                );
                None
            }
        };

        let sensors = available_sensors(first.as_deref())
            .into_iter()
            .map(|kind| PollenSensor::new(kind, coordinator.location(), coordinator.subscribe()))
            .collect::<Vec<_>>();
        info!(
            "Location '{}' exposes {} sensor(s)",
            coordinator.location().id,
            sensors.len()
        );

        let schedule = interval.map(|period| RefreshScheduler::spawn(Arc::clone(&coordinator), period));

        LocationRuntime {
            coordinator,
            sensors,
            schedule,
        }
    }

    pub async fn locations(&self) -> Vec<Arc<LocationRuntime>> {
        self.locations.read().await.values().cloned().collect()
    }

    pub async fn location(&self, id: &str) -> Option<Arc<LocationRuntime>> {
        self.locations.read().await.get(id).cloned()
    }

    /// Manual refresh of one location. `None` if the id is unknown.
    pub async fn refresh(&self, id: &str) -> Option<Result<Arc<PollenSnapshot>, UpdateFailed>> {
        let runtime = self.location(id).await?;
        Some(runtime.coordinator.refresh().await)
    }

    /// Stop tracking a location and discard its snapshot
    pub async fn remove_location(&self, id: &str) -> bool {
        let removed = self.locations.write().await.remove(id);
        match removed {
            Some(runtime) => {
                if let Some(schedule) = &runtime.schedule {
                    schedule.stop();
                }
                info!("Removed location '{}'", id);
                true
            }
            None => false,
        }
    }

    pub async fn shutdown(&self) {
        let mut locations = self.locations.write().await;
        for runtime in locations.values() {
            if let Some(schedule) = &runtime.schedule {
                schedule.stop();
            }
        }
        locations.clear();
        info!("Pollen service stopped");
    }
}
