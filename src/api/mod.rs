use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pollen::{LocationRuntime, PollenSensor, PollenService, SensorValue};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PollenService>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiLocation {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_update_success: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub refreshing: bool,
    pub refresh_attempts: u64,
    pub refresh_failures: u64,
}

#[derive(Serialize)]
pub struct ApiSensor {
    pub key: &'static str,
    pub unique_id: String,
    pub value: SensorValue,
    pub state_class: Option<&'static str>,
    pub attribution: &'static str,
}

#[derive(Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

impl From<&LocationRuntime> for ApiLocation {
    fn from(runtime: &LocationRuntime) -> Self {
        let location = runtime.location();
        let coordinator = runtime.coordinator();
        let state = coordinator.state();
        let stats = coordinator.stats();
        Self {
            id: location.id.clone(),
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            last_update_success: state.last_update_success,
            last_updated: state.last_updated,
            refreshing: coordinator.is_refreshing(),
            refresh_attempts: stats.attempts,
            refresh_failures: stats.failures,
        }
    }
}

impl From<&PollenSensor> for ApiSensor {
    fn from(sensor: &PollenSensor) -> Self {
        Self {
            key: sensor.key(),
            unique_id: sensor.unique_id().to_string(),
            value: sensor.native_value(),
            state_class: sensor.kind().state_class(),
            attribution: sensor.attribution(),
        }
    }
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
}

fn not_found(id: &str) -> (StatusCode, Json<ApiError>) {
    error(StatusCode::NOT_FOUND, format!("Unknown location '{id}'"))
}

fn sensors_of(runtime: &LocationRuntime) -> Vec<ApiSensor> {
    runtime.sensors().iter().map(ApiSensor::from).collect()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/locations", get(get_locations))
        .route("/locations/{id}/sensors", get(get_sensors))
        .route("/locations/{id}/refresh", post(refresh_location))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn get_locations(State(state): State<AppState>) -> Json<Vec<ApiLocation>> {
    let runtimes = state.service.locations().await;
    Json(runtimes.iter().map(|r| ApiLocation::from(r.as_ref())).collect())
}

async fn get_sensors(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<ApiSensor>> {
    let runtime = state.service.location(&id).await.ok_or_else(|| not_found(&id))?;
    Ok(Json(sensors_of(&runtime)))
}

async fn refresh_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ApiSensor>> {
    let runtime = state.service.location(&id).await.ok_or_else(|| not_found(&id))?;
    info!("Manual refresh requested for '{}'", id);

    match runtime.coordinator().refresh().await {
        Ok(_) => Ok(Json(sensors_of(&runtime))),
        Err(e) => Err(error(StatusCode::BAD_GATEWAY, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use crate::pollen::coordinator::tests::{ScriptedFetcher, api_error};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn app(fetcher: ScriptedFetcher) -> Router {
        let service = PollenService::run_once(
            vec![Location::new("home", "Home", 37.7749, -122.4194)],
            Arc::new(fetcher),
        )
        .await;
        router(AppState {
            service: Arc::new(service),
        })
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ));
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(ScriptedFetcher::default()).await, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".to_string()));
    }

    #[tokio::test]
    async fn test_list_locations() {
        let (status, body) = send(app(ScriptedFetcher::default()).await, "GET", "/locations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "home");
        assert_eq!(body[0]["name"], "Home");
        assert_eq!(body[0]["last_update_success"], true);
        assert!(body[0]["last_updated"].is_string());
        assert_eq!(body[0]["refreshing"], false);
        assert_eq!(body[0]["refresh_attempts"], 1);
        assert_eq!(body[0]["refresh_failures"], 0);
    }

    #[tokio::test]
    async fn test_sensors() {
        let (status, body) =
            send(app(ScriptedFetcher::default()).await, "GET", "/locations/home/sensors").await;
        assert_eq!(status, StatusCode::OK);
        let sensors = body.as_array().unwrap();
        assert_eq!(sensors.len(), 5);
        assert_eq!(sensors[0]["key"], "pollen_index");
        assert_eq!(sensors[0]["value"], 3);
        assert_eq!(sensors[0]["state_class"], "measurement");
        assert_eq!(sensors[0]["unique_id"], "pollen_index_37.7749_-122.4194");
        assert_eq!(sensors[1]["value"], "High");
        assert_eq!(sensors[2]["attribution"], "Data provided by Google Pollen");
        assert!(sensors[2]["state_class"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_location_is_not_found() {
        let app = app(ScriptedFetcher::default()).await;
        let (status, _) = send(app.clone(), "GET", "/locations/nowhere/sensors").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = send(app, "POST", "/locations/nowhere/refresh").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nowhere"));
    }

    #[tokio::test]
    async fn test_refresh_failure_is_bad_gateway() {
        // First refresh at setup fails, so only index and category exist
        let fetcher = ScriptedFetcher::new(vec![Err(api_error()), Err(api_error())]);
        let app = app(fetcher).await;
        let (status, body) = send(app.clone(), "POST", "/locations/home/refresh").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("home"));

        let (_, body) = send(app, "GET", "/locations").await;
        assert_eq!(body[0]["last_update_success"], false);
        assert_eq!(body[0]["refresh_attempts"], 2);
        assert_eq!(body[0]["refresh_failures"], 2);
    }

    #[tokio::test]
    async fn test_refresh_success_returns_sensors() {
        let fetcher = ScriptedFetcher::new(vec![Err(api_error())]);
        let (status, body) = send(app(fetcher).await, "POST", "/locations/home/refresh").await;
        assert_eq!(status, StatusCode::OK);
        let sensors = body.as_array().unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0]["value"], 3);
    }
}
