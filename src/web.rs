use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::PollenWatchError;
use crate::api::{self, AppState};
use crate::pollen::PollenService;

pub fn app(service: Arc<PollenService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(AppState { service }))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the HTTP API until `shutdown` resolves
pub async fn run(
    service: Arc<PollenService>,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(PollenWatchError::from)
        .with_context(|| format!("Failed to bind web server to {addr}"))?;
    tracing::info!("Web server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Web server failed")
}
