//! The tiny `axum` router exposing `/healthz`, `/readyz`, and `/metrics`,
//! reading straight from [`HealthCache`].

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;

use crate::cache::HealthCache;
use crate::metrics::MetricsRegistry;

#[derive(Clone)]
struct AppState {
    health: Arc<HealthCache>,
    metrics: Arc<MetricsRegistry>,
}

/// Builds the router; the binary crate nests this under its bind address
/// via `axum::serve`.
pub fn router(health: Arc<HealthCache>, metrics: Arc<MetricsRegistry>) -> Router {
    let state = AppState { health, metrics };
    Router::new()
        .route("/healthz", get(liveness))
        .route("/readyz", get(readiness))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Liveness: the process is scheduling requests at all. Always `200` once
/// the router is serving.
async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness: `200` unless some component has reported `Down`/`Error`
/// (`HealthSnapshot::is_ready`).
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.health.snapshot();
    let status = if snapshot.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(snapshot))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_agent_core::{HealthState, ResourceKind};
    use tower::ServiceExt;

    #[tokio::test]
    async fn readiness_is_ok_when_all_unknown() {
        let health = HealthCache::new();
        let metrics = MetricsRegistry::new();
        metrics.register_kind(ResourceKind::Vpc, Arc::new(site_agent_core::ActivityCounters::new()));
        let app = router(health, metrics);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/readyz")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_is_503_once_controller_is_down() {
        let health = HealthCache::new();
        health.record_controller_call(false, "a");
        health.record_controller_call(false, "b");
        health.record_controller_call(false, "c");
        let metrics = MetricsRegistry::new();
        let app = router(health.clone(), metrics);

        assert_eq!(
            health.snapshot().controller_connection_health.state,
            HealthState::Down
        );

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/readyz")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
