//! Health, breaker status and Prometheus metrics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use resilience::{BreakerSnapshot, BreakerState};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub events: &'static str,
    pub product_service: BreakerState,
}

/// GET /health: reports degraded only while the product service breaker is
/// open. Event delivery is reported but does not affect the status code.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let events_ok = match state.orchestrator.publisher().health_check().await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(%error, "event publisher health check failed");
            false
        }
    };
    let breaker = state.orchestrator.breaker().state();
    let degraded = breaker.rejects_calls();

    let status = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(HealthResponse {
            status: if degraded { "degraded" } else { "ok" },
            events: if events_ok { "ok" } else { "unavailable" },
            product_service: breaker,
        }),
    )
}

/// GET /circuit-breaker: current state and counts of the product service breaker.
pub async fn circuit_breaker(State(state): State<Arc<AppState>>) -> Json<BreakerSnapshot> {
    Json(state.orchestrator.breaker().snapshot())
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
