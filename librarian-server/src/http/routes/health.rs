//! Health check endpoint

use std::time::Duration;

use axum::extract::State;
use axum::http::{Extensions, StatusCode};
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::context::{self, ContextError};
use crate::http::server::AppState;
use crate::lifecycle::LifecycleState;

/// Bound on the ping issued per health request
const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub lifecycle: &'static str,
    pub database: &'static str,
}

/// GET /health
async fn health(
    State(state): State<AppState>,
    extensions: Extensions,
) -> (StatusCode, Json<HealthResponse>) {
    let database = match context::resolve(&extensions) {
        Ok(handle) => match tokio::time::timeout(PING_TIMEOUT, handle.client().ping()).await {
            Ok(Ok(())) => "connected",
            _ => "unreachable",
        },
        Err(ContextError::NotConfigured) => "not_configured",
        Err(ContextError::Closed) => "closed",
        Err(ContextError::MissingBinding) => "unbound",
    };

    let lifecycle = state.lifecycle.state();
    let healthy = lifecycle == LifecycleState::Running
        && matches!(database, "connected" | "not_configured");

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            lifecycle: lifecycle.as_str(),
            database,
        }),
    )
}

/// Health routes
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
