//! Health Routes
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (local cache usable)
//! - GET /health - Full health status
//!
//! None of these trigger a backend probe. An offline backend is reported
//! as "degraded", never as unhealthy: the console still serves local data.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Ready when the local cache can be read, since every degraded read
/// depends on it.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if check_cache_health(&state) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connection = state.service.connection_status().await;
    let cache_ok = check_cache_health(&state);

    let backend = match (connection.tested, connection.connected) {
        (false, _) => "untested",
        (true, true) => "connected",
        (true, false) => "offline",
    };

    let status = if connection.connected && cache_ok {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        backend: backend.to_string(),
        cache: if cache_ok { "ok" } else { "error" }.to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn check_cache_health(state: &AppState) -> bool {
    match state.service.cache().last_sync() {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Cache health check failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
