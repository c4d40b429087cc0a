//! Connection Status Routes
//!
//! - GET /api/v1/status - Current connection state, no probe
//! - POST /api/v1/status/refresh - Forget the memoized state and re-probe

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::service::SystemStatus;

/// GET /api/v1/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(state.service.system_status().await)
}

/// POST /api/v1/status/refresh
pub async fn refresh_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    state.service.invalidate_connection().await;
    let connected = state.service.check_connection().await;
    tracing::info!(connected, "Connection status refreshed");

    Json(state.service.system_status().await)
}
