//! Dashboard Routes
//!
//! - GET /api/v1/stats - Headline counts with their sources
//! - GET /api/v1/activity - Recent posts and comments

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::service::{Activity, DashboardStats};

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<DashboardStats> {
    Json(state.service.stats().await)
}

/// GET /api/v1/activity
pub async fn get_activity(State(state): State<Arc<AppState>>) -> Json<Vec<Activity>> {
    Json(state.service.recent_activity().await)
}
