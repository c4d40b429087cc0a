//! Resource Routes
//!
//! - GET /api/v1/resources/:name - Degrading read of a logical resource
//! - DELETE /api/v1/resources/:name/:key - Delete rows by key
//! - POST /api/v1/resources/:name/probe - Resolve the physical table

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::dto::{fetch_options_from_params, key_value, DeleteParams, DeleteResponse, ResourceResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::resolver::ProbeReport;

/// GET /api/v1/resources/:name
///
/// Always 200 for a well-formed request. The body's `source` field says
/// whether the rows are live, cached, sample or absent.
pub async fn get_resource(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ResourceResponse>> {
    let options = fetch_options_from_params(&params)?;
    let result = state.service.fetch(&name, &options).await;

    tracing::debug!(
        resource = %name,
        source = %result.source,
        rows = result.len(),
        "Served resource"
    );

    Ok(Json(ResourceResponse::new(name, result)))
}

/// DELETE /api/v1/resources/:name/:key?column=id
pub async fn delete_resource(
    State(state): State<Arc<AppState>>,
    Path((name, key)): Path<(String, String)>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Json<DeleteResponse>> {
    let rows = state
        .service
        .delete(&name, &params.column, &key_value(&key))
        .await?;

    Ok(Json(DeleteResponse {
        resource: name,
        deleted: rows.len(),
        rows,
    }))
}

/// POST /api/v1/resources/:name/probe
///
/// Walks every candidate table and caches the winner. Reports the
/// per-candidate results either way.
pub async fn probe_resource(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Json<ProbeReport> {
    Json(state.service.probe(&name).await)
}
