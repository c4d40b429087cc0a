//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.

use crate::backend::{OrderBy, Row};
use crate::service::{FetchOptions, FetchResult, DEFAULT_LIMIT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::error::{ApiError, ApiResult};

/// Hard cap on a single read through the API
pub const MAX_LIMIT: usize = 1000;

/// Query parameters with a meaning of their own; everything else filters
const RESERVED_PARAMS: &[&str] = &["select", "order", "limit"];

// ============================================
// RESOURCE DTOs
// ============================================

/// Turn `?select=..&order=col.desc&limit=n&col=value` into fetch options
pub fn fetch_options_from_params(params: &HashMap<String, String>) -> ApiResult<FetchOptions> {
    let mut options = FetchOptions::new();

    if let Some(select) = params.get("select").filter(|s| !s.trim().is_empty()) {
        options = options.select(select.trim());
    }

    if let Some(order) = params.get("order").filter(|s| !s.trim().is_empty()) {
        let order: OrderBy = order
            .parse()
            .map_err(|e| ApiError::Validation(format!("Invalid order '{}': {}", order, e)))?;
        options = options.order_by(order);
    }

    let limit = match params.get("limit") {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::Validation(format!("Invalid limit '{}'", raw)))?,
        None => DEFAULT_LIMIT,
    };
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    options = options.limit(limit);

    for (column, value) in params {
        if !RESERVED_PARAMS.contains(&column.as_str()) {
            options = options.eq(column.clone(), value.clone());
        }
    }

    Ok(options)
}

/// Response for a resource read
#[derive(Debug, Serialize)]
pub struct ResourceResponse {
    pub resource: String,
    pub count: usize,
    #[serde(flatten)]
    pub result: FetchResult,
}

impl ResourceResponse {
    pub fn new(resource: impl Into<String>, result: FetchResult) -> Self {
        Self {
            resource: resource.into(),
            count: result.len(),
            result,
        }
    }
}

/// Query parameters for delete-by-key
#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    /// Key column, defaults to `id`
    #[serde(default = "default_key_column")]
    pub column: String,
}

fn default_key_column() -> String {
    "id".to_string()
}

/// Path keys arrive as text; numeric keys are sent as numbers
pub fn key_value(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub resource: String,
    pub deleted: usize,
    pub rows: Vec<Row>,
}

// ============================================
// HEALTH DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" when the backend is connected, "degraded" otherwise
    pub status: String,
    /// "connected", "offline" or "untested"
    pub backend: String,
    /// "ok" or "error"
    pub cache: String,
    pub uptime_seconds: u64,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SortDirection;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_params_to_options() {
        let options = fetch_options_from_params(&params(&[
            ("select", "id,title"),
            ("order", "created_at.desc"),
            ("limit", "5"),
            ("status", "published"),
        ]))
        .unwrap();

        assert_eq!(options.select.as_deref(), Some("id,title"));
        assert_eq!(options.order.unwrap().direction, SortDirection::Desc);
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.filters.get("status"), Some(&Value::from("published")));
        assert_eq!(options.filters.len(), 1);
    }

    #[test]
    fn test_params_defaults() {
        let options = fetch_options_from_params(&HashMap::new()).unwrap();
        assert!(options.select.is_none());
        assert_eq!(options.limit, Some(DEFAULT_LIMIT));
    }

    #[test]
    fn test_invalid_params() {
        assert!(fetch_options_from_params(&params(&[("limit", "many")])).is_err());
        assert!(fetch_options_from_params(&params(&[("limit", "0")])).is_err());
        assert!(fetch_options_from_params(&params(&[("limit", "5000")])).is_err());
        assert!(fetch_options_from_params(&params(&[("order", "created_at.sideways")])).is_err());
    }

    #[test]
    fn test_key_value() {
        assert_eq!(key_value("42"), Value::from(42));
        assert_eq!(key_value("c1"), Value::from("c1"));
    }
}
