//! Fetch options and the provenance-tagged result envelope

use crate::backend::{OrderBy, Row, SelectQuery};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Row limit when the caller does not give one
pub const DEFAULT_LIMIT: usize = 100;

/// Where returned data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Fresh read from the backend
    Live,
    /// Last-known-good snapshot from the local cache
    Cached,
    /// Static sample records
    Sample,
    /// Nothing available
    None,
}

impl Source {
    pub fn outcome(self) -> Outcome {
        match self {
            Source::Live => Outcome::Ok,
            Source::Cached | Source::Sample => Outcome::Degraded,
            Source::None => Outcome::Empty,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Source::Live => "live",
            Source::Cached => "cached",
            Source::Sample => "sample",
            Source::None => "none",
        };
        write!(f, "{}", s)
    }
}

/// Coarse health of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Degraded,
    Empty,
}

/// Error carried inside a result envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FetchError {
    #[error("No data available for {resource}")]
    NoDataAvailable { resource: String },
}

/// Read options for a logical resource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchOptions {
    /// Column list, `*` when absent
    #[serde(default)]
    pub select: Option<String>,
    /// Equality filters, all ANDed
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
    #[serde(default)]
    pub order: Option<OrderBy>,
    /// Row limit, `DEFAULT_LIMIT` when absent
    #[serde(default)]
    pub limit: Option<usize>,
    /// Caller-supplied rows used when no sample set exists
    #[serde(default)]
    pub fallback: Option<Vec<Row>>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(column.into(), value.into());
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_fallback(mut self, rows: Vec<Row>) -> Self {
        self.fallback = Some(rows);
        self
    }

    /// The backend query these options describe
    pub fn to_query(&self) -> SelectQuery {
        SelectQuery {
            columns: self.select.clone().unwrap_or_else(|| "*".to_string()),
            filters: self.filters.clone(),
            order: self.order.clone(),
            limit: Some(self.limit.unwrap_or(DEFAULT_LIMIT)),
        }
    }
}

/// Result of a fetch: data plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    pub data: Vec<Row>,
    pub source: Source,
    pub outcome: Outcome,
    pub error: Option<FetchError>,
}

impl FetchResult {
    pub fn live(data: Vec<Row>) -> Self {
        Self::from_source(data, Source::Live)
    }

    pub fn cached(data: Vec<Row>) -> Self {
        Self::from_source(data, Source::Cached)
    }

    pub fn sample(data: Vec<Row>) -> Self {
        Self::from_source(data, Source::Sample)
    }

    /// Every tier exhausted
    pub fn none(resource: &str) -> Self {
        Self {
            data: Vec::new(),
            source: Source::None,
            outcome: Outcome::Empty,
            error: Some(FetchError::NoDataAvailable {
                resource: resource.to_string(),
            }),
        }
    }

    fn from_source(data: Vec<Row>, source: Source) -> Self {
        Self {
            data,
            source,
            outcome: source.outcome(),
            error: None,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SortDirection;

    #[test]
    fn test_options_to_query_defaults() {
        let query = FetchOptions::new().to_query();
        assert_eq!(query.columns, "*");
        assert_eq!(query.limit, Some(DEFAULT_LIMIT));
        assert!(query.order.is_none());
    }

    #[test]
    fn test_options_to_query() {
        let query = FetchOptions::new()
            .select("id,created_at")
            .eq("status", "published")
            .order_by(OrderBy::desc("created_at"))
            .limit(5)
            .to_query();

        assert_eq!(query.columns, "id,created_at");
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.order.unwrap().direction, SortDirection::Desc);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_none_result_invariant() {
        let result = FetchResult::none("tags");
        assert!(result.is_empty());
        assert_eq!(result.outcome, Outcome::Empty);
        assert_eq!(
            result.error.unwrap().to_string(),
            "No data available for tags"
        );
    }

    #[test]
    fn test_serialized_envelope() {
        let value = serde_json::to_value(FetchResult::none("tags")).unwrap();
        assert_eq!(value["source"], "none");
        assert_eq!(value["outcome"], "empty");
        assert_eq!(value["error"]["code"], "no_data_available");

        let value = serde_json::to_value(FetchResult::sample(vec![])).unwrap();
        assert_eq!(value["source"], "sample");
        assert_eq!(value["outcome"], "degraded");
        assert!(value["error"].is_null());
    }
}
