//! Read query shape
//!
//! A `SelectQuery` is rendered to REST query parameters for live reads and
//! can also be applied locally to cached or sample rows, so every source
//! tier answers the same question.

use super::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sort direction for a single-column ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("Unknown sort direction: {}", other)),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Single-column ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Parses `created_at`, `created_at.desc` or `created_at:desc`
impl FromStr for OrderBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Empty order specification".to_string());
        }

        let split = s.rsplit_once('.').or_else(|| s.rsplit_once(':'));
        match split {
            Some((column, direction)) if !column.is_empty() => Ok(Self {
                column: column.to_string(),
                direction: direction.parse()?,
            }),
            Some(_) => Err(format!("Missing column in order specification: {}", s)),
            None => Ok(Self::asc(s)),
        }
    }
}

/// A filtered, sorted, limited read over one table
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Column list in REST syntax, `*` for all columns
    pub columns: String,
    /// Equality filters, all ANDed
    pub filters: BTreeMap<String, Value>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Default for SelectQuery {
    fn default() -> Self {
        Self {
            columns: "*".to_string(),
            filters: BTreeMap::new(),
            order: None,
            limit: None,
        }
    }
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimal existence check: one row, one column, no mutation
    pub fn probe() -> Self {
        Self::new().columns("id").limit(1)
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
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

    /// Render as REST query parameters
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];

        for (column, value) in &self.filters {
            pairs.push((column.clone(), format!("eq.{}", value_text(value))));
        }

        if let Some(order) = &self.order {
            pairs.push((
                "order".to_string(),
                format!("{}.{}", order.column, order.direction),
            ));
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        pairs
    }

    /// Apply filters, ordering, limit and projection to rows held locally
    pub fn apply_local(&self, rows: Vec<Row>) -> Vec<Row> {
        let mut rows: Vec<Row> = rows
            .into_iter()
            .filter(|row| self.matches(row))
            .collect();

        if let Some(order) = &self.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        match self.projection() {
            Some(columns) => rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .filter(|(key, _)| columns.contains(&key.as_str()))
                        .collect()
                })
                .collect(),
            None => rows,
        }
    }

    /// Whether a row satisfies every equality filter
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|(column, expected)| {
            row.get(column)
                .map(|actual| actual == expected || value_text(actual) == value_text(expected))
                .unwrap_or(false)
        })
    }

    fn projection(&self) -> Option<Vec<&str>> {
        let columns: Vec<&str> = self
            .columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        if columns.is_empty() || columns.contains(&"*") {
            None
        } else {
            Some(columns)
        }
    }
}

/// Text form of a value as it appears in a REST filter
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Nulls and missing values sort first
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => value_text(x).cmp(&value_text(y)),
    }
}
