//! Hosted Row Store Backend
//!
//! Blogdesk talks to a hosted Backend-as-a-Service that exposes its
//! tables through a PostgREST-style row protocol. This module defines the
//! narrow protocol the rest of the crate depends on:
//!
//! - **RowStore**: select-with-filter/order/limit and delete-by-key over named tables
//! - **SelectQuery**: the read shape (columns, equality filters, sort, limit)
//! - **BackendError**: failures, classified as reachable or unreachable
//! - **RestClient**: the reqwest implementation speaking the REST dialect
//!
//! Storage, authentication and row-level security are enforced on the
//! backend side and treated as opaque.

mod client;
mod error;
mod query;

#[cfg(test)]
pub(crate) mod memory;

pub use client::RestClient;
pub use error::{message_signals_unreachable, BackendError, BackendResult, FailureClass};
pub use query::{OrderBy, SelectQuery, SortDirection};

use async_trait::async_trait;
use serde_json::Value;

/// A single row as returned by the backend
pub type Row = serde_json::Map<String, Value>;

/// Generic row-store protocol over named tables
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &str;

    /// Read rows from `table` matching `query`
    async fn select(&self, table: &str, query: &SelectQuery) -> BackendResult<Vec<Row>>;

    /// Delete rows where `column` equals `value`, returning the removed rows
    async fn delete_eq(&self, table: &str, column: &str, value: &Value) -> BackendResult<Vec<Row>>;
}
