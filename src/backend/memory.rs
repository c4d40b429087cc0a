//! In-memory row store used by unit tests
//!
//! Simulates the failure modes of the hosted backend: missing tables,
//! policy denial, network outage, rejected credentials and latency.

use super::{BackendError, BackendResult, Row, RowStore, SelectQuery};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Availability {
    Online,
    NetworkDown,
    BadCredentials,
}

pub(crate) struct InMemoryRowStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    denied: Mutex<HashSet<String>>,
    availability: Mutex<Availability>,
    latency: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryRowStore {
    pub(crate) fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            denied: Mutex::new(HashSet::new()),
            availability: Mutex::new(Availability::Online),
            latency: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Add a table; `rows` must be a JSON array of objects
    pub(crate) fn with_table(self, name: &str, rows: Value) -> Self {
        self.put_table(name, rows);
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub(crate) fn put_table(&self, name: &str, rows: Value) {
        let rows = rows
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default();
        self.tables.lock().unwrap().insert(name.to_string(), rows);
    }

    pub(crate) fn drop_table(&self, name: &str) {
        self.tables.lock().unwrap().remove(name);
    }

    pub(crate) fn deny(&self, name: &str) {
        self.denied.lock().unwrap().insert(name.to_string());
    }

    pub(crate) fn set_availability(&self, availability: Availability) {
        *self.availability.lock().unwrap() = availability;
    }

    /// Tables touched so far, in call order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn check_access(&self, table: &str) -> BackendResult<()> {
        match *self.availability.lock().unwrap() {
            Availability::NetworkDown => {
                return Err(BackendError::Network("TypeError: Failed to fetch".to_string()))
            }
            Availability::BadCredentials => {
                return Err(BackendError::Auth {
                    status: 401,
                    message: "Invalid API key".to_string(),
                })
            }
            Availability::Online => {}
        }

        if self.denied.lock().unwrap().contains(table) {
            return Err(BackendError::Denied {
                code: Some("42501".to_string()),
                message: format!("permission denied for table {}", table),
            });
        }

        if !self.tables.lock().unwrap().contains_key(table) {
            return Err(BackendError::MissingRelation {
                code: Some("42P01".to_string()),
                message: format!("relation \"public.{}\" does not exist", table),
            });
        }

        Ok(())
    }

    async fn enter(&self, table: &str) -> BackendResult<()> {
        self.calls.lock().unwrap().push(table.to_string());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.check_access(table)
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn select(&self, table: &str, query: &SelectQuery) -> BackendResult<Vec<Row>> {
        self.enter(table).await?;
        let rows = self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default();
        Ok(query.apply_local(rows))
    }

    async fn delete_eq(&self, table: &str, column: &str, value: &Value) -> BackendResult<Vec<Row>> {
        self.enter(table).await?;
        let filter = SelectQuery::new().eq(column, value.clone());
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let (removed, kept): (Vec<Row>, Vec<Row>) =
            rows.drain(..).partition(|row| filter.matches(row));
        *rows = kept;
        Ok(removed)
    }
}
