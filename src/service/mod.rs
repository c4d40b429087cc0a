//! Data Service
//!
//! The single read entry point for console code. A fetch walks down the
//! source tiers until one produces data:
//!
//! ```text
//! fetch("posts")
//!   connected? ── yes ─→ resolve table → read → snapshot → Live
//!        │                      │ fails
//!        no ←───────────────────┘
//!        ↓
//!   cached snapshot? → Cached
//!   sample data?     → Sample
//!   otherwise        → None + NoDataAvailable
//! ```
//!
//! Only network and credential failures mark the backend offline. A
//! missing table or a policy denial means the service is up and the
//! schema is not what we expected.

mod aggregate;
mod error;
mod result;
mod samples;

pub use aggregate::{
    count_created_since, start_of_local_day, Activity, ActivityKind, CountResult, DashboardStats,
    DataSources,
};
pub use error::{ServiceError, ServiceResult};
pub use result::{FetchError, FetchOptions, FetchResult, Outcome, Source, DEFAULT_LIMIT};
pub use samples::SampleData;

use crate::backend::{BackendError, BackendResult, RestClient, Row, RowStore, SelectQuery};
use crate::cache::{CacheStore, KeyValueStore, MemoryStore, SqliteStore};
use crate::config::{Config, ResolverConfig};
use crate::resolver::{
    ConnectivityProber, MappingOrigin, ProbeMode, ProbeOutcome, ProbeReport, Resolution,
    TableResolver,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Session-wide backend connection state
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// The connectivity probe has run this session
    pub tested: bool,
    pub checked_at: Option<Instant>,
}

impl ConnectionStatus {
    /// Whether the memoized verdict can be reused
    fn is_fresh(&self, offline_recheck: Duration) -> bool {
        if !self.tested {
            return false;
        }
        self.connected
            || self
                .checked_at
                .is_some_and(|at| at.elapsed() < offline_recheck)
    }
}

/// Snapshot of the connection state for consumers
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub connected: bool,
    pub tested: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

/// Resilient data access over the hosted row store
///
/// Construct once per process and share through `Arc`.
pub struct DataService {
    store: Arc<dyn RowStore>,
    cache: Arc<CacheStore>,
    resolver: TableResolver,
    prober: ConnectivityProber,
    samples: SampleData,
    status: RwLock<ConnectionStatus>,
    probe_tables: Vec<String>,
    reachable_is_connected: bool,
    offline_recheck: Duration,
}

impl DataService {
    pub fn new(store: Arc<dyn RowStore>, cache: Arc<CacheStore>, config: &ResolverConfig) -> Self {
        Self {
            resolver: TableResolver::new(config, Arc::clone(&cache)),
            prober: ConnectivityProber::new(
                Arc::clone(&store),
                Arc::clone(&cache),
                config.probe_timeout(),
            ),
            store,
            cache,
            samples: SampleData::default(),
            status: RwLock::new(ConnectionStatus::default()),
            probe_tables: config.probe_tables.clone(),
            reachable_is_connected: config.reachable_is_connected,
            offline_recheck: config.offline_recheck(),
        }
    }

    /// Build the REST client and cache store described by `config`
    pub fn from_config(config: &Config) -> ServiceResult<Self> {
        if !config.backend.is_configured() {
            tracing::warn!("Backend URL or anon key not configured, running on local data only");
        }

        let store: Arc<dyn RowStore> = Arc::new(RestClient::new(config.backend.clone())?);

        let kv: Arc<dyn KeyValueStore> = if config.cache.in_memory {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(SqliteStore::open(&config.cache.resolved_path())?)
        };

        Ok(Self::new(
            store,
            Arc::new(CacheStore::new(kv)),
            &config.resolver,
        ))
    }

    /// Replace the sample data set
    pub fn with_samples(mut self, samples: SampleData) -> Self {
        self.samples = samples;
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    // ==================== Connection Status ====================

    /// Memoized connectivity check
    ///
    /// Runs the probe batch at most once per session while connected.
    /// An offline verdict is re-checked after `offline_recheck`.
    pub async fn check_connection(&self) -> bool {
        {
            let status = self.status.read().await;
            if status.is_fresh(self.offline_recheck) {
                return status.connected;
            }
        }

        tracing::info!(backend = self.store.name(), "Testing backend connection");
        let report = self
            .prober
            .probe(&self.probe_tables, ProbeMode::Connectivity)
            .await;

        let connected = match &report.outcome {
            ProbeOutcome::Resolved { table } => {
                tracing::info!(table = %table, "Backend connection ok");
                true
            }
            ProbeOutcome::ReachableUnresolved { last_error } => {
                tracing::info!(
                    error = %last_error,
                    counted_as_connected = self.reachable_is_connected,
                    "Backend reachable, but tables or policies do not match"
                );
                self.reachable_is_connected
            }
            ProbeOutcome::Offline { reason } => {
                tracing::warn!(reason = %reason, "Backend unreachable, using local data");
                false
            }
        };

        if connected {
            if let Err(e) = self.cache.mark_synced(Utc::now()) {
                tracing::warn!(error = %e, "Failed to record sync time");
            }
        }

        *self.status.write().await = ConnectionStatus {
            connected,
            tested: true,
            checked_at: Some(Instant::now()),
        };

        connected
    }

    /// Forget the memoized verdict so the next call re-probes
    pub async fn invalidate_connection(&self) {
        *self.status.write().await = ConnectionStatus::default();
    }

    async fn mark_offline(&self) {
        *self.status.write().await = ConnectionStatus {
            connected: false,
            tested: true,
            checked_at: Some(Instant::now()),
        };
    }

    pub async fn connection_status(&self) -> ConnectionStatus {
        self.status.read().await.clone()
    }

    /// Current state without triggering a probe
    pub async fn system_status(&self) -> SystemStatus {
        let status = self.connection_status().await;
        let last_sync = self.cache.last_sync().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read sync time");
            None
        });

        SystemStatus {
            connected: status.connected,
            tested: status.tested,
            last_sync,
            timestamp: Utc::now(),
        }
    }

    // ==================== Reads ====================

    /// Read a logical resource, degrading through the source tiers
    ///
    /// Never fails: the worst case is `Source::None` with an error attached.
    pub async fn fetch(&self, resource: &str, options: &FetchOptions) -> FetchResult {
        let query = options.to_query();

        if self.check_connection().await {
            match self.fetch_live(resource, &query).await {
                Ok(rows) => {
                    tracing::debug!(resource, rows = rows.len(), "Fetched live data");
                    return FetchResult::live(rows);
                }
                Err(e) => {
                    tracing::warn!(resource, error = %e, "Live fetch failed, falling back");
                    if e.is_unreachable() {
                        self.mark_offline().await;
                    }
                }
            }
        }

        self.fetch_local(resource, &query, options)
    }

    async fn fetch_live(&self, resource: &str, query: &SelectQuery) -> BackendResult<Vec<Row>> {
        let (candidates, origin) = match self.resolver.resolve(resource) {
            Resolution::Mapped {
                table,
                origin: MappingOrigin::Hard,
            } => (vec![table], Some(MappingOrigin::Hard)),
            Resolution::Mapped {
                table,
                origin: MappingOrigin::Cached,
            } => {
                let mut candidates = vec![table.clone()];
                candidates.extend(
                    self.resolver
                        .aliases(resource)
                        .into_iter()
                        .filter(|alias| *alias != table),
                );
                (candidates, Some(MappingOrigin::Cached))
            }
            Resolution::Probe(candidates) => (candidates, None),
        };

        let mut last_error = None;

        for (position, table) in candidates.iter().enumerate() {
            match self.store.select(table, query).await {
                Ok(rows) => {
                    if origin != Some(MappingOrigin::Hard) {
                        self.remember_mapping(resource, table);
                    }
                    if is_full_read(query) {
                        if let Err(e) = self.cache.save_snapshot(resource, &rows) {
                            tracing::warn!(resource, error = %e, "Failed to save snapshot");
                        }
                    }
                    return Ok(rows);
                }
                Err(e) if e.is_unreachable() => return Err(e),
                Err(e) => {
                    tracing::debug!(resource, table = %table, error = %e, "Candidate table failed");
                    if position == 0 && origin == Some(MappingOrigin::Cached) {
                        self.forget_mapping(resource, table);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| BackendError::MissingRelation {
            code: None,
            message: format!("no candidate tables for {}", resource),
        }))
    }

    fn fetch_local(&self, resource: &str, query: &SelectQuery, options: &FetchOptions) -> FetchResult {
        match self.cache.snapshot(resource) {
            Ok(Some(rows)) => {
                tracing::info!(resource, "Serving cached snapshot");
                return FetchResult::cached(query.apply_local(rows));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(resource, error = %e, "Failed to read snapshot"),
        }

        if let Some(rows) = self.samples.rows(resource).or_else(|| options.fallback.clone()) {
            tracing::info!(resource, "Serving sample data");
            return FetchResult::sample(query.apply_local(rows));
        }

        tracing::warn!(resource, "No data available from any source");
        FetchResult::none(resource)
    }

    fn remember_mapping(&self, resource: &str, table: &str) {
        match self.cache.set_mapping(resource, table) {
            Ok(true) => tracing::info!(resource, table, "Cached table mapping"),
            Ok(false) => {}
            Err(e) => tracing::warn!(resource, error = %e, "Failed to cache table mapping"),
        }
    }

    fn forget_mapping(&self, resource: &str, table: &str) {
        match self.cache.clear_mapping(resource) {
            Ok(_) => tracing::info!(resource, table, "Cached table mapping stopped working"),
            Err(e) => tracing::warn!(resource, error = %e, "Failed to clear table mapping"),
        }
    }

    // ==================== Diagnostics & Mutations ====================

    /// Probe every candidate table for a resource, caching the winner
    pub async fn probe(&self, resource: &str) -> ProbeReport {
        let candidates = self.resolver.candidates(resource);
        self.prober.probe_resource(resource, &candidates).await
    }

    /// Delete rows by key with the elevated credential
    ///
    /// Mutations do not degrade: failures are returned to the caller.
    pub async fn delete(&self, resource: &str, column: &str, key: &Value) -> ServiceResult<Vec<Row>> {
        let table = match self.resolver.resolve(resource) {
            Resolution::Mapped { table, .. } => table,
            Resolution::Probe(candidates) => {
                let report = self.prober.probe_resource(resource, &candidates).await;
                match report.outcome {
                    ProbeOutcome::Resolved { table } => table,
                    ProbeOutcome::ReachableUnresolved { last_error: reason }
                    | ProbeOutcome::Offline { reason } => {
                        return Err(ServiceError::Unresolved {
                            resource: resource.to_string(),
                            reason,
                        })
                    }
                }
            }
        };

        let removed = match self.store.delete_eq(&table, column, key).await {
            Ok(rows) => rows,
            Err(e) => {
                if e.is_unreachable() {
                    self.mark_offline().await;
                }
                return Err(e.into());
            }
        };

        tracing::info!(resource, table = %table, removed = removed.len(), "Deleted rows");

        if let Err(e) = self.cache.remove_from_snapshot(resource, column, key) {
            tracing::warn!(resource, error = %e, "Failed to update snapshot after delete");
        }

        Ok(removed)
    }
}

/// Only unfiltered, all-column reads at the default size replace a snapshot
fn is_full_read(query: &SelectQuery) -> bool {
    query.columns.trim() == "*"
        && query.filters.is_empty()
        && query.limit.map_or(true, |limit| limit >= DEFAULT_LIMIT)
}
