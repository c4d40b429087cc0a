//! Connectivity Prober
//!
//! Walks an ordered candidate list with minimal reads (`select id limit 1`)
//! until one answers. Candidates are checked strictly one after another;
//! the first decisive attempt ends the walk and nothing after it is sent.
//!
//! ```text
//! posts    → 42P01 relation does not exist   (reachable, keep going)
//! articles → 200 OK                          (resolved, stop)
//! post     → never sent
//! ```
//!
//! The whole batch shares one timeout. When it expires the pending request
//! is dropped and the batch counts as offline.

use crate::backend::{BackendError, FailureClass, RowStore, SelectQuery};
use crate::cache::CacheStore;
use futures_util::{pin_mut, stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a reachable-but-failing candidate is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    /// Any answer from the service ends the walk
    Connectivity,
    /// Only a working table ends the walk
    Resolve,
}

/// Result of checking one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "error", rename_all = "snake_case")]
pub enum AttemptResult {
    Found,
    Reachable(String),
    Unreachable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeAttempt {
    pub candidate: String,
    #[serde(flatten)]
    pub result: AttemptResult,
}

impl ProbeAttempt {
    fn ends_walk(&self, mode: ProbeMode) -> bool {
        match (&self.result, mode) {
            (AttemptResult::Found, _) => true,
            (AttemptResult::Reachable(_), ProbeMode::Connectivity) => true,
            _ => false,
        }
    }
}

/// Overall verdict of a probe batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// A candidate answered successfully
    Resolved { table: String },
    /// The service answered, but no candidate worked
    ReachableUnresolved { last_error: String },
    /// Nothing usable came back
    Offline { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub outcome: ProbeOutcome,
    pub attempts: Vec<ProbeAttempt>,
    pub elapsed_ms: u64,
}

impl ProbeReport {
    fn from_attempts(attempts: Vec<ProbeAttempt>, elapsed: Duration) -> Self {
        let outcome = match attempts.last() {
            Some(ProbeAttempt {
                candidate,
                result: AttemptResult::Found,
            }) => ProbeOutcome::Resolved {
                table: candidate.clone(),
            },
            _ => attempts
                .iter()
                .rev()
                .find_map(|a| match &a.result {
                    AttemptResult::Reachable(e) => Some(ProbeOutcome::ReachableUnresolved {
                        last_error: e.clone(),
                    }),
                    _ => None,
                })
                .unwrap_or_else(|| ProbeOutcome::Offline {
                    reason: attempts
                        .iter()
                        .rev()
                        .find_map(|a| match &a.result {
                            AttemptResult::Unreachable(e) => Some(e.clone()),
                            _ => None,
                        })
                        .unwrap_or_else(|| "no probe candidates".to_string()),
                }),
        };

        Self {
            outcome,
            attempts,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    fn timed_out(elapsed: Duration) -> Self {
        Self {
            outcome: ProbeOutcome::Offline {
                reason: BackendError::Timeout.to_string(),
            },
            attempts: Vec::new(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn resolved_table(&self) -> Option<&str> {
        match &self.outcome {
            ProbeOutcome::Resolved { table } => Some(table),
            _ => None,
        }
    }

    /// The service answered at all
    pub fn is_reachable(&self) -> bool {
        !matches!(self.outcome, ProbeOutcome::Offline { .. })
    }
}

/// Sequential existence checks against the row store
pub struct ConnectivityProber {
    store: Arc<dyn RowStore>,
    cache: Arc<CacheStore>,
    timeout: Duration,
}

impl ConnectivityProber {
    pub fn new(store: Arc<dyn RowStore>, cache: Arc<CacheStore>, timeout: Duration) -> Self {
        Self {
            store,
            cache,
            timeout,
        }
    }

    /// Probe candidates in order under one overall timeout
    pub async fn probe(&self, candidates: &[String], mode: ProbeMode) -> ProbeReport {
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, self.walk(candidates, mode)).await {
            Ok(attempts) => ProbeReport::from_attempts(attempts, start.elapsed()),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Probe batch timed out, treating backend as offline"
                );
                ProbeReport::timed_out(start.elapsed())
            }
        }
    }

    /// Probe a logical resource and cache the winning table
    pub async fn probe_resource(&self, resource: &str, candidates: &[String]) -> ProbeReport {
        let report = self.probe(candidates, ProbeMode::Resolve).await;

        if let Some(table) = report.resolved_table() {
            match self.cache.set_mapping(resource, table) {
                Ok(true) => tracing::info!(resource, table, "Cached table mapping"),
                Ok(false) => {}
                Err(e) => tracing::warn!(resource, error = %e, "Failed to cache table mapping"),
            }
        }

        report
    }

    async fn walk(&self, candidates: &[String], mode: ProbeMode) -> Vec<ProbeAttempt> {
        let checks = stream::iter(candidates).then(|candidate| self.check(candidate));
        pin_mut!(checks);

        let mut attempts = Vec::with_capacity(candidates.len());
        while let Some(attempt) = checks.next().await {
            let done = attempt.ends_walk(mode);
            attempts.push(attempt);
            if done {
                break;
            }
        }
        attempts
    }

    async fn check(&self, candidate: &str) -> ProbeAttempt {
        tracing::debug!(table = candidate, backend = self.store.name(), "Probing table");

        let result = match self.store.select(candidate, &SelectQuery::probe()).await {
            Ok(_) => {
                tracing::debug!(table = candidate, "Probe succeeded");
                AttemptResult::Found
            }
            Err(e) => match e.class() {
                FailureClass::Reachable => {
                    tracing::debug!(table = candidate, error = %e, "Service reachable, table unusable");
                    AttemptResult::Reachable(e.to_string())
                }
                FailureClass::Unreachable => {
                    tracing::debug!(table = candidate, error = %e, "Probe could not reach service");
                    AttemptResult::Unreachable(e.to_string())
                }
            },
        };

        ProbeAttempt {
            candidate: candidate.to_string(),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{Availability, InMemoryRowStore};
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn prober(store: Arc<InMemoryRowStore>) -> (ConnectivityProber, Arc<CacheStore>) {
        let cache = Arc::new(CacheStore::in_memory());
        (
            ConnectivityProber::new(store, Arc::clone(&cache), Duration::from_millis(500)),
            cache,
        )
    }

    #[tokio::test]
    async fn test_resolve_skips_missing_and_caches_winner() {
        let store = Arc::new(InMemoryRowStore::new().with_table("articles", json!([{"id": 1}])));
        let (prober, cache) = prober(Arc::clone(&store));

        let report = prober
            .probe_resource("posts", &names(&["posts", "articles", "post"]))
            .await;

        assert_eq!(report.resolved_table(), Some("articles"));
        assert_eq!(report.attempts.len(), 2);
        assert!(matches!(report.attempts[0].result, AttemptResult::Reachable(_)));
        assert_eq!(store.calls(), vec!["posts", "articles"]);
        assert_eq!(cache.mapping("posts").unwrap().as_deref(), Some("articles"));
    }

    #[tokio::test]
    async fn test_resolve_all_missing_is_reachable_unresolved() {
        let store = Arc::new(InMemoryRowStore::new());
        store.put_table("secret", json!([]));
        store.deny("secret");
        let (prober, cache) = prober(Arc::clone(&store));

        let report = prober
            .probe_resource("posts", &names(&["posts", "secret"]))
            .await;

        assert!(matches!(
            report.outcome,
            ProbeOutcome::ReachableUnresolved { ref last_error } if last_error.contains("permission denied")
        ));
        assert!(report.is_reachable());
        assert_eq!(cache.mapping("posts").unwrap(), None);
    }

    #[tokio::test]
    async fn test_connectivity_stops_at_first_answer() {
        let store = Arc::new(InMemoryRowStore::new().with_table("users", json!([])));
        let (prober, _cache) = prober(Arc::clone(&store));

        let report = prober
            .probe(&names(&["posts", "users"]), ProbeMode::Connectivity)
            .await;

        assert!(matches!(report.outcome, ProbeOutcome::ReachableUnresolved { .. }));
        assert_eq!(store.calls(), vec!["posts"]);
    }

    #[tokio::test]
    async fn test_invalid_credentials_are_offline() {
        let store = Arc::new(InMemoryRowStore::new().with_table("posts", json!([])));
        store.set_availability(Availability::BadCredentials);
        let (prober, _cache) = prober(Arc::clone(&store));

        let report = prober
            .probe(&names(&["posts", "articles"]), ProbeMode::Connectivity)
            .await;

        assert!(matches!(
            report.outcome,
            ProbeOutcome::Offline { ref reason } if reason.contains("Invalid API key")
        ));
        assert_eq!(report.attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_network_failure_is_offline() {
        let store = Arc::new(InMemoryRowStore::new().with_table("posts", json!([])));
        store.set_availability(Availability::NetworkDown);
        let (prober, _cache) = prober(store);

        let report = prober.probe(&names(&["posts"]), ProbeMode::Resolve).await;
        assert!(!report.is_reachable());
    }

    #[tokio::test]
    async fn test_batch_timeout_is_offline() {
        let store = Arc::new(
            InMemoryRowStore::new()
                .with_table("posts", json!([]))
                .with_latency(Duration::from_millis(300)),
        );
        let cache = Arc::new(CacheStore::in_memory());
        let prober = ConnectivityProber::new(store, cache, Duration::from_millis(50));

        let report = prober.probe(&names(&["posts"]), ProbeMode::Connectivity).await;
        assert_eq!(
            report.outcome,
            ProbeOutcome::Offline {
                reason: "Request timeout".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let (prober, _cache) = prober(Arc::new(InMemoryRowStore::new()));
        let report = prober.probe(&[], ProbeMode::Resolve).await;
        assert!(matches!(report.outcome, ProbeOutcome::Offline { .. }));
    }
}
