//! Table Resolver
//!
//! Maps a logical resource name to a physical table without touching the
//! network. Priority: hard mapping, then cached mapping, then the ordered
//! alias list for the prober.

use crate::cache::CacheStore;
use crate::config::ResolverConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// Where a resolved table name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOrigin {
    Hard,
    Cached,
}

/// Outcome of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A single known table
    Mapped { table: String, origin: MappingOrigin },
    /// Candidates to probe, in priority order
    Probe(Vec<String>),
}

/// Pure lookup over static mappings and the cache store
pub struct TableResolver {
    hard_mappings: HashMap<String, String>,
    aliases: HashMap<String, Vec<String>>,
    cache: Arc<CacheStore>,
}

impl TableResolver {
    pub fn new(config: &ResolverConfig, cache: Arc<CacheStore>) -> Self {
        Self {
            hard_mappings: config.hard_mappings.clone(),
            aliases: config.aliases.clone(),
            cache,
        }
    }

    pub fn resolve(&self, resource: &str) -> Resolution {
        if let Some(table) = self.hard_mappings.get(resource) {
            return Resolution::Mapped {
                table: table.clone(),
                origin: MappingOrigin::Hard,
            };
        }

        match self.cache.mapping(resource) {
            Ok(Some(table)) => {
                return Resolution::Mapped {
                    table,
                    origin: MappingOrigin::Cached,
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(resource, error = %e, "Table map unavailable, probing"),
        }

        Resolution::Probe(self.aliases(resource))
    }

    /// Alias list for a resource; unknown resources map to themselves
    pub fn aliases(&self, resource: &str) -> Vec<String> {
        self.aliases
            .get(resource)
            .filter(|list| !list.is_empty())
            .cloned()
            .unwrap_or_else(|| vec![resource.to_string()])
    }

    /// Every candidate for a resource: hard mapping first, then aliases
    pub fn candidates(&self, resource: &str) -> Vec<String> {
        let mut candidates: Vec<String> =
            self.hard_mappings.get(resource).cloned().into_iter().collect();
        for alias in self.aliases(resource) {
            if !candidates.contains(&alias) {
                candidates.push(alias);
            }
        }
        candidates
    }
}
