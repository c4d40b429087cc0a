//! Typed view over the key/value backend
//!
//! Keys:
//! - `blogdesk_table_map`: JSON object, logical resource → physical table
//! - `blogdesk_snapshot_<resource>`: JSON array, last full live read of that resource
//! - `blogdesk_last_sync`: RFC 3339 timestamp of the last successful check
//!
//! Unreadable values are logged and treated as absent.

use super::{CacheResult, KeyValueStore};
use crate::backend::Row;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const SNAPSHOT_PREFIX: &str = "blogdesk_snapshot_";
const TABLE_MAP_KEY: &str = "blogdesk_table_map";
const LAST_SYNC_KEY: &str = "blogdesk_last_sync";

/// Last-known-good table mappings and result snapshots
#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Ephemeral store backed by a HashMap
    pub fn in_memory() -> Self {
        Self::new(Arc::new(super::MemoryStore::new()))
    }

    // ==================== Table Mappings ====================

    /// All cached logical → physical mappings
    pub fn table_map(&self) -> CacheResult<HashMap<String, String>> {
        let Some(raw) = self.kv.get(TABLE_MAP_KEY)? else {
            return Ok(HashMap::new());
        };

        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable table map");
                Ok(HashMap::new())
            }
        }
    }

    /// Cached physical table for a logical resource
    pub fn mapping(&self, resource: &str) -> CacheResult<Option<String>> {
        Ok(self.table_map()?.remove(resource))
    }

    /// Record a mapping; returns true if it changed
    pub fn set_mapping(&self, resource: &str, table: &str) -> CacheResult<bool> {
        let mut map = self.table_map()?;
        if map.get(resource).map(String::as_str) == Some(table) {
            return Ok(false);
        }

        map.insert(resource.to_string(), table.to_string());
        self.kv.set(TABLE_MAP_KEY, &serde_json::to_string(&map)?)?;
        Ok(true)
    }

    /// Forget a mapping; returns true if one existed
    pub fn clear_mapping(&self, resource: &str) -> CacheResult<bool> {
        let mut map = self.table_map()?;
        if map.remove(resource).is_none() {
            return Ok(false);
        }

        if map.is_empty() {
            self.kv.remove(TABLE_MAP_KEY)?;
        } else {
            self.kv.set(TABLE_MAP_KEY, &serde_json::to_string(&map)?)?;
        }
        Ok(true)
    }

    // ==================== Snapshots ====================

    /// Last live result stored for a resource
    pub fn snapshot(&self, resource: &str) -> CacheResult<Option<Vec<Row>>> {
        let Some(raw) = self.kv.get(&snapshot_key(resource))? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(rows) => Ok(Some(rows)),
            Err(e) => {
                tracing::warn!(resource, error = %e, "Discarding unreadable snapshot");
                Ok(None)
            }
        }
    }

    pub fn save_snapshot(&self, resource: &str, rows: &[Row]) -> CacheResult<()> {
        self.kv
            .set(&snapshot_key(resource), &serde_json::to_string(rows)?)
    }

    /// Drop rows matching `column == value` from a snapshot; returns how many
    pub fn remove_from_snapshot(
        &self,
        resource: &str,
        column: &str,
        value: &Value,
    ) -> CacheResult<usize> {
        let Some(rows) = self.snapshot(resource)? else {
            return Ok(0);
        };

        let before = rows.len();
        let filter = crate::backend::SelectQuery::new().eq(column, value.clone());
        let kept: Vec<Row> = rows.into_iter().filter(|row| !filter.matches(row)).collect();
        let removed = before - kept.len();

        if removed > 0 {
            self.save_snapshot(resource, &kept)?;
        }
        Ok(removed)
    }

    // ==================== Sync Timestamp ====================

    pub fn last_sync(&self) -> CacheResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.kv.get(LAST_SYNC_KEY)? else {
            return Ok(None);
        };

        match DateTime::parse_from_rfc3339(&raw) {
            Ok(dt) => Ok(Some(dt.with_timezone(&Utc))),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable sync timestamp");
                Ok(None)
            }
        }
    }

    pub fn mark_synced(&self, at: DateTime<Utc>) -> CacheResult<()> {
        self.kv.set(LAST_SYNC_KEY, &at.to_rfc3339())
    }
}

fn snapshot_key(resource: &str) -> String {
    format!("{}{}", SNAPSHOT_PREFIX, resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, SqliteStore};
    use serde_json::json;
    use tempfile::tempdir;

    fn row(value: Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_mapping_lifecycle() {
        let cache = CacheStore::in_memory();
        assert_eq!(cache.mapping("posts").unwrap(), None);

        assert!(cache.set_mapping("posts", "articles").unwrap());
        assert!(!cache.set_mapping("posts", "articles").unwrap());
        assert_eq!(cache.mapping("posts").unwrap().as_deref(), Some("articles"));

        assert!(cache.set_mapping("posts", "post").unwrap());
        assert_eq!(cache.mapping("posts").unwrap().as_deref(), Some("post"));

        assert!(cache.clear_mapping("posts").unwrap());
        assert!(!cache.clear_mapping("posts").unwrap());
        assert_eq!(cache.mapping("posts").unwrap(), None);
    }

    #[test]
    fn test_last_mapping_cleared_removes_key() {
        let kv = Arc::new(MemoryStore::new());
        let cache = CacheStore::new(kv.clone());
        cache.set_mapping("posts", "articles").unwrap();
        cache.set_mapping("users", "profiles").unwrap();

        cache.clear_mapping("posts").unwrap();
        assert!(kv.get(TABLE_MAP_KEY).unwrap().is_some());

        cache.clear_mapping("users").unwrap();
        assert_eq!(kv.get(TABLE_MAP_KEY).unwrap(), None);
        assert!(cache.table_map().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_keys_do_not_collide() {
        let cache = CacheStore::in_memory();
        let now = Utc::now();
        cache.set_mapping("posts", "articles").unwrap();
        cache.mark_synced(now).unwrap();

        let rows = vec![row(json!({"id": 1}))];
        cache.save_snapshot("table_map", &rows).unwrap();
        cache.save_snapshot("last_sync", &rows).unwrap();

        assert_eq!(cache.mapping("posts").unwrap().as_deref(), Some("articles"));
        assert_eq!(
            cache.last_sync().unwrap().map(|t| t.timestamp_millis()),
            Some(now.timestamp_millis())
        );
        assert_eq!(cache.snapshot("table_map").unwrap(), Some(rows));

        cache.clear_mapping("posts").unwrap();
        assert!(cache.snapshot("table_map").unwrap().is_some());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let cache = CacheStore::in_memory();
        assert!(cache.snapshot("posts").unwrap().is_none());

        let rows = vec![row(json!({"id": 1, "title": "hello"}))];
        cache.save_snapshot("posts", &rows).unwrap();
        assert_eq!(cache.snapshot("posts").unwrap(), Some(rows));

        cache.save_snapshot("comments", &[]).unwrap();
        assert_eq!(cache.snapshot("comments").unwrap(), Some(vec![]));
    }

    #[test]
    fn test_corrupt_values_are_absent() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("blogdesk_snapshot_posts", "{not json").unwrap();
        kv.set("blogdesk_table_map", "[1,2]").unwrap();
        kv.set("blogdesk_last_sync", "yesterday").unwrap();

        let cache = CacheStore::new(kv);
        assert!(cache.snapshot("posts").unwrap().is_none());
        assert!(cache.table_map().unwrap().is_empty());
        assert!(cache.last_sync().unwrap().is_none());
    }

    #[test]
    fn test_remove_from_snapshot() {
        let cache = CacheStore::in_memory();
        let rows = vec![
            row(json!({"id": "c1", "content": "a"})),
            row(json!({"id": "c2", "content": "b"})),
        ];
        cache.save_snapshot("comments", &rows).unwrap();

        assert_eq!(
            cache
                .remove_from_snapshot("comments", "id", &json!("c1"))
                .unwrap(),
            1
        );
        assert_eq!(cache.snapshot("comments").unwrap().unwrap().len(), 1);
        assert_eq!(
            cache
                .remove_from_snapshot("posts", "id", &json!("c1"))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let now = Utc::now();

        {
            let cache = CacheStore::new(Arc::new(SqliteStore::open(&path).unwrap()));
            cache.set_mapping("posts", "articles").unwrap();
            cache.mark_synced(now).unwrap();
        }

        let cache = CacheStore::new(Arc::new(SqliteStore::open(&path).unwrap()));
        assert_eq!(cache.mapping("posts").unwrap().as_deref(), Some("articles"));
        assert_eq!(
            cache.last_sync().unwrap().map(|t| t.timestamp_millis()),
            Some(now.timestamp_millis())
        );
    }
}
