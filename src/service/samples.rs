//! Static sample records
//!
//! Shown only when neither the backend nor the cache has anything for a
//! resource. Timestamps are fixed when the set is built, so repeated
//! reads in one process return identical rows.

use crate::backend::Row;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Read-only sample data per logical resource
#[derive(Debug, Clone)]
pub struct SampleData {
    sets: HashMap<String, Vec<Row>>,
}

impl SampleData {
    /// Build the default sample set relative to `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        let day_ago = now - Duration::days(1);
        let hour_ago = now - Duration::hours(1);

        let posts = json!([
            {
                "id": "demo-1",
                "title": "Welcome to the blog console",
                "content": "A sample post that shows what the console can do.",
                "status": "published",
                "created_at": now.to_rfc3339(),
                "updated_at": now.to_rfc3339(),
            },
            {
                "id": "demo-2",
                "title": "Connecting the database",
                "content": "How to point the console at your hosted project.",
                "status": "published",
                "created_at": day_ago.to_rfc3339(),
                "updated_at": day_ago.to_rfc3339(),
            }
        ]);

        let comments = json!([
            {
                "id": "comment-1",
                "post_id": "demo-1",
                "content": "Works nicely!",
                "author": "Anonymous",
                "created_at": now.to_rfc3339(),
            },
            {
                "id": "comment-2",
                "post_id": "demo-1",
                "content": "Looking forward to more features.",
                "author": "Test user",
                "created_at": hour_ago.to_rfc3339(),
            }
        ]);

        let users = json!([
            {
                "id": "user-1",
                "username": "admin",
                "email": "admin@example.com",
                "role": "admin",
                "created_at": now.to_rfc3339(),
            }
        ]);

        let sets = [("posts", posts), ("comments", comments), ("users", users)]
            .into_iter()
            .map(|(resource, value)| (resource.to_string(), rows_from(value)))
            .collect();

        Self { sets }
    }

    /// No sample data for any resource
    pub fn empty() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }

    /// A copy of the sample rows for a resource
    pub fn rows(&self, resource: &str) -> Option<Vec<Row>> {
        self.sets.get(resource).cloned()
    }
}

impl Default for SampleData {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

fn rows_from(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sets() {
        let samples = SampleData::new(Utc::now());
        assert_eq!(samples.rows("posts").unwrap().len(), 2);
        assert_eq!(samples.rows("comments").unwrap().len(), 2);
        assert_eq!(samples.rows("users").unwrap()[0]["username"], "admin");
        assert!(samples.rows("tags").is_none());
        assert!(SampleData::empty().rows("posts").is_none());
    }

    #[test]
    fn test_rows_are_copies() {
        let samples = SampleData::new(Utc::now());
        let mut rows = samples.rows("users").unwrap();
        rows[0].insert("role".to_string(), json!("editor"));
        assert_eq!(samples.rows("users").unwrap()[0]["role"], "admin");
    }
}
