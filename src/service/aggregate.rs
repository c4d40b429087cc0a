//! Dashboard aggregations derived from fetches
//!
//! Counts are the length of a capped read, not a server-side count. Every
//! aggregation inherits the degradation of the fetches under it.

use super::{DataService, FetchOptions, Source};
use crate::backend::{OrderBy, Row};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

/// Read cap used for counting
const COUNT_LIMIT: usize = 1000;
const ACTIVITY_PER_RESOURCE: usize = 5;
const ACTIVITY_LIMIT: usize = 4;
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountResult {
    pub count: usize,
    pub source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Post,
    Comment,
    System,
}

/// One entry of the recent activity feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub description: String,
    pub time: DateTime<Utc>,
    pub source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataSources {
    pub posts: Source,
    pub comments: Source,
    pub users: Source,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_posts: usize,
    pub total_comments: usize,
    pub total_users: usize,
    pub today_users: usize,
    pub data_source: DataSources,
}

impl DataService {
    pub async fn count(&self, resource: &str) -> CountResult {
        let options = FetchOptions::new().limit(COUNT_LIMIT);
        let result = self.fetch(resource, &options).await;
        CountResult {
            count: result.len(),
            source: result.source,
        }
    }

    /// Users created since the start of the local day containing `now`
    pub async fn today_new_users(&self, now: DateTime<Local>) -> usize {
        let options = FetchOptions::new()
            .select("id,created_at")
            .limit(COUNT_LIMIT);
        let result = self.fetch("users", &options).await;
        if result.source == Source::None {
            return 0;
        }

        count_created_since(&result.data, start_of_local_day(now))
    }

    /// Newest posts and comments, merged and capped
    pub async fn recent_activity(&self) -> Vec<Activity> {
        let mut activities = Vec::new();

        let posts = self
            .fetch(
                "posts",
                &FetchOptions::new()
                    .select("id,title,created_at")
                    .order_by(OrderBy::desc("created_at"))
                    .limit(ACTIVITY_PER_RESOURCE),
            )
            .await;
        activities.extend(posts.data.iter().filter_map(|row| {
            let title = text_field(row, "title").unwrap_or("Untitled");
            activity(row, ActivityKind::Post, format!("New post: {}", title), posts.source)
        }));

        let comments = self
            .fetch(
                "comments",
                &FetchOptions::new()
                    .select("id,content,created_at")
                    .order_by(OrderBy::desc("created_at"))
                    .limit(ACTIVITY_PER_RESOURCE),
            )
            .await;
        activities.extend(comments.data.iter().filter_map(|row| {
            let content = text_field(row, "content").unwrap_or_default();
            activity(
                row,
                ActivityKind::Comment,
                format!("New comment: {}", preview(content)),
                comments.source,
            )
        }));

        activities.sort_by(|a, b| b.time.cmp(&a.time));
        activities.truncate(ACTIVITY_LIMIT);

        if activities.is_empty() {
            activities.push(Activity {
                kind: ActivityKind::System,
                description: "System initialized".to_string(),
                time: Utc::now(),
                source: Source::Sample,
            });
        }

        activities
    }

    /// Headline numbers for the dashboard
    pub async fn stats(&self) -> DashboardStats {
        let posts = self.count("posts").await;
        let comments = self.count("comments").await;
        let users = self.count("users").await;
        let today_users = self.today_new_users(Local::now()).await;

        tracing::debug!(
            posts = posts.count,
            comments = comments.count,
            users = users.count,
            today_users,
            "Computed dashboard stats"
        );

        DashboardStats {
            total_posts: posts.count,
            total_comments: comments.count,
            total_users: users.count,
            today_users,
            data_source: DataSources {
                posts: posts.source,
                comments: comments.source,
                users: users.source,
            },
        }
    }
}

/// Midnight of the local day containing `now`
pub fn start_of_local_day(now: DateTime<Local>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

/// Rows whose `created_at` is at or after `since`
///
/// Missing or unparseable timestamps never count.
pub fn count_created_since(rows: &[Row], since: DateTime<Utc>) -> usize {
    rows.iter()
        .filter_map(|row| row.get("created_at").and_then(parse_timestamp))
        .filter(|created| *created >= since)
        .count()
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            // Zone-less timestamps are local time
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .and_then(|naive| Local.from_local_datetime(&naive).earliest())
                .map(|dt| dt.with_timezone(&Utc))
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn activity(row: &Row, kind: ActivityKind, description: String, source: Source) -> Option<Activity> {
    let time = row.get("created_at").and_then(parse_timestamp)?;
    Some(Activity {
        kind,
        description,
        time,
        source,
    })
}

fn text_field<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    let cut: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{Availability, InMemoryRowStore};
    use crate::cache::CacheStore;
    use crate::config::ResolverConfig;
    use crate::service::SampleData;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Arc;

    fn service(store: InMemoryRowStore) -> DataService {
        DataService::new(
            Arc::new(store),
            Arc::new(CacheStore::in_memory()),
            &ResolverConfig::default(),
        )
    }

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).earliest().unwrap()
    }

    fn row(value: Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_count_created_since_skips_bad_timestamps() {
        let since = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let rows = vec![
            row(json!({"id": 1, "created_at": "2024-03-10T08:00:00Z"})),
            row(json!({"id": 2, "created_at": "2024-03-09T23:59:59Z"})),
            row(json!({"id": 3, "created_at": "not a date"})),
            row(json!({"id": 4})),
            row(json!({"id": 5, "created_at": since.timestamp_millis()})),
        ];
        assert_eq!(count_created_since(&rows, since), 2);
    }

    #[test]
    fn test_start_of_local_day() {
        let now = local(2024, 6, 12, 15);
        assert_eq!(start_of_local_day(now), local(2024, 6, 12, 0).with_timezone(&Utc));
    }

    #[tokio::test]
    async fn test_today_new_users_counts_only_today() {
        let now = local(2024, 6, 12, 15);
        let store = InMemoryRowStore::new().with_table(
            "user_profiles",
            json!([
                {"id": "a", "created_at": (now - Duration::hours(2)).to_rfc3339()},
                {"id": "b", "created_at": (now - Duration::hours(16)).to_rfc3339()},
                {"id": "c", "created_at": (now - Duration::days(2)).to_rfc3339()},
                {"id": "d", "created_at": null},
            ]),
        );
        let service = service(store);

        assert_eq!(service.today_new_users(now).await, 1);
    }

    #[tokio::test]
    async fn test_today_new_users_zero_without_data() {
        let store = InMemoryRowStore::new();
        store.set_availability(Availability::NetworkDown);
        let service = service(store).with_samples(SampleData::empty());

        assert_eq!(service.today_new_users(Local::now()).await, 0);
    }

    #[tokio::test]
    async fn test_count_reports_source() {
        let store = InMemoryRowStore::new()
            .with_table("posts", json!([{"id": 1}, {"id": 2}]))
            .with_table("post_comments", json!([]))
            .with_table("user_profiles", json!([{"id": "u"}]));
        let service = service(store);

        assert_eq!(
            service.count("posts").await,
            CountResult {
                count: 2,
                source: Source::Live
            }
        );
    }

    #[tokio::test]
    async fn test_recent_activity_merges_and_truncates() {
        let store = InMemoryRowStore::new()
            .with_table(
                "posts",
                json!([
                    {"id": 1, "title": "Oldest", "created_at": "2024-03-01T10:00:00Z"},
                    {"id": 2, "title": "Newer", "created_at": "2024-03-05T10:00:00Z"},
                    {"id": 3, "title": "Newest", "created_at": "2024-03-07T10:00:00Z"},
                ]),
            )
            .with_table(
                "post_comments",
                json!([
                    {"id": "c1", "content": "short", "created_at": "2024-03-06T10:00:00Z"},
                    {"id": "c2", "content": "x".repeat(80), "created_at": "2024-03-04T10:00:00Z"},
                ]),
            );
        let service = service(store);

        let feed = service.recent_activity().await;
        assert_eq!(feed.len(), 4);
        assert_eq!(feed[0].description, "New post: Newest");
        assert_eq!(feed[1].kind, ActivityKind::Comment);
        assert_eq!(feed[2].description, "New post: Newer");
        assert!(feed[3].description.ends_with("..."));
        assert!(feed.iter().all(|a| a.source == Source::Live));
    }

    #[tokio::test]
    async fn test_recent_activity_placeholder() {
        let store = InMemoryRowStore::new();
        store.set_availability(Availability::NetworkDown);
        let service = service(store).with_samples(SampleData::empty());

        let feed = service.recent_activity().await;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, ActivityKind::System);
        assert_eq!(feed[0].source, Source::Sample);
    }

    #[tokio::test]
    async fn test_stats_offline_uses_samples() {
        let store = InMemoryRowStore::new();
        store.set_availability(Availability::NetworkDown);
        let service = service(store);

        let stats = service.stats().await;
        assert_eq!(stats.total_posts, 2);
        assert_eq!(stats.total_comments, 2);
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.data_source.users, Source::Sample);
    }

    #[tokio::test]
    async fn test_dashboard_reads_keep_full_snapshots() {
        let posts: Vec<Value> = (1..=10)
            .map(|i| {
                json!({
                    "id": i,
                    "title": format!("Post {}", i),
                    "content": "body",
                    "created_at": format!("2024-03-{:02}T10:00:00Z", i),
                })
            })
            .collect();
        let store = Arc::new(
            InMemoryRowStore::new()
                .with_table("posts", Value::Array(posts))
                .with_table(
                    "post_comments",
                    json!([{"id": "c1", "content": "hi", "created_at": "2024-03-02T10:00:00Z"}]),
                )
                .with_table(
                    "user_profiles",
                    json!([{"id": "u1", "username": "ana", "email": "ana@example.com", "created_at": "2024-03-01T10:00:00Z"}]),
                ),
        );
        let service = DataService::new(
            store.clone(),
            Arc::new(CacheStore::in_memory()),
            &ResolverConfig::default(),
        );

        assert_eq!(service.stats().await.total_posts, 10);
        assert_eq!(service.recent_activity().await.len(), ACTIVITY_LIMIT);

        store.set_availability(Availability::NetworkDown);

        let users = service.fetch("users", &FetchOptions::new()).await;
        assert_eq!(users.source, Source::Cached);
        assert_eq!(users.data[0]["username"], "ana");

        let posts = service.fetch("posts", &FetchOptions::new()).await;
        assert_eq!(posts.source, Source::Cached);
        assert_eq!(posts.len(), 10);
        assert_eq!(posts.data[0]["content"], "body");
    }
}
