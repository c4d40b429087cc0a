//! # Blogdesk
//!
//! Resilient data access for a blog administration console whose storage,
//! authentication and row-level security live in a hosted row store.
//!
//! ## Features
//!
//! - **Table resolution**: logical resources (`posts`, `comments`, `users`) map to
//!   whichever physical table actually exists, found by probing ranked aliases
//! - **Failure classification**: "cannot reach the service" is kept apart from
//!   "reached it, but the table or policy did not match"
//! - **Degradation**: live data, then the last cached snapshot, then sample data,
//!   with every result tagged by where it came from
//! - **Dashboard**: counts, today's new users and a recent activity feed
//!
//! ## Modules
//!
//! - [`backend`]: Row store protocol and its REST client
//! - [`cache`]: Local persistence for table mappings and snapshots
//! - [`resolver`]: Table resolution and connectivity probing
//! - [`service`]: The fetch facade and dashboard aggregations
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blogdesk::config::Config;
//! use blogdesk::service::{DataService, FetchOptions};
//! use blogdesk::backend::OrderBy;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let service = DataService::from_config(&config)?;
//!
//!     let options = FetchOptions::new()
//!         .eq("status", "published")
//!         .order_by(OrderBy::desc("created_at"))
//!         .limit(10);
//!     let posts = service.fetch("posts", &options).await;
//!
//!     println!("{} posts ({})", posts.len(), posts.source);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod logging;
pub mod resolver;
pub mod service;

// Re-export top-level types for convenience
pub use backend::{BackendError, FailureClass, RestClient, Row, RowStore, SelectQuery};

pub use cache::{CacheError, CacheStore};

pub use resolver::{ConnectivityProber, ProbeMode, ProbeOutcome, ProbeReport, TableResolver};

pub use service::{
    DashboardStats, DataService, FetchOptions, FetchResult, Outcome, ServiceError, Source,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};
