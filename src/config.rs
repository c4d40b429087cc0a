//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted row store connection
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. "https://<project>.supabase.co"
    #[serde(default)]
    pub url: String,

    /// Public key (subject to row-level security)
    #[serde(default)]
    pub anon_key: String,

    /// Elevated key (bypasses row-level security)
    #[serde(default)]
    pub service_role_key: Option<String>,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            service_role_key: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl BackendConfig {
    /// URL and anon key are both set
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.anon_key.is_empty()
    }
}

/// Local cache store
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// SQLite file holding table mappings and snapshots
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// Keep the cache in memory only (nothing survives a restart)
    #[serde(default)]
    pub in_memory: bool,
}

fn default_cache_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("blogdesk").join("cache.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./blogdesk_data/cache.db".to_string())
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            in_memory: false,
        }
    }
}

impl CacheConfig {
    /// Cache file path with a leading `~` expanded to the home directory
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Table resolution and connectivity probing
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Logical resource → candidate physical tables, in priority order
    #[serde(default = "default_aliases")]
    pub aliases: HashMap<String, Vec<String>>,

    /// Logical resource → physical table, used without probing
    #[serde(default = "default_hard_mappings")]
    pub hard_mappings: HashMap<String, String>,

    /// Tables tried, in order, by the session connectivity check
    #[serde(default = "default_probe_tables")]
    pub probe_tables: Vec<String>,

    /// Overall bound for one probe batch
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Count "reachable but table missing / denied" as connected
    #[serde(default = "default_reachable_is_connected")]
    pub reachable_is_connected: bool,

    /// How long an offline verdict is trusted before the next re-probe
    #[serde(default = "default_offline_recheck_secs")]
    pub offline_recheck_secs: u64,
}

fn default_aliases() -> HashMap<String, Vec<String>> {
    [
        ("posts", vec!["posts", "articles", "post"]),
        ("comments", vec!["post_comments", "comments", "comment"]),
        ("users", vec!["user_profiles", "users", "user"]),
    ]
    .into_iter()
    .map(|(logical, tables)| {
        (
            logical.to_string(),
            tables.into_iter().map(String::from).collect(),
        )
    })
    .collect()
}

fn default_hard_mappings() -> HashMap<String, String> {
    [("users", "user_profiles"), ("comments", "post_comments")]
        .into_iter()
        .map(|(logical, table)| (logical.to_string(), table.to_string()))
        .collect()
}

fn default_probe_tables() -> Vec<String> {
    [
        "posts",
        "articles",
        "post",
        "comments",
        "comment",
        "profiles",
        "users",
        "user",
        "user_profiles",
        "post_comments",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

fn default_reachable_is_connected() -> bool {
    true
}

fn default_offline_recheck_secs() -> u64 {
    30
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases(),
            hard_mappings: default_hard_mappings(),
            probe_tables: default_probe_tables(),
            probe_timeout_ms: default_probe_timeout_ms(),
            reachable_is_connected: default_reachable_is_connected(),
            offline_recheck_secs: default_offline_recheck_secs(),
        }
    }
}

impl ResolverConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn offline_recheck(&self) -> Duration {
        Duration::from_secs(self.offline_recheck_secs)
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8086
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Socket address string for binding
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Unset means each binary picks its own default
    #[serde(default)]
    pub level: Option<String>,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Level used when neither the file nor the environment sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Effective level
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Pick the level for one run: an explicit request, else the configured
    /// level, else `fallback`
    pub fn resolve_level(&mut self, requested: Option<String>, fallback: &str) {
        self.level = requested
            .or_else(|| self.level.take())
            .or_else(|| Some(fallback.to_string()));
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("blogdesk").join("config.toml")),
            Some(PathBuf::from("/etc/blogdesk/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Backend overrides
        if let Some(url) = lookup("BLOGDESK_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(key) = lookup("BLOGDESK_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Some(key) = lookup("BLOGDESK_SERVICE_ROLE_KEY") {
            self.backend.service_role_key = Some(key).filter(|k| !k.is_empty());
        }

        // Cache overrides
        if let Some(path) = lookup("BLOGDESK_CACHE_PATH") {
            self.cache.path = path;
        }

        // API overrides
        if let Some(host) = lookup("BLOGDESK_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("BLOGDESK_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = lookup("BLOGDESK_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(format) = lookup("BLOGDESK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Blogdesk Configuration
#
# Environment variables override these settings:
# - BLOGDESK_BACKEND_URL
# - BLOGDESK_ANON_KEY
# - BLOGDESK_SERVICE_ROLE_KEY
# - BLOGDESK_CACHE_PATH
# - BLOGDESK_API_HOST
# - BLOGDESK_API_PORT
# - BLOGDESK_LOG_LEVEL
# - BLOGDESK_LOG_FORMAT

[backend]
# Hosted project URL
url = ""

# Public (anon) key
anon_key = ""

# Service-role key, bypasses row-level security (optional)
# service_role_key = ""

# Per-request timeout (ms)
request_timeout_ms = 10000

[cache]
# SQLite file for table mappings and last-known-good snapshots
# (default: blogdesk/cache.db under the platform data directory; `~` is expanded)
# path = "~/.local/share/blogdesk/cache.db"

# Keep the cache in memory only
in_memory = false

[resolver]
# Tables tried by the connectivity check, in order
probe_tables = ["posts", "articles", "post", "comments", "comment", "profiles", "users", "user", "user_profiles", "post_comments"]

# Overall timeout for one probe batch (ms)
probe_timeout_ms = 5000

# Treat "table missing" / "permission denied" as a reachable, connected backend
reachable_is_connected = true

# Seconds before an offline verdict is re-checked
offline_recheck_secs = 30

[resolver.aliases]
posts = ["posts", "articles", "post"]
comments = ["post_comments", "comments", "comment"]
users = ["user_profiles", "users", "user"]

[resolver.hard_mappings]
users = "user_profiles"
comments = "post_comments"

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8086

# Allowed CORS origins
cors_origins = ["http://localhost:5173", "http://127.0.0.1:5173"]

# Request timeout in seconds
request_timeout_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
# (default: info for the server, warn for the CLI)
# level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
