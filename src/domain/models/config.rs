//! Application settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure for boardgate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Read cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Bulk executor configuration
    #[serde(default)]
    pub bulk: BulkConfig,

    /// Backend client lifecycle configuration
    #[serde(default)]
    pub clients: ClientsConfig,

    /// Where instance descriptors are loaded from
    #[serde(default)]
    pub instances: InstanceSourceConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stderr)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Enable stderr logging
    #[serde(default = "default_true")]
    pub enable_stderr: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable, colored when attached to a terminal.
    #[default]
    Pretty,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_stderr: true,
        }
    }
}

/// Read cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Disabled caches pass every read straight to the backend
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time-to-live of cached reads in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

const fn default_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Bulk executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BulkConfig {
    /// Maximum concurrently outstanding per-item operations
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum ids per bulk request (at most 500)
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

const fn default_concurrency() -> usize {
    10
}

const fn default_max_items() -> usize {
    500
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_items: default_max_items(),
        }
    }
}

/// Backend client lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientsConfig {
    /// Reuse clients per (instance, credential)
    #[serde(default = "default_true")]
    pub enable_caching: bool,

    /// Call `initialize` on new clients before handing them out
    #[serde(default = "default_true")]
    pub initialize_on_create: bool,

    /// Propagate initialization failures instead of returning the
    /// uninitialized client
    #[serde(default = "default_true")]
    pub fail_on_init_error: bool,

    /// Per-client request budget
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_requests_per_minute() -> u32 {
    60
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            initialize_on_create: true,
            fail_on_init_error: true,
            requests_per_minute: default_requests_per_minute(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Instance descriptor sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InstanceSourceConfig {
    /// Explicit instances file; takes priority over every other source
    #[serde(default)]
    pub config_path: Option<PathBuf>,

    /// Fail when no source is found instead of staying unconfigured
    #[serde(default)]
    pub strict: bool,

    /// Allow synthesizing a single instance from the legacy URL/token variables
    #[serde(default = "default_true")]
    pub allow_legacy: bool,
}

impl Default for InstanceSourceConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            strict: false,
            allow_legacy: true,
        }
    }
}
