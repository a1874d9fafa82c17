//! Settings loading: defaults, `.boardgate/` files and `BOARDGATE_*` variables
//! merged with figment, then validated.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::services::bulk_executor::MAX_BULK_ITEMS;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `bulk.concurrency` is zero.
    #[error("Invalid bulk concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    /// `bulk.max_items` is zero or above the hard limit.
    #[error("Invalid bulk max_items: {0}. Must be between 1 and 500")]
    InvalidMaxItems(usize),

    /// Window larger than the batch limit.
    #[error("Bulk concurrency ({0}) cannot exceed max_items ({1})")]
    ConcurrencyExceedsMaxItems(usize, usize),

    /// `cache.ttl_secs` is zero.
    #[error("Invalid cache ttl_secs: {0}. Must be positive")]
    InvalidTtl(u64),

    /// `client.requests_per_minute` is zero.
    #[error("Invalid requests_per_minute: {0}. Must be at least 1")]
    InvalidRequestRate(u32),

    /// `client.timeout_secs` is zero.
    #[error("Invalid timeout_secs: {0}. Must be at least 1")]
    InvalidTimeout(u64),

    /// Unknown `logging.level`.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .boardgate/config.yaml (project config)
    /// 3. .boardgate/local.yaml (project local overrides, optional)
    /// 4. Environment variables (BOARDGATE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".boardgate/config.yaml"))
            .merge(Yaml::file(".boardgate/local.yaml"))
            .merge(Env::prefixed("BOARDGATE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.bulk.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(config.bulk.concurrency));
        }

        if config.bulk.max_items == 0 || config.bulk.max_items > MAX_BULK_ITEMS {
            return Err(ConfigError::InvalidMaxItems(config.bulk.max_items));
        }

        if config.bulk.concurrency > config.bulk.max_items {
            return Err(ConfigError::ConcurrencyExceedsMaxItems(
                config.bulk.concurrency,
                config.bulk.max_items,
            ));
        }

        if config.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidTtl(config.cache.ttl_secs));
        }

        if config.clients.requests_per_minute == 0 {
            return Err(ConfigError::InvalidRequestRate(
                config.clients.requests_per_minute,
            ));
        }

        if config.clients.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.clients.timeout_secs));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
