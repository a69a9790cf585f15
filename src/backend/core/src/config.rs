//! Configuration management.
//!
//! Values come from an optional file plus `GATEKEEPER__*` environment
//! variables, e.g. `GATEKEEPER__DATABASE__URL=sqlite://policy.db`.

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::Result;
use crate::rbac::EnforcerOptions;
use crate::telemetry::{LoggingConfig, MetricsConfig};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Backing store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Policy engine configuration
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Create the policy table on connect
    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            auto_migrate: default_auto_migrate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Policy source to bulk-load at startup
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Reject cyclic role graphs instead of tolerating them
    #[serde(default)]
    pub strict_cycles: bool,

    /// Cache effective roles per user
    #[serde(default = "default_cache_roles")]
    pub cache_roles: bool,

    /// Persist the full snapshot after every individual mutation
    #[serde(default)]
    pub auto_save: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            source: None,
            strict_cycles: false,
            cache_roles: default_cache_roles(),
            auto_save: false,
        }
    }
}

impl PolicyConfig {
    pub fn enforcer_options(&self) -> EnforcerOptions {
        EnforcerOptions {
            strict_cycles: self.strict_cycles,
            cache_roles: self.cache_roles,
            auto_save: self.auto_save,
        }
    }
}

// Default value functions
fn default_database_url() -> String { "sqlite://gatekeeper.db".to_string() }
fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout_secs() -> u64 { 5 }
fn default_auto_migrate() -> bool { true }
fn default_cache_roles() -> bool { true }

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        Self::load_layered(None, &[])
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> Result<Self> {
        Self::load_layered(Some(path), &[])
    }

    /// Load with caller-supplied defaults underneath the file and the
    /// environment. Keys use dotted paths such as `logging.level`.
    pub fn load_layered(path: Option<&str>, defaults: &[(&str, &str)]) -> Result<Self> {
        let mut builder = config::Config::builder();
        for (key, value) in defaults {
            builder = builder.set_default(*key, *value)?;
        }
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("GATEKEEPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}
