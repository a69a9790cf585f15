//! Shared setup for every command: configuration and the hydrated enforcer.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gatekeeper_core::adapter::SqliteAdapter;
use gatekeeper_core::config::Config;
use gatekeeper_core::rbac::Enforcer;

/// Global options that affect how the policy database is opened.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub config_file: Option<PathBuf>,
    pub database_url: Option<String>,
    pub verbose: bool,
    pub metrics: bool,
}

/// Load configuration and apply command-line overrides.
///
/// Without `--verbose` or `RUST_LOG` the CLI logs at `warn` unless the
/// config file or environment sets `logging.level`.
pub fn load_config(options: &ContextOptions) -> Result<Config> {
    let quiet = !options.verbose && std::env::var("RUST_LOG").is_err();
    let defaults: &[(&str, &str)] = if quiet {
        &[("logging.level", "warn")]
    } else {
        &[]
    };

    let mut config = match &options.config_file {
        Some(path) => Config::load_layered(Some(&*path.to_string_lossy()), defaults)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_layered(None, defaults).context("Failed to load configuration")?,
    };

    if let Some(url) = &options.database_url {
        config.database.url = url.clone();
    }
    if options.verbose {
        config.logging.level = "debug".to_string();
    }
    config.metrics.enabled |= options.metrics;

    Ok(config)
}

/// An open policy database and the enforcer hydrated from it.
pub struct PolicyContext {
    pub enforcer: Enforcer,
    pub config: Config,
    adapter: Arc<SqliteAdapter>,
}

impl PolicyContext {
    /// Connect to the configured database and hydrate an enforcer from it.
    pub async fn open(config: Config) -> Result<Self> {
        let adapter = Arc::new(
            SqliteAdapter::connect_with(&config.database)
                .await
                .with_context(|| format!("Failed to open {}", config.database.url))?,
        );

        let enforcer = Enforcer::open(adapter.clone(), config.policy.enforcer_options())
            .await
            .context("Failed to load policy")?;

        tracing::debug!(enforcer = ?enforcer, "Policy context ready");

        Ok(Self {
            enforcer,
            config,
            adapter,
        })
    }

    /// The policy source to seed from: the explicit path, else the configured one.
    pub fn source_path<'a>(&'a self, explicit: Option<&'a Path>) -> Result<&'a Path> {
        explicit
            .or(self.config.policy.source.as_deref())
            .context("No policy source given and policy.source is not configured")
    }

    pub fn database_url(&self) -> &str {
        &self.config.database.url
    }

    /// Close the connection pool.
    pub async fn close(self) {
        self.adapter.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_configured_log_level_is_kept() {
        let file = config_file("[logging]\nlevel = \"debug\"");
        let options = ContextOptions {
            config_file: Some(file.path().to_path_buf()),
            ..ContextOptions::default()
        };

        let config = load_config(&options).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_verbose_forces_debug() {
        let file = config_file("[logging]\nlevel = \"error\"");
        let options = ContextOptions {
            config_file: Some(file.path().to_path_buf()),
            verbose: true,
            ..ContextOptions::default()
        };

        let config = load_config(&options).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let file = config_file("[database]\nurl = \"sqlite://from-file.db\"");
        let options = ContextOptions {
            config_file: Some(file.path().to_path_buf()),
            database_url: Some("sqlite://from-flag.db".to_string()),
            metrics: true,
            ..ContextOptions::default()
        };

        let config = load_config(&options).unwrap();
        assert_eq!(config.database.url, "sqlite://from-flag.db");
        assert!(config.metrics.enabled);
    }
}
