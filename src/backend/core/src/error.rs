//! Error handling for Gatekeeper Core.
//!
//! This module provides:
//! - A single crate error type carrying a machine-readable [`ErrorCode`]
//! - Storage, configuration and policy-source error kinds
//! - Conversions from sqlx, config and I/O errors
//! - Error counters through the `metrics` facade
//!
//! Access denial is never represented here: `enforce` answers with a plain
//! boolean and the absence of a matching rule is the normal negative outcome.
//!
//! # Usage
//!
//! ```rust,ignore
//! use gatekeeper_core::error::{GatekeeperError, Result};
//!
//! async fn flush(enforcer: &Enforcer) -> Result<()> {
//!     enforcer.save_policy().await?;
//!     Ok(())
//! }
//! ```

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Gatekeeper operations.
pub type Result<T> = std::result::Result<T, GatekeeperError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Storage Errors (2000-2099)
    StorageUnavailable,
    StorageQueryFailed,
    StorageTransactionFailed,
    StorageCorrupted,

    // Policy Source Errors (2200-2299)
    SourceUnreadable,

    // Configuration Errors (5000-5099)
    CyclicRoleGraph,
    InvalidConfiguration,
    MissingConfiguration,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::StorageUnavailable => 2000,
            Self::StorageQueryFailed => 2001,
            Self::StorageTransactionFailed => 2002,
            Self::StorageCorrupted => 2003,

            Self::SourceUnreadable => 2200,

            Self::CyclicRoleGraph => 5000,
            Self::InvalidConfiguration => 5001,
            Self::MissingConfiguration => 5002,
        }
    }

    /// Check if retrying the failed operation may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable | Self::StorageTransactionFailed
        )
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            2000..=2099 => "storage",
            2200..=2299 => "source",
            5000..=5099 => "configuration",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Gatekeeper Core.
#[derive(Debug, Error)]
pub enum GatekeeperError {
    /// Backing store unreachable, malformed rows or schema, failed transaction.
    #[error("[{code}] storage error: {message}")]
    Storage {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Cyclic role graph under strict mode, or an unusable configuration.
    #[error("[{code}] configuration error: {message}")]
    Configuration {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The policy source as a whole could not be read.
    #[error("[{code}] policy source error: {message}")]
    Source {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl GatekeeperError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a storage error with the given code.
    pub fn storage(code: ErrorCode, message: impl Into<String>) -> Self {
        let error = Self::Storage {
            code,
            message: message.into(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an error for backing-store rows that cannot be mapped back to policy.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::storage(ErrorCode::StorageCorrupted, message)
    }

    /// Create a configuration error with the given code.
    pub fn configuration(code: ErrorCode, message: impl Into<String>) -> Self {
        let error = Self::Configuration {
            code,
            message: message.into(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create a cycle error listing the role nodes that form the cycle.
    pub fn cyclic_roles(nodes: &[String]) -> Self {
        Self::configuration(
            ErrorCode::CyclicRoleGraph,
            format!("role assignments form a cycle: {}", nodes.join(" -> ")),
        )
    }

    /// Create an error for a policy source that cannot be opened or read.
    pub fn source_unreadable(path: impl fmt::Display, source: std::io::Error) -> Self {
        let error = Self::Source {
            code: ErrorCode::SourceUnreadable,
            message: format!("cannot read policy source {}: {}", path, source),
            source: Some(source),
        };
        error.record_metrics();
        error
    }

    /// Wrap a sqlx error raised while beginning or committing a transaction.
    pub fn transaction(error: sqlx::Error) -> Self {
        Self::storage(
            ErrorCode::StorageTransactionFailed,
            format!("transaction failed: {}", error),
        )
        .with_source(error)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach a source error. Source-kind errors keep their I/O source.
    pub fn with_source<E>(mut self, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match &mut self {
            Self::Storage { source, .. } | Self::Configuration { source, .. } => {
                *source = Some(Box::new(error));
            }
            Self::Source { .. } => {}
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Storage { code, .. }
            | Self::Configuration { code, .. }
            | Self::Source { code, .. } => *code,
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    fn record_metrics(&self) {
        let code = self.code();
        counter!(
            "gatekeeper_errors_total",
            "category" => code.category(),
            "code" => code.to_string(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<sqlx::Error> for GatekeeperError {
    fn from(error: sqlx::Error) -> Self {
        let code = match &error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                ErrorCode::StorageUnavailable
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => ErrorCode::StorageCorrupted,
            sqlx::Error::Configuration(_) => ErrorCode::InvalidConfiguration,
            _ => ErrorCode::StorageQueryFailed,
        };

        if code == ErrorCode::InvalidConfiguration {
            return Self::configuration(code, error.to_string()).with_source(error);
        }
        Self::storage(code, error.to_string()).with_source(error)
    }
}

impl From<sqlx::migrate::MigrateError> for GatekeeperError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::storage(
            ErrorCode::StorageCorrupted,
            format!("schema migration failed: {}", error),
        )
        .with_source(error)
    }
}

impl From<config::ConfigError> for GatekeeperError {
    fn from(error: config::ConfigError) -> Self {
        let code = match &error {
            config::ConfigError::NotFound(_) => ErrorCode::MissingConfiguration,
            _ => ErrorCode::InvalidConfiguration,
        };
        Self::configuration(code, error.to_string()).with_source(error)
    }
}

impl From<std::io::Error> for GatekeeperError {
    fn from(error: std::io::Error) -> Self {
        Self::source_unreadable("<reader>", error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_categories() {
        assert_eq!(ErrorCode::StorageCorrupted.category(), "storage");
        assert_eq!(ErrorCode::SourceUnreadable.category(), "source");
        assert_eq!(ErrorCode::CyclicRoleGraph.category(), "configuration");
    }

    #[test]
    fn test_every_error_code_has_a_category() {
        let codes = [
            ErrorCode::StorageUnavailable,
            ErrorCode::StorageQueryFailed,
            ErrorCode::StorageTransactionFailed,
            ErrorCode::StorageCorrupted,
            ErrorCode::SourceUnreadable,
            ErrorCode::CyclicRoleGraph,
            ErrorCode::InvalidConfiguration,
            ErrorCode::MissingConfiguration,
        ];
        for code in codes {
            assert_ne!(code.category(), "unknown", "{} has no category", code);
        }
    }

    #[test]
    fn test_error_code_is_retryable() {
        assert!(ErrorCode::StorageUnavailable.is_retryable());
        assert!(ErrorCode::StorageTransactionFailed.is_retryable());
        assert!(!ErrorCode::StorageCorrupted.is_retryable());
        assert!(!ErrorCode::CyclicRoleGraph.is_retryable());
    }

    #[test]
    fn test_cyclic_roles_message() {
        let error = GatekeeperError::cyclic_roles(&["a".to_string(), "b".to_string()]);
        assert!(error.is_configuration());
        assert_eq!(error.code(), ErrorCode::CyclicRoleGraph);
        assert!(error.to_string().contains("a -> b"));
    }

    #[test]
    fn test_sqlx_pool_errors_are_unavailable() {
        let error = GatekeeperError::from(sqlx::Error::PoolTimedOut);
        assert!(error.is_storage());
        assert_eq!(error.code(), ErrorCode::StorageUnavailable);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_sqlx_row_not_found_is_query_failure() {
        let error = GatekeeperError::from(sqlx::Error::RowNotFound);
        assert_eq!(error.code(), ErrorCode::StorageQueryFailed);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_source_unreadable_keeps_io_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = GatekeeperError::source_unreadable("policy.csv", io);
        assert_eq!(error.code(), ErrorCode::SourceUnreadable);
        assert!(error.to_string().contains("policy.csv"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
