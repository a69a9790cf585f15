//! # Gatekeeper Core
//!
//! An embeddable role-based access control engine with persistent storage.
//!
//! ## Architecture
//!
//! - **Policy Store**: In-memory rules and role assignments, the source of truth for decisions
//! - **Role Resolver**: Transitive role membership, safe on cyclic data
//! - **Adapters**: Full-snapshot load and transactional save (SQLite, in-memory)
//! - **Enforcer**: Allow/deny decisions plus the mutation and bulk-load API
//! - **Telemetry**: Structured logging and Prometheus metrics

pub mod adapter;
pub mod config;
pub mod error;
pub mod rbac;
pub mod telemetry;

pub use error::{ErrorCode, GatekeeperError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::adapter::{Adapter, MemoryAdapter, SqliteAdapter};
    pub use crate::config::Config;
    pub use crate::error::{ErrorCode, GatekeeperError, Result};
    pub use crate::rbac::{
        EnforcementRequest, Enforcer, EnforcerOptions, LoadReport, PolicyRule, PolicySnapshot,
        RoleAssignment,
    };
}
