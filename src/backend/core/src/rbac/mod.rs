//! Role-based access control over subject/object/action triples.
//!
//! This module provides:
//! - **Models**: policy rules, role assignments, requests and snapshots
//! - **Store**: the in-memory, insertion-ordered policy store
//! - **Resolver**: transitive role membership with cycle detection
//! - **Source**: the line-oriented bulk-load format
//! - **Enforcer**: decisions, mutations and persistence through an adapter
//!
//! # Usage
//!
//! ```rust,ignore
//! use gatekeeper_core::adapter::SqliteAdapter;
//! use gatekeeper_core::rbac::{Enforcer, EnforcerOptions};
//! use std::sync::Arc;
//!
//! let adapter = Arc::new(SqliteAdapter::connect("sqlite://casbin.db").await?);
//! let enforcer = Enforcer::open(adapter, EnforcerOptions::default()).await?;
//!
//! enforcer.load_from_file("policy.csv").await?;
//! assert!(enforcer.enforce("alice", "/api/user", "GET"));
//! ```

pub mod enforcer;
pub mod models;
pub mod resolver;
pub mod source;
pub mod store;

pub use enforcer::{Enforcer, EnforcerOptions, LoadReport};
pub use models::{
    EnforcementRequest, PolicyField, PolicyRule, PolicySnapshot, PolicyType, RoleAssignment,
};
pub use resolver::{ensure_acyclic, RoleResolver};
pub use source::{read_source, ParsedSource, PolicyLine, SkipReason, SkippedLine};
pub use store::PolicyStore;
