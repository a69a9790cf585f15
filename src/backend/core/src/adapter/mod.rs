//! Persistence adapters.
//!
//! An adapter is a pure load/save boundary: it hands full snapshots in and
//! out and never owns policy data. Saves replace the whole backing store in
//! one transaction, so a reader of the store sees either the previous
//! snapshot or the new one.
//!
//! Backing-store rows use the flattened `(ptype, v0, v1, v2)` layout: `p` rows
//! carry subject/object/action, `g` rows carry user/role with `v2` empty.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::{GatekeeperError, Result};
use crate::rbac::models::{PolicyRule, PolicySnapshot, PolicyType, RoleAssignment};

pub use memory::MemoryAdapter;
pub use sqlite::SqliteAdapter;

/// Load/save boundary between an enforcer and its backing store.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Read the entire backing store. All-or-nothing: any bad row fails the load.
    async fn load_all(&self) -> Result<PolicySnapshot>;

    /// Replace the entire backing store with `snapshot`, atomically.
    async fn save_all(&self, snapshot: &PolicySnapshot) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Row Types
// ═══════════════════════════════════════════════════════════════════════════════

/// One flattened backing-store row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PolicyRow {
    pub ptype: String,
    pub v0: String,
    pub v1: String,
    pub v2: String,
}

impl From<&PolicyRule> for PolicyRow {
    fn from(rule: &PolicyRule) -> Self {
        Self {
            ptype: PolicyType::Policy.as_str().to_string(),
            v0: rule.subject.clone(),
            v1: rule.object.clone(),
            v2: rule.action.clone(),
        }
    }
}

impl From<&RoleAssignment> for PolicyRow {
    fn from(assignment: &RoleAssignment) -> Self {
        Self {
            ptype: PolicyType::Grouping.as_str().to_string(),
            v0: assignment.user.clone(),
            v1: assignment.role.clone(),
            v2: String::new(),
        }
    }
}

/// Flatten a snapshot into rows: policies first, in order, then assignments.
pub fn snapshot_to_rows(snapshot: &PolicySnapshot) -> Vec<PolicyRow> {
    snapshot
        .policies
        .iter()
        .map(PolicyRow::from)
        .chain(snapshot.assignments.iter().map(PolicyRow::from))
        .collect()
}

/// Rebuild a snapshot from rows, preserving row order within each kind.
///
/// # Errors
///
/// Fails with a `StorageCorrupted` error on an unknown `ptype` or a `g` row
/// that carries a third field.
pub fn rows_to_snapshot(rows: Vec<PolicyRow>) -> Result<PolicySnapshot> {
    let mut snapshot = PolicySnapshot::default();

    for (index, row) in rows.into_iter().enumerate() {
        match PolicyType::parse(&row.ptype) {
            Some(PolicyType::Policy) => {
                snapshot
                    .policies
                    .push(PolicyRule::new(row.v0, row.v1, row.v2));
            }
            Some(PolicyType::Grouping) => {
                if !row.v2.is_empty() {
                    return Err(GatekeeperError::corrupted(format!(
                        "row {}: role assignment has unexpected third field {:?}",
                        index, row.v2
                    )));
                }
                snapshot
                    .assignments
                    .push(RoleAssignment::new(row.v0, row.v1));
            }
            None => {
                return Err(GatekeeperError::corrupted(format!(
                    "row {}: unknown policy type {:?}",
                    index, row.ptype
                )));
            }
        }
    }

    Ok(snapshot)
}
