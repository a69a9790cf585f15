//! RBAC data models: policy rules, role assignments, requests and snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Policy Rule
// ═══════════════════════════════════════════════════════════════════════════════

/// A permission triple: `subject` may perform `action` on `object`.
///
/// The subject is either a literal user name or a role name. All three fields
/// are compared by exact string equality; an empty string is a valid value
/// and never acts as a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl PolicyRule {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        }
    }

    /// Whether this rule grants `action` on `object`, ignoring the subject.
    pub fn covers(&self, object: &str, action: &str) -> bool {
        self.object == object && self.action == action
    }

    /// Read one field by position, in backing-store column order.
    pub fn field(&self, field: PolicyField) -> &str {
        match field {
            PolicyField::Subject => &self.subject,
            PolicyField::Object => &self.object,
            PolicyField::Action => &self.action,
        }
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.subject, self.object, self.action)
    }
}

/// Field selector for filtered policy removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyField {
    Subject,
    Object,
    Action,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role Assignment
// ═══════════════════════════════════════════════════════════════════════════════

/// An edge granting `user` membership in `role`.
///
/// The user side may itself be a role, which is how role chains are built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user: String,
    pub role: String,
}

impl RoleAssignment {
    pub fn new(user: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            role: role.into(),
        }
    }
}

impl fmt::Display for RoleAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.user, self.role)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Enforcement Request
// ═══════════════════════════════════════════════════════════════════════════════

/// A single access question, built per call and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnforcementRequest {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl EnforcementRequest {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for EnforcementRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} {}", self.subject, self.object, self.action)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy Type
// ═══════════════════════════════════════════════════════════════════════════════

/// Record-kind discriminator shared by the policy source and the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    /// `p` rows: subject, object, action.
    #[serde(rename = "p")]
    Policy,
    /// `g` rows: user, role.
    #[serde(rename = "g")]
    Grouping,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Policy => "p",
            Self::Grouping => "g",
        }
    }

    /// Parse a discriminator; anything other than `p` or `g` is unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "p" => Some(Self::Policy),
            "g" => Some(Self::Grouping),
            _ => None,
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Snapshot
// ═══════════════════════════════════════════════════════════════════════════════

/// Full contents of a policy store, as exchanged with a persistence adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    /// Rules in insertion order.
    pub policies: Vec<PolicyRule>,
    pub assignments: Vec<RoleAssignment>,
}

impl PolicySnapshot {
    pub fn new(policies: Vec<PolicyRule>, assignments: Vec<RoleAssignment>) -> Self {
        Self {
            policies,
            assignments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty() && self.assignments.is_empty()
    }

    /// Total number of rows this snapshot occupies in the backing store.
    pub fn row_count(&self) -> usize {
        self.policies.len() + self.assignments.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_covers_exact_match_only() {
        let rule = PolicyRule::new("admin", "/api/user", "GET");
        assert!(rule.covers("/api/user", "GET"));
        assert!(!rule.covers("/api/user", "get"));
        assert!(!rule.covers("/api/user/1", "GET"));
        assert!(!rule.covers("*", "GET"));
    }

    #[test]
    fn test_empty_fields_are_literals() {
        let rule = PolicyRule::new("", "", "");
        assert!(rule.covers("", ""));
        assert!(!rule.covers("/api", ""));
    }

    #[test]
    fn test_policy_type_parse() {
        assert_eq!(PolicyType::parse("p"), Some(PolicyType::Policy));
        assert_eq!(PolicyType::parse("g"), Some(PolicyType::Grouping));
        assert_eq!(PolicyType::parse("P"), None);
        assert_eq!(PolicyType::parse("g2"), None);
        assert_eq!(PolicyType::Grouping.as_str(), "g");
    }

    #[test]
    fn test_rule_field_access() {
        let rule = PolicyRule::new("editor", "/api/article", "POST");
        assert_eq!(rule.field(PolicyField::Subject), "editor");
        assert_eq!(rule.field(PolicyField::Object), "/api/article");
        assert_eq!(rule.field(PolicyField::Action), "POST");
    }

    #[test]
    fn test_snapshot_row_count() {
        let snapshot = PolicySnapshot::new(
            vec![PolicyRule::new("admin", "/api/user", "GET")],
            vec![RoleAssignment::new("alice", "admin")],
        );
        assert_eq!(snapshot.row_count(), 2);
        assert!(!snapshot.is_empty());
        assert!(PolicySnapshot::default().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            PolicyRule::new("admin", "/api/user", "GET").to_string(),
            "admin, /api/user, GET"
        );
        assert_eq!(RoleAssignment::new("alice", "admin").to_string(), "alice -> admin");
    }
}
