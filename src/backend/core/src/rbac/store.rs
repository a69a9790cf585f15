//! In-memory policy store.
//!
//! Holds policy rules in insertion order and role assignments as a directed
//! edge list (user -> role) with an adjacency index for the resolver. Nothing
//! here touches the backing store; persistence is an explicit, separate step.

use std::collections::{HashMap, HashSet};

use super::models::{PolicyField, PolicyRule, PolicySnapshot, RoleAssignment};

/// The in-memory source of truth for enforcement.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    /// Rules in insertion order.
    policies: Vec<PolicyRule>,
    policy_index: HashSet<PolicyRule>,

    /// Assignments in insertion order.
    assignments: Vec<RoleAssignment>,
    assignment_index: HashSet<RoleAssignment>,

    /// Direct roles per user, in insertion order.
    edges: HashMap<String, Vec<String>>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot, dropping duplicate rows.
    pub fn from_snapshot(snapshot: PolicySnapshot) -> Self {
        let mut store = Self::new();
        for rule in snapshot.policies {
            store.insert_policy(rule);
        }
        for assignment in snapshot.assignments {
            store.insert_assignment(assignment);
        }
        store
    }

    /// Copy the current contents out for persistence.
    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot::new(self.list_policies(), self.list_role_assignments())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Policy rules
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a rule. Returns `false` if an identical rule already exists.
    pub fn add_policy(
        &mut self,
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> bool {
        self.insert_policy(PolicyRule::new(subject, object, action))
    }

    pub fn insert_policy(&mut self, rule: PolicyRule) -> bool {
        if self.policy_index.contains(&rule) {
            return false;
        }
        self.policy_index.insert(rule.clone());
        self.policies.push(rule);
        true
    }

    /// Remove a rule. Returns `false` if no identical rule exists.
    pub fn remove_policy(&mut self, subject: &str, object: &str, action: &str) -> bool {
        let rule = PolicyRule::new(subject, object, action);
        if !self.policy_index.remove(&rule) {
            return false;
        }
        self.policies.retain(|existing| existing != &rule);
        true
    }

    /// Remove every rule whose `field` equals `value`. Returns the removed rules.
    pub fn remove_filtered_policy(&mut self, field: PolicyField, value: &str) -> Vec<PolicyRule> {
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .policies
            .drain(..)
            .partition(|rule| rule.field(field) == value);
        self.policies = kept;
        for rule in &removed {
            self.policy_index.remove(rule);
        }
        removed
    }

    pub fn has_policy(&self, subject: &str, object: &str, action: &str) -> bool {
        self.policy_index
            .contains(&PolicyRule::new(subject, object, action))
    }

    /// Borrow the rules in insertion order.
    pub fn policies(&self) -> &[PolicyRule] {
        &self.policies
    }

    /// Snapshot of the rules in insertion order.
    pub fn list_policies(&self) -> Vec<PolicyRule> {
        self.policies.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role assignments
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant `role` to `user`. Returns `false` if the pair already exists.
    pub fn add_role_assignment(&mut self, user: impl Into<String>, role: impl Into<String>) -> bool {
        self.insert_assignment(RoleAssignment::new(user, role))
    }

    pub fn insert_assignment(&mut self, assignment: RoleAssignment) -> bool {
        if self.assignment_index.contains(&assignment) {
            return false;
        }
        self.edges
            .entry(assignment.user.clone())
            .or_default()
            .push(assignment.role.clone());
        self.assignment_index.insert(assignment.clone());
        self.assignments.push(assignment);
        true
    }

    /// Revoke `role` from `user`. Returns `false` if the pair does not exist.
    pub fn remove_role_assignment(&mut self, user: &str, role: &str) -> bool {
        let assignment = RoleAssignment::new(user, role);
        if !self.assignment_index.remove(&assignment) {
            return false;
        }
        self.assignments.retain(|existing| existing != &assignment);
        if let Some(roles) = self.edges.get_mut(user) {
            roles.retain(|r| r != role);
            if roles.is_empty() {
                self.edges.remove(user);
            }
        }
        true
    }

    pub fn has_role_assignment(&self, user: &str, role: &str) -> bool {
        self.assignment_index
            .contains(&RoleAssignment::new(user, role))
    }

    /// Roles granted directly to `user` (no inheritance).
    pub fn direct_roles(&self, user: &str) -> &[String] {
        self.edges.get(user).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Users (or roles) holding `role` directly.
    pub fn direct_members(&self, role: &str) -> Vec<String> {
        self.assignments
            .iter()
            .filter(|a| a.role == role)
            .map(|a| a.user.clone())
            .collect()
    }

    pub fn assignments(&self) -> &[RoleAssignment] {
        &self.assignments
    }

    pub fn list_role_assignments(&self) -> Vec<RoleAssignment> {
        self.assignments.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bookkeeping
    // ─────────────────────────────────────────────────────────────────────────

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.policies.len() + self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty() && self.assignments.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
