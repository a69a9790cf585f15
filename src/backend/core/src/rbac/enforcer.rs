//! Enforcement engine and policy mutation API.
//!
//! The enforcer answers the question:
//! "May subject S perform action A on object O?"
//!
//! It owns the in-memory [`PolicyStore`] and talks to a backing store only
//! through an [`Adapter`]. Reads take a shared lock and never await.
//! Mutations and persistence are serialized by an async write gate, and the
//! store lock is only held long enough to copy or swap the store.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::models::{EnforcementRequest, PolicyRule, RoleAssignment};
use super::resolver::{ensure_acyclic, RoleResolver};
use super::source::{read_source, PolicyLine, SkippedLine};
use super::store::PolicyStore;
use crate::adapter::Adapter;
use crate::error::{GatekeeperError, Result};
use crate::telemetry::metrics::PolicyMetrics;

// ═══════════════════════════════════════════════════════════════════════════════
// Options
// ═══════════════════════════════════════════════════════════════════════════════

/// Behavioural switches for an [`Enforcer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnforcerOptions {
    /// Reject cyclic role graphs at load time and on assignment.
    pub strict_cycles: bool,

    /// Cache effective roles per subject until the next mutation.
    pub cache_roles: bool,

    /// Persist the full snapshot after every individual mutation.
    pub auto_save: bool,
}

impl Default for EnforcerOptions {
    fn default() -> Self {
        Self {
            strict_cycles: false,
            cache_roles: true,
            auto_save: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Load Report
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a bulk load from a policy source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub policies_added: usize,
    pub assignments_added: usize,
    /// Records that were already present in the store.
    pub duplicates: usize,
    pub skipped: Vec<SkippedLine>,
}

impl LoadReport {
    /// Number of records that changed the store.
    pub fn applied(&self) -> usize {
        self.policies_added + self.assignments_added
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Enforcer
// ═══════════════════════════════════════════════════════════════════════════════

/// Thread-safe RBAC enforcer. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct Enforcer {
    store: Arc<RwLock<PolicyStore>>,
    adapter: Arc<dyn Adapter>,

    /// Serializes "mutate then save" so snapshots are never interleaved.
    write_gate: Arc<Mutex<()>>,

    /// Effective roles per subject. Filled under the read lock, cleared under
    /// the write lock.
    role_cache: Arc<DashMap<String, Arc<HashSet<String>>>>,

    options: EnforcerOptions,
}

impl fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store.read();
        f.debug_struct("Enforcer")
            .field("policies", &store.policies().len())
            .field("assignments", &store.assignments().len())
            .field("cached_subjects", &self.role_cache.len())
            .field("options", &self.options)
            .finish()
    }
}

impl Enforcer {
    /// Create an enforcer with an empty store. Call [`Enforcer::load_policy`]
    /// to hydrate it.
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self::with_options(adapter, EnforcerOptions::default())
    }

    pub fn with_options(adapter: Arc<dyn Adapter>, options: EnforcerOptions) -> Self {
        Self {
            store: Arc::new(RwLock::new(PolicyStore::new())),
            adapter,
            write_gate: Arc::new(Mutex::new(())),
            role_cache: Arc::new(DashMap::new()),
            options,
        }
    }

    /// Create an enforcer and hydrate it from the backing store.
    pub async fn open(adapter: Arc<dyn Adapter>, options: EnforcerOptions) -> Result<Self> {
        let enforcer = Self::with_options(adapter, options);
        enforcer.load_policy().await?;
        Ok(enforcer)
    }

    pub fn options(&self) -> EnforcerOptions {
        self.options
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Enforcement
    // ─────────────────────────────────────────────────────────────────────────

    /// Decide whether `subject` may perform `action` on `object`.
    ///
    /// Denial is the normal negative outcome and never an error.
    pub fn enforce(&self, subject: &str, object: &str, action: &str) -> bool {
        self.enforce_ex(subject, object, action).is_some()
    }

    pub fn enforce_request(&self, request: &EnforcementRequest) -> bool {
        self.enforce(&request.subject, &request.object, &request.action)
    }

    /// Like [`Enforcer::enforce`], returning the first rule that allowed the
    /// request.
    pub fn enforce_ex(&self, subject: &str, object: &str, action: &str) -> Option<PolicyRule> {
        let store = self.store.read();
        let roles = self.effective_roles_in(&store, subject);

        let matched = store
            .policies()
            .iter()
            .find(|rule| rule.covers(object, action) && roles.contains(&rule.subject))
            .cloned();

        let allowed = matched.is_some();
        debug!(subject, object, action, allowed, "Enforcement decision");
        PolicyMetrics::record_decision(allowed);

        matched
    }

    /// Evaluate several requests against one consistent view of the store.
    pub fn batch_enforce(&self, requests: &[EnforcementRequest]) -> Vec<bool> {
        let store = self.store.read();
        requests
            .iter()
            .map(|request| {
                let roles = self.effective_roles_in(&store, &request.subject);
                let allowed = store.policies().iter().any(|rule| {
                    rule.covers(&request.object, &request.action) && roles.contains(&rule.subject)
                });
                PolicyMetrics::record_decision(allowed);
                allowed
            })
            .collect()
    }

    fn effective_roles_in(&self, store: &PolicyStore, subject: &str) -> Arc<HashSet<String>> {
        // Subjects without assignments resolve to themselves and are not
        // cached, so unknown names cannot grow the cache.
        if !self.options.cache_roles || store.direct_roles(subject).is_empty() {
            return Arc::new(RoleResolver::new(store).effective_roles(subject));
        }

        if let Some(cached) = self.role_cache.get(subject) {
            return Arc::clone(cached.value());
        }

        let roles = Arc::new(RoleResolver::new(store).effective_roles(subject));
        self.role_cache
            .insert(subject.to_string(), Arc::clone(&roles));
        roles
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn policies(&self) -> Vec<PolicyRule> {
        self.store.read().list_policies()
    }

    pub fn role_assignments(&self) -> Vec<RoleAssignment> {
        self.store.read().list_role_assignments()
    }

    pub fn has_policy(&self, subject: &str, object: &str, action: &str) -> bool {
        self.store.read().has_policy(subject, object, action)
    }

    /// Whether `user` holds `role` directly.
    pub fn has_role_for_user(&self, user: &str, role: &str) -> bool {
        self.store.read().has_role_assignment(user, role)
    }

    /// Roles granted directly to `user`.
    pub fn roles_for_user(&self, user: &str) -> Vec<String> {
        self.store.read().direct_roles(user).to_vec()
    }

    /// Roles `user` holds directly or through inheritance, sorted.
    pub fn implicit_roles_for_user(&self, user: &str) -> Vec<String> {
        RoleResolver::new(&self.store.read()).implicit_roles(user)
    }

    /// Users (or roles) holding `role` directly.
    pub fn users_for_role(&self, role: &str) -> Vec<String> {
        self.store.read().direct_members(role)
    }

    /// Effective roles of `subject`, including `subject` itself.
    pub fn effective_roles(&self, subject: &str) -> HashSet<String> {
        let store = self.store.read();
        self.effective_roles_in(&store, subject).as_ref().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a rule. Returns `false` if an identical rule already exists.
    pub async fn add_policy(&self, subject: &str, object: &str, action: &str) -> Result<bool> {
        let rule = PolicyRule::new(subject, object, action);
        debug!(rule = %rule, "Adding policy");
        self.mutate(move |store| Ok(store.insert_policy(rule))).await
    }

    /// Remove a rule. Returns `false` if no identical rule exists.
    pub async fn remove_policy(&self, subject: &str, object: &str, action: &str) -> Result<bool> {
        debug!(subject, object, action, "Removing policy");
        self.mutate(|store| Ok(store.remove_policy(subject, object, action)))
            .await
    }

    /// Grant `role` to `user`. Returns `false` if the pair already exists.
    ///
    /// # Errors
    ///
    /// With `strict_cycles`, fails with a `CyclicRoleGraph` error if the new
    /// edge would close a cycle. The store is left unchanged.
    pub async fn add_role_for_user(&self, user: &str, role: &str) -> Result<bool> {
        let strict = self.options.strict_cycles;
        debug!(user, role, "Adding role assignment");
        self.mutate(move |store| {
            if !store.add_role_assignment(user, role) {
                return Ok(false);
            }
            if strict {
                if let Err(error) = ensure_acyclic(store) {
                    store.remove_role_assignment(user, role);
                    return Err(error);
                }
            }
            Ok(true)
        })
        .await
    }

    /// Revoke `role` from `user`. Returns `false` if the pair does not exist.
    pub async fn delete_role_for_user(&self, user: &str, role: &str) -> Result<bool> {
        debug!(user, role, "Removing role assignment");
        self.mutate(|store| Ok(store.remove_role_assignment(user, role)))
            .await
    }

    /// Apply one mutation under the write gate.
    ///
    /// Without auto-save the live store is changed in place. With auto-save
    /// the change is applied to a copy, which replaces the live store only
    /// after the snapshot is persisted.
    async fn mutate<F>(&self, op: F) -> Result<bool>
    where
        F: FnOnce(&mut PolicyStore) -> Result<bool>,
    {
        let _gate = self.write_gate.lock().await;

        if !self.options.auto_save {
            let mut store = self.store.write();
            let changed = op(&mut *store)?;
            if changed {
                self.role_cache.clear();
                PolicyMetrics::set_store_size(store.policies().len(), store.assignments().len());
            }
            return Ok(changed);
        }

        let mut candidate = self.store.read().clone();
        if !op(&mut candidate)? {
            return Ok(false);
        }
        self.persist(&candidate).await?;
        self.install(candidate);
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the in-memory store with the backing store's contents.
    ///
    /// All-or-nothing: on failure the current store is kept.
    pub async fn load_policy(&self) -> Result<()> {
        let _gate = self.write_gate.lock().await;

        let snapshot = self.adapter.load_all().await?;
        let store = PolicyStore::from_snapshot(snapshot);

        if self.options.strict_cycles {
            ensure_acyclic(&store)?;
        }

        info!(
            policies = store.policies().len(),
            assignments = store.assignments().len(),
            "Loaded policy from backing store"
        );
        PolicyMetrics::record_load("store");

        self.install(store);
        Ok(())
    }

    /// Persist the current store as one snapshot.
    pub async fn save_policy(&self) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let store = self.store.read().clone();
        self.persist(&store).await
    }

    /// Bulk-load records from a line-oriented policy source, then save once.
    ///
    /// Malformed records are skipped and reported. The batch is applied to a
    /// copy of the store, which is swapped in only after the save succeeds.
    ///
    /// # Errors
    ///
    /// Storage errors from the save, or a `CyclicRoleGraph` error under
    /// `strict_cycles`. Either way the store keeps its prior contents.
    pub async fn load_from_reader<R: Read>(&self, reader: R) -> Result<LoadReport> {
        let parsed = read_source(reader);
        let _gate = self.write_gate.lock().await;

        let mut candidate = self.store.read().clone();
        let mut report = LoadReport {
            skipped: parsed.skipped,
            ..LoadReport::default()
        };

        for line in parsed.lines {
            match line {
                PolicyLine::Policy(rule) => {
                    if candidate.insert_policy(rule) {
                        report.policies_added += 1;
                    } else {
                        report.duplicates += 1;
                    }
                }
                PolicyLine::Assignment(assignment) => {
                    if candidate.insert_assignment(assignment) {
                        report.assignments_added += 1;
                    } else {
                        report.duplicates += 1;
                    }
                }
            }
        }

        if self.options.strict_cycles {
            ensure_acyclic(&candidate)?;
        }

        self.persist(&candidate).await?;
        self.install(candidate);

        info!(
            policies_added = report.policies_added,
            assignments_added = report.assignments_added,
            duplicates = report.duplicates,
            skipped = report.skipped.len(),
            "Loaded policy source"
        );
        PolicyMetrics::record_load("source");

        Ok(report)
    }

    /// Bulk-load from a file. See [`Enforcer::load_from_reader`].
    ///
    /// # Errors
    ///
    /// A `SourceUnreadable` error if the file cannot be read at all.
    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let contents = tokio::fs::read(path)
            .await
            .map_err(|error| GatekeeperError::source_unreadable(path.display(), error))?;
        self.load_from_reader(contents.as_slice()).await
    }

    async fn persist(&self, store: &PolicyStore) -> Result<()> {
        let snapshot = store.snapshot();
        match self.adapter.save_all(&snapshot).await {
            Ok(()) => {
                PolicyMetrics::record_save(true);
                info!(
                    policies = snapshot.policies.len(),
                    assignments = snapshot.assignments.len(),
                    "Saved policy"
                );
                Ok(())
            }
            Err(error) => {
                PolicyMetrics::record_save(false);
                warn!(error = %error, "Failed to save policy, keeping last good state");
                Err(error)
            }
        }
    }

    fn install(&self, store: PolicyStore) {
        let mut live = self.store.write();
        *live = store;
        self.role_cache.clear();
        PolicyMetrics::set_store_size(live.policies().len(), live.assignments().len());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::error::ErrorCode;
    use crate::rbac::models::PolicySnapshot;

    const SAMPLE: &str = "\
p, admin, /api/user, GET
p, admin, /api/user, POST
p, editor, /api/article, GET
p, editor, /api/article, POST
g, alice, admin
g, bob, editor
";

    async fn seeded(options: EnforcerOptions) -> (Arc<MemoryAdapter>, Enforcer) {
        let adapter = Arc::new(MemoryAdapter::new());
        let enforcer = Enforcer::with_options(adapter.clone(), options);
        enforcer.load_from_reader(SAMPLE.as_bytes()).await.unwrap();
        (adapter, enforcer)
    }

    #[tokio::test]
    async fn test_alice_and_bob() {
        let (_, enforcer) = seeded(EnforcerOptions::default()).await;

        assert!(enforcer.enforce("bob", "/api/article", "POST"));
        assert!(!enforcer.enforce("bob", "/api/user", "GET"));
        assert!(enforcer.enforce("alice", "/api/user", "GET"));
        assert!(!enforcer.enforce("alice", "/api/article", "GET"));
        assert!(!enforcer.enforce("eve", "/api/article", "GET"));
    }

    #[tokio::test]
    async fn test_default_deny_on_empty_store() {
        let enforcer = Enforcer::new(Arc::new(MemoryAdapter::new()));
        assert!(!enforcer.enforce("alice", "/api/user", "GET"));
        assert!(!enforcer.enforce("", "", ""));
    }

    #[tokio::test]
    async fn test_exact_match_only() {
        let (_, enforcer) = seeded(EnforcerOptions::default()).await;
        assert!(!enforcer.enforce("alice", "/api/user/", "GET"));
        assert!(!enforcer.enforce("alice", "/api/user", "get"));
        assert!(!enforcer.enforce("alice", "/api/*", "GET"));
    }

    #[tokio::test]
    async fn test_empty_strings_are_literals() {
        let enforcer = Enforcer::new(Arc::new(MemoryAdapter::new()));
        enforcer.add_policy("admin", "", "GET").await.unwrap();
        enforcer.add_role_for_user("alice", "admin").await.unwrap();

        assert!(enforcer.enforce("alice", "", "GET"));
        assert!(!enforcer.enforce("alice", "/api/user", "GET"));
    }

    #[tokio::test]
    async fn test_literal_user_subject() {
        let enforcer = Enforcer::new(Arc::new(MemoryAdapter::new()));
        enforcer.add_policy("carol", "/reports", "GET").await.unwrap();
        assert!(enforcer.enforce("carol", "/reports", "GET"));
    }

    #[tokio::test]
    async fn test_transitive_roles_grant_access() {
        let enforcer = Enforcer::new(Arc::new(MemoryAdapter::new()));
        enforcer.add_policy("staff", "/wiki", "GET").await.unwrap();
        enforcer.add_role_for_user("alice", "admin").await.unwrap();
        enforcer.add_role_for_user("admin", "staff").await.unwrap();

        assert!(enforcer.enforce("alice", "/wiki", "GET"));
        assert_eq!(enforcer.implicit_roles_for_user("alice"), vec!["admin", "staff"]);
        assert_eq!(enforcer.roles_for_user("alice"), vec!["admin"]);
    }

    #[tokio::test]
    async fn test_enforce_ex_returns_matching_rule() {
        let (_, enforcer) = seeded(EnforcerOptions::default()).await;
        assert_eq!(
            enforcer.enforce_ex("alice", "/api/user", "POST"),
            Some(PolicyRule::new("admin", "/api/user", "POST"))
        );
        assert_eq!(enforcer.enforce_ex("eve", "/api/user", "POST"), None);
    }

    #[tokio::test]
    async fn test_batch_enforce() {
        let (_, enforcer) = seeded(EnforcerOptions::default()).await;
        let requests = vec![
            EnforcementRequest::new("bob", "/api/article", "POST"),
            EnforcementRequest::new("bob", "/api/user", "GET"),
            EnforcementRequest::new("alice", "/api/user", "GET"),
        ];
        assert_eq!(enforcer.batch_enforce(&requests), vec![true, false, true]);
        assert!(enforcer.enforce_request(&requests[0]));
    }

    #[tokio::test]
    async fn test_mutations_are_idempotent() {
        let enforcer = Enforcer::new(Arc::new(MemoryAdapter::new()));
        assert!(enforcer.add_policy("admin", "/api/user", "GET").await.unwrap());
        assert!(!enforcer.add_policy("admin", "/api/user", "GET").await.unwrap());
        assert!(enforcer.add_role_for_user("alice", "admin").await.unwrap());
        assert!(!enforcer.add_role_for_user("alice", "admin").await.unwrap());

        assert_eq!(enforcer.policies().len(), 1);
        assert_eq!(enforcer.role_assignments().len(), 1);

        assert!(enforcer.remove_policy("admin", "/api/user", "GET").await.unwrap());
        assert!(!enforcer.remove_policy("admin", "/api/user", "GET").await.unwrap());
    }

    #[tokio::test]
    async fn test_role_cache_invalidated_on_change() {
        let (_, enforcer) = seeded(EnforcerOptions::default()).await;

        assert!(!enforcer.enforce("eve", "/api/article", "GET"));
        enforcer.add_role_for_user("eve", "editor").await.unwrap();
        assert!(enforcer.enforce("eve", "/api/article", "GET"));

        enforcer.delete_role_for_user("eve", "editor").await.unwrap();
        assert!(!enforcer.enforce("eve", "/api/article", "GET"));
    }

    #[tokio::test]
    async fn test_unknown_subjects_are_not_cached() {
        let (_, enforcer) = seeded(EnforcerOptions::default()).await;

        for i in 0..1_000 {
            assert!(!enforcer.enforce(&format!("stranger-{}", i), "/api/user", "GET"));
        }
        assert_eq!(enforcer.role_cache.len(), 0);

        // Literal-user rules still match for uncached subjects.
        enforcer.add_policy("carol", "/reports", "GET").await.unwrap();
        assert!(enforcer.enforce("carol", "/reports", "GET"));
        assert_eq!(enforcer.role_cache.len(), 0);

        assert!(enforcer.enforce("alice", "/api/user", "GET"));
        assert_eq!(enforcer.role_cache.len(), 1);
    }

    #[tokio::test]
    async fn test_role_holder_denied_on_unlisted_object() {
        let (_, enforcer) = seeded(EnforcerOptions::default()).await;
        enforcer.add_role_for_user("eve", "editor").await.unwrap();

        assert!(enforcer.enforce("eve", "/api/article", "GET"));
        assert!(!enforcer.enforce("eve", "/api/data", "GET"));
        assert_eq!(enforcer.enforce_ex("eve", "/api/data", "GET"), None);
    }

    #[tokio::test]
    async fn test_without_cache() {
        let options = EnforcerOptions {
            cache_roles: false,
            ..EnforcerOptions::default()
        };
        let (_, enforcer) = seeded(options).await;
        assert!(enforcer.enforce("bob", "/api/article", "GET"));
        assert_eq!(enforcer.role_cache.len(), 0);
    }

    #[tokio::test]
    async fn test_cycles_are_tolerated_by_default() {
        let enforcer = Enforcer::new(Arc::new(MemoryAdapter::new()));
        enforcer.add_role_for_user("a", "b").await.unwrap();
        enforcer.add_role_for_user("b", "a").await.unwrap();
        enforcer.add_policy("b", "/x", "GET").await.unwrap();

        assert!(enforcer.enforce("a", "/x", "GET"));
        assert!(!enforcer.enforce("a", "/y", "GET"));
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_cycle_on_add() {
        let options = EnforcerOptions {
            strict_cycles: true,
            ..EnforcerOptions::default()
        };
        let enforcer = Enforcer::with_options(Arc::new(MemoryAdapter::new()), options);
        enforcer.add_role_for_user("a", "b").await.unwrap();

        let error = enforcer.add_role_for_user("b", "a").await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::CyclicRoleGraph);
        assert!(!enforcer.has_role_for_user("b", "a"));
        assert_eq!(enforcer.role_assignments().len(), 1);
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_cyclic_load() {
        let adapter = Arc::new(MemoryAdapter::with_snapshot(PolicySnapshot::new(
            vec![],
            vec![RoleAssignment::new("a", "b"), RoleAssignment::new("b", "a")],
        )));
        let options = EnforcerOptions {
            strict_cycles: true,
            ..EnforcerOptions::default()
        };

        let error = Enforcer::open(adapter, options).await.unwrap_err();
        assert!(error.is_configuration());
    }

    #[tokio::test]
    async fn test_save_and_reload_round_trip() {
        let (adapter, enforcer) = seeded(EnforcerOptions::default()).await;
        enforcer.add_policy("admin", "/api/user", "DELETE").await.unwrap();
        enforcer.save_policy().await.unwrap();

        let reloaded = Enforcer::open(adapter, EnforcerOptions::default()).await.unwrap();
        assert_eq!(reloaded.policies(), enforcer.policies());
        assert_eq!(reloaded.role_assignments(), enforcer.role_assignments());
    }

    #[tokio::test]
    async fn test_mutations_stay_dirty_until_saved() {
        let (adapter, enforcer) = seeded(EnforcerOptions::default()).await;
        let saves = adapter.save_count();

        enforcer.add_policy("admin", "/api/user", "DELETE").await.unwrap();
        assert_eq!(adapter.save_count(), saves);
        assert_eq!(adapter.persisted().policies.len(), 4);
    }

    #[tokio::test]
    async fn test_bulk_load_saves_once() {
        let (adapter, _) = seeded(EnforcerOptions::default()).await;
        assert_eq!(adapter.save_count(), 1);
        assert_eq!(adapter.persisted().policies.len(), 4);
        assert_eq!(adapter.persisted().assignments.len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_load_report() {
        let (_, enforcer) = seeded(EnforcerOptions::default()).await;
        let report = enforcer
            .load_from_reader("p, admin, /api/user, GET\np, admin\ng, carol, admin\n".as_bytes())
            .await
            .unwrap();

        assert_eq!(report.policies_added, 0);
        assert_eq!(report.assignments_added, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.applied(), 1);
    }

    #[tokio::test]
    async fn test_failed_bulk_save_leaves_store_untouched() {
        let (adapter, enforcer) = seeded(EnforcerOptions::default()).await;
        let before = enforcer.policies();
        adapter.set_fail_saves(true);

        let error = enforcer
            .load_from_reader("p, eve, /api/user, GET\n".as_bytes())
            .await
            .unwrap_err();
        assert!(error.is_storage());
        assert_eq!(enforcer.policies(), before);
        assert!(!enforcer.enforce("eve", "/api/user", "GET"));
    }

    #[tokio::test]
    async fn test_auto_save_persists_each_mutation() {
        let options = EnforcerOptions {
            auto_save: true,
            ..EnforcerOptions::default()
        };
        let (adapter, enforcer) = seeded(options).await;

        enforcer.add_role_for_user("eve", "editor").await.unwrap();
        assert_eq!(adapter.save_count(), 2);
        assert!(adapter
            .persisted()
            .assignments
            .contains(&RoleAssignment::new("eve", "editor")));

        // No-op mutations do not save.
        enforcer.add_role_for_user("eve", "editor").await.unwrap();
        assert_eq!(adapter.save_count(), 2);
    }

    #[tokio::test]
    async fn test_auto_save_failure_keeps_last_good_state() {
        let options = EnforcerOptions {
            auto_save: true,
            ..EnforcerOptions::default()
        };
        let (adapter, enforcer) = seeded(options).await;
        adapter.set_fail_saves(true);

        assert!(enforcer.add_policy("eve", "/api/user", "GET").await.is_err());
        assert!(!enforcer.has_policy("eve", "/api/user", "GET"));
    }

    #[tokio::test]
    async fn test_missing_source_file() {
        let enforcer = Enforcer::new(Arc::new(MemoryAdapter::new()));
        let error = enforcer
            .load_from_file("/nonexistent/policy.csv")
            .await
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::SourceUnreadable);
    }

    #[tokio::test]
    async fn test_concurrent_enforce_and_mutate() {
        let (_, enforcer) = seeded(EnforcerOptions::default()).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let enforcer = enforcer.clone();
            handles.push(tokio::spawn(async move {
                let user = format!("user{}", i);
                enforcer.add_role_for_user(&user, "editor").await.unwrap();
                assert!(enforcer.enforce(&user, "/api/article", "GET"));
                assert!(enforcer.enforce("alice", "/api/user", "GET"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(enforcer.users_for_role("editor").len(), 9);
    }
}
