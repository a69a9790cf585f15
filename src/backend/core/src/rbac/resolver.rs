//! Role hierarchy resolution.
//!
//! Effective roles are the nodes reachable from a user over assignment edges
//! (user -> role -> parent role ...), including the user itself so that rules
//! naming a literal user match directly.
//!
//! Traversal is breadth-first with a visited set, so cyclic assignment data
//! terminates. Strict deployments can reject cycles up front with
//! [`ensure_acyclic`].

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashSet, VecDeque};

use super::store::PolicyStore;
use crate::error::{GatekeeperError, Result};

/// Computes transitive role membership over a borrowed store.
#[derive(Debug, Clone, Copy)]
pub struct RoleResolver<'a> {
    store: &'a PolicyStore,
}

impl<'a> RoleResolver<'a> {
    pub fn new(store: &'a PolicyStore) -> Self {
        Self { store }
    }

    /// All nodes reachable from `user`, including `user`. O(V+E).
    pub fn effective_roles(&self, user: &str) -> HashSet<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        visited.insert(user.to_string());
        queue.push_back(user);

        while let Some(node) = queue.pop_front() {
            for role in self.store.direct_roles(node) {
                if visited.insert(role.clone()) {
                    queue.push_back(role);
                }
            }
        }

        visited
    }

    /// Inherited roles of `user`, excluding `user` itself, sorted.
    pub fn implicit_roles(&self, user: &str) -> Vec<String> {
        let mut roles: Vec<String> = self
            .effective_roles(user)
            .into_iter()
            .filter(|role| role != user)
            .collect();
        roles.sort();
        roles
    }

    /// Whether `user` holds `role` directly or through inheritance.
    pub fn has_role(&self, user: &str, role: &str) -> bool {
        user != role && self.effective_roles(user).contains(role)
    }

    /// Find one cycle in the assignment graph, if any.
    ///
    /// Returns the members of the first strongly connected component with
    /// more than one node, or a single node assigned to itself. Members are
    /// sorted so the report is stable.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for assignment in self.store.assignments() {
            graph.add_edge(assignment.user.as_str(), assignment.role.as_str(), ());
        }

        tarjan_scc(&graph).into_iter().find_map(|component| {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|node| graph.contains_edge(*node, *node));
            if !cyclic {
                return None;
            }
            let mut nodes: Vec<String> = component.into_iter().map(str::to_string).collect();
            nodes.sort();
            Some(nodes)
        })
    }
}

/// Reject a store whose assignment graph contains a cycle.
pub fn ensure_acyclic(store: &PolicyStore) -> Result<()> {
    match RoleResolver::new(store).find_cycle() {
        Some(nodes) => Err(GatekeeperError::cyclic_roles(&nodes)),
        None => Ok(()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_user_without_roles_resolves_to_self() {
        let store = PolicyStore::new();
        assert_eq!(RoleResolver::new(&store).effective_roles("eve"), set(&["eve"]));
    }

    #[test]
    fn test_transitive_roles() {
        let mut store = PolicyStore::new();
        store.add_role_assignment("alice", "admin");
        store.add_role_assignment("admin", "staff");
        store.add_role_assignment("staff", "employee");
        store.add_role_assignment("bob", "staff");

        let resolver = RoleResolver::new(&store);
        assert_eq!(
            resolver.effective_roles("alice"),
            set(&["alice", "admin", "staff", "employee"])
        );
        assert_eq!(resolver.effective_roles("bob"), set(&["bob", "staff", "employee"]));
        assert!(resolver.has_role("alice", "employee"));
        assert!(!resolver.has_role("bob", "admin"));
        assert!(!resolver.has_role("alice", "alice"));
    }

    #[test]
    fn test_diamond_deduplicates() {
        let mut store = PolicyStore::new();
        store.add_role_assignment("alice", "left");
        store.add_role_assignment("alice", "right");
        store.add_role_assignment("left", "top");
        store.add_role_assignment("right", "top");

        let roles = RoleResolver::new(&store).implicit_roles("alice");
        assert_eq!(roles, vec!["left", "right", "top"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut store = PolicyStore::new();
        store.add_role_assignment("a", "b");
        store.add_role_assignment("b", "a");

        assert_eq!(RoleResolver::new(&store).effective_roles("a"), set(&["a", "b"]));
    }

    #[test]
    fn test_self_assignment_terminates() {
        let mut store = PolicyStore::new();
        store.add_role_assignment("a", "a");
        assert_eq!(RoleResolver::new(&store).effective_roles("a"), set(&["a"]));
    }

    #[test]
    fn test_find_cycle() {
        let mut store = PolicyStore::new();
        store.add_role_assignment("alice", "admin");
        store.add_role_assignment("admin", "staff");
        assert_eq!(RoleResolver::new(&store).find_cycle(), None);
        assert!(ensure_acyclic(&store).is_ok());

        store.add_role_assignment("staff", "admin");
        assert_eq!(
            RoleResolver::new(&store).find_cycle(),
            Some(vec!["admin".to_string(), "staff".to_string()])
        );

        let error = ensure_acyclic(&store).unwrap_err();
        assert_eq!(error.code(), ErrorCode::CyclicRoleGraph);
    }

    #[test]
    fn test_find_self_loop() {
        let mut store = PolicyStore::new();
        store.add_role_assignment("root", "root");
        assert_eq!(
            RoleResolver::new(&store).find_cycle(),
            Some(vec!["root".to_string()])
        );
    }
}
