//! Effective-permission resolution across a user's active roles.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use warden_core::{DomainError, DomainResult, PermissionId, UserId};

use crate::graph::RoleGraph;
use crate::model::{Permission, Role};
use crate::store::RbacStore;
use crate::PermissionCheck;

/// A user's active roles and deduplicated effective permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grants {
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Grants {
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.as_str().to_string()).collect()
    }

    pub fn permission_names(&self) -> Vec<String> {
        self.permissions.iter().map(|p| p.name.clone()).collect()
    }
}

/// Merge per-role permission batches into one ordered, deduplicated list.
///
/// Each batch is tagged with the position of its role in the user's
/// assignment order. Batches may arrive in any order; the result depends only
/// on the tags. Identity is the permission id, so the same row granted by two
/// roles appears once, at its first position.
pub fn merge_permissions(mut batches: Vec<(usize, Vec<Permission>)>) -> Vec<Permission> {
    batches.sort_by_key(|(position, _)| *position);

    let mut seen: HashSet<PermissionId> = HashSet::new();
    let mut merged = Vec::new();
    for (_, batch) in batches {
        for permission in batch {
            if seen.insert(permission.id) {
                merged.push(permission);
            }
        }
    }
    merged
}

pub struct PermissionResolver<S> {
    graph: RoleGraph<S>,
    store: Arc<S>,
    parallel_lookups: bool,
}

impl<S> Clone for PermissionResolver<S> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            store: self.store.clone(),
            parallel_lookups: self.parallel_lookups,
        }
    }
}

impl<S: RbacStore> PermissionResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            graph: RoleGraph::new(store.clone()),
            store,
            parallel_lookups: false,
        }
    }

    /// Fan per-role lookups out over scoped threads. Worth it only when the
    /// store has real latency.
    pub fn with_parallel_lookups(mut self, enabled: bool) -> Self {
        self.parallel_lookups = enabled;
        self
    }

    /// Union of the permissions of the user's active roles, deduplicated by
    /// permission id, in first-seen order.
    pub fn get_user_permissions(&self, user_id: UserId) -> DomainResult<Vec<Permission>> {
        let roles = self.graph.get_user_roles(user_id)?;
        let batches = self.fetch_batches(&roles)?;
        let merged = merge_permissions(batches);
        debug!(user_id = %user_id, roles = roles.len(), permissions = merged.len(), "permissions resolved");
        Ok(merged)
    }

    /// Exact, case-sensitive match on both resource and action.
    pub fn has_permission(&self, user_id: UserId, check: &PermissionCheck) -> DomainResult<bool> {
        Ok(self
            .get_user_permissions(user_id)?
            .iter()
            .any(|p| p.resource == check.resource && p.action == check.action))
    }

    /// Whether the user holds an active role with exactly this name.
    pub fn has_role(&self, user_id: UserId, role_name: &str) -> DomainResult<bool> {
        self.graph.has_role(user_id, role_name)
    }

    /// Roles and permissions for token minting and live authorization.
    ///
    /// Unknown or inactive users resolve to empty grants.
    pub fn get_user_grants(&self, user_id: UserId) -> DomainResult<Grants> {
        match self.store.find_user(user_id)? {
            Some(user) if user.is_active => {}
            _ => return Ok(Grants::default()),
        }

        let roles = self.graph.get_user_roles(user_id)?;
        let permissions = merge_permissions(self.fetch_batches(&roles)?);
        Ok(Grants { roles, permissions })
    }

    fn fetch_batches(&self, roles: &[Role]) -> DomainResult<Vec<(usize, Vec<Permission>)>> {
        if !self.parallel_lookups || roles.len() < 2 {
            return roles
                .iter()
                .enumerate()
                .map(|(position, role)| Ok((position, self.graph.get_role_permissions(role.id)?)))
                .collect();
        }

        let graph = &self.graph;
        std::thread::scope(|scope| {
            let handles: Vec<_> = roles
                .iter()
                .enumerate()
                .map(|(position, role)| {
                    let role_id = role.id;
                    scope.spawn(move || {
                        graph
                            .get_role_permissions(role_id)
                            .map(|batch| (position, batch))
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| -> DomainResult<(usize, Vec<Permission>)> {
                    handle
                        .join()
                        .map_err(|_| DomainError::internal("permission lookup panicked"))?
                })
                .collect()
        })
    }
}
