//! Role-permission graph: the role/permission catalog and the two
//! many-to-many junctions (user↔role, role↔permission).
//!
//! Read queries join to the related entity's active flag. An inactive role
//! keeps its edges but is invisible to every query here, which is what makes
//! deactivation reversible.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use warden_core::{DomainError, DomainResult, Page, Pagination, PermissionId, RoleId, UserId};

use crate::model::{Permission, Role, RolePermissionAssignment, UserRecord, UserRoleAssignment};
use crate::store::RbacStore;
use crate::{PermissionCheck, RoleName};

#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// Partial role update. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPermission {
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

/// Partial permission update. Changing resource or action re-derives the name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionChanges {
    pub resource: Option<String>,
    pub action: Option<String>,
    pub description: Option<Option<String>>,
}

pub struct RoleGraph<S> {
    store: Arc<S>,
}

impl<S> Clone for RoleGraph<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: RbacStore> RoleGraph<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role catalog
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_role(&self, new: NewRole) -> DomainResult<Role> {
        let name = RoleName::parse(&new.name)?;
        if self.store.find_role_by_name(name.as_str())?.is_some() {
            return Err(DomainError::conflict(format!("role '{name}' already exists")));
        }

        let now = Utc::now();
        let role = self.store.insert_role(Role {
            id: RoleId::new(),
            name,
            description: new.description,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        })?;
        info!(role_id = %role.id, role = %role.name, "role created");
        Ok(role)
    }

    pub fn update_role(&self, id: RoleId, changes: RoleChanges) -> DomainResult<Role> {
        let mut role = self.require_role(id)?;

        if let Some(name) = changes.name {
            let name = RoleName::parse(&name)?;
            if name != role.name && self.store.find_role_by_name(name.as_str())?.is_some() {
                return Err(DomainError::conflict(format!("role '{name}' already exists")));
            }
            role.name = name;
        }
        if let Some(description) = changes.description {
            role.description = description;
        }
        if let Some(is_active) = changes.is_active {
            role.is_active = is_active;
        }
        role.updated_at = Utc::now();

        let role = self.store.update_role(role)?;
        info!(role_id = %role.id, is_active = role.is_active, "role updated");
        Ok(role)
    }

    /// Delete a role and every edge touching it.
    pub fn delete_role(&self, id: RoleId) -> DomainResult<()> {
        self.store.delete_role(id)?;
        info!(role_id = %id, "role deleted");
        Ok(())
    }

    pub fn get_role(&self, id: RoleId) -> DomainResult<Option<Role>> {
        Ok(self.store.find_role(id)?)
    }

    pub fn find_role_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        Ok(self.store.find_role_by_name(name)?)
    }

    pub fn list_roles(&self, pagination: Pagination) -> DomainResult<Page<Role>> {
        Ok(self.store.list_roles(pagination)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission catalog
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_permission(&self, new: NewPermission) -> DomainResult<Permission> {
        let check = PermissionCheck::validated(&new.resource, &new.action)?;
        if self
            .store
            .find_permission_by_pair(&check.resource, &check.action)?
            .is_some()
        {
            return Err(DomainError::conflict(format!(
                "permission '{check}' already exists"
            )));
        }

        let now = Utc::now();
        let permission = self.store.insert_permission(Permission {
            id: PermissionId::new(),
            name: check.name(),
            resource: check.resource,
            action: check.action,
            description: new.description,
            created_at: now,
            updated_at: now,
        })?;
        info!(permission_id = %permission.id, permission = %permission.name, "permission created");
        Ok(permission)
    }

    pub fn update_permission(
        &self,
        id: PermissionId,
        changes: PermissionChanges,
    ) -> DomainResult<Permission> {
        let mut permission = self
            .store
            .find_permission(id)?
            .ok_or_else(|| DomainError::not_found(format!("permission {id}")))?;

        if changes.resource.is_some() || changes.action.is_some() {
            let resource = changes.resource.unwrap_or_else(|| permission.resource.clone());
            let action = changes.action.unwrap_or_else(|| permission.action.clone());
            let check = PermissionCheck::validated(&resource, &action)?;
            if let Some(existing) = self
                .store
                .find_permission_by_pair(&check.resource, &check.action)?
            {
                if existing.id != id {
                    return Err(DomainError::conflict(format!(
                        "permission '{check}' already exists"
                    )));
                }
            }
            permission.name = check.name();
            permission.resource = check.resource;
            permission.action = check.action;
        }
        if let Some(description) = changes.description {
            permission.description = description;
        }
        permission.updated_at = Utc::now();

        Ok(self.store.update_permission(permission)?)
    }

    /// Delete a permission and its role edges.
    pub fn delete_permission(&self, id: PermissionId) -> DomainResult<()> {
        self.store.delete_permission(id)?;
        info!(permission_id = %id, "permission deleted");
        Ok(())
    }

    pub fn get_permission(&self, id: PermissionId) -> DomainResult<Option<Permission>> {
        Ok(self.store.find_permission(id)?)
    }

    pub fn find_permission(&self, resource: &str, action: &str) -> DomainResult<Option<Permission>> {
        Ok(self.store.find_permission_by_pair(resource, action)?)
    }

    /// Look up by name; the legacy `resource.action` spelling is accepted.
    pub fn find_permission_by_name(&self, name: &str) -> DomainResult<Option<Permission>> {
        match PermissionCheck::parse(name) {
            Some(check) => self.find_permission(&check.resource, &check.action),
            None => Ok(None),
        }
    }

    pub fn list_permissions(&self, pagination: Pagination) -> DomainResult<Page<Permission>> {
        Ok(self.store.list_permissions(pagination)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Junction mutations (one row per call)
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant a role to a user. Re-assigning an existing pair is a Conflict.
    pub fn assign_role_to_user(
        &self,
        user_id: UserId,
        role_id: RoleId,
        assigned_by: Option<UserId>,
    ) -> DomainResult<UserRoleAssignment> {
        if self.store.find_user(user_id)?.is_none() {
            return Err(DomainError::not_found(format!("user {user_id}")));
        }
        self.require_role(role_id)?;
        if self.store.find_user_role(user_id, role_id)?.is_some() {
            return Err(DomainError::conflict("role already assigned to user"));
        }

        let edge = self.store.insert_user_role(UserRoleAssignment {
            user_id,
            role_id,
            assigned_by,
            assigned_at: Utc::now(),
        })?;
        info!(user_id = %user_id, role_id = %role_id, "role assigned to user");
        Ok(edge)
    }

    pub fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> DomainResult<()> {
        if !self.store.delete_user_role(user_id, role_id)? {
            return Err(DomainError::not_found("role is not assigned to user"));
        }
        info!(user_id = %user_id, role_id = %role_id, "role removed from user");
        Ok(())
    }

    /// Grant a permission to a role. Re-assigning an existing pair is a Conflict.
    pub fn assign_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        assigned_by: Option<UserId>,
    ) -> DomainResult<RolePermissionAssignment> {
        self.require_role(role_id)?;
        if self.store.find_permission(permission_id)?.is_none() {
            return Err(DomainError::not_found(format!("permission {permission_id}")));
        }
        if self.store.find_role_permission(role_id, permission_id)?.is_some() {
            return Err(DomainError::conflict("permission already assigned to role"));
        }

        let edge = self.store.insert_role_permission(RolePermissionAssignment {
            role_id,
            permission_id,
            assigned_by,
            assigned_at: Utc::now(),
        })?;
        info!(role_id = %role_id, permission_id = %permission_id, "permission assigned to role");
        Ok(edge)
    }

    pub fn remove_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> DomainResult<()> {
        if !self.store.delete_role_permission(role_id, permission_id)? {
            return Err(DomainError::not_found("permission is not assigned to role"));
        }
        info!(role_id = %role_id, permission_id = %permission_id, "permission removed from role");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Active-filtered queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Permissions granted by a role, in assignment order. Empty when the role
    /// is inactive or unknown.
    pub fn get_role_permissions(&self, role_id: RoleId) -> DomainResult<Vec<Permission>> {
        match self.store.find_role(role_id)? {
            Some(role) if role.is_active => {}
            _ => return Ok(Vec::new()),
        }

        let mut out = Vec::new();
        for edge in self.store.role_permissions_for_role(role_id)? {
            if let Some(permission) = self.store.find_permission(edge.permission_id)? {
                out.push(permission);
            }
        }
        Ok(out)
    }

    /// Active roles held by a user, in assignment order.
    pub fn get_user_roles(&self, user_id: UserId) -> DomainResult<Vec<Role>> {
        let mut out = Vec::new();
        for edge in self.store.user_roles_for_user(user_id)? {
            if let Some(role) = self.store.find_role(edge.role_id)? {
                if role.is_active {
                    out.push(role);
                }
            }
        }
        Ok(out)
    }

    /// Active roles granting a permission.
    pub fn get_permission_roles(&self, permission_id: PermissionId) -> DomainResult<Vec<Role>> {
        let mut out = Vec::new();
        for edge in self.store.role_permissions_for_permission(permission_id)? {
            if let Some(role) = self.store.find_role(edge.role_id)? {
                if role.is_active {
                    out.push(role);
                }
            }
        }
        Ok(out)
    }

    /// Active users holding a role. Empty when the role is inactive.
    pub fn get_role_users(&self, role_id: RoleId) -> DomainResult<Vec<UserRecord>> {
        match self.store.find_role(role_id)? {
            Some(role) if role.is_active => {}
            _ => return Ok(Vec::new()),
        }

        let mut out = Vec::new();
        for edge in self.store.user_roles_for_role(role_id)? {
            if let Some(user) = self.store.find_user(edge.user_id)? {
                if user.is_active {
                    out.push(user.to_record());
                }
            }
        }
        Ok(out)
    }

    /// Whether an active role grants the named permission (either spelling).
    pub fn has_permission(&self, role_id: RoleId, permission_name: &str) -> DomainResult<bool> {
        let Some(wanted) = PermissionCheck::parse(permission_name) else {
            return Ok(false);
        };
        Ok(self
            .get_role_permissions(role_id)?
            .iter()
            .any(|p| p.resource == wanted.resource && p.action == wanted.action))
    }

    /// Whether the user holds an active role with exactly this name.
    pub fn has_role(&self, user_id: UserId, role_name: &str) -> DomainResult<bool> {
        Ok(self
            .get_user_roles(user_id)?
            .iter()
            .any(|r| r.name.as_str() == role_name))
    }

    fn require_role(&self, id: RoleId) -> DomainResult<Role> {
        self.store
            .find_role(id)?
            .ok_or_else(|| DomainError::not_found(format!("role {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{IdentityDirectory, NewIdentity};
    use crate::memory_store::InMemoryRbacStore;
    use warden_core::ErrorKind;

    struct Fixture {
        graph: RoleGraph<InMemoryRbacStore>,
        directory: IdentityDirectory<InMemoryRbacStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryRbacStore::new());
        Fixture {
            graph: RoleGraph::new(store.clone()),
            directory: IdentityDirectory::new(store),
        }
    }

    fn role(graph: &RoleGraph<InMemoryRbacStore>, name: &str) -> Role {
        graph
            .create_role(NewRole {
                name: name.to_string(),
                description: None,
                is_active: true,
            })
            .unwrap()
    }

    fn permission(graph: &RoleGraph<InMemoryRbacStore>, resource: &str, action: &str) -> Permission {
        graph
            .create_permission(NewPermission {
                resource: resource.to_string(),
                action: action.to_string(),
                description: None,
            })
            .unwrap()
    }

    fn user(fx: &Fixture, username: &str) -> UserRecord {
        fx.directory
            .create_identity(NewIdentity {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: "password".to_string(),
                is_active: true,
            })
            .unwrap()
    }

    #[test]
    fn permission_name_is_derived() {
        let fx = fixture();
        let p = permission(&fx.graph, "content", "read");
        assert_eq!(p.name, "content:read");
        assert_eq!(
            fx.graph.find_permission_by_name("content.read").unwrap().unwrap().id,
            p.id
        );
    }

    #[test]
    fn duplicate_role_permission_edge_conflicts_and_graph_is_unchanged() {
        let fx = fixture();
        let editor = role(&fx.graph, "editor");
        let read = permission(&fx.graph, "content", "read");

        fx.graph.assign_permission_to_role(editor.id, read.id, None).unwrap();
        let err = fx
            .graph
            .assign_permission_to_role(editor.id, read.id, None)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(fx.graph.get_role_permissions(editor.id).unwrap(), vec![read]);
    }

    #[test]
    fn duplicate_user_role_edge_conflicts() {
        let fx = fixture();
        let alice = user(&fx, "alice");
        let editor = role(&fx.graph, "editor");

        fx.graph.assign_role_to_user(alice.id, editor.id, None).unwrap();
        let err = fx
            .graph
            .assign_role_to_user(alice.id, editor.id, None)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(fx.graph.get_user_roles(alice.id).unwrap().len(), 1);
    }

    #[test]
    fn assigning_unknown_endpoints_is_not_found() {
        let fx = fixture();
        let editor = role(&fx.graph, "editor");
        let err = fx
            .graph
            .assign_permission_to_role(editor.id, PermissionId::new(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = fx
            .graph
            .assign_role_to_user(UserId::new(), editor.id, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn inactive_role_is_hidden_but_edges_persist() {
        let fx = fixture();
        let alice = user(&fx, "alice");
        let editor = role(&fx.graph, "editor");
        let update = permission(&fx.graph, "content", "update");
        fx.graph.assign_role_to_user(alice.id, editor.id, None).unwrap();
        fx.graph.assign_permission_to_role(editor.id, update.id, None).unwrap();

        fx.graph
            .update_role(
                editor.id,
                RoleChanges {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(fx.graph.get_user_roles(alice.id).unwrap().is_empty());
        assert!(fx.graph.get_role_permissions(editor.id).unwrap().is_empty());
        assert!(fx.graph.get_permission_roles(update.id).unwrap().is_empty());
        assert!(fx.graph.get_role_users(editor.id).unwrap().is_empty());
        assert!(!fx.graph.has_role(alice.id, "editor").unwrap());
        assert!(!fx.graph.has_permission(editor.id, "content:update").unwrap());

        fx.graph
            .update_role(
                editor.id,
                RoleChanges {
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(fx.graph.has_role(alice.id, "editor").unwrap());
        assert!(fx.graph.has_permission(editor.id, "content.update").unwrap());
    }

    #[test]
    fn removing_a_missing_edge_is_not_found() {
        let fx = fixture();
        let editor = role(&fx.graph, "editor");
        let read = permission(&fx.graph, "content", "read");
        let err = fx
            .graph
            .remove_permission_from_role(editor.id, read.id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn deleting_a_permission_detaches_it_from_roles() {
        let fx = fixture();
        let editor = role(&fx.graph, "editor");
        let read = permission(&fx.graph, "content", "read");
        fx.graph.assign_permission_to_role(editor.id, read.id, None).unwrap();

        fx.graph.delete_permission(read.id).unwrap();

        assert!(fx.graph.get_role_permissions(editor.id).unwrap().is_empty());
    }

    #[test]
    fn renaming_permission_pair_rederives_name_and_checks_conflicts() {
        let fx = fixture();
        let read = permission(&fx.graph, "content", "read");
        permission(&fx.graph, "content", "list");

        let err = fx
            .graph
            .update_permission(
                read.id,
                PermissionChanges {
                    action: Some("list".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let renamed = fx
            .graph
            .update_permission(
                read.id,
                PermissionChanges {
                    resource: Some("articles".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "articles:read");
    }

    #[test]
    fn role_users_excludes_inactive_users() {
        let fx = fixture();
        let alice = user(&fx, "alice");
        let bob = user(&fx, "bob");
        let editor = role(&fx.graph, "editor");
        fx.graph.assign_role_to_user(alice.id, editor.id, None).unwrap();
        fx.graph.assign_role_to_user(bob.id, editor.id, Some(alice.id)).unwrap();
        fx.directory
            .update_identity(
                bob.id,
                crate::directory::IdentityChanges {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        let users = fx.graph.get_role_users(editor.id).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, alice.id);
    }
}
