//! In-memory [`RbacStore`] for tests/dev.
//!
//! All tables live behind one `RwLock`, so every mutation (including the
//! uniqueness check that precedes it and the cascades that follow a delete)
//! is atomic with respect to concurrent callers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use warden_core::{Entity, Page, Pagination, PermissionId, RoleId, UserId};

use crate::model::{
    Permission, Role, RolePermissionAssignment, StoredUser, UserRoleAssignment,
};
use crate::store::{RbacStore, StoreError, StoreResult};

/// Keyed rows of one entity type.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: HashMap<E::Id, E>,
}

impl<E: Entity + Clone> Table<E> {
    fn new() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }

    fn get(&self, id: &E::Id) -> Option<E> {
        self.rows.get(id).cloned()
    }

    fn find(&self, pred: impl Fn(&E) -> bool) -> Option<E> {
        self.rows.values().find(|row| pred(row)).cloned()
    }

    /// Whether a row other than `except` satisfies `pred`.
    fn taken(&self, except: Option<&E::Id>, pred: impl Fn(&E) -> bool) -> bool {
        self.rows
            .iter()
            .any(|(id, row)| Some(id) != except && pred(row))
    }

    /// Newest first; UUIDv7 ids break timestamp ties.
    fn page(&self, pagination: Pagination) -> Page<E>
    where
        E::Id: Ord,
    {
        let mut all: Vec<E> = self.rows.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(a.id()))
        });
        Page::from_ordered(all, pagination)
    }

    fn len(&self) -> u64 {
        self.rows.len() as u64
    }
}

#[derive(Debug)]
struct Tables {
    users: Table<StoredUser>,
    roles: Table<Role>,
    permissions: Table<Permission>,
    user_roles: Vec<UserRoleAssignment>,
    role_permissions: Vec<RolePermissionAssignment>,
}

/// In-memory store. Not optimized for performance.
#[derive(Debug)]
pub struct InMemoryRbacStore {
    tables: RwLock<Tables>,
}

impl InMemoryRbacStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                users: Table::new(),
                roles: Table::new(),
                permissions: Table::new(),
                user_roles: Vec::new(),
                role_permissions: Vec::new(),
            }),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

impl Default for InMemoryRbacStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_user_unique(t: &Tables, user: &StoredUser, except: Option<&UserId>) -> StoreResult<()> {
    if t.users.taken(except, |u| u.username == user.username) {
        return Err(StoreError::UniqueViolation {
            entity: "user",
            field: "username",
        });
    }
    if t.users.taken(except, |u| u.email == user.email) {
        return Err(StoreError::UniqueViolation {
            entity: "user",
            field: "email",
        });
    }
    Ok(())
}

fn check_role_unique(t: &Tables, role: &Role, except: Option<&RoleId>) -> StoreResult<()> {
    if t.roles.taken(except, |r| r.name == role.name) {
        return Err(StoreError::UniqueViolation {
            entity: "role",
            field: "name",
        });
    }
    Ok(())
}

fn check_permission_unique(
    t: &Tables,
    permission: &Permission,
    except: Option<&PermissionId>,
) -> StoreResult<()> {
    let taken = t.permissions.taken(except, |p| {
        p.name == permission.name
            || (p.resource == permission.resource && p.action == permission.action)
    });
    if taken {
        return Err(StoreError::UniqueViolation {
            entity: "permission",
            field: "name",
        });
    }
    Ok(())
}

impl RbacStore for InMemoryRbacStore {
    fn insert_user(&self, user: StoredUser) -> StoreResult<StoredUser> {
        let mut t = self.write()?;
        check_user_unique(&t, &user, None)?;
        t.users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    fn update_user(&self, user: StoredUser) -> StoreResult<StoredUser> {
        let mut t = self.write()?;
        if !t.users.rows.contains_key(&user.id) {
            return Err(StoreError::missing("user", user.id));
        }
        check_user_unique(&t, &user, Some(&user.id))?;
        t.users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.users.rows.remove(&id).is_none() {
            return Err(StoreError::missing("user", id));
        }
        t.user_roles.retain(|e| e.user_id != id);
        Ok(())
    }

    fn find_user(&self, id: UserId) -> StoreResult<Option<StoredUser>> {
        Ok(self.read()?.users.get(&id))
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        Ok(self.read()?.users.find(|u| u.username == username))
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        Ok(self.read()?.users.find(|u| u.email == email))
    }

    fn list_users(&self, pagination: Pagination) -> StoreResult<Page<StoredUser>> {
        Ok(self.read()?.users.page(pagination))
    }

    fn count_users(&self) -> StoreResult<u64> {
        Ok(self.read()?.users.len())
    }

    fn insert_role(&self, role: Role) -> StoreResult<Role> {
        let mut t = self.write()?;
        check_role_unique(&t, &role, None)?;
        t.roles.rows.insert(role.id, role.clone());
        Ok(role)
    }

    fn update_role(&self, role: Role) -> StoreResult<Role> {
        let mut t = self.write()?;
        if !t.roles.rows.contains_key(&role.id) {
            return Err(StoreError::missing("role", role.id));
        }
        check_role_unique(&t, &role, Some(&role.id))?;
        t.roles.rows.insert(role.id, role.clone());
        Ok(role)
    }

    fn delete_role(&self, id: RoleId) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.roles.rows.remove(&id).is_none() {
            return Err(StoreError::missing("role", id));
        }
        t.user_roles.retain(|e| e.role_id != id);
        t.role_permissions.retain(|e| e.role_id != id);
        Ok(())
    }

    fn find_role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        Ok(self.read()?.roles.get(&id))
    }

    fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        Ok(self.read()?.roles.find(|r| r.name.as_str() == name))
    }

    fn list_roles(&self, pagination: Pagination) -> StoreResult<Page<Role>> {
        Ok(self.read()?.roles.page(pagination))
    }

    fn count_roles(&self) -> StoreResult<u64> {
        Ok(self.read()?.roles.len())
    }

    fn insert_permission(&self, permission: Permission) -> StoreResult<Permission> {
        let mut t = self.write()?;
        check_permission_unique(&t, &permission, None)?;
        t.permissions.rows.insert(permission.id, permission.clone());
        Ok(permission)
    }

    fn update_permission(&self, permission: Permission) -> StoreResult<Permission> {
        let mut t = self.write()?;
        if !t.permissions.rows.contains_key(&permission.id) {
            return Err(StoreError::missing("permission", permission.id));
        }
        check_permission_unique(&t, &permission, Some(&permission.id))?;
        t.permissions.rows.insert(permission.id, permission.clone());
        Ok(permission)
    }

    fn delete_permission(&self, id: PermissionId) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.permissions.rows.remove(&id).is_none() {
            return Err(StoreError::missing("permission", id));
        }
        t.role_permissions.retain(|e| e.permission_id != id);
        Ok(())
    }

    fn find_permission(&self, id: PermissionId) -> StoreResult<Option<Permission>> {
        Ok(self.read()?.permissions.get(&id))
    }

    fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>> {
        Ok(self.read()?.permissions.find(|p| p.name == name))
    }

    fn find_permission_by_pair(
        &self,
        resource: &str,
        action: &str,
    ) -> StoreResult<Option<Permission>> {
        Ok(self
            .read()?
            .permissions
            .find(|p| p.resource == resource && p.action == action))
    }

    fn list_permissions(&self, pagination: Pagination) -> StoreResult<Page<Permission>> {
        Ok(self.read()?.permissions.page(pagination))
    }

    fn count_permissions(&self) -> StoreResult<u64> {
        Ok(self.read()?.permissions.len())
    }

    fn insert_user_role(&self, edge: UserRoleAssignment) -> StoreResult<UserRoleAssignment> {
        let mut t = self.write()?;
        if !t.users.rows.contains_key(&edge.user_id) {
            return Err(StoreError::foreign_key("user", edge.user_id));
        }
        if !t.roles.rows.contains_key(&edge.role_id) {
            return Err(StoreError::foreign_key("role", edge.role_id));
        }
        if t
            .user_roles
            .iter()
            .any(|e| e.user_id == edge.user_id && e.role_id == edge.role_id)
        {
            return Err(StoreError::UniqueViolation {
                entity: "user_role",
                field: "(user_id, role_id)",
            });
        }
        t.user_roles.push(edge.clone());
        Ok(edge)
    }

    fn delete_user_role(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool> {
        let mut t = self.write()?;
        let before = t.user_roles.len();
        t.user_roles
            .retain(|e| !(e.user_id == user_id && e.role_id == role_id));
        Ok(t.user_roles.len() != before)
    }

    fn find_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> StoreResult<Option<UserRoleAssignment>> {
        Ok(self
            .read()?
            .user_roles
            .iter()
            .find(|e| e.user_id == user_id && e.role_id == role_id)
            .cloned())
    }

    fn user_roles_for_user(&self, user_id: UserId) -> StoreResult<Vec<UserRoleAssignment>> {
        Ok(self
            .read()?
            .user_roles
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    fn user_roles_for_role(&self, role_id: RoleId) -> StoreResult<Vec<UserRoleAssignment>> {
        Ok(self
            .read()?
            .user_roles
            .iter()
            .filter(|e| e.role_id == role_id)
            .cloned()
            .collect())
    }

    fn insert_role_permission(
        &self,
        edge: RolePermissionAssignment,
    ) -> StoreResult<RolePermissionAssignment> {
        let mut t = self.write()?;
        if !t.roles.rows.contains_key(&edge.role_id) {
            return Err(StoreError::foreign_key("role", edge.role_id));
        }
        if !t.permissions.rows.contains_key(&edge.permission_id) {
            return Err(StoreError::foreign_key("permission", edge.permission_id));
        }
        if t
            .role_permissions
            .iter()
            .any(|e| e.role_id == edge.role_id && e.permission_id == edge.permission_id)
        {
            return Err(StoreError::UniqueViolation {
                entity: "role_permission",
                field: "(role_id, permission_id)",
            });
        }
        t.role_permissions.push(edge.clone());
        Ok(edge)
    }

    fn delete_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        let mut t = self.write()?;
        let before = t.role_permissions.len();
        t.role_permissions
            .retain(|e| !(e.role_id == role_id && e.permission_id == permission_id));
        Ok(t.role_permissions.len() != before)
    }

    fn find_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<Option<RolePermissionAssignment>> {
        Ok(self
            .read()?
            .role_permissions
            .iter()
            .find(|e| e.role_id == role_id && e.permission_id == permission_id)
            .cloned())
    }

    fn role_permissions_for_role(
        &self,
        role_id: RoleId,
    ) -> StoreResult<Vec<RolePermissionAssignment>> {
        Ok(self
            .read()?
            .role_permissions
            .iter()
            .filter(|e| e.role_id == role_id)
            .cloned()
            .collect())
    }

    fn role_permissions_for_permission(
        &self,
        permission_id: PermissionId,
    ) -> StoreResult<Vec<RolePermissionAssignment>> {
        Ok(self
            .read()?
            .role_permissions
            .iter()
            .filter(|e| e.permission_id == permission_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::RoleName;

    fn role(name: &'static str) -> Role {
        let now = Utc::now();
        Role {
            id: RoleId::new(),
            name: RoleName::new(name),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn permission(resource: &str, action: &str) -> Permission {
        let now = Utc::now();
        Permission {
            id: PermissionId::new(),
            name: format!("{resource}:{action}"),
            resource: resource.to_string(),
            action: action.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(name: &str) -> StoredUser {
        let now = Utc::now();
        StoredUser {
            id: UserId::new(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "hash".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let store = InMemoryRbacStore::new();
        store.insert_user(user("alice")).unwrap();

        let mut dup = user("alice");
        dup.email = "other@example.com".to_string();
        let err = store.insert_user(dup).unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                entity: "user",
                field: "username"
            }
        );
    }

    #[test]
    fn update_may_keep_its_own_unique_values() {
        let store = InMemoryRbacStore::new();
        let mut alice = store.insert_user(user("alice")).unwrap();
        alice.is_active = false;
        assert!(store.update_user(alice).is_ok());
    }

    #[test]
    fn same_pair_under_another_name_is_rejected() {
        let store = InMemoryRbacStore::new();
        store.insert_permission(permission("content", "read")).unwrap();
        let mut sneaky = permission("content", "read");
        sneaky.name = "content.read".to_string();
        assert!(store.insert_permission(sneaky).is_err());
    }

    #[test]
    fn deleting_a_role_cascades_both_junctions() {
        let store = InMemoryRbacStore::new();
        let u = store.insert_user(user("bob")).unwrap();
        let r = store.insert_role(role("editor")).unwrap();
        let p = store.insert_permission(permission("content", "update")).unwrap();
        let now = Utc::now();
        store
            .insert_user_role(UserRoleAssignment {
                user_id: u.id,
                role_id: r.id,
                assigned_by: None,
                assigned_at: now,
            })
            .unwrap();
        store
            .insert_role_permission(RolePermissionAssignment {
                role_id: r.id,
                permission_id: p.id,
                assigned_by: None,
                assigned_at: now,
            })
            .unwrap();

        store.delete_role(r.id).unwrap();

        assert!(store.user_roles_for_user(u.id).unwrap().is_empty());
        assert!(store.role_permissions_for_permission(p.id).unwrap().is_empty());
    }

    #[test]
    fn edge_requires_existing_parents() {
        let store = InMemoryRbacStore::new();
        let r = store.insert_role(role("editor")).unwrap();
        let err = store
            .insert_role_permission(RolePermissionAssignment {
                role_id: r.id,
                permission_id: PermissionId::new(),
                assigned_by: None,
                assigned_at: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey { entity: "permission", .. }));
    }

    #[test]
    fn listing_is_newest_first() {
        let store = InMemoryRbacStore::new();
        let mut old = role("old");
        old.created_at = Utc::now() - Duration::hours(1);
        store.insert_role(old).unwrap();
        store.insert_role(role("new")).unwrap();

        let page = store.list_roles(Pagination::default()).unwrap();
        let names: Vec<&str> = page.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["new", "old"]);
        assert_eq!(store.count_roles().unwrap(), 2);
    }

    #[test]
    fn concurrent_duplicate_edges_have_one_winner() {
        let store = Arc::new(InMemoryRbacStore::new());
        let r = store.insert_role(role("editor")).unwrap();
        let p = store.insert_permission(permission("content", "read")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.insert_role_permission(RolePermissionAssignment {
                        role_id: r.id,
                        permission_id: p.id,
                        assigned_by: None,
                        assigned_at: Utc::now(),
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.role_permissions_for_role(r.id).unwrap().len(), 1);
    }
}
