//! Store double for exercising failure paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use warden_core::{Page, Pagination, PermissionId, RoleId, UserId};

use crate::memory_store::InMemoryRbacStore;
use crate::model::{Permission, Role, RolePermissionAssignment, StoredUser, UserRoleAssignment};
use crate::store::{RbacStore, StoreError, StoreResult};

/// Wraps [`InMemoryRbacStore`], counting every call and failing selected
/// operations on demand.
#[derive(Debug, Default)]
pub(crate) struct FaultyStore {
    inner: InMemoryRbacStore,
    calls: AtomicUsize,
    fail_user_reads: AtomicBool,
    fail_role_grants: AtomicBool,
}

impl FaultyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `find_user` returns a backend error while set.
    pub(crate) fn fail_user_reads(&self, fail: bool) {
        self.fail_user_reads.store(fail, Ordering::SeqCst);
    }

    /// `insert_user_role` returns a backend error while set.
    pub(crate) fn fail_role_grants(&self, fail: bool) {
        self.fail_role_grants.store(fail, Ordering::SeqCst);
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl RbacStore for FaultyStore {
    fn insert_user(&self, user: StoredUser) -> StoreResult<StoredUser> {
        self.hit();
        self.inner.insert_user(user)
    }

    fn update_user(&self, user: StoredUser) -> StoreResult<StoredUser> {
        self.hit();
        self.inner.update_user(user)
    }

    fn delete_user(&self, id: UserId) -> StoreResult<()> {
        self.hit();
        self.inner.delete_user(id)
    }

    fn find_user(&self, id: UserId) -> StoreResult<Option<StoredUser>> {
        self.hit();
        if self.fail_user_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("user table unavailable".to_string()));
        }
        self.inner.find_user(id)
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        self.hit();
        self.inner.find_user_by_username(username)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        self.hit();
        self.inner.find_user_by_email(email)
    }

    fn list_users(&self, pagination: Pagination) -> StoreResult<Page<StoredUser>> {
        self.hit();
        self.inner.list_users(pagination)
    }

    fn count_users(&self) -> StoreResult<u64> {
        self.hit();
        self.inner.count_users()
    }

    fn insert_role(&self, role: Role) -> StoreResult<Role> {
        self.hit();
        self.inner.insert_role(role)
    }

    fn update_role(&self, role: Role) -> StoreResult<Role> {
        self.hit();
        self.inner.update_role(role)
    }

    fn delete_role(&self, id: RoleId) -> StoreResult<()> {
        self.hit();
        self.inner.delete_role(id)
    }

    fn find_role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        self.hit();
        self.inner.find_role(id)
    }

    fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        self.hit();
        self.inner.find_role_by_name(name)
    }

    fn list_roles(&self, pagination: Pagination) -> StoreResult<Page<Role>> {
        self.hit();
        self.inner.list_roles(pagination)
    }

    fn count_roles(&self) -> StoreResult<u64> {
        self.hit();
        self.inner.count_roles()
    }

    fn insert_permission(&self, permission: Permission) -> StoreResult<Permission> {
        self.hit();
        self.inner.insert_permission(permission)
    }

    fn update_permission(&self, permission: Permission) -> StoreResult<Permission> {
        self.hit();
        self.inner.update_permission(permission)
    }

    fn delete_permission(&self, id: PermissionId) -> StoreResult<()> {
        self.hit();
        self.inner.delete_permission(id)
    }

    fn find_permission(&self, id: PermissionId) -> StoreResult<Option<Permission>> {
        self.hit();
        self.inner.find_permission(id)
    }

    fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>> {
        self.hit();
        self.inner.find_permission_by_name(name)
    }

    fn find_permission_by_pair(&self, resource: &str, action: &str) -> StoreResult<Option<Permission>> {
        self.hit();
        self.inner.find_permission_by_pair(resource, action)
    }

    fn list_permissions(&self, pagination: Pagination) -> StoreResult<Page<Permission>> {
        self.hit();
        self.inner.list_permissions(pagination)
    }

    fn count_permissions(&self) -> StoreResult<u64> {
        self.hit();
        self.inner.count_permissions()
    }

    fn insert_user_role(&self, edge: UserRoleAssignment) -> StoreResult<UserRoleAssignment> {
        self.hit();
        if self.fail_role_grants.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("user_roles table unavailable".to_string()));
        }
        self.inner.insert_user_role(edge)
    }

    fn delete_user_role(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool> {
        self.hit();
        self.inner.delete_user_role(user_id, role_id)
    }

    fn find_user_role(&self, user_id: UserId, role_id: RoleId) -> StoreResult<Option<UserRoleAssignment>> {
        self.hit();
        self.inner.find_user_role(user_id, role_id)
    }

    fn user_roles_for_user(&self, user_id: UserId) -> StoreResult<Vec<UserRoleAssignment>> {
        self.hit();
        self.inner.user_roles_for_user(user_id)
    }

    fn user_roles_for_role(&self, role_id: RoleId) -> StoreResult<Vec<UserRoleAssignment>> {
        self.hit();
        self.inner.user_roles_for_role(role_id)
    }

    fn insert_role_permission(
        &self,
        edge: RolePermissionAssignment,
    ) -> StoreResult<RolePermissionAssignment> {
        self.hit();
        self.inner.insert_role_permission(edge)
    }

    fn delete_role_permission(&self, role_id: RoleId, permission_id: PermissionId) -> StoreResult<bool> {
        self.hit();
        self.inner.delete_role_permission(role_id, permission_id)
    }

    fn find_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<Option<RolePermissionAssignment>> {
        self.hit();
        self.inner.find_role_permission(role_id, permission_id)
    }

    fn role_permissions_for_role(&self, role_id: RoleId) -> StoreResult<Vec<RolePermissionAssignment>> {
        self.hit();
        self.inner.role_permissions_for_role(role_id)
    }

    fn role_permissions_for_permission(
        &self,
        permission_id: PermissionId,
    ) -> StoreResult<Vec<RolePermissionAssignment>> {
        self.hit();
        self.inner.role_permissions_for_permission(permission_id)
    }
}
