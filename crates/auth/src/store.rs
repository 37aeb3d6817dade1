//! Persistence contract consumed by the authorization core.
//!
//! The core never talks to a database directly: every component receives an
//! explicitly constructed store handle. Implementations must enforce the
//! unique keys listed on each method and cascade edge removal on delete.

use thiserror::Error;

use warden_core::{DomainError, Page, Pagination, PermissionId, RoleId, UserId};

use crate::model::{
    Permission, Role, RolePermissionAssignment, StoredUser, UserRoleAssignment,
};

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique key is already taken.
    #[error("unique constraint violated: {entity}.{field}")]
    UniqueViolation {
        entity: &'static str,
        field: &'static str,
    },

    /// Update/delete targeted a row that does not exist.
    #[error("{entity} {id} does not exist")]
    MissingRow { entity: &'static str, id: String },

    /// An edge referenced a parent row that does not exist.
    #[error("foreign key violated: {entity} {id} does not exist")]
    ForeignKey { entity: &'static str, id: String },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn missing(entity: &'static str, id: impl ToString) -> Self {
        Self::MissingRow {
            entity,
            id: id.to_string(),
        }
    }

    pub fn foreign_key(entity: &'static str, id: impl ToString) -> Self {
        Self::ForeignKey {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { entity, field } => {
                DomainError::conflict(format!("{entity} with this {field} already exists"))
            }
            StoreError::MissingRow { entity, id } | StoreError::ForeignKey { entity, id } => {
                DomainError::not_found(format!("{entity} {id}"))
            }
            StoreError::Backend(msg) => DomainError::internal(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Typed CRUD, exact-match lookup and paginated listing over the four
/// entities and two junction tables.
///
/// Listings are ordered by creation time, newest first. Edge queries return
/// rows in assignment order.
pub trait RbacStore: Send + Sync {
    // ── users ───────────────────────────────────────────────────────────────

    /// Unique: `username`, `email`.
    fn insert_user(&self, user: StoredUser) -> StoreResult<StoredUser>;
    fn update_user(&self, user: StoredUser) -> StoreResult<StoredUser>;
    /// Also removes every user↔role edge of the user.
    fn delete_user(&self, id: UserId) -> StoreResult<()>;
    fn find_user(&self, id: UserId) -> StoreResult<Option<StoredUser>>;
    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<StoredUser>>;
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>>;
    fn list_users(&self, pagination: Pagination) -> StoreResult<Page<StoredUser>>;
    fn count_users(&self) -> StoreResult<u64>;

    // ── roles ───────────────────────────────────────────────────────────────

    /// Unique: `name`.
    fn insert_role(&self, role: Role) -> StoreResult<Role>;
    fn update_role(&self, role: Role) -> StoreResult<Role>;
    /// Also removes the role's edges in both junctions.
    fn delete_role(&self, id: RoleId) -> StoreResult<()>;
    fn find_role(&self, id: RoleId) -> StoreResult<Option<Role>>;
    fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;
    fn list_roles(&self, pagination: Pagination) -> StoreResult<Page<Role>>;
    fn count_roles(&self) -> StoreResult<u64>;

    // ── permissions ─────────────────────────────────────────────────────────

    /// Unique: `name` (equivalently `(resource, action)`).
    fn insert_permission(&self, permission: Permission) -> StoreResult<Permission>;
    fn update_permission(&self, permission: Permission) -> StoreResult<Permission>;
    /// Also removes every role↔permission edge of the permission.
    fn delete_permission(&self, id: PermissionId) -> StoreResult<()>;
    fn find_permission(&self, id: PermissionId) -> StoreResult<Option<Permission>>;
    fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>>;
    fn find_permission_by_pair(
        &self,
        resource: &str,
        action: &str,
    ) -> StoreResult<Option<Permission>>;
    fn list_permissions(&self, pagination: Pagination) -> StoreResult<Page<Permission>>;
    fn count_permissions(&self) -> StoreResult<u64>;

    // ── user ↔ role ─────────────────────────────────────────────────────────

    /// Unique: `(user_id, role_id)`. Both parents must exist.
    fn insert_user_role(&self, edge: UserRoleAssignment) -> StoreResult<UserRoleAssignment>;
    /// Returns whether an edge was removed.
    fn delete_user_role(&self, user_id: UserId, role_id: RoleId) -> StoreResult<bool>;
    fn find_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> StoreResult<Option<UserRoleAssignment>>;
    fn user_roles_for_user(&self, user_id: UserId) -> StoreResult<Vec<UserRoleAssignment>>;
    fn user_roles_for_role(&self, role_id: RoleId) -> StoreResult<Vec<UserRoleAssignment>>;

    // ── role ↔ permission ───────────────────────────────────────────────────

    /// Unique: `(role_id, permission_id)`. Both parents must exist.
    fn insert_role_permission(
        &self,
        edge: RolePermissionAssignment,
    ) -> StoreResult<RolePermissionAssignment>;
    fn delete_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool>;
    fn find_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<Option<RolePermissionAssignment>>;
    fn role_permissions_for_role(
        &self,
        role_id: RoleId,
    ) -> StoreResult<Vec<RolePermissionAssignment>>;
    fn role_permissions_for_permission(
        &self,
        permission_id: PermissionId,
    ) -> StoreResult<Vec<RolePermissionAssignment>>;
}
