//! `warden-auth`: identities, roles, permissions and the authorization gate.
//!
//! Storage is behind [`RbacStore`]; transport is out of scope. Components are
//! synchronous, `Send + Sync`, and share the store through `Arc`.

pub mod authorize;
pub mod claims;
pub mod context;
pub mod directory;
pub mod graph;
pub mod memory_store;
pub mod model;
pub mod password;
pub mod permissions;
pub mod resolver;
pub mod roles;
pub mod service;
pub mod store;
pub mod token;

#[cfg(test)]
mod testing;

pub use authorize::{
    AuthorizationExplanation, AuthzError, DenialKind, Gate, GateMode, Requirement, authorize, explain,
    require_admin_or_permission, require_any_permission, require_any_role, require_permission,
    require_role,
};
pub use claims::{IdentityClaims, TokenClaims, TokenValidationError, validate_claims};
pub use context::AuthContext;
pub use directory::{IdentityChanges, IdentityDirectory, NewIdentity};
pub use graph::{NewPermission, NewRole, PermissionChanges, RoleChanges, RoleGraph};
pub use memory_store::InMemoryRbacStore;
pub use model::{Permission, Role, RolePermissionAssignment, StoredUser, UserRecord, UserRoleAssignment};
pub use permissions::PermissionCheck;
pub use resolver::{Grants, PermissionResolver};
pub use roles::{ADMIN_ROLE, DEFAULT_ROLE, RoleName};
pub use service::{AuthService, LoginOutcome};
pub use store::{RbacStore, StoreError, StoreResult};
pub use token::{InvalidToken, TokenConfig, TokenService};
