//! Default catalog: the admin and user roles and the permissions they hold.

use tracing::info;

use warden_auth::{ADMIN_ROLE, DEFAULT_ROLE, NewPermission, NewRole, Permission, RbacStore, Role, RoleGraph};
use warden_core::{DomainResult, ErrorKind};

const CRUD_LIST: &[&str] = &["create", "read", "update", "delete", "list"];
const CRUD: &[&str] = &["create", "read", "update", "delete"];

/// Every `(resource, action)` pair of the default catalog, in seeding order.
pub fn default_permissions() -> Vec<(&'static str, &'static str)> {
    let mut out = Vec::new();
    for resource in ["users", "roles", "permissions"] {
        out.extend(CRUD_LIST.iter().map(|action| (resource, *action)));
    }
    out.extend(CRUD.iter().map(|action| ("content", *action)));
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub roles_created: usize,
    pub grants_created: usize,
}

/// Create whatever part of the default catalog is missing.
///
/// Idempotent: existing rows and edges are left as they are.
pub fn seed_default_catalog<S: RbacStore>(graph: &RoleGraph<S>) -> DomainResult<SeedReport> {
    let mut report = SeedReport::default();

    let mut permissions = Vec::new();
    for (resource, action) in default_permissions() {
        let permission = match graph.find_permission(resource, action)? {
            Some(p) => p,
            None => {
                report.permissions_created += 1;
                graph.create_permission(NewPermission {
                    resource: resource.to_string(),
                    action: action.to_string(),
                    description: Some(format!("{action} {resource}")),
                })?
            }
        };
        permissions.push(permission);
    }

    let admin = ensure_role(graph, ADMIN_ROLE, "Full access to the catalog and content", &mut report)?;
    let user = ensure_role(graph, DEFAULT_ROLE, "Read access to content", &mut report)?;

    for permission in &permissions {
        grant(graph, &admin, permission, &mut report)?;
    }
    for permission in permissions.iter().filter(|p| p.resource == "content" && p.action == "read") {
        grant(graph, &user, permission, &mut report)?;
    }

    info!(
        permissions_created = report.permissions_created,
        roles_created = report.roles_created,
        grants_created = report.grants_created,
        "default catalog seeded"
    );
    Ok(report)
}

fn ensure_role<S: RbacStore>(
    graph: &RoleGraph<S>,
    name: &str,
    description: &str,
    report: &mut SeedReport,
) -> DomainResult<Role> {
    if let Some(role) = graph.find_role_by_name(name)? {
        return Ok(role);
    }
    report.roles_created += 1;
    graph.create_role(NewRole {
        name: name.to_string(),
        description: Some(description.to_string()),
        is_active: true,
    })
}

fn grant<S: RbacStore>(
    graph: &RoleGraph<S>,
    role: &Role,
    permission: &Permission,
    report: &mut SeedReport,
) -> DomainResult<()> {
    match graph.assign_permission_to_role(role.id, permission.id, None) {
        Ok(_) => {
            report.grants_created += 1;
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::Conflict => Ok(()),
        Err(e) => Err(e),
    }
}
