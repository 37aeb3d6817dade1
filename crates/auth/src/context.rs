use tracing::debug;

use warden_core::UserId;

use crate::claims::TokenClaims;
use crate::permissions::PermissionCheck;
use crate::roles::RoleName;

/// Authenticated identity for a single request.
///
/// Immutable once built. Permission names are normalized here, so the gate
/// only ever compares `PermissionCheck` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user_id: UserId,
    username: String,
    email: String,
    roles: Vec<RoleName>,
    permissions: Vec<PermissionCheck>,
}

impl AuthContext {
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        roles: Vec<RoleName>,
        permissions: Vec<PermissionCheck>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            email: email.into(),
            roles,
            permissions,
        }
    }

    /// Build from verified token claims (snapshot mode).
    ///
    /// Names that are neither `resource:action` nor `resource.action` cannot
    /// satisfy any requirement and are dropped.
    pub fn from_claims(claims: &TokenClaims) -> Self {
        let identity = &claims.identity;
        let roles = identity
            .roles
            .iter()
            .map(|r| RoleName::new(r.clone()))
            .collect();
        let permissions = identity
            .permissions
            .iter()
            .filter_map(|name| {
                let parsed = PermissionCheck::parse(name);
                if parsed.is_none() {
                    debug!(permission = %name, "ignoring unparseable permission claim");
                }
                parsed
            })
            .collect();

        Self::new(
            identity.user_id,
            identity.username.clone(),
            identity.email.clone(),
            roles,
            permissions,
        )
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn roles(&self) -> &[RoleName] {
        &self.roles
    }

    pub fn permissions(&self) -> &[PermissionCheck] {
        &self.permissions
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == name)
    }

    pub fn has_permission(&self, check: &PermissionCheck) -> bool {
        self.permissions.iter().any(|p| p == check)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(RoleName::is_admin)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::claims::IdentityClaims;

    #[test]
    fn claims_are_normalized_once() {
        let now = Utc::now();
        let claims = TokenClaims {
            identity: IdentityClaims {
                user_id: UserId::new(),
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                roles: vec!["editor".to_string()],
                permissions: vec![
                    "content:read".to_string(),
                    "content.update".to_string(),
                    "nonsense".to_string(),
                ],
            },
            issued_at: now,
            expires_at: now,
        };

        let ctx = AuthContext::from_claims(&claims);
        assert_eq!(
            ctx.permissions(),
            &[
                PermissionCheck::new("content", "read"),
                PermissionCheck::new("content", "update"),
            ]
        );
        assert!(ctx.has_role("editor"));
        assert!(!ctx.has_role("Editor"));
        assert!(!ctx.is_admin());
    }
}
