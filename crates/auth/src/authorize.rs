use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use warden_core::{ErrorKind, UserId};

use crate::claims::TokenClaims;
use crate::context::AuthContext;
use crate::permissions::PermissionCheck;
use crate::resolver::PermissionResolver;
use crate::roles::{ADMIN_ROLE, RoleName};
use crate::store::RbacStore;
use crate::token::TokenService;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: requires {0}")]
    Forbidden(String),

    /// Live grant lookup failed; the request is denied.
    #[error("authorization unavailable: {0}")]
    Internal(String),
}

impl AuthzError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthzError::Unauthenticated => ErrorKind::Unauthenticated,
            AuthzError::Forbidden(_) => ErrorKind::Forbidden,
            AuthzError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// What a protected operation declares it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Role(RoleName),
    Permission(PermissionCheck),
    AnyRole(Vec<RoleName>),
    AnyPermission(Vec<PermissionCheck>),
    /// The `admin` role, or the given permission.
    AdminOrPermission(PermissionCheck),
}

impl Requirement {
    pub fn role(name: impl Into<String>) -> Self {
        Requirement::Role(RoleName::new(name.into()))
    }

    pub fn permission(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Requirement::Permission(PermissionCheck::new(resource, action))
    }

    pub fn admin_or_permission(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Requirement::AdminOrPermission(PermissionCheck::new(resource, action))
    }
}

impl core::fmt::Display for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fn join<T: core::fmt::Display>(items: &[T]) -> String {
            items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" | ")
        }

        match self {
            Requirement::Role(r) => write!(f, "role '{r}'"),
            Requirement::Permission(p) => write!(f, "permission '{p}'"),
            Requirement::AnyRole(rs) => write!(f, "any role of [{}]", join(rs)),
            Requirement::AnyPermission(ps) => write!(f, "any permission of [{}]", join(ps)),
            Requirement::AdminOrPermission(p) => write!(f, "role '{ADMIN_ROLE}' or permission '{p}'"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision functions
// ─────────────────────────────────────────────────────────────────────────────
//
// No IO, no panics. Every function answers over the context alone.

pub fn require_role(ctx: &AuthContext, name: &str) -> Result<(), AuthzError> {
    if ctx.has_role(name) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(format!("role '{name}'")))
    }
}

pub fn require_permission(ctx: &AuthContext, check: &PermissionCheck) -> Result<(), AuthzError> {
    if ctx.has_permission(check) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(format!("permission '{check}'")))
    }
}

pub fn require_any_role(ctx: &AuthContext, names: &[RoleName]) -> Result<(), AuthzError> {
    if names.iter().any(|n| ctx.has_role(n.as_str())) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(Requirement::AnyRole(names.to_vec()).to_string()))
    }
}

pub fn require_any_permission(ctx: &AuthContext, checks: &[PermissionCheck]) -> Result<(), AuthzError> {
    if checks.iter().any(|c| ctx.has_permission(c)) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(
            Requirement::AnyPermission(checks.to_vec()).to_string(),
        ))
    }
}

pub fn require_admin_or_permission(ctx: &AuthContext, check: &PermissionCheck) -> Result<(), AuthzError> {
    if ctx.is_admin() || ctx.has_permission(check) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(
            Requirement::AdminOrPermission(check.clone()).to_string(),
        ))
    }
}

/// Evaluate a declared requirement against an authenticated context.
pub fn authorize(ctx: &AuthContext, requirement: &Requirement) -> Result<(), AuthzError> {
    match requirement {
        Requirement::Role(r) => require_role(ctx, r.as_str()),
        Requirement::Permission(p) => require_permission(ctx, p),
        Requirement::AnyRole(rs) => require_any_role(ctx, rs),
        Requirement::AnyPermission(ps) => require_any_permission(ctx, ps),
        Requirement::AdminOrPermission(p) => require_admin_or_permission(ctx, p),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gate
// ─────────────────────────────────────────────────────────────────────────────

/// Where the gate takes grants from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Roles and permissions embedded in the token. Revocations take effect
    /// when the token expires.
    #[default]
    Snapshot,
    /// The token only proves identity; grants are re-resolved per request.
    Live,
}

impl core::str::FromStr for GateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Ok(GateMode::Snapshot),
            "live" => Ok(GateMode::Live),
            other => Err(format!("unknown gate mode '{other}'")),
        }
    }
}

/// Bearer-token gate in front of protected operations.
pub struct Gate<S> {
    tokens: TokenService,
    resolver: PermissionResolver<S>,
    mode: GateMode,
}

impl<S> Clone for Gate<S> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            resolver: self.resolver.clone(),
            mode: self.mode,
        }
    }
}

impl<S: RbacStore> Gate<S> {
    pub fn new(tokens: TokenService, resolver: PermissionResolver<S>, mode: GateMode) -> Self {
        Self { tokens, resolver, mode }
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Turn a bearer credential into an identity.
    ///
    /// Accepts the raw token or `Bearer <token>`. Anything missing or
    /// invalid is `Unauthenticated`, and the resolver is not consulted.
    pub fn authenticate(&self, bearer: Option<&str>) -> Result<AuthContext, AuthzError> {
        let token = bearer.and_then(extract_bearer).ok_or(AuthzError::Unauthenticated)?;
        let claims = self
            .tokens
            .verify_token(token)
            .map_err(|_| AuthzError::Unauthenticated)?;

        match self.mode {
            GateMode::Snapshot => Ok(AuthContext::from_claims(&claims)),
            GateMode::Live => self.live_context(&claims),
        }
    }

    pub fn authorize(&self, ctx: &AuthContext, requirement: &Requirement) -> Result<(), AuthzError> {
        let decision = authorize(ctx, requirement);
        if let Err(ref err) = decision {
            debug!(user_id = %ctx.user_id(), %requirement, error = %err, "access denied");
        }
        decision
    }

    /// Authenticate, then authorize.
    pub fn check(&self, bearer: Option<&str>, requirement: &Requirement) -> Result<AuthContext, AuthzError> {
        let ctx = self.authenticate(bearer)?;
        self.authorize(&ctx, requirement)?;
        Ok(ctx)
    }

    fn live_context(&self, claims: &TokenClaims) -> Result<AuthContext, AuthzError> {
        let user_id = claims.identity.user_id;
        let grants = self
            .resolver
            .get_user_grants(user_id)
            .map_err(|e| AuthzError::Internal(e.to_string()))?;

        let identity = &claims.identity;
        Ok(AuthContext::new(
            user_id,
            identity.username.clone(),
            identity.email.clone(),
            grants.roles.iter().map(|r| r.name.clone()).collect(),
            grants.permissions.iter().map(|p| p.check()).collect(),
        ))
    }
}

fn extract_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() { None } else { Some(token) }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Why a request was (or would be) allowed or denied.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub requirement: String,
    pub granted: bool,
    pub reason: String,
    pub principal: PrincipalState,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    MissingRole,
    MissingPermission,
}

/// Explain the decision [`authorize`] would make for this context.
pub fn explain(ctx: &AuthContext, requirement: &Requirement) -> AuthorizationExplanation {
    let mut permissions: Vec<String> = ctx.permissions().iter().map(PermissionCheck::name).collect();
    permissions.sort();

    let principal = PrincipalState {
        user_id: ctx.user_id(),
        username: ctx.username().to_string(),
        roles: ctx.roles().iter().map(|r| r.as_str().to_string()).collect(),
        permissions,
        is_admin: ctx.is_admin(),
    };

    let granted = authorize(ctx, requirement).is_ok();
    let required = requirement.to_string();

    if granted {
        let reason = match requirement {
            Requirement::AdminOrPermission(_) if ctx.is_admin() => {
                format!("Principal holds the '{ADMIN_ROLE}' role")
            }
            _ => format!("Principal satisfies {required}"),
        };
        return AuthorizationExplanation {
            requirement: required,
            granted,
            reason,
            principal,
            denial_reason: None,
        };
    }

    let (kind, suggestions) = match requirement {
        Requirement::Role(_) | Requirement::AnyRole(_) => (
            DenialKind::MissingRole,
            vec![format!("Assign the user an active role matching {required}")],
        ),
        Requirement::Permission(p) | Requirement::AdminOrPermission(p) => (
            DenialKind::MissingPermission,
            vec![
                format!("Grant '{p}' to one of the user's roles: {:?}", principal.roles),
                "Check that the granting role is active".to_string(),
            ],
        ),
        Requirement::AnyPermission(_) => (
            DenialKind::MissingPermission,
            vec![format!("Grant one of {required} to one of the user's roles")],
        ),
    };

    AuthorizationExplanation {
        reason: format!(
            "Principal does not satisfy {required}. Current permissions: {:?}",
            principal.permissions
        ),
        requirement: required.clone(),
        granted,
        principal,
        denial_reason: Some(DenialReason {
            kind,
            message: format!("Missing {required}"),
            suggestions,
        }),
    }
}
