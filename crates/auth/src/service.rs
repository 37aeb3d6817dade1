//! Login and registration facade over the directory, graph and gate.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use warden_core::DomainResult;

use crate::authorize::{Gate, GateMode};
use crate::claims::IdentityClaims;
use crate::directory::{IdentityDirectory, NewIdentity};
use crate::graph::RoleGraph;
use crate::model::{Permission, Role, UserRecord};
use crate::resolver::PermissionResolver;
use crate::roles::DEFAULT_ROLE;
use crate::store::RbacStore;
use crate::token::TokenService;

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: UserRecord,
    pub token: String,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

pub struct AuthService<S> {
    directory: IdentityDirectory<S>,
    graph: RoleGraph<S>,
    resolver: PermissionResolver<S>,
    tokens: TokenService,
    gate: Gate<S>,
}

impl<S> Clone for AuthService<S> {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            graph: self.graph.clone(),
            resolver: self.resolver.clone(),
            tokens: self.tokens.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<S: RbacStore> AuthService<S> {
    pub fn new(store: Arc<S>, tokens: TokenService, mode: GateMode) -> Self {
        Self::with_resolver(store.clone(), tokens, mode, PermissionResolver::new(store))
    }

    pub fn with_resolver(
        store: Arc<S>,
        tokens: TokenService,
        mode: GateMode,
        resolver: PermissionResolver<S>,
    ) -> Self {
        Self {
            directory: IdentityDirectory::new(store.clone()),
            graph: RoleGraph::new(store),
            gate: Gate::new(tokens.clone(), resolver.clone(), mode),
            resolver,
            tokens,
        }
    }

    /// Verify credentials and mint a token carrying the user's current grants.
    ///
    /// Any credential failure is `Ok(None)`.
    pub fn authenticate(&self, username: &str, password: &str) -> DomainResult<Option<LoginOutcome>> {
        let Some(user) = self.directory.verify_credentials(username, password)? else {
            return Ok(None);
        };

        let grants = self.resolver.get_user_grants(user.id)?;
        let token = self.tokens.issue_token(IdentityClaims::from_grants(&user, &grants))?;

        info!(user_id = %user.id, roles = grants.roles.len(), "login succeeded");
        Ok(Some(LoginOutcome {
            user,
            token,
            roles: grants.roles,
            permissions: grants.permissions,
        }))
    }

    /// Create an active identity and grant it the default role, if one exists.
    ///
    /// Only identity creation can fail the call. Once the identity exists it
    /// is returned even if the default role cannot be looked up or granted;
    /// that failure is logged and the user is left without roles.
    pub fn register(&self, username: &str, email: &str, password: &str) -> DomainResult<UserRecord> {
        let user = self.directory.create_identity(NewIdentity {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            is_active: true,
        })?;

        if let Err(error) = self.grant_default_role(&user) {
            warn!(user_id = %user.id, %error, "default role not granted; identity kept");
        }

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    fn grant_default_role(&self, user: &UserRecord) -> DomainResult<()> {
        if let Some(role) = self.graph.find_role_by_name(DEFAULT_ROLE)? {
            self.graph.assign_role_to_user(user.id, role.id, None)?;
        }
        Ok(())
    }

    pub fn directory(&self) -> &IdentityDirectory<S> {
        &self.directory
    }

    pub fn graph(&self) -> &RoleGraph<S> {
        &self.graph
    }

    pub fn resolver(&self) -> &PermissionResolver<S> {
        &self.resolver
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn gate(&self) -> &Gate<S> {
        &self.gate
    }
}
