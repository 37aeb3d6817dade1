//! Wiring: one store handle shared by every component.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use warden_auth::{AuthService, InMemoryRbacStore, PermissionResolver, RbacStore, TokenService};
use warden_core::DomainResult;

use crate::config::{JWT_SECRET_VAR, WardenConfig};
use crate::seed;

pub struct Services<S> {
    pub store: Arc<S>,
    pub auth: AuthService<S>,
}

impl<S> Clone for Services<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            auth: self.auth.clone(),
        }
    }
}

impl<S: RbacStore> Services<S> {
    pub fn build(store: Arc<S>, config: &WardenConfig) -> DomainResult<Self> {
        let tokens = TokenService::new(&config.token)?;
        let resolver = PermissionResolver::new(store.clone()).with_parallel_lookups(config.parallel_lookups);
        let auth = AuthService::with_resolver(store.clone(), tokens, config.gate_mode, resolver);
        Ok(Self { store, auth })
    }
}

/// Initialize logging, wire an in-memory store and seed the default catalog.
pub fn bootstrap(config: &WardenConfig) -> anyhow::Result<Services<InMemoryRbacStore>> {
    warden_observability::init(&config.log);

    if config.uses_dev_secret() {
        warn!("{JWT_SECRET_VAR} not set; using insecure dev default");
    }

    let services = Services::build(Arc::new(InMemoryRbacStore::new()), config)
        .context("failed to build services")?;
    seed::seed_default_catalog(services.auth.graph()).context("failed to seed default catalog")?;

    info!(gate_mode = ?config.gate_mode, "warden ready");
    Ok(services)
}

/// [`bootstrap`] with configuration read from the process environment.
pub fn bootstrap_from_env() -> anyhow::Result<Services<InMemoryRbacStore>> {
    let config = WardenConfig::from_env().context("invalid configuration")?;
    bootstrap(&config)
}
