//! Configuration loading and representation.

use serde::Deserialize;
use thiserror::Error;

use warden_auth::{GateMode, TokenConfig};
use warden_observability::{LogConfig, LogFormat};

pub const JWT_SECRET_VAR: &str = "WARDEN_JWT_SECRET";
pub const TOKEN_TTL_VAR: &str = "WARDEN_TOKEN_TTL_SECS";
pub const GATE_MODE_VAR: &str = "WARDEN_GATE_MODE";
pub const PARALLEL_LOOKUPS_VAR: &str = "WARDEN_PARALLEL_LOOKUPS";
pub const LOG_LEVEL_VAR: &str = "WARDEN_LOG_LEVEL";
pub const LOG_FORMAT_VAR: &str = "WARDEN_LOG_FORMAT";

/// Insecure fallback used when no secret is configured. Never deploy with it.
pub const DEV_SECRET: &str = "warden-insecure-dev-secret-do-not-deploy";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

impl ConfigError {
    fn invalid(var: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub token: TokenConfig,
    pub gate_mode: GateMode,
    /// Resolve per-role permission batches on scoped threads.
    pub parallel_lookups: bool,
    pub log: LogConfig,
}

impl WardenConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Unset variables take their
    /// defaults; set but unparseable ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let mut token = TokenConfig::new(get(JWT_SECRET_VAR).unwrap_or_else(|| DEV_SECRET.to_string()));
        if let Some(raw) = get(TOKEN_TTL_VAR) {
            let ttl = raw
                .trim()
                .parse::<i64>()
                .map_err(|e| ConfigError::invalid(TOKEN_TTL_VAR, e.to_string()))?;
            token = token.with_ttl_secs(ttl);
        }

        let gate_mode = match get(GATE_MODE_VAR) {
            Some(raw) => raw
                .parse::<GateMode>()
                .map_err(|e| ConfigError::invalid(GATE_MODE_VAR, e))?,
            None => GateMode::default(),
        };

        let parallel_lookups = match get(PARALLEL_LOOKUPS_VAR) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::invalid(PARALLEL_LOOKUPS_VAR, format!("expected a boolean, got '{raw}'"))
            })?,
            None => false,
        };

        let mut log = LogConfig::default();
        if let Some(level) = get(LOG_LEVEL_VAR) {
            log.level = level;
        }
        if let Some(raw) = get(LOG_FORMAT_VAR) {
            log.format = raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid(LOG_FORMAT_VAR, e))?;
        }

        Ok(Self {
            token,
            gate_mode,
            parallel_lookups,
            log,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.token.secret == DEV_SECRET
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = WardenConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.uses_dev_secret());
        assert_eq!(config.token.ttl_secs, 3600);
        assert_eq!(config.gate_mode, GateMode::Snapshot);
        assert!(!config.parallel_lookups);
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = WardenConfig::from_lookup(lookup(&[
            (JWT_SECRET_VAR, "a-production-secret-of-sufficient-length"),
            (TOKEN_TTL_VAR, "900"),
            (GATE_MODE_VAR, "live"),
            (PARALLEL_LOOKUPS_VAR, "true"),
            (LOG_LEVEL_VAR, "warden_auth=debug,info"),
            (LOG_FORMAT_VAR, "pretty"),
        ]))
        .unwrap();

        assert!(!config.uses_dev_secret());
        assert_eq!(config.token.ttl_secs, 900);
        assert_eq!(config.gate_mode, GateMode::Live);
        assert!(config.parallel_lookups);
        assert_eq!(config.log.level, "warden_auth=debug,info");
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn unparseable_values_name_the_variable() {
        let err = WardenConfig::from_lookup(lookup(&[(TOKEN_TTL_VAR, "an hour")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == TOKEN_TTL_VAR));

        let err = WardenConfig::from_lookup(lookup(&[(GATE_MODE_VAR, "eventually")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == GATE_MODE_VAR));
    }

    #[test]
    fn oversized_ttl_fails_at_service_construction() {
        let config = WardenConfig::from_lookup(lookup(&[(TOKEN_TTL_VAR, "1000000000000000")])).unwrap();
        let err = warden_auth::TokenService::new(&config.token).unwrap_err();
        assert!(matches!(err, warden_core::DomainError::Validation { ref field, .. } if field == "ttl_secs"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: WardenConfig = serde_json::from_value(serde_json::json!({
            "token": { "secret": "from-a-config-file-and-long-enough!" },
            "gate_mode": "live"
        }))
        .unwrap();

        assert_eq!(config.token.ttl_secs, 3600);
        assert_eq!(config.gate_mode, GateMode::Live);
        assert_eq!(config.log.level, "info");
    }
}
