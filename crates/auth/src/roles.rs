use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use warden_core::{DomainError, DomainResult};

/// Name of the privileged role honoured by `AdminOrPermission` requirements.
pub const ADMIN_ROLE: &str = "admin";

/// Role granted to self-registered identities when it exists in the catalog.
pub const DEFAULT_ROLE: &str = "user";

const MAX_ROLE_NAME_LEN: usize = 50;

/// Role name as carried in tokens and requirements.
///
/// Roles are flat: a name maps to one row, never to a parent role.
/// Comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Build a role name from untrusted input.
    pub fn parse(name: &str) -> DomainResult<Self> {
        validate_role_name(name)?;
        Ok(Self(Cow::Owned(name.to_string())))
    }

    pub fn admin() -> Self {
        Self::new(ADMIN_ROLE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == ADMIN_ROLE
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for RoleName {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

pub(crate) fn validate_role_name(name: &str) -> DomainResult<()> {
    if name.is_empty() || name.len() > MAX_ROLE_NAME_LEN {
        return Err(DomainError::validation(
            "name",
            format!("role name must be 1-{MAX_ROLE_NAME_LEN} characters"),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DomainError::validation(
            "name",
            "role name may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_validates() {
        assert!(RoleName::parse("content-editor").is_ok());
        assert!(RoleName::parse("").is_err());
        assert!(RoleName::parse("has space").is_err());
        assert!(RoleName::parse(&"x".repeat(51)).is_err());
    }

    #[test]
    fn admin_is_case_sensitive() {
        assert!(RoleName::admin().is_admin());
        assert!(!RoleName::new("Admin").is_admin());
    }
}
