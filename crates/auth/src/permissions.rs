use serde::{Deserialize, Serialize};

use warden_core::{DomainError, DomainResult};

/// Canonical separator between resource and action.
pub const SEPARATOR: char = ':';

/// Separator of the older `resource.action` naming, still accepted on input.
pub const LEGACY_SEPARATOR: char = '.';

/// A resource/action pair: the unit of permission granularity.
///
/// Every textual permission name is normalized into this form once, at the
/// boundary (token decoding, catalog creation). Matching is exact and
/// case-sensitive on both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionCheck {
    pub resource: String,
    pub action: String,
}

impl PermissionCheck {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Parse `resource:action` or the legacy `resource.action`.
    ///
    /// Returns `None` for anything else (no separator, empty segments, more
    /// than one separator).
    pub fn parse(name: &str) -> Option<Self> {
        let sep = if name.contains(SEPARATOR) {
            SEPARATOR
        } else {
            LEGACY_SEPARATOR
        };
        let (resource, action) = name.split_once(sep)?;
        if !is_valid_segment(resource) || !is_valid_segment(action) {
            return None;
        }
        Some(Self::new(resource, action))
    }

    /// Build a pair from untrusted input, reporting which field is wrong.
    pub fn validated(resource: &str, action: &str) -> DomainResult<Self> {
        if !is_valid_segment(resource) {
            return Err(DomainError::validation(
                "resource",
                "must be non-empty without ':', '.' or whitespace",
            ));
        }
        if !is_valid_segment(action) {
            return Err(DomainError::validation(
                "action",
                "must be non-empty without ':', '.' or whitespace",
            ));
        }
        Ok(Self::new(resource, action))
    }

    /// Canonical `resource:action` name.
    pub fn name(&self) -> String {
        format!("{}{}{}", self.resource, SEPARATOR, self.action)
    }

    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.action == action
    }
}

impl core::fmt::Display for PermissionCheck {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}{}", self.resource, SEPARATOR, self.action)
    }
}

fn is_valid_segment(s: &str) -> bool {
    !s.is_empty()
        && !s
            .chars()
            .any(|c| c == SEPARATOR || c == LEGACY_SEPARATOR || c.is_whitespace())
}
