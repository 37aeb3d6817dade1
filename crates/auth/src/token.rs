//! Stateless token issuance and verification (HS256 JWT).
//!
//! The signing secret is fixed for the lifetime of a [`TokenService`]. There is
//! no revocation list: rotating the secret is the only way to invalidate
//! tokens already in circulation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use warden_core::{DomainError, DomainResult};

use crate::claims::{IdentityClaims, TokenClaims, TokenValidationError, validate_claims};

/// Default token lifetime.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Longest accepted token lifetime (one year).
pub const MAX_TTL_SECS: i64 = 365 * 24 * 3600;

const RECOMMENDED_SECRET_LEN: usize = 32;

/// Why a token was rejected. Every variant means "invalid"; the detail is for
/// logs, not for the caller's control flow.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidToken {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid token time window")]
    InvalidTimeWindow,
}

impl From<TokenValidationError> for InvalidToken {
    fn from(err: TokenValidationError) -> Self {
        match err {
            TokenValidationError::Expired => InvalidToken::Expired,
            TokenValidationError::NotYetValid => InvalidToken::NotYetValid,
            TokenValidationError::InvalidTimeWindow => InvalidToken::InvalidTimeWindow,
        }
    }
}

/// Token configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC secret for signing tokens.
    pub secret: String,
    /// Fixed token lifetime in seconds.
    pub ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.secret.is_empty() {
            return Err(DomainError::validation("secret", "token secret is not configured"));
        }
        if self.ttl_secs <= 0 || self.ttl_secs > MAX_TTL_SECS {
            return Err(DomainError::validation(
                "ttl_secs",
                format!("token ttl must be between 1 and {MAX_TTL_SECS} seconds"),
            ));
        }
        if self.secret.len() < RECOMMENDED_SECRET_LEN {
            warn!("token secret is shorter than recommended ({RECOMMENDED_SECRET_LEN} bytes)");
        }
        Ok(())
    }
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Issues and verifies signed tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> DomainResult<Self> {
        config.validate()?;
        let ttl = Duration::try_seconds(config.ttl_secs)
            .ok_or_else(|| DomainError::validation("ttl_secs", "token ttl is out of range"))?;

        let mut validation = Validation::new(Algorithm::HS256);
        // The time window is checked by `validate_claims` against an explicit
        // clock, with zero leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(config.secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            validation: Arc::new(validation),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token valid for the configured TTL from now.
    pub fn issue_token(&self, identity: IdentityClaims) -> DomainResult<String> {
        self.issue_token_at(identity, Utc::now())
    }

    /// Mint a token as if issued at `now` (truncated to whole seconds).
    pub fn issue_token_at(&self, identity: IdentityClaims, now: DateTime<Utc>) -> DomainResult<String> {
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| DomainError::internal("token expiry is out of range"))?;
        let claims = TokenClaims {
            identity,
            issued_at,
            expires_at,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::internal(format!("failed to sign token: {e}")))
    }

    /// Verify a token against the current time. Never panics; any defect
    /// yields `Err(InvalidToken)`.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, InvalidToken> {
        self.verify_token_at(token, Utc::now())
    }

    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, InvalidToken> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
                    InvalidToken::BadSignature
                }
                JwtErrorKind::ExpiredSignature => InvalidToken::Expired,
                _ => InvalidToken::Malformed,
            };
            debug!(%reason, "token rejected");
            reason
        })?;

        validate_claims(&data.claims, now).map_err(|e| {
            let reason = InvalidToken::from(e);
            debug!(%reason, "token rejected");
            reason
        })?;

        Ok(data.claims)
    }
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl", &self.ttl)
            .finish()
    }
}
