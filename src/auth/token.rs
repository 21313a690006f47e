use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Default lifetime of an issued token.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;
/// One year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's id, string-encoded.
    #[serde(default)]
    pub sub: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique token id, the key a [`RevocationList`] is consulted with.
    #[serde(default)]
    pub jti: String,
}

impl Claims {
    /// Parses the subject back into a user id.
    pub fn subject_id(&self) -> Result<i32, TokenError> {
        self.sub.parse().map_err(|_| TokenError::InvalidSubject)
    }
}

/// Reasons a token is rejected. Callers treat every variant the same way.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is malformed or its signature does not verify")]
    Malformed,
    #[error("token subject is missing or not a user id")]
    InvalidSubject,
    #[error("token has been revoked")]
    Revoked,
}

/// Server-side set of withdrawn tokens, keyed by `jti`.
///
/// Nothing revokes tokens today; logging out only discards the token client-side. An
/// implementation plugged into [`TokenService::with_revocation`] is consulted on every
/// verification.
pub trait RevocationList: Send + Sync {
    fn is_revoked(&self, jti: &str) -> bool;
}

/// Process-local revocation list. Entries are never pruned.
#[derive(Debug, Default)]
pub struct MemoryRevocationList {
    revoked: RwLock<HashSet<String>>,
}

impl MemoryRevocationList {
    pub fn revoke(&self, jti: &str) {
        if let Ok(mut revoked) = self.revoked.write() {
            revoked.insert(jti.to_string());
        }
    }
}

impl RevocationList for MemoryRevocationList {
    fn is_revoked(&self, jti: &str) -> bool {
        self.revoked
            .read()
            .map(|revoked| revoked.contains(jti))
            .unwrap_or(true)
    }
}

/// Issues and verifies HS256-signed session tokens.
///
/// The signing secret is supplied once at startup (see [`crate::config::Config`]).
/// Verification is pure computation: no I/O, no shared mutable state unless a
/// revocation list is attached.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
    revocation: Option<Arc<dyn RevocationList>>,
}

impl TokenService {
    /// Creates a service signing with `secret` and issuing tokens valid for `default_ttl`.
    pub fn new(secret: &str, default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            default_ttl,
            revocation: None,
        }
    }

    /// Attaches a revocation list consulted during verification.
    pub fn with_revocation(mut self, revocation: Arc<dyn RevocationList>) -> Self {
        self.revocation = Some(revocation);
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issues a token for `subject_id`, valid for `ttl` or the default lifetime.
    ///
    /// A negative `ttl` produces a token that is already expired.
    pub fn issue(&self, subject_id: i32, ttl: Option<Duration>) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl.unwrap_or(self.default_ttl))
            .ok_or_else(|| AppError::Internal("Token lifetime out of range".into()))?;

        let claims = Claims {
            sub: subject_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verifies signature, expiry and revocation, returning the decoded claims.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => {
                    TokenError::InvalidSubject
                }
                _ => TokenError::Malformed,
            })?;

        if let Some(revocation) = &self.revocation {
            if revocation.is_revoked(&claims.jti) {
                return Err(TokenError::Revoked);
            }
        }

        Ok(claims)
    }

    /// Verifies `token` and returns the user id it was issued for.
    pub fn verify(&self, token: &str) -> Result<i32, TokenError> {
        self.decode_claims(token)?.subject_id()
    }
}
