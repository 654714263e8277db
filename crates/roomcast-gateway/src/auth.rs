//! Identity resolution from a bearer credential.
//!
//! - No secret configured: every connection resolves to [`ANONYMOUS_IDENTITY`].
//! - Otherwise the credential must be an HMAC-signed JWT (HS256/384/512) under
//!   the configured secret. Identity comes from `sub`, falling back to `uid`.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;

use roomcast_core::error::{Result, RoomcastError};

/// Identity used when the gateway runs without a verification secret.
pub const ANONYMOUS_IDENTITY: &str = "anon";

const BEARER_PREFIX: &str = "bearer ";

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    uid: Option<Value>,
}

impl IdentityClaims {
    fn identity(self) -> Option<String> {
        [self.sub, self.uid]
            .into_iter()
            .flatten()
            .find_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
    }
}

/// Resolve `token` to an identity under `secret`.
pub fn resolve_identity(token: &str, secret: &str) -> Result<String> {
    if secret.is_empty() {
        return Ok(ANONYMOUS_IDENTITY.to_string());
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    // exp/nbf are still checked when present; nothing else is required.
    validation.required_spec_claims.clear();
    validation.validate_nbf = true;
    validation.validate_aud = false;

    let data = decode::<IdentityClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "token verification failed");
            RoomcastError::AuthFailed("invalid token".into())
        })?;

    data.claims
        .identity()
        .ok_or_else(|| RoomcastError::AuthFailed("missing subject".into()))
}

/// Bearer credential from `Authorization` (case-insensitive scheme), falling
/// back to the `token` query parameter when the header yields nothing.
pub fn extract_token(headers: &HeaderMap, query_token: Option<&str>) -> String {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let scheme = v.get(..BEARER_PREFIX.len())?;
            let rest = v.get(BEARER_PREFIX.len()..)?;
            scheme.eq_ignore_ascii_case(BEARER_PREFIX).then(|| rest.trim())
        })
        .filter(|t| !t.is_empty());

    match from_header {
        Some(t) => t.to_string(),
        None => query_token.unwrap_or_default().to_string(),
    }
}

/// Resolver bound to the configured secret.
#[derive(Clone)]
pub struct IdentityResolver {
    secret: String,
}

impl IdentityResolver {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn is_anonymous(&self) -> bool {
        self.secret.is_empty()
    }

    pub fn resolve(&self, token: &str) -> Result<String> {
        resolve_identity(token, &self.secret)
    }
}
