//! Client-side inspection of bearer tokens.
//!
//! Tokens are `header.payload.signature`. Only the payload is decoded, to
//! read the expiry claim; the signature is the server's business and is
//! never checked here. Anything that does not match [`TokenClaims`] is
//! rejected.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not three dot-separated segments")]
    Format,

    #[error("token payload is not valid base64: {0}")]
    Encoding(String),

    #[error("token payload does not match the claims schema: {0}")]
    Claims(String),

    #[error("token expired at {0}")]
    Expired(i64),
}

/// Decoded payload claims. `exp` is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// An `exp` outside the representable range counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_none_or(|expiry| now > expiry)
    }
}

pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Format);
    };

    let payload = payload.trim_end_matches('=');
    if payload.is_empty() {
        return Err(TokenError::Format);
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|e| TokenError::Encoding(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenError::Claims(e.to_string()))
}

/// Decodes the claims and rejects tokens whose expiry is before `now`.
pub fn check_fresh(token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
    let claims = decode_claims(token)?;
    if claims.is_expired_at(now) {
        return Err(TokenError::Expired(claims.exp));
    }
    Ok(claims)
}

/// True only when the token decodes and its expiry has passed.
pub fn is_provably_expired(token: &str) -> bool {
    matches!(check_fresh(token, Utc::now()), Err(TokenError::Expired(_)))
}
