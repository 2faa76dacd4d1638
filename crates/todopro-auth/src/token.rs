//! Offline JWT claim decoding.
//!
//! Only the payload segment is read; signatures are the server's business.
//! The client needs the `exp` claim to decide whether a stored token is
//! still worth presenting.

use base64::Engine as _;
use serde_json::Value;

use crate::errors::TokenError;

/// Claims the client reads from a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenClaims {
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Subject claim, when present.
    pub sub: Option<String>,
}

impl TokenClaims {
    /// Whether the token is expired at `now` (epoch seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        is_expired_at(self.exp, now)
    }

    /// Seconds left before expiry at `now`; negative once expired.
    pub fn remaining_at(&self, now: i64) -> i64 {
        self.exp - now
    }
}

/// `exp == now` counts as expired.
pub fn is_expired_at(exp: i64, now: i64) -> bool {
    exp <= now
}

/// Current wall-clock time in epoch seconds.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Decode the claims of a `header.payload.signature` token.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts[1].is_empty() {
        return Err(TokenError::Malformed);
    }

    let bytes = base64::engine::general_purpose::STANDARD.decode(to_standard_base64(parts[1]))?;
    let payload: Value = serde_json::from_slice(&bytes)?;

    let exp = payload
        .get("exp")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.floor() as i64)))
        .ok_or(TokenError::MissingExp)?;
    let sub = payload.get("sub").and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    Ok(TokenClaims { exp, sub })
}

/// Convert base64url encoding to standard base64 (with padding).
fn to_standard_base64(input: &str) -> String {
    let standard: String = input
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    match standard.len() % 4 {
        2 => format!("{standard}=="),
        3 => format!("{standard}="),
        _ => standard,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
