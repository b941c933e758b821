//! Expiry gating over unverified token payloads.
//!
//! Tokens are opaque bearer credentials as far as the server is concerned;
//! the only thing read client-side is the expiration claim, and the
//! signature is never checked. Nothing decoded here is trusted beyond
//! deciding whether a refresh or re-login is needed.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jiff::Timestamp;
use serde::Deserialize;
use tracing::debug;

use crate::store::TokenStore;

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Expiration instant, seconds since epoch.
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub jti: Option<String>,
}

/// Decodes the payload segment of a three-segment token. Returns `None` on
/// any malformed input rather than erroring.
pub fn decode(token: &str) -> Option<Claims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }
    // Payloads are base64url without padding; tolerate encoders that pad.
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// An undecodable token counts as expired, as does `exp == now`.
pub fn is_expired(token: &str) -> bool {
    match decode(token) {
        Some(claims) => claims.exp <= Timestamp::now().as_second(),
        None => {
            debug!("token payload undecodable; treating as expired");
            true
        }
    }
}

/// True only when an access token exists in the store and is not expired.
pub async fn is_authenticated(store: &TokenStore) -> bool {
    match store.access_token().await {
        Some(token) => !is_expired(&token),
        None => false,
    }
}
