//! Compact three-part token handling.
//!
//! Tokens are `header.payload.signature` strings. Only the payload is ever
//! read here; signatures are the server's business and are never verified
//! on the client.

mod claims;
mod secret;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::Result;
use crate::error::TokenError;

pub use claims::{Claims, Role};
pub use secret::{AccessToken, RefreshToken};

/// Number of dot-separated segments in a structurally valid token.
const SEGMENTS: usize = 3;

/// base64url that accepts payloads with or without trailing `=`.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Returns true iff `token` splits into exactly three segments on `.`.
///
/// No cryptographic check is made. The empty string has one segment and is
/// therefore never valid.
///
/// ```
/// use mindrecord_core::token::is_valid_token;
///
/// assert!(is_valid_token("a.b.c"));
/// assert!(!is_valid_token("a.b"));
/// assert!(!is_valid_token(""));
/// ```
pub fn is_valid_token(token: &str) -> bool {
    token.split('.').count() == SEGMENTS
}

/// Decode the claims carried in the payload segment of `token`.
///
/// The payload is base64url-decoded to bytes, the bytes are decoded as UTF-8,
/// and the text is parsed as a JSON object.
///
/// # Errors
///
/// Returns [`TokenError::MalformedClaims`] if the token is not three-part or
/// if any decoding step fails.
pub fn decode_claims(token: &str) -> Result<Claims> {
    if !is_valid_token(token) {
        return Err(malformed("token must have three segments"));
    }

    let payload = token.split('.').nth(1).unwrap_or_default();

    let bytes = PAYLOAD_ENGINE
        .decode(payload)
        .map_err(|e| malformed(format!("payload is not base64url: {}", e)))?;

    let text = String::from_utf8(bytes)
        .map_err(|e| malformed(format!("payload is not UTF-8: {}", e)))?;

    serde_json::from_str::<Claims>(&text)
        .map_err(|e| malformed(format!("payload is not a JSON object: {}", e)))
}

/// Build an unsigned token carrying `claims`.
///
/// The header declares `alg: none` and the signature segment is empty. The
/// result passes [`is_valid_token`] and [`decode_claims`] returns `claims`.
pub fn encode_unsigned(claims: &Claims) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_json().as_bytes());
    format!("{}.{}.", header, payload)
}

fn malformed(reason: impl Into<String>) -> crate::Error {
    TokenError::MalformedClaims {
        reason: reason.into(),
    }
    .into()
}
