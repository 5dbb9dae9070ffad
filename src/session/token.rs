//! Access Token Claims
//!
//! Reads the payload of the backend's JWT without checking its signature.
//! The backend signs with a secret the client never sees, so the claims are
//! only good for display decisions (showing the admin dashboard, printing
//! who is logged in). The server re-checks every request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use crate::api::dto::deserialize_optional_id;

/// Claims carried by a RoomMatch access token
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Subject, the account email
    #[serde(default)]
    pub sub: Option<String>,
    /// Numeric user id, normalised to a string
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    /// Expiry as unix seconds
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Whether the admin claim is present and true
    pub fn is_admin(&self) -> bool {
        self.is_admin.unwrap_or(false)
    }

    /// Whether the token has expired relative to `now` (unix seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.map(|exp| exp <= now).unwrap_or(false)
    }
}

/// Errors that can occur while decoding a token
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token is not a three-part JWT")]
    Malformed,

    #[error("Token payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Token payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Decode the claims segment of a JWT
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(_), None) if !header.is_empty() => payload,
        _ => return Err(TokenError::Malformed),
    };

    // Some encoders keep the padding even though JWT forbids it
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_admin_token() {
        let token = encode_test_token(json!({
            "sub": "admin@mymail.pomona.edu",
            "user_id": 7,
            "is_admin": true,
            "exp": 1_700_000_000
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("admin@mymail.pomona.edu"));
        assert_eq!(claims.user_id.as_deref(), Some("7"));
        assert!(claims.is_admin());
        assert!(claims.is_expired_at(1_700_000_001));
        assert!(!claims.is_expired_at(1_699_999_999));
    }

    #[test]
    fn test_missing_admin_claim_is_not_admin() {
        let token = encode_test_token(json!({ "sub": "a@x.edu" }));
        let claims = decode_claims(&token).unwrap();
        assert!(!claims.is_admin());
        assert!(!claims.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_null_admin_claim_is_not_admin() {
        let token = encode_test_token(json!({ "sub": "a@x.edu", "is_admin": null }));
        assert!(!decode_claims(&token).unwrap().is_admin());
    }

    #[test]
    fn test_opaque_token_is_malformed() {
        assert!(matches!(decode_claims("t1"), Err(TokenError::Malformed)));
        assert!(matches!(decode_claims("a.b.c.d"), Err(TokenError::Malformed)));
        assert!(matches!(decode_claims(".b.c"), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_bad_payload() {
        assert!(matches!(decode_claims("aaa.!!!.sig"), Err(TokenError::Encoding(_))));

        let not_json = format!("aaa.{}.sig", URL_SAFE_NO_PAD.encode("not json"));
        assert!(matches!(decode_claims(&not_json), Err(TokenError::Payload(_))));
    }
}
