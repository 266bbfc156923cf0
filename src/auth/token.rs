use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Access/refresh token pair as issued by the auth backend. The backend may
/// or may not rotate the refresh token on renewal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Claims extracted from the payload segment of a JWT-shaped access token.
/// The signature is never verified client-side; only the expiry matters here.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenClaims {
    pub iat: Option<u64>,
    pub exp: Option<u64>,
}

impl TokenClaims {
    pub fn expires_in_seconds(&self, now: SystemTime) -> Option<i64> {
        let exp = self.exp? as i64;
        let now_secs = now.duration_since(UNIX_EPOCH).ok()?.as_secs() as i64;
        Some(exp - now_secs)
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_in_seconds(now)
            .is_some_and(|remaining| remaining <= 0)
    }
}

/// Decodes the claims of a bearer token without verifying it. Any structural
/// problem (wrong segment count, invalid base64url, non-JSON payload) yields
/// `None` rather than an error: an undecodable token simply has no usable
/// expiry.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let payload = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(header), Some(payload), Some(_signature), None) if !header.is_empty() => payload,
        _ => return None,
    };

    let raw = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&raw).ok()
}

/// Expiry of a bearer token in Unix milliseconds, or `None` when the token
/// carries no usable `exp` claim.
pub fn expiry_millis(token: &str) -> Option<u64> {
    decode_claims(token)?.exp?.checked_mul(1000)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn encode_token(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn decodes_exp_and_iat() {
        let token = encode_token(r#"{"iat":1700000000,"exp":1700003600}"#);
        let claims = decode_claims(&token).expect("claims should decode");
        assert_eq!(claims.iat, Some(1_700_000_000));
        assert_eq!(claims.exp, Some(1_700_003_600));
        assert_eq!(expiry_millis(&token), Some(1_700_003_600_000));
    }

    #[test]
    fn missing_exp_yields_no_expiry() {
        let token = encode_token(r#"{"sub":"user-1"}"#);
        assert!(decode_claims(&token).is_some());
        assert_eq!(expiry_millis(&token), None);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(decode_claims("only-one-segment").is_none());
        assert!(decode_claims("two.segments").is_none());
        assert!(decode_claims("a.b.c.d").is_none());
    }

    #[test]
    fn rejects_invalid_base64_payload() {
        assert!(decode_claims("header.!!!not-base64!!!.signature").is_none());
    }

    #[test]
    fn rejects_non_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode(b"plain text");
        assert!(decode_claims(&format!("h.{payload}.s")).is_none());
    }

    #[test]
    fn expiry_math_tracks_now() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let claims = TokenClaims {
            iat: Some(1_700_000_000),
            exp: Some(1_700_003_600),
        };

        assert_eq!(claims.expires_in_seconds(now), Some(3600));
        assert!(!claims.is_expired(now));
        assert!(claims.is_expired(now + Duration::from_secs(3600)));
    }
}
