//! Request authentication — bearer tokens, custom headers, and the
//! signed-token scheme.
//!
//! The signed token is an HS256 JWT assembled from a compound `id.secret`
//! API key: the key splits on the first `.`, the left half identifies the
//! key, the right half signs. Tokens expire after one hour and are minted
//! fresh for every call, so clock drift never accumulates.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use tweetforge_core::error::GenerationError;

use crate::registry::{AuthScheme, ProviderSpec};

type HmacSha256 = Hmac<Sha256>;

/// Token lifetime in milliseconds.
const TOKEN_TTL_MS: i64 = 3_600_000;

/// The header name/value pair that authenticates a request to `spec`.
pub fn auth_header(
    spec: &ProviderSpec,
    credential: &str,
) -> Result<(&'static str, String), GenerationError> {
    match spec.auth {
        AuthScheme::Bearer => Ok(("Authorization", format!("Bearer {credential}"))),
        AuthScheme::Header(name) => Ok((name, credential.to_string())),
        AuthScheme::SignedToken => {
            let token = signed_token(credential, chrono::Utc::now().timestamp_millis())?;
            Ok(("Authorization", format!("Bearer {token}")))
        }
    }
}

/// Mint a signed token from an `id.secret` compound key.
///
/// Layout is the standard three-segment JWT: base64url(header) `.`
/// base64url(payload) `.` base64url(HMAC-SHA256(header.payload, secret)),
/// all segments unpadded.
pub fn signed_token(credential: &str, now_ms: i64) -> Result<String, GenerationError> {
    let (key_id, secret) = credential.split_once('.').ok_or_else(|| {
        GenerationError::Configuration(
            "The signed-token API key must look like '<id>.<secret>' — check the value you configured."
                .to_string(),
        )
    })?;
    if key_id.is_empty() || secret.is_empty() {
        return Err(GenerationError::Configuration(
            "The signed-token API key is missing its id or secret half.".to_string(),
        ));
    }

    let header = serde_json::json!({
        "alg": "HS256",
        "sign_type": "SIGN",
        "typ": "JWT",
    });
    let payload = serde_json::json!({
        "api_key": key_id,
        "exp": now_ms + TOKEN_TTL_MS,
        "timestamp": now_ms,
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.to_string());
    let signing_input = format!("{header_b64}.{payload_b64}");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GenerationError::Configuration(format!("Unusable signing secret: {e}")))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::find_by_id;

    const NOW_MS: i64 = 1_700_000_000_000;

    #[test]
    fn test_bearer_header() {
        let spec = find_by_id("groq").unwrap();
        let (name, value) = auth_header(spec, "gsk-123").unwrap();
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer gsk-123");
    }

    #[test]
    fn test_custom_header() {
        let spec = find_by_id("gemini").unwrap();
        let (name, value) = auth_header(spec, "AIza-key").unwrap();
        assert_eq!(name, "x-goog-api-key");
        assert_eq!(value, "AIza-key");
    }

    #[test]
    fn test_signed_token_has_three_segments() {
        let token = signed_token("my-id.my-secret", NOW_MS).unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        for seg in &segments {
            assert!(!seg.is_empty());
            assert!(!seg.contains('='), "segments must be unpadded");
        }
    }

    #[test]
    fn test_signed_token_payload_fields() {
        let token = signed_token("my-id.my-secret", NOW_MS).unwrap();
        let payload_b64 = token.split('.').nth(1).unwrap();
        let payload_bytes = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).unwrap();

        assert_eq!(payload["api_key"], "my-id");
        assert_eq!(payload["timestamp"], NOW_MS);
        assert_eq!(payload["exp"], NOW_MS + 3_600_000);
    }

    #[test]
    fn test_signed_token_signature_verifies() {
        let token = signed_token("my-id.my-secret", NOW_MS).unwrap();
        let mut parts = token.rsplitn(2, '.');
        let signature = parts.next().unwrap();
        let signing_input = parts.next().unwrap();

        let mut mac = HmacSha256::new_from_slice(b"my-secret").unwrap();
        mac.update(signing_input.as_bytes());
        let expected = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        assert_eq!(signature, expected);
    }

    #[test]
    fn test_signed_token_is_deterministic_for_fixed_time() {
        let a = signed_token("id.secret", NOW_MS).unwrap();
        let b = signed_token("id.secret", NOW_MS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signed_token_rejects_malformed_key() {
        assert!(signed_token("no-separator", NOW_MS).is_err());
        assert!(signed_token(".secret-only", NOW_MS).is_err());
        assert!(signed_token("id-only.", NOW_MS).is_err());
    }

    #[test]
    fn test_signed_token_splits_on_first_dot() {
        // Secrets may themselves contain dots
        let token = signed_token("id.se.cret", NOW_MS).unwrap();
        let payload_b64 = token.split('.').nth(1).unwrap();
        let payload: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload_b64).unwrap()).unwrap();
        assert_eq!(payload["api_key"], "id");
    }

    #[test]
    fn test_signed_token_scheme_wraps_in_bearer() {
        let spec = find_by_id("zhipu").unwrap();
        let (name, value) = auth_header(spec, "id.secret").unwrap();
        assert_eq!(name, "Authorization");
        assert!(value.starts_with("Bearer "));
        assert_eq!(value.matches('.').count(), 2);
    }
}
