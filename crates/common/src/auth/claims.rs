//! JWT payload decoding
//!
//! Reads the claims segment of an access token without verifying the
//! signature. The backend is the only party that validates tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use carelink_domain::{CareLinkError, Result, TokenClaims};

/// Decode the payload segment of a compact JWT.
///
/// # Errors
/// Returns `CareLinkError::InvalidInput` if the token does not have three
/// segments or the payload is not base64url-encoded JSON.
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(CareLinkError::InvalidInput("token is not a compact JWT".into())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| CareLinkError::InvalidInput(format!("token payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| CareLinkError::InvalidInput(format!("token payload is not JSON claims: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn decodes_user_id_and_expiry() {
        let token =
            token_with_payload(r#"{"token_type":"access","exp":1700000000,"jti":"abc","user_id":42}"#);
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.user_id, Some(42));
        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(claims.token_type.as_deref(), Some("access"));
        assert_eq!(claims.jti.as_deref(), Some("abc"));
    }

    #[test]
    fn unknown_claims_are_ignored() {
        let token = token_with_payload(r#"{"user_id":7,"scope":"read"}"#);
        assert_eq!(decode_claims(&token).unwrap().user_id, Some(7));
    }

    #[test]
    fn rejects_opaque_tokens() {
        assert!(decode_claims("opaque-token").is_err());
        assert!(decode_claims("a.b.c.d").is_err());
        assert!(decode_claims("e30.!!!.sig").is_err());
        assert!(decode_claims(&token_with_payload("not json")).is_err());
    }
}
