//! Entity-statement codec.
//!
//! Statements travel as compact `header.payload.signature` tokens (each
//! segment unpadded base64url). Test deployments may publish raw JSON bodies
//! instead; accepting those is gated by [`CodecMode`] and such statements
//! carry no signature.

use crate::error::{TrustError, TrustResult};
use crate::models::{EntityStatement, StatementClaims, StatementHeader};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, EncodingKey, Header};

/// Media type of a compact entity-statement token.
pub const ENTITY_STATEMENT_CONTENT_TYPE: &str = "application/entity-statement+jwt";

/// Which statement representations the codec accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecMode {
    /// Compact signed tokens only (production).
    #[default]
    CompactOnly,
    /// Compact tokens, falling back to raw JSON bodies (test deployments).
    CompactOrJson,
}

/// Decode a compact entity-statement token without verifying its signature.
///
/// # Errors
///
/// `MalformedStatement` for anything that is not exactly three dot-separated
/// base64url segments decoding to a JSON header and payload.
pub fn decode_compact(token: &str) -> TrustResult<EntityStatement> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TrustError::MalformedStatement(format!(
            "expected 3 token segments, found {}",
            segments.len()
        )));
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|e| TrustError::MalformedStatement(format!("header is not base64url: {e}")))?;
    let header: StatementHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| TrustError::MalformedStatement(format!("header is not valid JSON: {e}")))?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| TrustError::MalformedStatement(format!("payload is not base64url: {e}")))?;
    let claims: StatementClaims = serde_json::from_slice(&payload_bytes)
        .map_err(|e| TrustError::MalformedStatement(format!("payload is not valid JSON: {e}")))?;

    Ok(EntityStatement::from_parts(
        header,
        claims,
        Some(token.to_string()),
    ))
}

/// Decode a raw JSON statement body. The result is unsigned and only passes
/// verification in the insecure verifier mode.
///
/// # Errors
///
/// `MalformedStatement` when the body is not a valid claims document.
pub fn decode_json(body: &str) -> TrustResult<EntityStatement> {
    let claims: StatementClaims = serde_json::from_str(body)
        .map_err(|e| TrustError::MalformedStatement(format!("body is not valid JSON: {e}")))?;

    Ok(EntityStatement::from_parts(
        StatementHeader::unsigned(),
        claims,
        None,
    ))
}

/// Decode a statement body according to the configured mode.
///
/// In [`CodecMode::CompactOrJson`], bodies that start with `{` are parsed as
/// raw JSON; everything else goes through the compact parser.
///
/// # Errors
///
/// `MalformedStatement` as for the underlying parser.
pub fn decode_body(body: &str, mode: CodecMode) -> TrustResult<EntityStatement> {
    match mode {
        CodecMode::CompactOnly => decode_compact(body),
        CodecMode::CompactOrJson => {
            if body.trim_start().starts_with('{') {
                decode_json(body)
            } else {
                decode_compact(body)
            }
        }
    }
}

/// Sign claims into a compact entity-statement token (RS256, explicit kid).
///
/// # Errors
///
/// `MalformedStatement` when the private key is not a valid RSA PEM or
/// encoding fails.
pub fn encode_signed(
    claims: &StatementClaims,
    private_key_pem: &[u8],
    kid: &str,
) -> TrustResult<String> {
    let key = EncodingKey::from_rsa_pem(private_key_pem)
        .map_err(|e| TrustError::MalformedStatement(format!("invalid signing key: {e}")))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    header.typ = Some("entity-statement+jwt".to_string());

    jsonwebtoken::encode(&header, claims, &key)
        .map_err(|e| TrustError::MalformedStatement(format!("encoding failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JwkSet;
    use crate::test_keys::{test_jwk, TEST_PRIVATE_KEY};

    fn sample_claims() -> StatementClaims {
        StatementClaims::builder()
            .issuer("https://rp.example")
            .subject("https://rp.example")
            .jwks(JwkSet::from_keys(vec![test_jwk("fed-key-1")]))
            .authority_hint("https://anchor.example")
            .expires_in_secs(3600)
            .build()
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let claims = sample_claims();
        let token = encode_signed(&claims, TEST_PRIVATE_KEY, "fed-key-1").unwrap();

        assert_eq!(token.split('.').count(), 3);

        let statement = decode_compact(&token).unwrap();
        assert_eq!(statement.header.alg, "RS256");
        assert_eq!(statement.header.kid.as_deref(), Some("fed-key-1"));
        assert_eq!(statement.header.typ.as_deref(), Some("entity-statement+jwt"));
        assert_eq!(statement.claims.iss, claims.iss);
        assert_eq!(statement.claims.jti, claims.jti);
        assert_eq!(statement.raw(), Some(token.as_str()));
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        assert!(matches!(
            decode_compact("only.two"),
            Err(TrustError::MalformedStatement(_))
        ));
        assert!(matches!(
            decode_compact("a.b.c.d"),
            Err(TrustError::MalformedStatement(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(matches!(
            decode_compact("!!.@@.##"),
            Err(TrustError::MalformedStatement(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let not_json = URL_SAFE_NO_PAD.encode(b"not json");
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256"}"#);
        let token = format!("{header}.{not_json}.sig");

        assert!(matches!(
            decode_compact(&token),
            Err(TrustError::MalformedStatement(_))
        ));
    }

    #[test]
    fn test_json_body_only_in_permissive_mode() {
        let claims = sample_claims();
        let body = serde_json::to_string(&claims).unwrap();

        let statement = decode_body(&body, CodecMode::CompactOrJson).unwrap();
        assert_eq!(statement.header.alg, "none");
        assert!(statement.raw().is_none());

        assert!(matches!(
            decode_body(&body, CodecMode::CompactOnly),
            Err(TrustError::MalformedStatement(_))
        ));
    }

    #[test]
    fn test_compact_token_accepted_in_either_mode() {
        let token = encode_signed(&sample_claims(), TEST_PRIVATE_KEY, "fed-key-1").unwrap();

        assert!(decode_body(&token, CodecMode::CompactOnly).is_ok());
        assert!(decode_body(&token, CodecMode::CompactOrJson).is_ok());
    }
}
