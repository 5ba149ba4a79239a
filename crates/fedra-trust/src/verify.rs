//! Statement signature verification.
//!
//! Verifies a statement's signature against a supplied key set. Temporal
//! checks are deliberately not performed here; the chain validator owns
//! them and runs them before any signature work.

use crate::error::{TrustError, TrustResult};
use crate::models::{EntityStatement, JwkSet, StatementClaims};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::{instrument, warn};

/// How statements are verified.
///
/// `InsecureAcceptAll` exists for development rigs that publish unsigned or
/// mock-signed statements. It is a security boundary: it must be selected
/// explicitly, and every accepted statement is logged at warn level. It is
/// never a fallback when real verification fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationMode {
    /// Verify signatures cryptographically (default).
    #[default]
    Enforce,
    /// Accept every statement without verification, loudly.
    InsecureAcceptAll,
}

/// Statement signature verifier.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    mode: VerificationMode,
}

impl SignatureVerifier {
    /// A verifier in the given mode.
    #[must_use]
    pub fn new(mode: VerificationMode) -> Self {
        Self { mode }
    }

    /// The active verification mode.
    #[must_use]
    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// Verify `statement` against `key_set`.
    ///
    /// # Errors
    ///
    /// - `SignatureInvalid` - unsigned statement, unusable key material, or
    ///   a signature that does not match the signed bytes
    /// - `KeyNotFound` - no key in the set matches the declared key ID
    /// - `AlgorithmUnsupported` - anything other than RS256
    #[instrument(skip(self, statement, key_set), fields(subject = %statement.subject()))]
    pub fn verify(&self, statement: &EntityStatement, key_set: &JwkSet) -> TrustResult<()> {
        if self.mode == VerificationMode::InsecureAcceptAll {
            warn!(
                subject = %statement.subject(),
                issuer = %statement.issuer(),
                "INSECURE verification mode: accepting statement without signature check"
            );
            return Ok(());
        }

        let raw = statement.raw().ok_or_else(|| {
            TrustError::SignatureInvalid("statement carries no signature".to_string())
        })?;

        if statement.header.alg != "RS256" {
            return Err(TrustError::AlgorithmUnsupported(statement.header.alg.clone()));
        }

        let kid = statement.header.kid.as_deref();
        let jwk = key_set.find_signing_key(kid).ok_or_else(|| {
            TrustError::KeyNotFound(kid.unwrap_or("no kid").to_string())
        })?;

        let pem = jwk.to_pem().ok_or_else(|| {
            TrustError::SignatureInvalid("key material is not a usable RSA public key".to_string())
        })?;

        let key = DecodingKey::from_rsa_pem(&pem)
            .map_err(|e| TrustError::SignatureInvalid(format!("invalid public key: {e}")))?;

        // Signature only: temporal validation belongs to the chain validator.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = std::collections::HashSet::new();

        jsonwebtoken::decode::<StatementClaims>(raw, &key, &validation)
            .map_err(map_jwt_error)?;

        Ok(())
    }
}

/// Map jsonwebtoken errors to trust errors.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TrustError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature => {
            TrustError::SignatureInvalid("signature does not match signed bytes".to_string())
        }
        ErrorKind::InvalidAlgorithm => TrustError::AlgorithmUnsupported("mismatched".to_string()),
        ErrorKind::Base64(_) => {
            TrustError::SignatureInvalid("signature segment is not valid base64".to_string())
        }
        _ => TrustError::SignatureInvalid(format!("verification failed: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_compact, decode_json, encode_signed};
    use crate::models::StatementClaims;
    use crate::test_keys::{tamper_signature, test_jwk_set, TEST_PRIVATE_KEY};

    fn signed_statement(kid: &str) -> EntityStatement {
        let claims = StatementClaims::builder()
            .issuer("https://rp.example")
            .subject("https://rp.example")
            .jwks(test_jwk_set(kid))
            .expires_in_secs(3600)
            .build();
        let token = encode_signed(&claims, TEST_PRIVATE_KEY, kid).unwrap();
        decode_compact(&token).unwrap()
    }

    #[test]
    fn test_verify_valid_statement() {
        let statement = signed_statement("fed-key-1");
        let verifier = SignatureVerifier::default();

        assert!(verifier.verify(&statement, &test_jwk_set("fed-key-1")).is_ok());
    }

    #[test]
    fn test_verify_tampered_signature() {
        let statement = signed_statement("fed-key-1");
        let tampered = decode_compact(&tamper_signature(statement.raw().unwrap())).unwrap();

        let verifier = SignatureVerifier::default();
        let err = verifier
            .verify(&tampered, &test_jwk_set("fed-key-1"))
            .unwrap_err();
        assert!(matches!(err, TrustError::SignatureInvalid(_)));
    }

    #[test]
    fn test_verify_unknown_kid() {
        let statement = signed_statement("fed-key-1");
        let verifier = SignatureVerifier::default();

        let err = verifier
            .verify(&statement, &test_jwk_set("other-key"))
            .unwrap_err();
        assert!(matches!(err, TrustError::KeyNotFound(kid) if kid == "fed-key-1"));
    }

    #[test]
    fn test_verify_rejects_non_rs256() {
        let mut statement = signed_statement("fed-key-1");
        statement.header.alg = "HS256".to_string();

        let verifier = SignatureVerifier::default();
        let err = verifier
            .verify(&statement, &test_jwk_set("fed-key-1"))
            .unwrap_err();
        assert!(matches!(err, TrustError::AlgorithmUnsupported(alg) if alg == "HS256"));
    }

    #[test]
    fn test_verify_rejects_unsigned_in_enforce_mode() {
        let claims = StatementClaims::builder()
            .issuer("https://rp.example")
            .subject("https://rp.example")
            .expires_in_secs(3600)
            .build();
        let body = serde_json::to_string(&claims).unwrap();
        let statement = decode_json(&body).unwrap();

        let verifier = SignatureVerifier::default();
        let err = verifier
            .verify(&statement, &test_jwk_set("fed-key-1"))
            .unwrap_err();
        assert!(matches!(err, TrustError::SignatureInvalid(_)));
    }

    #[test]
    fn test_insecure_mode_accepts_unsigned() {
        let claims = StatementClaims::builder()
            .issuer("https://rp.example")
            .subject("https://rp.example")
            .expires_in_secs(3600)
            .build();
        let body = serde_json::to_string(&claims).unwrap();
        let statement = decode_json(&body).unwrap();

        let verifier = SignatureVerifier::new(VerificationMode::InsecureAcceptAll);
        assert!(verifier.verify(&statement, &JwkSet::new()).is_ok());
    }

    #[test]
    fn test_verify_without_kid_uses_first_signing_key() {
        let claims = StatementClaims::builder()
            .issuer("https://rp.example")
            .subject("https://rp.example")
            .expires_in_secs(3600)
            .build();
        let token = encode_signed(&claims, TEST_PRIVATE_KEY, "ignored").unwrap();
        let mut statement = decode_compact(&token).unwrap();
        statement.header.kid = None;

        // Key set whose only key has no kid at all.
        let mut jwk = crate::test_keys::test_jwk("x");
        jwk.kid = None;
        let set = JwkSet::from_keys(vec![jwk]);

        let verifier = SignatureVerifier::default();
        assert!(verifier.verify(&statement, &set).is_ok());
    }
}
