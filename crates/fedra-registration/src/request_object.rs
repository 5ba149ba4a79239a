//! Request Object parsing and verification.
//!
//! A relying party submits its registration as a compact token whose payload
//! carries standard OAuth2 authorization parameters plus a `client_metadata`
//! object. The token's signature is checked against the keys that the
//! relying party's validated trust chain vouched for.

use crate::error::{RegistrationError, RegistrationResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use fedra_trust::models::{JwkSet, MetadataObject};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims of a registration Request Object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestObjectClaims {
    /// Issuer; for federation registration this is the relying party itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// The client identifier: the relying party's entity id.
    pub client_id: String,

    /// Requested response type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,

    /// Requested redirect URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Requested scope, space-separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Opaque state echoed back to the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Replay nonce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// The relying party's self-description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_metadata: Option<MetadataObject>,
}

impl RequestObjectClaims {
    /// The scope values requested, split on whitespace.
    #[must_use]
    pub fn requested_scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Every redirect URI the request asks for: the authorization parameter
    /// plus any listed in `client_metadata.redirect_uris`.
    #[must_use]
    pub fn requested_redirect_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = Vec::new();
        if let Some(uri) = &self.redirect_uri {
            uris.push(uri.clone());
        }
        if let Some(metadata) = &self.client_metadata {
            if let Some(listed) = metadata.string_values("redirect_uris") {
                for uri in listed {
                    if !uris.contains(&uri) {
                        uris.push(uri);
                    }
                }
            }
        }
        uris
    }
}

/// Parse a Request Object token without verifying its signature.
///
/// # Errors
///
/// `MalformedRequestObject` for anything that is not three base64url
/// segments around a JSON payload.
pub fn parse_request_object(token: &str) -> RegistrationResult<RequestObjectClaims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(RegistrationError::MalformedRequestObject(format!(
            "expected 3 token segments, found {}",
            segments.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD.decode(segments[1]).map_err(|e| {
        RegistrationError::MalformedRequestObject(format!("payload is not base64url: {e}"))
    })?;

    serde_json::from_slice(&payload).map_err(|e| {
        RegistrationError::MalformedRequestObject(format!("payload is not valid JSON: {e}"))
    })
}

/// Parse a Request Object and verify its signature against the relying
/// party's chain-validated key set.
///
/// # Errors
///
/// - `MalformedRequestObject` - token structure or header problems
/// - `RequestObjectSignatureInvalid` - no usable key or failed verification
pub fn verify_request_object(
    token: &str,
    rp_keys: &JwkSet,
) -> RegistrationResult<RequestObjectClaims> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| RegistrationError::MalformedRequestObject(format!("invalid header: {e}")))?;

    if header.alg != Algorithm::RS256 {
        return Err(RegistrationError::RequestObjectSignatureInvalid(format!(
            "unsupported algorithm: {:?}",
            header.alg
        )));
    }

    let jwk = rp_keys
        .find_signing_key(header.kid.as_deref())
        .ok_or_else(|| {
            RegistrationError::RequestObjectSignatureInvalid(format!(
                "no key matching '{}'",
                header.kid.as_deref().unwrap_or("no kid")
            ))
        })?;

    let pem = jwk.to_pem().ok_or_else(|| {
        RegistrationError::RequestObjectSignatureInvalid(
            "key material is not a usable RSA public key".to_string(),
        )
    })?;
    let key = DecodingKey::from_rsa_pem(&pem).map_err(|e| {
        RegistrationError::RequestObjectSignatureInvalid(format!("invalid public key: {e}"))
    })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = std::collections::HashSet::new();

    let data = jsonwebtoken::decode::<RequestObjectClaims>(token, &key, &validation)
        .map_err(|e| RegistrationError::RequestObjectSignatureInvalid(e.to_string()))?;

    Ok(data.claims)
}
