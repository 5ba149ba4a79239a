//! Dynamic registration service.
//!
//! Consumes a validated trust chain's effective metadata plus the relying
//! party's Request Object and produces a registration decision. The decision
//! is handed to the IdP core for persistence; nothing is stored here.

use crate::error::RegistrationError;
use crate::request_object::RequestObjectClaims;
use fedra_core::{EntityId, EntityType};
use fedra_trust::models::{EffectiveMetadata, MetadataObject};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

/// Outcome of one registration attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationDecision {
    /// Whether the registration was accepted.
    pub accepted: bool,
    /// Reconciled client metadata for the IdP core to persist, on acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_metadata: Option<MetadataObject>,
    /// The specific rejection cause, on rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<RegistrationError>,
}

impl RegistrationDecision {
    /// An accepted registration carrying the reconciled metadata.
    #[must_use]
    pub fn accepted(client_metadata: MetadataObject) -> Self {
        Self {
            accepted: true,
            client_metadata: Some(client_metadata),
            rejection_reason: None,
        }
    }

    /// A rejected registration tagged with its cause.
    #[must_use]
    pub fn rejected(reason: RegistrationError) -> Self {
        Self {
            accepted: false,
            client_metadata: None,
            rejection_reason: Some(reason),
        }
    }
}

/// Dynamic registration service.
#[derive(Debug, Clone, Default)]
pub struct RegistrationService;

impl RegistrationService {
    /// A registration service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decide a registration request.
    ///
    /// `validated_entity` is the entity whose trust chain produced
    /// `validated_metadata`; the request object must be about that same
    /// entity, and everything it asks for must be covered by the effective
    /// relying-party metadata.
    #[instrument(skip(self, request, validated_metadata), fields(entity = %validated_entity))]
    pub fn register(
        &self,
        request: &RequestObjectClaims,
        validated_entity: &EntityId,
        validated_metadata: &EffectiveMetadata,
    ) -> RegistrationDecision {
        if let Err(reason) = self.check_entity(request, validated_entity) {
            warn!(entity = %validated_entity, error = %reason, "registration rejected");
            return RegistrationDecision::rejected(reason);
        }

        let effective_rp = match validated_metadata.get(EntityType::OpenidRelyingParty) {
            Some(metadata) => metadata,
            None => {
                let reason = RegistrationError::MetadataMismatch {
                    field: "client_metadata".to_string(),
                    message: "validated chain carries no relying-party metadata".to_string(),
                };
                warn!(entity = %validated_entity, error = %reason, "registration rejected");
                return RegistrationDecision::rejected(reason);
            }
        };

        let redirect_uris = match self.check_redirect_uris(request, effective_rp) {
            Ok(uris) => uris,
            Err(reason) => {
                warn!(entity = %validated_entity, error = %reason, "registration rejected");
                return RegistrationDecision::rejected(reason);
            }
        };

        let scopes = match self.check_scopes(request, effective_rp) {
            Ok(scopes) => scopes,
            Err(reason) => {
                warn!(entity = %validated_entity, error = %reason, "registration rejected");
                return RegistrationDecision::rejected(reason);
            }
        };

        // Reconcile: the chain's effective metadata, narrowed to what the
        // relying party actually requested.
        let mut reconciled = effective_rp.clone();
        if !redirect_uris.is_empty() {
            reconciled.set(
                "redirect_uris",
                Value::Array(redirect_uris.into_iter().map(Value::String).collect()),
            );
        }
        if !scopes.is_empty() {
            reconciled.set("scope", Value::String(scopes.join(" ")));
        }

        info!(entity = %validated_entity, "registration accepted");
        RegistrationDecision::accepted(reconciled)
    }

    /// The request object must be about the chain-validated entity; a chain
    /// cannot be substituted onto an unrelated registration.
    fn check_entity(
        &self,
        request: &RequestObjectClaims,
        validated_entity: &EntityId,
    ) -> Result<(), RegistrationError> {
        if request.client_id != validated_entity.as_str() {
            return Err(RegistrationError::EntityMismatch {
                declared: request.client_id.clone(),
                validated: validated_entity.to_string(),
            });
        }
        if let Some(iss) = &request.iss {
            if iss != validated_entity.as_str() {
                return Err(RegistrationError::EntityMismatch {
                    declared: iss.clone(),
                    validated: validated_entity.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_redirect_uris(
        &self,
        request: &RequestObjectClaims,
        effective_rp: &MetadataObject,
    ) -> Result<Vec<String>, RegistrationError> {
        let requested = request.requested_redirect_uris();
        if requested.is_empty() {
            return Ok(requested);
        }

        let allowed = effective_rp
            .string_values("redirect_uris")
            .unwrap_or_default();
        if allowed.is_empty() {
            return Err(RegistrationError::MetadataMismatch {
                field: "redirect_uris".to_string(),
                message: "validated metadata permits no redirect URIs".to_string(),
            });
        }

        for uri in &requested {
            if !allowed.contains(uri) {
                return Err(RegistrationError::MetadataMismatch {
                    field: "redirect_uris".to_string(),
                    message: format!("'{uri}' is not among the validated redirect URIs"),
                });
            }
        }
        Ok(requested)
    }

    fn check_scopes(
        &self,
        request: &RequestObjectClaims,
        effective_rp: &MetadataObject,
    ) -> Result<Vec<String>, RegistrationError> {
        let requested = request.requested_scopes();
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        // Effective scope may be a space-separated string or an array.
        let allowed: Vec<String> = match effective_rp.string_values("scope") {
            Some(values) if values.len() == 1 => values[0]
                .split_whitespace()
                .map(ToString::to_string)
                .collect(),
            Some(values) => values,
            None => Vec::new(),
        };

        for scope in &requested {
            if !allowed.iter().any(|a| a == scope) {
                return Err(RegistrationError::MetadataMismatch {
                    field: "scope".to_string(),
                    message: format!("'{scope}' is not among the validated scopes"),
                });
            }
        }
        Ok(requested.into_iter().map(ToString::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn effective_metadata() -> EffectiveMetadata {
        let mut rp = MetadataObject::new();
        rp.set("client_name", json!("Demo RP"));
        rp.set(
            "redirect_uris",
            json!(["https://rp.example/callback", "https://rp.example/alt"]),
        );
        rp.set("scope", json!(["openid", "profile", "email"]));

        let mut effective = EffectiveMetadata::new();
        effective.insert(EntityType::OpenidRelyingParty, rp);
        effective
    }

    fn request(client_id: &str) -> RequestObjectClaims {
        RequestObjectClaims {
            iss: Some(client_id.to_string()),
            client_id: client_id.to_string(),
            response_type: Some("code".to_string()),
            redirect_uri: Some("https://rp.example/callback".to_string()),
            scope: Some("openid profile".to_string()),
            state: None,
            nonce: None,
            client_metadata: None,
        }
    }

    #[test]
    fn test_accepts_consistent_request() {
        let service = RegistrationService::new();
        let decision = service.register(
            &request("https://rp.example"),
            &EntityId::new("https://rp.example"),
            &effective_metadata(),
        );

        assert!(decision.accepted);
        let metadata = decision.client_metadata.unwrap();
        assert_eq!(
            metadata.get("redirect_uris"),
            Some(&json!(["https://rp.example/callback"]))
        );
        assert_eq!(metadata.get("scope"), Some(&json!("openid profile")));
        assert_eq!(metadata.get("client_name"), Some(&json!("Demo RP")));
        assert!(decision.rejection_reason.is_none());
    }

    #[test]
    fn test_rejects_client_id_mismatch() {
        let service = RegistrationService::new();
        let decision = service.register(
            &request("https://other.example"),
            &EntityId::new("https://rp.example"),
            &effective_metadata(),
        );

        assert!(!decision.accepted);
        assert!(matches!(
            decision.rejection_reason,
            Some(RegistrationError::EntityMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_issuer_mismatch() {
        let mut req = request("https://rp.example");
        req.iss = Some("https://other.example".to_string());

        let service = RegistrationService::new();
        let decision = service.register(
            &req,
            &EntityId::new("https://rp.example"),
            &effective_metadata(),
        );

        assert!(!decision.accepted);
        assert!(matches!(
            decision.rejection_reason,
            Some(RegistrationError::EntityMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_redirect_uri_outside_metadata() {
        let mut req = request("https://rp.example");
        req.redirect_uri = Some("https://rp.example/unregistered".to_string());

        let service = RegistrationService::new();
        let decision = service.register(
            &req,
            &EntityId::new("https://rp.example"),
            &effective_metadata(),
        );

        assert!(!decision.accepted);
        assert!(matches!(
            decision.rejection_reason,
            Some(RegistrationError::MetadataMismatch { ref field, .. }) if field == "redirect_uris"
        ));
    }

    #[test]
    fn test_rejects_scope_outside_metadata() {
        let mut req = request("https://rp.example");
        req.scope = Some("openid admin".to_string());

        let service = RegistrationService::new();
        let decision = service.register(
            &req,
            &EntityId::new("https://rp.example"),
            &effective_metadata(),
        );

        assert!(!decision.accepted);
        assert!(matches!(
            decision.rejection_reason,
            Some(RegistrationError::MetadataMismatch { ref field, .. }) if field == "scope"
        ));
    }

    #[test]
    fn test_rejects_when_no_rp_metadata_validated() {
        let service = RegistrationService::new();
        let decision = service.register(
            &request("https://rp.example"),
            &EntityId::new("https://rp.example"),
            &EffectiveMetadata::new(),
        );

        assert!(!decision.accepted);
        assert!(matches!(
            decision.rejection_reason,
            Some(RegistrationError::MetadataMismatch { .. })
        ));
    }

    #[test]
    fn test_client_metadata_redirect_uris_also_checked() {
        let mut req = request("https://rp.example");
        req.redirect_uri = None;
        let mut client_metadata = MetadataObject::new();
        client_metadata.set(
            "redirect_uris",
            json!(["https://rp.example/alt", "https://rp.example/sneaky"]),
        );
        req.client_metadata = Some(client_metadata);

        let service = RegistrationService::new();
        let decision = service.register(
            &req,
            &EntityId::new("https://rp.example"),
            &effective_metadata(),
        );

        assert!(!decision.accepted);
    }

    #[test]
    fn test_scope_string_form_in_effective_metadata() {
        let mut rp = MetadataObject::new();
        rp.set("redirect_uris", json!(["https://rp.example/callback"]));
        rp.set("scope", json!("openid profile"));
        let mut effective = EffectiveMetadata::new();
        effective.insert(EntityType::OpenidRelyingParty, rp);

        let service = RegistrationService::new();
        let decision = service.register(
            &request("https://rp.example"),
            &EntityId::new("https://rp.example"),
            &effective,
        );

        assert!(decision.accepted);
    }

    #[test]
    fn test_decision_serializes_reason_code() {
        let decision = RegistrationDecision::rejected(RegistrationError::MetadataMismatch {
            field: "scope".to_string(),
            message: "'admin' is not among the validated scopes".to_string(),
        });

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["accepted"], json!(false));
        assert_eq!(json["rejection_reason"]["type"], json!("metadata_mismatch"));
        assert_eq!(json["rejection_reason"]["field"], json!("scope"));
    }
}
