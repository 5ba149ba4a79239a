//! Metadata policy operators.
//!
//! A superior constrains how a subordinate may express its metadata through
//! per-claim policy records. The operator set is closed: value override,
//! subset-of constraint, default-if-absent. Application order within one
//! record is fixed (value, then subset_of, then default), and policies are
//! applied walking the chain from the anchor side toward the leaf.

use crate::error::{TrustError, TrustResult};
use crate::models::metadata::MetadataObject;
use fedra_core::EntityType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Policy record for a single metadata claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimPolicy {
    /// Forces the claim to this exact value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Constrains the claim to the listed values. An array claim must be a
    /// subset; a scalar claim must be a member. Anything outside the set is
    /// a policy violation, never silently trimmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subset_of: Option<Vec<Value>>,

    /// Supplies a value when the claim is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ClaimPolicy {
    /// A policy that forces an exact value.
    #[must_use]
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// A policy that constrains to a set of allowed values.
    #[must_use]
    pub fn subset_of(allowed: Vec<Value>) -> Self {
        Self {
            subset_of: Some(allowed),
            ..Self::default()
        }
    }

    /// A policy that supplies a default.
    #[must_use]
    pub fn default_value(value: Value) -> Self {
        Self {
            default: Some(value),
            ..Self::default()
        }
    }

    /// Apply this policy to the current value of one claim.
    ///
    /// # Errors
    ///
    /// Returns `PolicyViolation` when the (possibly overridden) value falls
    /// outside a `subset_of` constraint.
    pub fn apply(
        &self,
        entity_type: EntityType,
        claim: &str,
        current: Option<Value>,
    ) -> TrustResult<Option<Value>> {
        let mut current = current;

        if let Some(forced) = &self.value {
            current = Some(forced.clone());
        }

        if let Some(allowed) = &self.subset_of {
            match &current {
                None => {}
                Some(Value::Array(items)) => {
                    if let Some(outside) = items.iter().find(|item| !allowed.contains(item)) {
                        return Err(TrustError::PolicyViolation {
                            entity_type,
                            claim: claim.to_string(),
                            message: format!("value {outside} is outside the allowed set"),
                        });
                    }
                }
                Some(scalar) => {
                    if !allowed.contains(scalar) {
                        return Err(TrustError::PolicyViolation {
                            entity_type,
                            claim: claim.to_string(),
                            message: format!("value {scalar} is outside the allowed set"),
                        });
                    }
                }
            }
        }

        if current.is_none() {
            if let Some(default) = &self.default {
                current = Some(default.clone());
            }
        }

        Ok(current)
    }
}

/// Per-claim policies for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataPolicy(BTreeMap<String, ClaimPolicy>);

impl MetadataPolicy {
    /// An empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim policy.
    #[must_use]
    pub fn with_claim(mut self, claim: impl Into<String>, policy: ClaimPolicy) -> Self {
        self.0.insert(claim.into(), policy);
        self
    }

    /// Apply every claim policy in this record to a metadata object.
    ///
    /// # Errors
    ///
    /// Propagates the first `PolicyViolation` encountered.
    pub fn apply(&self, entity_type: EntityType, metadata: &mut MetadataObject) -> TrustResult<()> {
        for (claim, policy) in &self.0 {
            let current = metadata.get(claim).cloned();
            match policy.apply(entity_type, claim, current)? {
                Some(value) => metadata.set(claim.clone(), value),
                None => {
                    metadata.remove(claim);
                }
            }
        }
        Ok(())
    }
}

/// The `metadata_policy` claim: policies keyed by entity-type wire name.
pub type MetadataPolicyMap = BTreeMap<String, MetadataPolicy>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RP: EntityType = EntityType::OpenidRelyingParty;

    #[test]
    fn test_value_overrides_leaf() {
        let policy = ClaimPolicy::value(json!("https://op.example/token"));
        let result = policy
            .apply(RP, "token_endpoint_auth_method", Some(json!("none")))
            .unwrap();
        assert_eq!(result, Some(json!("https://op.example/token")));
    }

    #[test]
    fn test_subset_of_accepts_subset_array() {
        let policy = ClaimPolicy::subset_of(vec![json!("openid"), json!("profile"), json!("email")]);
        let result = policy
            .apply(RP, "scope", Some(json!(["openid", "email"])))
            .unwrap();
        assert_eq!(result, Some(json!(["openid", "email"])));
    }

    #[test]
    fn test_subset_of_rejects_value_outside_set() {
        let policy = ClaimPolicy::subset_of(vec![json!("openid")]);
        let err = policy
            .apply(RP, "scope", Some(json!(["openid", "admin"])))
            .unwrap_err();
        assert!(matches!(err, TrustError::PolicyViolation { claim, .. } if claim == "scope"));
    }

    #[test]
    fn test_subset_of_scalar_membership() {
        let policy = ClaimPolicy::subset_of(vec![json!("code"), json!("id_token")]);

        assert!(policy.apply(RP, "response_type", Some(json!("code"))).is_ok());
        assert!(policy
            .apply(RP, "response_type", Some(json!("token")))
            .is_err());
    }

    #[test]
    fn test_subset_of_ignores_absent_claim() {
        let policy = ClaimPolicy::subset_of(vec![json!("openid")]);
        assert_eq!(policy.apply(RP, "scope", None).unwrap(), None);
    }

    #[test]
    fn test_default_fills_absent_only() {
        let policy = ClaimPolicy::default_value(json!("openid"));

        assert_eq!(policy.apply(RP, "scope", None).unwrap(), Some(json!("openid")));
        assert_eq!(
            policy.apply(RP, "scope", Some(json!("profile"))).unwrap(),
            Some(json!("profile"))
        );
    }

    #[test]
    fn test_value_then_subset_then_default_order() {
        // The forced value itself must satisfy subset_of.
        let policy = ClaimPolicy {
            value: Some(json!("token")),
            subset_of: Some(vec![json!("code")]),
            default: None,
        };
        assert!(policy.apply(RP, "response_type", Some(json!("code"))).is_err());
    }

    #[test]
    fn test_metadata_policy_applies_all_claims() {
        let policy = MetadataPolicy::new()
            .with_claim("scope", ClaimPolicy::subset_of(vec![json!("openid")]))
            .with_claim("client_name", ClaimPolicy::default_value(json!("unnamed")));

        let mut metadata = MetadataObject::new();
        metadata.set("scope", json!(["openid"]));

        policy.apply(RP, &mut metadata).unwrap();
        assert_eq!(metadata.get("client_name"), Some(&json!("unnamed")));
    }

    #[test]
    fn test_policy_deserializes_from_wire_shape() {
        let raw = json!({
            "scope": { "subset_of": ["openid", "profile"], "default": "openid" },
            "grant_types": { "value": ["authorization_code"] }
        });

        let policy: MetadataPolicy = serde_json::from_value(raw).unwrap();
        let mut metadata = MetadataObject::new();
        policy.apply(RP, &mut metadata).unwrap();

        assert_eq!(metadata.get("scope"), Some(&json!("openid")));
        assert_eq!(metadata.get("grant_types"), Some(&json!(["authorization_code"])));
    }
}
