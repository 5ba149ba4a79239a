//! Metadata objects and the effective-metadata result of a validated chain.

use fedra_core::EntityType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A metadata object for one entity type: a string-keyed JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataObject(Map<String, Value>);

impl MetadataObject {
    /// An empty metadata object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a claim by name.
    #[must_use]
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    /// Set a claim, replacing any previous value.
    pub fn set(&mut self, claim: impl Into<String>, value: Value) {
        self.0.insert(claim.into(), value);
    }

    /// Remove a claim.
    pub fn remove(&mut self, claim: &str) -> Option<Value> {
        self.0.remove(claim)
    }

    /// Whether the object has no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the claims.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The claim value as a list of strings, treating a scalar string as a
    /// singleton. Returns None when the claim is absent or not string-shaped.
    #[must_use]
    pub fn string_values(&self, claim: &str) -> Option<Vec<String>> {
        match self.get(claim)? {
            Value::String(s) => Some(vec![s.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(ToString::to_string))
                .collect(),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for MetadataObject {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for MetadataObject {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The metadata for each entity type after every policy along a validated
/// chain has been applied. Produced once per successful validation and not
/// mutated afterward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectiveMetadata(BTreeMap<EntityType, MetadataObject>);

impl EffectiveMetadata {
    /// An empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The effective metadata for one entity type.
    #[must_use]
    pub fn get(&self, entity_type: EntityType) -> Option<&MetadataObject> {
        self.0.get(&entity_type)
    }

    /// Record the merged metadata for one entity type.
    pub fn insert(&mut self, entity_type: EntityType, metadata: MetadataObject) {
        self.0.insert(entity_type, metadata);
    }

    /// Entity types present in the result.
    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.0.keys().copied()
    }

    /// Whether no entity type produced metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_values_scalar_and_array() {
        let mut obj = MetadataObject::new();
        obj.set("scope", json!("openid profile"));
        obj.set("redirect_uris", json!(["https://rp.example/cb"]));
        obj.set("count", json!(3));

        assert_eq!(obj.string_values("scope").unwrap(), vec!["openid profile"]);
        assert_eq!(
            obj.string_values("redirect_uris").unwrap(),
            vec!["https://rp.example/cb"]
        );
        assert!(obj.string_values("count").is_none());
        assert!(obj.string_values("absent").is_none());
    }

    #[test]
    fn test_effective_metadata_keyed_by_entity_type() {
        let mut effective = EffectiveMetadata::new();
        let mut rp = MetadataObject::new();
        rp.set("client_name", json!("Demo RP"));
        effective.insert(EntityType::OpenidRelyingParty, rp);

        assert!(effective.get(EntityType::OpenidRelyingParty).is_some());
        assert!(effective.get(EntityType::OpenidProvider).is_none());

        let json = serde_json::to_value(&effective).unwrap();
        assert_eq!(
            json["openid_relying_party"]["client_name"],
            json!("Demo RP")
        );
    }
}
