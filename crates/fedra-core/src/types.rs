//! Federation entity types.

use serde::{Deserialize, Serialize};

/// Federation entity type.
///
/// A closed enumeration: only relying parties and providers are admitted by
/// the trust anchor registry and by effective-metadata lookup. Statement
/// payloads may carry other metadata keys (such as `federation_entity`), but
/// those never parse into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// An OpenID relying party.
    OpenidRelyingParty,
    /// An OpenID provider.
    OpenidProvider,
}

impl EntityType {
    /// The wire name of this entity type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::OpenidRelyingParty => "openid_relying_party",
            EntityType::OpenidProvider => "openid_provider",
        }
    }

    /// All entity types the registry accepts.
    #[must_use]
    pub fn all() -> &'static [EntityType] {
        &[EntityType::OpenidRelyingParty, EntityType::OpenidProvider]
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openid_relying_party" => Ok(EntityType::OpenidRelyingParty),
            "openid_provider" => Ok(EntityType::OpenidProvider),
            _ => Err(format!("Invalid entity type: {s}")),
        }
    }
}
