//! Entity statements and their claims.
//!
//! An entity statement is a signed assertion about one entity: its keys, its
//! metadata, and its place in the trust hierarchy. A statement whose issuer
//! equals its subject is that entity's own configuration; otherwise it is a
//! subordinate statement issued by a superior.

use crate::models::keys::JwkSet;
use crate::models::metadata::MetadataObject;
use crate::models::policy::MetadataPolicyMap;
use chrono::{Duration, Utc};
use fedra_core::{EntityId, EntityType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Metadata key under which federation-infrastructure parameters live.
pub const FEDERATION_ENTITY: &str = "federation_entity";

/// Header of a compact entity-statement token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementHeader {
    /// Signature algorithm.
    pub alg: String,
    /// Key ID of the signing key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Token type; `entity-statement+jwt` on the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl StatementHeader {
    /// Header for an unsigned statement parsed from a raw JSON body
    /// (test configurations only).
    #[must_use]
    pub fn unsigned() -> Self {
        Self {
            alg: "none".to_string(),
            kid: None,
            typ: None,
        }
    }
}

/// A trust mark carried by an entity statement. Parsed and re-serialized
/// untouched; this engine does not validate trust marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustMark {
    /// Trust mark identifier.
    pub id: String,
    /// The trust mark token itself.
    pub trust_mark: String,
}

/// Claims of an entity statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementClaims {
    /// Issuer entity.
    pub iss: EntityId,

    /// Subject entity. Equal to `iss` for an entity configuration.
    pub sub: EntityId,

    /// Issued-at as a Unix timestamp.
    pub iat: i64,

    /// Expiry as a Unix timestamp.
    pub exp: i64,

    /// Statement ID.
    pub jti: String,

    /// The subject's signing keys.
    #[serde(default)]
    pub jwks: JwkSet,

    /// Metadata per entity-type wire name. String-keyed so that
    /// infrastructure entries such as `federation_entity` survive parsing;
    /// typed lookup goes through [`StatementClaims::metadata_for`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetadataObject>,

    /// Declared superiors, in preference order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authority_hints: Vec<EntityId>,

    /// Constraints this issuer imposes on subordinate metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata_policy: MetadataPolicyMap,

    /// Trust marks held by the subject.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_marks: Vec<TrustMark>,
}

impl StatementClaims {
    /// Start building claims for a new statement.
    #[must_use]
    pub fn builder() -> StatementClaimsBuilder {
        StatementClaimsBuilder::default()
    }

    /// Whether issuer and subject are the same entity.
    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.iss == self.sub
    }

    /// Metadata for one of the closed entity types.
    #[must_use]
    pub fn metadata_for(&self, entity_type: EntityType) -> Option<&MetadataObject> {
        self.metadata.get(entity_type.as_str())
    }

    /// The subordinate-statement fetch endpoint this entity declares, if any.
    #[must_use]
    pub fn federation_fetch_endpoint(&self) -> Option<&str> {
        self.metadata
            .get(FEDERATION_ENTITY)?
            .get("federation_fetch_endpoint")?
            .as_str()
    }

    /// Whether this entity's configuration lists `id` among its subordinates.
    /// Exact identifier match only.
    #[must_use]
    pub fn lists_subordinate(&self, id: &EntityId) -> bool {
        self.metadata
            .get(FEDERATION_ENTITY)
            .and_then(|m| m.get("subordinates"))
            .and_then(Value::as_array)
            .is_some_and(|subs| subs.iter().any(|v| v.as_str() == Some(id.as_str())))
    }
}

/// Builder for [`StatementClaims`].
#[derive(Debug, Default)]
pub struct StatementClaimsBuilder {
    iss: Option<EntityId>,
    sub: Option<EntityId>,
    iat: Option<i64>,
    exp: Option<i64>,
    jti: Option<String>,
    jwks: JwkSet,
    metadata: BTreeMap<String, MetadataObject>,
    authority_hints: Vec<EntityId>,
    metadata_policy: MetadataPolicyMap,
    trust_marks: Vec<TrustMark>,
}

impl StatementClaimsBuilder {
    /// Set the issuer.
    #[must_use]
    pub fn issuer(mut self, iss: impl Into<EntityId>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Set the subject.
    #[must_use]
    pub fn subject(mut self, sub: impl Into<EntityId>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Set the expiry as seconds from now.
    #[must_use]
    pub fn expires_in_secs(mut self, secs: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(secs)).timestamp());
        self
    }

    /// Set the expiry as an absolute Unix timestamp.
    #[must_use]
    pub fn expiration(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Set the issued-at timestamp. Defaults to now.
    #[must_use]
    pub fn issued_at(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    /// Set an explicit statement ID. Defaults to a random UUID.
    #[must_use]
    pub fn statement_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    /// Set the subject's key set.
    #[must_use]
    pub fn jwks(mut self, jwks: JwkSet) -> Self {
        self.jwks = jwks;
        self
    }

    /// Append one authority hint.
    #[must_use]
    pub fn authority_hint(mut self, hint: impl Into<EntityId>) -> Self {
        self.authority_hints.push(hint.into());
        self
    }

    /// Set metadata for one of the closed entity types.
    #[must_use]
    pub fn metadata(mut self, entity_type: EntityType, metadata: MetadataObject) -> Self {
        self.metadata.insert(entity_type.as_str().to_string(), metadata);
        self
    }

    /// Set a raw metadata entry, including infrastructure entries such as
    /// `federation_entity`.
    #[must_use]
    pub fn metadata_entry(mut self, key: impl Into<String>, metadata: MetadataObject) -> Self {
        self.metadata.insert(key.into(), metadata);
        self
    }

    /// Set the full metadata-policy map.
    #[must_use]
    pub fn metadata_policy(mut self, policy: MetadataPolicyMap) -> Self {
        self.metadata_policy = policy;
        self
    }

    /// Append a trust mark.
    #[must_use]
    pub fn trust_mark(mut self, mark: TrustMark) -> Self {
        self.trust_marks.push(mark);
        self
    }

    /// Build the claims. A missing issuer or subject becomes the empty
    /// identifier, which every consuming boundary rejects.
    #[must_use]
    pub fn build(self) -> StatementClaims {
        let now = Utc::now().timestamp();
        StatementClaims {
            iss: self.iss.unwrap_or_else(|| EntityId::new("")),
            sub: self.sub.unwrap_or_else(|| EntityId::new("")),
            iat: self.iat.unwrap_or(now),
            exp: self.exp.unwrap_or(now + 3600), // Default: 1 hour
            jti: self.jti.unwrap_or_else(|| Uuid::new_v4().to_string()),
            jwks: self.jwks,
            metadata: self.metadata,
            authority_hints: self.authority_hints,
            metadata_policy: self.metadata_policy,
            trust_marks: self.trust_marks,
        }
    }
}

/// A parsed entity statement: header, claims, and the raw compact token when
/// one exists (the exact signed bytes, needed for verification).
#[derive(Debug, Clone)]
pub struct EntityStatement {
    /// Decoded token header.
    pub header: StatementHeader,
    /// Decoded claims.
    pub claims: StatementClaims,
    raw: Option<String>,
}

impl EntityStatement {
    /// Assemble a statement from its parts. The codec is the usual producer.
    #[must_use]
    pub fn from_parts(header: StatementHeader, claims: StatementClaims, raw: Option<String>) -> Self {
        Self { header, claims, raw }
    }

    /// The raw compact token, absent for statements parsed from JSON bodies.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Whether this is an entity configuration (self-issued).
    #[must_use]
    pub fn is_entity_configuration(&self) -> bool {
        self.claims.is_self_issued()
    }

    /// The issuing entity.
    #[must_use]
    pub fn issuer(&self) -> &EntityId {
        &self.claims.iss
    }

    /// The subject entity.
    #[must_use]
    pub fn subject(&self) -> &EntityId {
        &self.claims.sub
    }
}
