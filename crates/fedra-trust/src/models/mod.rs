//! Data models for trust-chain operations.

pub mod keys;
pub mod metadata;
pub mod policy;
pub mod responses;
pub mod statement;

pub use keys::{Jwk, JwkSet};
pub use metadata::{EffectiveMetadata, MetadataObject};
pub use policy::{ClaimPolicy, MetadataPolicy, MetadataPolicyMap};
pub use responses::{AddEntityResponse, ListEntitiesResponse, RemoveEntityResponse};
pub use statement::{
    EntityStatement, StatementClaims, StatementClaimsBuilder, StatementHeader, TrustMark,
    FEDERATION_ENTITY,
};
