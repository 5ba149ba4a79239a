//! Trust-chain validation engine for OpenID Federation.
//!
//! This crate admits a relying party an authorization server has never
//! configured by proving, through a chain of signed entity statements, that
//! the relying party is vouched for, transitively, by a pre-registered
//! trust anchor.
//!
//! # Components
//!
//! - [`codec`] - entity-statement token parsing and signing
//! - [`verify`] - signature verification against a key set
//! - [`discovery`] - fetching configurations and subordinate statements
//! - [`registry`] - the authoritative trust anchor set (+ [`admin`] facade)
//! - [`chain`] - chain building, validation, and the resolution service
//!
//! # Example
//!
//! ```rust,ignore
//! use fedra_core::{EntityId, EntityType};
//! use fedra_trust::chain::{
//!     BuilderConfig, ChainBuilder, ChainValidator, ServiceConfig, TrustChainService,
//!     ValidatorConfig,
//! };
//! use fedra_trust::discovery::{DiscoveryConfig, EntityDiscoveryClient};
//! use fedra_trust::registry::{RegistryConfig, TrustAnchorRegistry};
//! use fedra_trust::verify::SignatureVerifier;
//!
//! let registry = TrustAnchorRegistry::new(RegistryConfig::default());
//! registry
//!     .add(EntityId::new("https://anchor.example"), EntityType::OpenidProvider)
//!     .await?;
//!
//! let discovery = EntityDiscoveryClient::new(DiscoveryConfig::default())?;
//! let service = TrustChainService::new(
//!     discovery.clone(),
//!     ChainBuilder::new(discovery, registry.clone(), BuilderConfig::default()),
//!     ChainValidator::new(registry, SignatureVerifier::default(), ValidatorConfig::default()),
//!     ServiceConfig::default(),
//! );
//!
//! let resolved = service.resolve(&EntityId::new("https://rp.example")).await?;
//! ```

pub mod admin;
pub mod chain;
pub mod codec;
pub mod discovery;
pub mod error;
pub mod models;
pub mod registry;
pub mod verify;

#[cfg(test)]
mod test_keys;

pub use admin::RegistryAdminService;
pub use chain::{
    AnchorConfirmation, AnchorLink, BuildOutcome, BuilderConfig, ChainBuilder, ChainValidator,
    ResolvedTrust, ServiceConfig, TrustChain, TrustChainService, ValidatorConfig,
};
pub use codec::CodecMode;
pub use discovery::{DiscoveryConfig, EntityDiscoveryClient};
pub use error::{TrustError, TrustResult};
pub use models::{
    EffectiveMetadata, EntityStatement, Jwk, JwkSet, MetadataObject, MetadataPolicy,
    StatementClaims, TrustMark,
};
pub use registry::{RegistryConfig, TrustAnchorRecord, TrustAnchorRegistry};
pub use verify::{SignatureVerifier, VerificationMode};
