//! Trust chains: assembly and validation.

pub mod builder;
pub mod service;
pub mod validator;

pub use builder::{BuildOutcome, BuilderConfig, ChainBuilder};
pub use service::{ResolvedTrust, ServiceConfig, TrustChainService};
pub use validator::{ChainValidator, ValidatorConfig};

use crate::models::EntityStatement;
use fedra_core::EntityId;

/// How the final link to the trust anchor was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorLink {
    /// The anchor issued a subordinate statement; it is the last element of
    /// the chain's statement sequence.
    SubordinateStatement,
    /// The anchor exposes no fetch endpoint but its own configuration lists
    /// the leaf as a subordinate by exact entity id; the chain is the leaf
    /// configuration alone.
    ListedSubordinate,
}

/// Confirmation that a chain terminates at a trust anchor, carrying the
/// anchor's self-issued configuration so the validator has the key set for
/// the final hop without re-discovery.
#[derive(Debug, Clone)]
pub struct AnchorConfirmation {
    /// The anchor's self-issued entity configuration.
    pub configuration: EntityStatement,
    /// How the final link was established.
    pub link: AnchorLink,
}

impl AnchorConfirmation {
    /// The anchor's entity identifier.
    #[must_use]
    pub fn anchor_id(&self) -> &EntityId {
        self.configuration.issuer()
    }
}

/// An ordered sequence of statements proving a path from a leaf entity to a
/// trust anchor.
///
/// `statements[0]` is the leaf's self-issued configuration; each subsequent
/// statement is issued by a superior about the previous statement's issuer;
/// the last statement's issuer is the anchor (except for
/// [`AnchorLink::ListedSubordinate`] chains, which consist of the leaf
/// configuration alone).
#[derive(Debug, Clone)]
pub struct TrustChain {
    /// The statement sequence, leaf configuration first.
    pub statements: Vec<EntityStatement>,
    /// Anchor confirmation for the final hop.
    pub anchor: AnchorConfirmation,
}

impl TrustChain {
    /// The leaf's self-issued configuration.
    #[must_use]
    pub fn leaf(&self) -> Option<&EntityStatement> {
        self.statements.first()
    }

    /// The trust anchor's entity identifier.
    #[must_use]
    pub fn anchor_id(&self) -> &EntityId {
        self.anchor.anchor_id()
    }

    /// Number of statements in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the chain holds no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
