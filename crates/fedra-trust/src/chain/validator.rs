//! Chain validator.
//!
//! Given an assembled candidate chain, runs the checks in a fixed order,
//! short-circuiting on the first failure: structure, temporal windows,
//! hop-by-hop signatures, anchor registration, metadata policy merge.

use crate::chain::{AnchorLink, TrustChain};
use crate::error::{TrustError, TrustResult};
use crate::models::{EffectiveMetadata, EntityStatement, MetadataPolicyMap};
use crate::registry::TrustAnchorRegistry;
use crate::verify::SignatureVerifier;
use chrono::Utc;
use fedra_core::{EntityId, EntityType};
use tracing::{debug, instrument};

/// Configuration for chain validation.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Clock skew tolerance in seconds for temporal checks.
    pub clock_skew_secs: i64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { clock_skew_secs: 60 }
    }
}

/// Chain validator.
#[derive(Debug, Clone)]
pub struct ChainValidator {
    registry: TrustAnchorRegistry,
    verifier: SignatureVerifier,
    config: ValidatorConfig,
}

impl ChainValidator {
    /// A validator using the given registry and signature verifier.
    #[must_use]
    pub fn new(
        registry: TrustAnchorRegistry,
        verifier: SignatureVerifier,
        config: ValidatorConfig,
    ) -> Self {
        Self {
            registry,
            verifier,
            config,
        }
    }

    /// Validate a candidate chain for `leaf_id`, producing the effective
    /// metadata on acceptance.
    ///
    /// # Errors
    ///
    /// The first failing check's error: `ChainInvalid`, `Expired`,
    /// `NotYetValid`, `SignatureInvalid`/`KeyNotFound`/
    /// `AlgorithmUnsupported`, `UntrustedAnchor`, or `PolicyViolation`.
    #[instrument(skip(self, chain), fields(leaf = %leaf_id, anchor = %chain.anchor_id()))]
    pub async fn validate(
        &self,
        leaf_id: &EntityId,
        chain: &TrustChain,
    ) -> TrustResult<EffectiveMetadata> {
        // (1) Structure: non-empty, leaf configuration first.
        let leaf = chain.leaf().ok_or_else(|| TrustError::ChainInvalid {
            reason: "chain is empty".to_string(),
        })?;
        if !leaf.is_entity_configuration() || leaf.subject() != leaf_id {
            return Err(TrustError::ChainInvalid {
                reason: format!(
                    "first element is not the self-issued configuration of {leaf_id}"
                ),
            });
        }
        match chain.anchor.link {
            AnchorLink::SubordinateStatement => {
                if chain.len() < 2 {
                    return Err(TrustError::ChainInvalid {
                        reason: "subordinate-statement chain must carry the anchor's statement"
                            .to_string(),
                    });
                }
            }
            AnchorLink::ListedSubordinate => {
                if chain.len() != 1 {
                    return Err(TrustError::ChainInvalid {
                        reason: "listed-subordinate chain must be the leaf configuration alone"
                            .to_string(),
                    });
                }
                // Independent re-check of the listing; anything ambiguous is
                // rejected rather than trusted on the builder's word.
                if !chain
                    .anchor
                    .configuration
                    .claims
                    .lists_subordinate(leaf_id)
                {
                    return Err(TrustError::ChainInvalid {
                        reason: format!(
                            "anchor {} does not list {leaf_id} as a subordinate",
                            chain.anchor_id()
                        ),
                    });
                }
            }
        }

        // (2) Temporal windows, every statement plus the anchor configuration.
        let now = Utc::now().timestamp();
        for statement in chain
            .statements
            .iter()
            .chain(std::iter::once(&chain.anchor.configuration))
        {
            self.check_temporal(statement, now)?;
        }

        // (3) Signatures, hop by hop: each statement against the key set
        // declared one hop closer to the anchor; the final statement against
        // the anchor configuration; the anchor configuration against its own
        // declared keys (trusted out-of-band through registration).
        for (index, statement) in chain.statements.iter().enumerate() {
            let keys = match chain.statements.get(index + 1) {
                Some(next) => &next.claims.jwks,
                None => match chain.anchor.link {
                    AnchorLink::SubordinateStatement => &chain.anchor.configuration.claims.jwks,
                    // Leaf configuration alone: self-signed.
                    AnchorLink::ListedSubordinate => &statement.claims.jwks,
                },
            };
            self.verifier.verify(statement, keys)?;
        }
        self.verifier.verify(
            &chain.anchor.configuration,
            &chain.anchor.configuration.claims.jwks,
        )?;

        // (4) The final issuer must be a registered anchor.
        let anchor_id = chain.anchor_id();
        if chain.anchor.link == AnchorLink::SubordinateStatement {
            if let Some(last) = chain.statements.last() {
                if last.issuer() != anchor_id {
                    return Err(TrustError::ChainInvalid {
                        reason: format!(
                            "final statement issued by {}, expected anchor {anchor_id}",
                            last.issuer()
                        ),
                    });
                }
            }
        }
        if !self.registry.is_trust_anchor(anchor_id).await {
            return Err(TrustError::UntrustedAnchor {
                entity: anchor_id.to_string(),
            });
        }

        // (5) Metadata policy merge, anchor side toward the leaf.
        let effective = self.merge_metadata(leaf, chain)?;

        debug!(
            leaf = %leaf_id,
            anchor = %anchor_id,
            chain_len = chain.len(),
            "trust chain accepted"
        );
        Ok(effective)
    }

    fn check_temporal(&self, statement: &EntityStatement, now: i64) -> TrustResult<()> {
        let skew = self.config.clock_skew_secs;
        let claims = &statement.claims;

        if claims.iat > now + skew {
            return Err(TrustError::NotYetValid {
                entity: claims.sub.to_string(),
            });
        }
        if now >= claims.exp + skew {
            return Err(TrustError::Expired {
                entity: claims.sub.to_string(),
            });
        }
        Ok(())
    }

    /// Apply every policy found along the chain, innermost (leaf) values
    /// constrained by outer (closer-to-anchor) operators, producing the
    /// effective metadata per entity type.
    fn merge_metadata(
        &self,
        leaf: &EntityStatement,
        chain: &TrustChain,
    ) -> TrustResult<EffectiveMetadata> {
        // Policy sources ordered anchor side first. The leaf's own policy
        // constrains its subordinates, not itself.
        let mut sources: Vec<&MetadataPolicyMap> =
            vec![&chain.anchor.configuration.claims.metadata_policy];
        for statement in chain.statements.iter().skip(1).rev() {
            sources.push(&statement.claims.metadata_policy);
        }

        let mut effective = EffectiveMetadata::new();
        for entity_type in EntityType::all() {
            let Some(base) = leaf.claims.metadata_for(*entity_type) else {
                continue;
            };

            let mut merged = base.clone();
            for policies in &sources {
                if let Some(policy) = policies.get(entity_type.as_str()) {
                    policy.apply(*entity_type, &mut merged)?;
                }
            }
            effective.insert(*entity_type, merged);
        }

        Ok(effective)
    }
}
