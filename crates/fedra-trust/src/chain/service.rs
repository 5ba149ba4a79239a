//! Trust chain resolution service.
//!
//! Orchestrates the data flow for one entity: discovery of the leaf
//! configuration, chain building, then validation of each candidate in
//! order. The first accepted chain wins; when everything fails, the most
//! specific diagnosis is surfaced as the single terminal error.

use crate::chain::builder::ChainBuilder;
use crate::chain::validator::ChainValidator;
use crate::chain::TrustChain;
use crate::discovery::EntityDiscoveryClient;
use crate::error::{TrustError, TrustResult};
use crate::models::EffectiveMetadata;
use fedra_core::EntityId;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Configuration for trust resolution.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Overall deadline for one resolution. In-flight discovery is cancelled
    /// when it elapses. None means no deadline beyond per-request timeouts.
    pub deadline: Option<Duration>,
}

/// A successfully resolved trust relationship.
#[derive(Debug, Clone)]
pub struct ResolvedTrust {
    /// The chain that validated.
    pub chain: TrustChain,
    /// Effective metadata after the policy merge.
    pub metadata: EffectiveMetadata,
}

/// Trust chain resolution service.
#[derive(Debug, Clone)]
pub struct TrustChainService {
    discovery: EntityDiscoveryClient,
    builder: ChainBuilder,
    validator: ChainValidator,
    config: ServiceConfig,
}

impl TrustChainService {
    /// A service over the given components.
    #[must_use]
    pub fn new(
        discovery: EntityDiscoveryClient,
        builder: ChainBuilder,
        validator: ChainValidator,
        config: ServiceConfig,
    ) -> Self {
        Self {
            discovery,
            builder,
            validator,
            config,
        }
    }

    /// Resolve and validate a trust chain for `entity_id`.
    ///
    /// # Errors
    ///
    /// A single terminal error carrying the most specific diagnosis from the
    /// failed branches; `Timeout` when the overall deadline elapses.
    #[instrument(skip(self), fields(entity = %entity_id))]
    pub async fn resolve(&self, entity_id: &EntityId) -> TrustResult<ResolvedTrust> {
        match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.resolve_inner(entity_id))
                .await
                .map_err(|_| TrustError::Timeout)?,
            None => self.resolve_inner(entity_id).await,
        }
    }

    async fn resolve_inner(&self, entity_id: &EntityId) -> TrustResult<ResolvedTrust> {
        let leaf = self.discovery.fetch_entity_configuration(entity_id).await?;

        let outcome = self.builder.build_chains(&leaf).await;
        debug!(
            entity = %entity_id,
            candidates = outcome.chains.len(),
            branch_failures = outcome.failures.len(),
            "chain building finished"
        );

        let mut failures = outcome.failures;
        if outcome.chains.is_empty() {
            return Err(TrustError::most_specific(failures, entity_id.as_str()));
        }

        for chain in outcome.chains {
            match self.validator.validate(entity_id, &chain).await {
                Ok(metadata) => {
                    info!(
                        entity = %entity_id,
                        anchor = %chain.anchor_id(),
                        "trust chain resolved"
                    );
                    return Ok(ResolvedTrust { chain, metadata });
                }
                Err(err) => {
                    debug!(entity = %entity_id, error = %err, "candidate chain rejected");
                    failures.push(err);
                }
            }
        }

        Err(TrustError::most_specific(failures, entity_id.as_str()))
    }
}
