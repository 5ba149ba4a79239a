//! Trust anchor registry.
//!
//! The authoritative set of trusted root entities. The registry is the one
//! piece of shared mutable state in the engine: mutations take the write
//! lock, chain building reads through the read lock, so a read started after
//! a completed add observes it.

use crate::error::{TrustError, TrustResult};
use chrono::{DateTime, Utc};
use fedra_core::{EntityId, EntityType};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

/// A registered trust anchor.
#[derive(Debug, Clone, Serialize)]
pub struct TrustAnchorRecord {
    /// The anchor's entity identifier.
    pub entity_id: EntityId,
    /// The entity type the anchor was registered under.
    pub entity_type: EntityType,
    /// When this record was created.
    pub added_at: DateTime<Utc>,
}

/// Configuration for the registry.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Permit plain-http loopback entity identifiers. Test configurations
    /// only; production anchors are HTTPS URLs.
    pub allow_insecure_entity_ids: bool,
}

impl RegistryConfig {
    /// Permit insecure identifiers (test configurations).
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.allow_insecure_entity_ids = true;
        self
    }
}

/// Trust anchor registry.
///
/// Cloning shares the underlying store; the registry is handed to the chain
/// builder and validator as a narrow interface, never as ambient state.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorRegistry {
    records: Arc<RwLock<Vec<TrustAnchorRecord>>>,
    config: RegistryConfig,
}

impl TrustAnchorRegistry {
    /// An empty registry with the given configuration.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            config,
        }
    }

    /// Register a trust anchor.
    ///
    /// Duplicate identifiers fail; the prior record, including its original
    /// entity type, is left untouched. Re-adding after removal creates a
    /// fresh record with a new `added_at` and the newly supplied type.
    ///
    /// # Errors
    ///
    /// - `InvalidEntityId` - empty, unparsable, or (outside test mode) not HTTPS
    /// - `AlreadyExists` - the identifier is already registered
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        entity_id: EntityId,
        entity_type: EntityType,
    ) -> TrustResult<TrustAnchorRecord> {
        self.validate_entity_id(&entity_id)?;

        let mut records = self.records.write().await;
        if records.iter().any(|r| r.entity_id == entity_id) {
            return Err(TrustError::AlreadyExists(entity_id.to_string()));
        }

        let record = TrustAnchorRecord {
            entity_id,
            entity_type,
            added_at: Utc::now(),
        };
        records.push(record.clone());

        info!(
            entity_id = %record.entity_id,
            entity_type = %record.entity_type,
            "Trust anchor registered"
        );
        Ok(record)
    }

    /// Remove a trust anchor.
    ///
    /// # Errors
    ///
    /// `NotFound` when the identifier is not registered.
    #[instrument(skip(self))]
    pub async fn remove(&self, entity_id: &EntityId) -> TrustResult<()> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| &r.entity_id != entity_id);

        if records.len() == before {
            return Err(TrustError::NotFound(entity_id.to_string()));
        }

        info!(entity_id = %entity_id, "Trust anchor removed");
        Ok(())
    }

    /// All registered anchors, in insertion order.
    pub async fn list(&self) -> Vec<TrustAnchorRecord> {
        self.records.read().await.clone()
    }

    /// Whether an entity is a registered trust anchor.
    pub async fn is_trust_anchor(&self, entity_id: &EntityId) -> bool {
        self.records
            .read()
            .await
            .iter()
            .any(|r| &r.entity_id == entity_id)
    }

    fn validate_entity_id(&self, entity_id: &EntityId) -> TrustResult<()> {
        if entity_id.is_empty() {
            return Err(TrustError::InvalidEntityId(
                "entity id must not be empty".to_string(),
            ));
        }

        let url = url::Url::parse(entity_id.as_str())
            .map_err(|e| TrustError::InvalidEntityId(format!("{entity_id}: {e}")))?;

        match url.scheme() {
            "https" => Ok(()),
            "http" => {
                let host = url.host_str().unwrap_or_default();
                let loopback =
                    host == "localhost" || host == "127.0.0.1" || host == "[::1]" || host == "::1";
                if self.config.allow_insecure_entity_ids && loopback {
                    Ok(())
                } else {
                    Err(TrustError::InvalidEntityId(format!(
                        "{entity_id}: only HTTPS identifiers are allowed"
                    )))
                }
            }
            other => Err(TrustError::InvalidEntityId(format!(
                "{entity_id}: unsupported scheme {other}"
            ))),
        }
    }
}
