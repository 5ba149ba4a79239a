//! Admin facade over the trust anchor registry.
//!
//! Consumed by an external admin surface (not part of this crate). Input
//! arrives as raw strings and is validated here: a missing entity type is a
//! client error, an unknown one a validation error, and both leave the
//! registry unchanged.

use crate::models::{AddEntityResponse, ListEntitiesResponse, RemoveEntityResponse};
use crate::registry::TrustAnchorRegistry;
use fedra_core::{EntityId, EntityType};
use tracing::{info, instrument};

/// Registry admin service.
#[derive(Debug, Clone)]
pub struct RegistryAdminService {
    registry: TrustAnchorRegistry,
}

impl RegistryAdminService {
    /// A facade over the given registry.
    #[must_use]
    pub fn new(registry: TrustAnchorRegistry) -> Self {
        Self { registry }
    }

    /// Register a trust anchor from raw admin input.
    #[instrument(skip(self))]
    pub async fn add_entity(
        &self,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> AddEntityResponse {
        let Some(raw_type) = entity_type else {
            return AddEntityResponse::failed("entity_type is required");
        };

        let entity_type: EntityType = match raw_type.parse() {
            Ok(ty) => ty,
            Err(_) => {
                return AddEntityResponse::failed(format!("invalid entity_type: {raw_type}"));
            }
        };

        info!(entity_id = %entity_id, entity_type = %entity_type, "Admin registering trust anchor");

        match self.registry.add(EntityId::new(entity_id), entity_type).await {
            Ok(record) => AddEntityResponse::created(record),
            Err(err) => AddEntityResponse::failed(err.to_string()),
        }
    }

    /// List registered trust anchors.
    pub async fn list_entities(&self) -> ListEntitiesResponse {
        ListEntitiesResponse {
            success: true,
            entities: self.registry.list().await,
        }
    }

    /// Remove a trust anchor.
    #[instrument(skip(self))]
    pub async fn remove_entity(&self, entity_id: &str) -> RemoveEntityResponse {
        info!(entity_id = %entity_id, "Admin removing trust anchor");

        match self.registry.remove(&EntityId::new(entity_id)).await {
            Ok(()) => RemoveEntityResponse {
                success: true,
                message: None,
            },
            Err(err) => RemoveEntityResponse {
                success: false,
                message: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryConfig;

    fn service() -> RegistryAdminService {
        RegistryAdminService::new(TrustAnchorRegistry::new(RegistryConfig::default()))
    }

    #[tokio::test]
    async fn test_add_entity_success() {
        let admin = service();
        let response = admin
            .add_entity("https://op.example", Some("openid_provider"))
            .await;

        assert!(response.success);
        let record = response.entity.unwrap();
        assert_eq!(record.entity_id.as_str(), "https://op.example");
        assert_eq!(record.entity_type, EntityType::OpenidProvider);
    }

    #[tokio::test]
    async fn test_add_entity_missing_type_is_client_error() {
        let admin = service();
        let response = admin.add_entity("https://op.example", None).await;

        assert!(!response.success);
        assert!(response.message.unwrap().contains("entity_type is required"));
        assert!(admin.list_entities().await.entities.is_empty());
    }

    #[tokio::test]
    async fn test_add_entity_invalid_type_is_validation_error() {
        let admin = service();
        let response = admin
            .add_entity("https://op.example", Some("federation_entity"))
            .await;

        assert!(!response.success);
        assert!(response.message.unwrap().contains("invalid entity_type"));
        assert!(admin.list_entities().await.entities.is_empty());
    }

    #[tokio::test]
    async fn test_double_add_reports_failure_and_single_record() {
        let admin = service();

        let first = admin
            .add_entity("https://op.example", Some("openid_provider"))
            .await;
        assert!(first.success);

        let second = admin
            .add_entity("https://op.example", Some("openid_provider"))
            .await;
        assert!(!second.success);

        assert_eq!(admin.list_entities().await.entities.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_entity() {
        let admin = service();
        admin
            .add_entity("https://op.example", Some("openid_provider"))
            .await;

        let removed = admin.remove_entity("https://op.example").await;
        assert!(removed.success);

        let missing = admin.remove_entity("https://op.example").await;
        assert!(!missing.success);
        assert!(missing.message.is_some());
    }
}
