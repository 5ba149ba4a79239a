//! Response models for the trust-anchor admin facade.
//!
//! The HTTP surface itself lives outside this crate; these are the shapes an
//! external admin surface serializes.

use crate::registry::TrustAnchorRecord;
use serde::Serialize;

/// Response to an add-entity request.
#[derive(Debug, Clone, Serialize)]
pub struct AddEntityResponse {
    /// Whether the anchor was registered.
    pub success: bool,
    /// The created record on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<TrustAnchorRecord>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AddEntityResponse {
    /// Successful registration.
    #[must_use]
    pub fn created(entity: TrustAnchorRecord) -> Self {
        Self {
            success: true,
            entity: Some(entity),
            message: None,
        }
    }

    /// Failed registration.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            entity: None,
            message: Some(message.into()),
        }
    }
}

/// Response to a list-entities request.
#[derive(Debug, Clone, Serialize)]
pub struct ListEntitiesResponse {
    /// Always true; listing cannot fail.
    pub success: bool,
    /// Registered anchors in insertion order.
    pub entities: Vec<TrustAnchorRecord>,
}

/// Response to a remove-entity request.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveEntityResponse {
    /// Whether the anchor was removed.
    pub success: bool,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
