//! Error types for trust-chain operations.

use fedra_core::EntityType;
use thiserror::Error;

/// Result type for trust-chain operations.
pub type TrustResult<T> = Result<T, TrustError>;

/// Trust-chain error types.
///
/// Branch-local failures (discovery, signature, temporal) never abort
/// sibling branches; they are collected during exploration and only the most
/// specific one is surfaced when every branch has failed.
#[derive(Debug, Clone, Error)]
pub enum TrustError {
    // Discovery errors
    #[error("Discovery failed for {entity}: {message}")]
    DiscoveryFailed { entity: String, message: String },

    #[error("Malformed entity statement: {0}")]
    MalformedStatement(String),

    // Cryptographic verification errors
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("No key matching '{0}' in the supplied key set")]
    KeyNotFound(String),

    #[error("Unsupported signature algorithm: {0}")]
    AlgorithmUnsupported(String),

    // Temporal errors
    #[error("Statement for {entity} has expired")]
    Expired { entity: String },

    #[error("Statement for {entity} is not yet valid")]
    NotYetValid { entity: String },

    // Chain errors
    #[error("Chain terminates at unregistered anchor: {entity}")]
    UntrustedAnchor { entity: String },

    #[error("Metadata policy violation on {entity_type} claim '{claim}': {message}")]
    PolicyViolation {
        entity_type: EntityType,
        claim: String,
        message: String,
    },

    #[error("Authority-hint exploration exceeded maximum depth {max_depth}")]
    ChainTooDeep { max_depth: usize },

    #[error("No trust chain found for {entity}")]
    NoChainFound { entity: String },

    #[error("Invalid trust chain: {reason}")]
    ChainInvalid { reason: String },

    // Registry errors
    #[error("Invalid entity id: {0}")]
    InvalidEntityId(String),

    #[error("Invalid entity type: {0}")]
    InvalidEntityType(String),

    #[error("Trust anchor already registered: {0}")]
    AlreadyExists(String),

    #[error("Trust anchor not found: {0}")]
    NotFound(String),

    // Operational errors
    #[error("Trust resolution deadline exceeded")]
    Timeout,
}

impl TrustError {
    /// Specificity rank used when surfacing a single diagnosis after every
    /// branch of an exploration has failed. Higher wins.
    #[must_use]
    pub fn specificity(&self) -> u8 {
        match self {
            TrustError::PolicyViolation { .. } => 8,
            TrustError::SignatureInvalid(_)
            | TrustError::KeyNotFound(_)
            | TrustError::AlgorithmUnsupported(_) => 7,
            TrustError::Expired { .. } | TrustError::NotYetValid { .. } => 6,
            TrustError::UntrustedAnchor { .. } | TrustError::ChainInvalid { .. } => 5,
            TrustError::ChainTooDeep { .. } | TrustError::MalformedStatement(_) => 4,
            TrustError::DiscoveryFailed { .. } | TrustError::Timeout => 3,
            TrustError::NoChainFound { .. } => 2,
            _ => 1,
        }
    }

    /// Pick the most specific error from a set of branch failures, falling
    /// back to `NoChainFound` for the named entity when the set is empty.
    #[must_use]
    pub fn most_specific(failures: Vec<TrustError>, entity: &str) -> TrustError {
        failures
            .into_iter()
            .max_by_key(TrustError::specificity)
            .unwrap_or(TrustError::NoChainFound {
                entity: entity.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_specific_prefers_policy_violation() {
        let failures = vec![
            TrustError::DiscoveryFailed {
                entity: "https://a.example".into(),
                message: "timeout".into(),
            },
            TrustError::PolicyViolation {
                entity_type: EntityType::OpenidRelyingParty,
                claim: "scope".into(),
                message: "outside allowed set".into(),
            },
            TrustError::UntrustedAnchor {
                entity: "https://b.example".into(),
            },
        ];

        let picked = TrustError::most_specific(failures, "https://rp.example");
        assert!(matches!(picked, TrustError::PolicyViolation { .. }));
    }

    #[test]
    fn test_most_specific_prefers_signature_over_no_chain() {
        let failures = vec![
            TrustError::NoChainFound {
                entity: "https://rp.example".into(),
            },
            TrustError::SignatureInvalid("bad signature".into()),
        ];

        let picked = TrustError::most_specific(failures, "https://rp.example");
        assert!(matches!(picked, TrustError::SignatureInvalid(_)));
    }

    #[test]
    fn test_most_specific_empty_falls_back_to_no_chain() {
        let picked = TrustError::most_specific(vec![], "https://rp.example");
        assert!(matches!(picked, TrustError::NoChainFound { entity } if entity == "https://rp.example"));
    }
}
