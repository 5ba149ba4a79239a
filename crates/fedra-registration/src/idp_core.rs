//! IdP-core client interface.
//!
//! The authorization engine that persists client records and runs the OAuth2
//! grants is an external collaborator. This module captures the contract a
//! caller implements against it: the record shape, the error taxonomy the
//! retry policy classifies, and Retry-After parsing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fedra_core::EntityId;
use fedra_trust::models::MetadataObject;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// A client record produced by an accepted registration, ready for the IdP
/// core to persist.
#[derive(Debug, Clone, Serialize)]
pub struct ClientRecord {
    /// The client identifier: the relying party's entity id.
    pub client_id: String,
    /// The entity whose trust chain produced this record.
    pub entity_id: EntityId,
    /// Reconciled client metadata.
    pub metadata: MetadataObject,
    /// When the registration was decided.
    pub registered_at: DateTime<Utc>,
}

impl ClientRecord {
    /// A record for `entity_id` carrying `metadata`, stamped now.
    #[must_use]
    pub fn new(entity_id: EntityId, metadata: MetadataObject) -> Self {
        Self {
            client_id: entity_id.to_string(),
            entity_id,
            metadata,
            registered_at: Utc::now(),
        }
    }
}

/// Errors surfaced by IdP-core calls, classified for retry.
#[derive(Debug, Clone, Error)]
pub enum IdpCoreError {
    /// HTTP 429. Retryable; the server may name its own delay.
    #[error("IdP core rate limited")]
    RateLimited {
        /// Parsed Retry-After delay, when the response carried one.
        retry_after: Option<Duration>,
    },

    /// HTTP 5xx. Retryable.
    #[error("IdP core server error {status}: {message}")]
    Server {
        status: u16,
        message: String,
        /// Parsed Retry-After delay, when the response carried one.
        retry_after: Option<Duration>,
    },

    /// Any other HTTP 4xx. Never retried.
    #[error("IdP core rejected request with {status}: {message}")]
    Client { status: u16, message: String },

    /// Connection-level failure (DNS, refused, reset, timeout). Retryable.
    #[error("IdP core unreachable: {0}")]
    Connection(String),
}

impl IdpCoreError {
    /// Whether the retry policy may try this error again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IdpCoreError::RateLimited { .. }
                | IdpCoreError::Server { .. }
                | IdpCoreError::Connection(_)
        )
    }

    /// The server-requested delay, when one was supplied.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            IdpCoreError::RateLimited { retry_after }
            | IdpCoreError::Server { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Parse a `Retry-After` header value: delta-seconds or an HTTP-date.
///
/// An HTTP-date in the past yields a zero delay. Unparsable values yield
/// None and the caller falls back to exponential backoff.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - Utc::now();
    Some(Duration::from_secs(delta.num_seconds().max(0) as u64))
}

/// The IdP core as this subsystem sees it: a sink for accepted client
/// records. Implementations wrap the actual HTTP API and classify failures
/// into [`IdpCoreError`]; the retry policy supplies the resilience.
#[async_trait]
pub trait IdpCoreClient: Send + Sync {
    /// Persist an accepted client record.
    async fn persist_client(&self, record: &ClientRecord) -> Result<(), IdpCoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(IdpCoreError::RateLimited { retry_after: None }.is_retryable());
        assert!(IdpCoreError::Server {
            status: 503,
            message: "unavailable".into(),
            retry_after: None
        }
        .is_retryable());
        assert!(IdpCoreError::Connection("refused".into()).is_retryable());

        assert!(!IdpCoreError::Client {
            status: 400,
            message: "bad request".into()
        }
        .is_retryable());
        assert!(!IdpCoreError::Client {
            status: 404,
            message: "not found".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::from_secs(0)));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let future = (Utc::now() + chrono::Duration::seconds(45)).to_rfc2822();
        let parsed = parse_retry_after(&future).unwrap();
        assert!(parsed <= Duration::from_secs(45));
        assert!(parsed >= Duration::from_secs(40));
    }

    #[test]
    fn test_parse_retry_after_past_date_is_zero() {
        let past = (Utc::now() - chrono::Duration::seconds(60)).to_rfc2822();
        assert_eq!(parse_retry_after(&past), Some(Duration::from_secs(0)));
    }

    #[test]
    fn test_parse_retry_after_garbage_is_none() {
        assert_eq!(parse_retry_after("soon"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn test_client_record_carries_entity() {
        let mut metadata = MetadataObject::new();
        metadata.set("client_name", serde_json::json!("Demo RP"));
        let record = ClientRecord::new(EntityId::new("https://rp.example"), metadata);

        assert_eq!(record.client_id, "https://rp.example");
        assert_eq!(record.entity_id.as_str(), "https://rp.example");
    }
}
