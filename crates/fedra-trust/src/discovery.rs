//! Entity discovery client.
//!
//! Fetches entity configurations from the well-known federation path and
//! subordinate statements from a superior's fetch endpoint. Every network or
//! parse failure is a `DiscoveryFailed` for that call; retry policy belongs
//! to the caller.

use crate::codec::{self, CodecMode, ENTITY_STATEMENT_CONTENT_TYPE};
use crate::error::{TrustError, TrustResult};
use crate::models::EntityStatement;
use chrono::Utc;
use fedra_core::EntityId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Well-known path suffix for entity configurations.
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-federation";

/// Configuration for the discovery client.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Request timeout. A timed-out fetch is a hard failure for that branch.
    pub timeout: Duration,
    /// Permit plain-http localhost entity identifiers and raw JSON statement
    /// bodies. Test configurations only.
    pub allow_insecure: bool,
    /// Cache fetched statements until their own expiry. Off by default so
    /// every validation observes fresh statements.
    pub cache_statements: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            allow_insecure: false,
            cache_statements: false,
        }
    }
}

impl DiscoveryConfig {
    /// Permit insecure identifiers and JSON bodies (test configurations).
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.allow_insecure = true;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable the expiry-bounded statement cache.
    #[must_use]
    pub fn with_statement_cache(mut self) -> Self {
        self.cache_statements = true;
        self
    }

    fn codec_mode(&self) -> CodecMode {
        if self.allow_insecure {
            CodecMode::CompactOrJson
        } else {
            CodecMode::CompactOnly
        }
    }
}

/// A cached statement, bounded by the statement's own expiry.
#[derive(Debug, Clone)]
struct CachedStatement {
    statement: EntityStatement,
    expires_at: i64,
}

impl CachedStatement {
    fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.expires_at
    }
}

/// Entity discovery client.
#[derive(Debug, Clone)]
pub struct EntityDiscoveryClient {
    http: reqwest::Client,
    config: DiscoveryConfig,
    cache: Arc<RwLock<HashMap<EntityId, CachedStatement>>>,
}

impl EntityDiscoveryClient {
    /// Create a discovery client.
    ///
    /// # Errors
    ///
    /// `DiscoveryFailed` when the HTTP client cannot be constructed.
    pub fn new(config: DiscoveryConfig) -> TrustResult<Self> {
        // Redirects disabled: an entity id resolves to its own well-known
        // document or nothing.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout)
            .build()
            .map_err(|e| TrustError::DiscoveryFailed {
                entity: String::new(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            config,
            cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// The well-known entity-configuration URL for an entity identifier.
    #[must_use]
    pub fn well_known_url(entity_id: &EntityId) -> String {
        format!("{}{WELL_KNOWN_PATH}", entity_id.as_str().trim_end_matches('/'))
    }

    /// Fetch an entity's self-issued configuration.
    ///
    /// # Errors
    ///
    /// `DiscoveryFailed` for network errors, timeouts, non-2xx responses,
    /// malformed statements, or a configuration that is not self-issued by
    /// the requested entity.
    #[instrument(skip(self), fields(entity = %entity_id))]
    pub async fn fetch_entity_configuration(
        &self,
        entity_id: &EntityId,
    ) -> TrustResult<EntityStatement> {
        if self.config.cache_statements {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(entity_id) {
                if !cached.is_expired() {
                    debug!(entity = %entity_id, jti = %cached.statement.claims.jti, "statement cache hit");
                    return Ok(cached.statement.clone());
                }
            }
        }

        self.guard_url(entity_id.as_str())
            .map_err(|message| TrustError::DiscoveryFailed {
                entity: entity_id.to_string(),
                message,
            })?;

        let url = Self::well_known_url(entity_id);
        let statement = self.fetch_statement(&url, entity_id.as_str()).await?;

        if !statement.is_entity_configuration() || statement.subject() != entity_id {
            return Err(TrustError::DiscoveryFailed {
                entity: entity_id.to_string(),
                message: format!(
                    "well-known document is not a self-issued configuration for {entity_id} (iss={}, sub={})",
                    statement.issuer(),
                    statement.subject()
                ),
            });
        }

        if self.config.cache_statements {
            let mut cache = self.cache.write().await;
            cache.insert(
                entity_id.clone(),
                CachedStatement {
                    expires_at: statement.claims.exp,
                    statement: statement.clone(),
                },
            );
        }

        Ok(statement)
    }

    /// Fetch the statement a superior has issued about `subordinate_id` from
    /// the superior's declared fetch endpoint.
    ///
    /// # Errors
    ///
    /// `DiscoveryFailed` for network/parse failures or a statement about the
    /// wrong subject.
    #[instrument(skip(self), fields(subordinate = %subordinate_id))]
    pub async fn fetch_subordinate_statement(
        &self,
        fetch_endpoint: &str,
        subordinate_id: &EntityId,
    ) -> TrustResult<EntityStatement> {
        self.guard_url(fetch_endpoint)
            .map_err(|message| TrustError::DiscoveryFailed {
                entity: subordinate_id.to_string(),
                message,
            })?;

        let response = self
            .http
            .get(fetch_endpoint)
            .query(&[("sub", subordinate_id.as_str())])
            .header(reqwest::header::ACCEPT, ENTITY_STATEMENT_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| TrustError::DiscoveryFailed {
                entity: subordinate_id.to_string(),
                message: format!("fetch endpoint request failed: {e}"),
            })?;

        let statement = self
            .parse_response(response, subordinate_id.as_str())
            .await?;

        if statement.subject() != subordinate_id {
            return Err(TrustError::DiscoveryFailed {
                entity: subordinate_id.to_string(),
                message: format!(
                    "fetch endpoint returned a statement about {}, expected {subordinate_id}",
                    statement.subject()
                ),
            });
        }

        Ok(statement)
    }

    async fn fetch_statement(&self, url: &str, entity: &str) -> TrustResult<EntityStatement> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, ENTITY_STATEMENT_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| TrustError::DiscoveryFailed {
                entity: entity.to_string(),
                message: format!("request failed: {e}"),
            })?;

        self.parse_response(response, entity).await
    }

    async fn parse_response(
        &self,
        response: reqwest::Response,
        entity: &str,
    ) -> TrustResult<EntityStatement> {
        let status = response.status();
        if !status.is_success() {
            return Err(TrustError::DiscoveryFailed {
                entity: entity.to_string(),
                message: format!("HTTP status {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TrustError::DiscoveryFailed {
                entity: entity.to_string(),
                message: format!("failed to read response body: {e}"),
            })?;

        codec::decode_body(&body, self.config.codec_mode()).map_err(|e| {
            TrustError::DiscoveryFailed {
                entity: entity.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Validate that a URL is acceptable for outbound discovery.
    ///
    /// HTTPS is required; plain http is permitted only in insecure mode and
    /// only for loopback hosts.
    fn guard_url(&self, url_str: &str) -> Result<(), String> {
        let url = url::Url::parse(url_str).map_err(|e| format!("invalid URL: {e}"))?;

        match url.scheme() {
            "https" => Ok(()),
            "http" => {
                let host = url.host_str().unwrap_or_default();
                let loopback =
                    host == "localhost" || host == "127.0.0.1" || host == "[::1]" || host == "::1";
                if self.config.allow_insecure && loopback {
                    warn!(url = %url_str, "INSECURE discovery: plain-http loopback URL accepted");
                    Ok(())
                } else {
                    Err(format!("only HTTPS entity identifiers are allowed, got: {url_str}"))
                }
            }
            other => Err(format!("unsupported URL scheme: {other}")),
        }
    }
}
