//! Dynamic client registration for OpenID Federation.
//!
//! Turns a validated trust chain plus a relying party's Request Object into
//! a registration decision, and defines the contract against the external
//! IdP core that persists accepted client records.
//!
//! # Modules
//!
//! - [`request_object`] - Request Object parsing and verification
//! - [`service`] - the registration decision itself
//! - [`idp_core`] - the IdP-core collaborator interface
//! - [`retry`] - the outbound retry/backoff policy for IdP-core calls
//!
//! # Example
//!
//! ```rust,ignore
//! use fedra_registration::{
//!     parse_request_object, ClientRecord, RegistrationService, RetryPolicy,
//! };
//!
//! let request = parse_request_object(&token)?;
//! let decision = RegistrationService::new().register(&request, &entity_id, &metadata);
//!
//! if decision.accepted {
//!     let record = ClientRecord::new(entity_id, decision.client_metadata.unwrap());
//!     RetryPolicy::default()
//!         .execute("persist_client", || idp_core.persist_client(&record))
//!         .await?;
//! }
//! ```

pub mod error;
pub mod idp_core;
pub mod request_object;
pub mod retry;
pub mod service;

#[cfg(test)]
mod test_support;

pub use error::{RegistrationError, RegistrationResult};
pub use idp_core::{parse_retry_after, ClientRecord, IdpCoreClient, IdpCoreError};
pub use request_object::{parse_request_object, verify_request_object, RequestObjectClaims};
pub use retry::RetryPolicy;
pub use service::{RegistrationDecision, RegistrationService};
