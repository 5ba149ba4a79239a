//! Error types for dynamic registration.

use serde::Serialize;
use thiserror::Error;

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Registration error types.
///
/// `EntityMismatch` and `MetadataMismatch` are rejection causes carried
/// inside a [`crate::service::RegistrationDecision`]; the remaining variants
/// are operational failures of the registration pipeline itself.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistrationError {
    /// The request object's declared client does not match the entity whose
    /// chain was validated.
    #[error("Request object client '{declared}' does not match validated entity '{validated}'")]
    EntityMismatch {
        /// Client the request object declared.
        declared: String,
        /// Entity the trust chain was validated for.
        validated: String,
    },

    /// A requested value is inconsistent with the chain's effective metadata.
    #[error("Requested {field} is not permitted by the validated metadata: {message}")]
    MetadataMismatch {
        /// The offending request field.
        field: String,
        /// What went wrong.
        message: String,
    },

    /// The request object token could not be parsed.
    #[error("Malformed request object: {0}")]
    MalformedRequestObject(String),

    /// The request object signature did not verify against the relying
    /// party's chain-validated keys.
    #[error("Request object signature invalid: {0}")]
    RequestObjectSignatureInvalid(String),
}
