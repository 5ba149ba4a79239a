//! Strongly Typed Identifiers
//!
//! Federation entity identifiers are opaque strings (HTTPS URLs in
//! production deployments). The newtype keeps them from being confused with
//! other string values and pins down the equality contract: exact string
//! match, no normalization.
//!
//! # Example
//!
//! ```
//! use fedra_core::EntityId;
//!
//! let rp = EntityId::new("https://rp.example");
//! let op: EntityId = "https://op.example".parse().unwrap();
//!
//! assert_ne!(rp, op);
//! assert_eq!(rp.as_str(), "https://rp.example");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Error type for identifier parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of identifier that failed to parse.
    pub id_type: &'static str,
    /// Description of the failure.
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Opaque federation entity identifier.
///
/// Equality is exact string match. Whether an identifier is acceptable
/// (HTTPS, localhost in test configurations) is decided at the component
/// boundaries that consume it, never here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an entity identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier, returning the underlying string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether the identifier is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseIdError {
                id_type: "EntityId",
                message: "identifier must not be empty".to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
