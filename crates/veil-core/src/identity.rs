//! # Identifier Newtypes
//!
//! Domain-primitive newtypes for the proof engine. Each identifier is a
//! distinct type, so a [`CircuitId`] cannot be passed where a
//! [`CredentialRef`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`CircuitId`], [`CredentialRef`]) validate
//! format at construction time and route deserialization through the same
//! constructor. UUID-based identifiers ([`BatchId`]) are always valid by
//! construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Helper macro to implement `Deserialize` for string newtypes that must
/// validate their contents. Deserializes as a plain `String`, then routes
/// through the type's `new()` constructor so that invalid values are
/// rejected at deserialization time, not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// Identifier of a registered circuit (e.g. `age_verification`).
///
/// # Validation
///
/// - 1 to 64 characters
/// - Lowercase letters, digits, and underscores only
/// - Must start with a letter
///
/// The format matches circuit directory names in artifact repositories, so
/// an identifier is always safe to splice into an artifact URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CircuitId(String);

impl CircuitId {
    /// Create a circuit identifier, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCircuitId`] if the string does not
    /// match the required format.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let mut chars = s.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_lowercase());
        let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid_start || !valid_rest || s.len() > 64 {
            return Err(ValidationError::InvalidCircuitId(s));
        }
        Ok(Self(s))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CircuitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validating_deserialize!(CircuitId);

/// Opaque reference to the credential a proof is derived from.
///
/// The engine never interprets the reference; it only binds cached proofs to
/// it through an unsalted SHA-256 hash compared in constant time. Wallet
/// and issuer layers decide what the string actually is (a storage key, a
/// DID URL, a database row id).
///
/// # Validation
///
/// - Trimmed of surrounding whitespace
/// - Non-empty after trimming, at most 256 characters
/// - No control characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CredentialRef(String);

impl CredentialRef {
    /// Create a credential reference, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCredentialRef`] if the trimmed
    /// string is empty, longer than 256 characters, or contains control
    /// characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidCredentialRef(
                "must be non-empty".to_string(),
            ));
        }
        if trimmed.len() > 256 {
            return Err(ValidationError::InvalidCredentialRef(format!(
                "length {} exceeds 256 characters",
                trimmed.len()
            )));
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(ValidationError::InvalidCredentialRef(
                "control characters are not permitted".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validating_deserialize!(CredentialRef);

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

/// A unique identifier for a batch proving run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Create a new random batch identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a batch identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
