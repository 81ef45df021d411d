//! # Typed Input Values
//!
//! The value model for circuit inputs. Circuit field values are strings,
//! integers, booleans, or lists of those; floats never enter the engine.
//! Rejecting them at the type level keeps fingerprints deterministic and
//! matches what arithmetic circuits can actually consume.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::CredentialRef;

/// A single circuit input value.
///
/// Deserializes untagged from plain JSON, so `1990`, `"1990"`, `true`, and
/// `["a", "b"]` all map directly. A JSON float matches no variant and is
/// rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    /// Boolean flag. Serializes to a circuit field as `"1"` / `"0"`.
    Bool(bool),
    /// Signed integer. Large field elements travel as [`InputValue::Text`]
    /// decimal strings instead.
    Integer(i64),
    /// String value: decimal field elements, hex digests, attribute names.
    Text(String),
    /// Homogeneous or mixed list, used for Merkle paths and disclosure sets.
    List(Vec<InputValue>),
}

impl InputValue {
    /// Returns the kind of this value as a lowercase name, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Text(_) => "string",
            Self::List(_) => "list",
        }
    }

    /// Interpret the value as a signed integer.
    ///
    /// Accepts both [`InputValue::Integer`] and an [`InputValue::Text`]
    /// holding a decimal integer, since callers routinely supply circuit
    /// numbers as strings.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Interpret the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Interpret the value as a list slice.
    pub fn as_list(&self) -> Option<&[InputValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render the value as a circuit field string: integers as decimal,
    /// booleans as `"1"` / `"0"`, strings as-is. Lists have no scalar field
    /// rendering and return `None`.
    pub fn to_field_string(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Self::Integer(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::List(_) => None,
        }
    }
}

impl From<i64> for InputValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for InputValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for InputValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<InputValue>> for InputValue {
    fn from(items: Vec<InputValue>) -> Self {
        Self::List(items)
    }
}

/// The full input to a proof request: the credential the values came from,
/// private inputs (never leave the engine), and public inputs (become part
/// of the proof's public signals and the cache fingerprint).
///
/// Maps are `BTreeMap` so iteration order, and therefore canonical
/// serialization, is independent of insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofInput {
    /// The credential the input values were extracted from.
    pub credential: CredentialRef,
    /// Inputs that stay private to the prover.
    #[serde(default)]
    pub private: BTreeMap<String, InputValue>,
    /// Inputs that are public to the verifier.
    #[serde(default)]
    pub public: BTreeMap<String, InputValue>,
}

impl ProofInput {
    /// Create an empty input set for a credential.
    pub fn new(credential: CredentialRef) -> Self {
        Self {
            credential,
            private: BTreeMap::new(),
            public: BTreeMap::new(),
        }
    }

    /// Add a private input field.
    pub fn with_private(mut self, name: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.private.insert(name.into(), value.into());
        self
    }

    /// Add a public input field.
    pub fn with_public(mut self, name: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.public.insert(name.into(), value.into());
        self
    }

    /// Look up a field across both maps, private first.
    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.private.get(name).or_else(|| self.public.get(name))
    }
}
