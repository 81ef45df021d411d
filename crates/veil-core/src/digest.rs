//! # Content Digests and Fingerprints
//!
//! Defines [`ContentDigest`] for artifact integrity and batch commitments,
//! [`Fingerprint`] as the proof-cache key, and [`CredentialHash`] as the
//! constant-time credential binding stored next to cached proofs.
//!
//! ## Security Invariant
//!
//! Canonical JSON digests are computed from [`CanonicalBytes`] only, so any
//! two digests over the same logical value agree. Raw-byte hashing exists
//! solely for opaque artifact blobs fetched from a resolver, where the bytes
//! themselves are the identity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::canonical::CanonicalBytes;
use crate::error::{CanonicalizationError, ValidationError};
use crate::identity::{CircuitId, CredentialRef};
use crate::value::InputValue;

/// The hash algorithm that produced a digest.
///
/// SHA-256 is the only algorithm in use today. The tag is carried anyway so
/// stored digests survive a future migration to a circuit-friendly hash
/// without ambiguity about which function produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256, the standard content-addressing hash.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a content digest from raw bytes and algorithm.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Parse a digest from `sha256:<64 hex>` or bare 64-char hex form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDigest`] on unknown algorithm tags,
    /// wrong length, or non-hex characters.
    pub fn from_hex(value: &str) -> Result<Self, ValidationError> {
        let hex = match value.split_once(':') {
            Some(("sha256", rest)) => rest,
            Some((tag, _)) => {
                return Err(ValidationError::InvalidDigest {
                    value: value.to_string(),
                    reason: format!("unknown algorithm tag \"{tag}\""),
                })
            }
            None => value,
        };
        if hex.len() != 64 {
            return Err(ValidationError::InvalidDigest {
                value: value.to_string(),
                reason: format!("expected 64 hex chars, got {}", hex.len()),
            });
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &hex[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| ValidationError::InvalidDigest {
                value: value.to_string(),
                reason: format!("non-hex characters at offset {}", i * 2),
            })?;
        }
        Ok(Self::new(DigestAlgorithm::Sha256, bytes))
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// The signature accepts only [`CanonicalBytes`], never raw `&[u8]`, so no
/// code path can digest non-canonical JSON.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    ContentDigest::new(DigestAlgorithm::Sha256, sha256_array(data.as_bytes()))
}

/// Compute a SHA-256 content digest over opaque artifact bytes.
///
/// For fetched circuit artifacts (programs, keys) the raw bytes are the
/// identity; canonical JSON values must flow through [`sha256_digest`]
/// instead.
pub fn sha256_raw(data: &[u8]) -> ContentDigest {
    ContentDigest::new(DigestAlgorithm::Sha256, sha256_array(data))
}

fn sha256_array(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    bytes
}

/// The proof-cache key: a digest over the canonical tuple of circuit id,
/// credential reference, and public inputs.
///
/// Private inputs are deliberately excluded. Two requests that differ only
/// in private inputs but agree on circuit, credential, and public inputs
/// prove the same public statement, and the cached artifact is valid for
/// both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(ContentDigest);

impl Fingerprint {
    /// Compute the fingerprint for a proof request.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError`] if the public inputs fail canonical
    /// serialization.
    pub fn for_request(
        circuit_id: &CircuitId,
        credential: &CredentialRef,
        public_inputs: &BTreeMap<String, InputValue>,
    ) -> Result<Self, CanonicalizationError> {
        let tuple = serde_json::json!({
            "circuitId": circuit_id.as_str(),
            "credential": credential.as_str(),
            "publicInputs": public_inputs,
        });
        let canonical = CanonicalBytes::new(&tuple)?;
        Ok(Self(sha256_digest(&canonical)))
    }

    /// Wrap an existing digest as a fingerprint, for callers that manage
    /// their own cache keys.
    pub fn from_digest(digest: ContentDigest) -> Self {
        Self(digest)
    }

    /// Access the underlying digest.
    pub fn as_digest(&self) -> &ContentDigest {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 of a credential reference, stored alongside cached proofs.
///
/// Equality is constant-time so a cache probe cannot be used to recover a
/// stored credential reference byte-by-byte through timing.
#[derive(Clone)]
pub struct CredentialHash([u8; 32]);

impl CredentialHash {
    /// Hash a credential reference.
    pub fn of(credential: &CredentialRef) -> Self {
        Self(sha256_array(credential.as_str().as_bytes()))
    }

    /// Render the hash as lowercase hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl PartialEq for CredentialHash {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for CredentialHash {}

impl std::fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialHash({}..)", &self.to_hex()[..8])
    }
}
