#![deny(missing_docs)]

//! # veil-core — Foundational Types for the Veil Proof Engine
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies, only `serde`, `serde_json`,
//! `thiserror`, `chrono`, `uuid`, `sha2`, and `subtle` from the external
//! ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type. You cannot pass a [`CredentialRef`] where a
//!    [`CircuitId`] is expected, and string formats are validated at
//!    construction.
//!
//! 2. **[`CanonicalBytes`] is the sole path to digest computation.** Cache
//!    fingerprints and batch commitments flow through
//!    `CanonicalBytes::new()`, which sorts keys, rejects floats, and
//!    normalizes datetimes before hashing.
//!
//! 3. **Typed input values.** [`InputValue`] admits strings, integers,
//!    booleans, and lists, never floats, so everything the engine
//!    fingerprints is something an arithmetic circuit can consume.
//!
//! 4. **[`EngineError`] hierarchy.** Structured errors with `thiserror`,
//!    `Clone` end to end so results can be shared across concurrent callers
//!    of a deduplicated generation.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{
    sha256_digest, sha256_raw, ContentDigest, CredentialHash, DigestAlgorithm, Fingerprint,
};
pub use error::{
    ArtifactKind, CanonicalizationError, EngineError, ValidationError, WitnessError,
};
pub use identity::{BatchId, CircuitId, CredentialRef};
pub use temporal::Timestamp;
pub use value::{InputValue, ProofInput};
