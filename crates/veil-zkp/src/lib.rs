#![deny(missing_docs)]

//! # veil-zkp — Proving Capability Boundary
//!
//! Everything cryptographic in the Veil engine lives behind the
//! [`ProofBackend`] trait defined here. The engine prepares witnesses,
//! loads circuit artifacts, caches and batches; the backend turns a
//! [`Witness`] into a [`ProofArtifact`]-shaped proof and checks proofs
//! against public signals.
//!
//! ## Architecture
//!
//! - [`backend::ProofBackend`] is object-safe and deliberately unsealed:
//!   deployments inject an arkworks prover, a snarkjs sidecar, or an
//!   HSM-backed service without touching this crate.
//! - [`artifact`] fixes the snarkjs-compatible Groth16 wire shape that
//!   relying parties consume.
//! - [`deterministic::DeterministicBackend`] is the development backend:
//!   hash-derived proofs with honest tamper detection and zero
//!   cryptographic soundness.
//! - [`policy::ProofPolicy`] keeps the deterministic backend out of
//!   production deployments at runtime.

pub mod artifact;
pub mod backend;
pub mod deterministic;
pub mod policy;
pub mod witness;

// Re-export primary types.
pub use artifact::{Groth16Proof, ProofArtifact, ProofMetadata, VerificationOutcome};
pub use backend::{CircuitArtifacts, ProofBackend, ProofError, ProveOutput, VerifyError};
pub use deterministic::DeterministicBackend;
pub use policy::{PolicyError, PolicyMode, ProofPolicy};
pub use witness::{Assignment, Witness};
