//! # Proof Backend Trait
//!
//! The capability boundary between the engine and the proof system. The
//! engine orchestrates circuits, witnesses, caching, and batching; the
//! backend turns a witness into a proof and checks proofs against public
//! signals. Everything cryptographic lives behind this trait.
//!
//! The trait is deliberately open: deployments inject their own backend
//! (an arkworks prover, a snarkjs sidecar, an HSM-backed service) without
//! touching this crate. What protects production deployments from
//! non-cryptographic backends is the runtime
//! [`ProofPolicy`](crate::policy::ProofPolicy), not a sealed trait.
//!
//! Backend calls are synchronous and CPU-bound. The engine invokes them on
//! a blocking thread (`tokio::task::spawn_blocking`), so implementations
//! must be `Send + Sync` and must not assume an async runtime.

use thiserror::Error;

use veil_core::CircuitId;

use crate::artifact::Groth16Proof;
use crate::witness::Witness;

/// Error during proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The witness is missing signals or carries unusable values.
    #[error("invalid witness: {0}")]
    InvalidWitness(String),
    /// Proof generation failed internally.
    #[error("proof generation failed: {0}")]
    GenerationFailed(String),
}

/// Error during proof verification.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof is structurally malformed and cannot be checked.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// Verification could not be carried out (corrupt key, backend fault).
    #[error("proof verification failed: {0}")]
    VerificationFailed(String),
}

/// The three artifacts a circuit needs, loaded into memory.
///
/// `Debug` prints byte lengths only: proving keys run to megabytes and none
/// of the three belongs in a log line.
pub struct CircuitArtifacts {
    /// The compiled circuit program (constraint system plus witness
    /// generator).
    pub program: Vec<u8>,
    /// The proving key.
    pub proving_key: Vec<u8>,
    /// The verification key.
    pub verification_key: Vec<u8>,
}

impl std::fmt::Debug for CircuitArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitArtifacts")
            .field("program", &format_args!("{} bytes", self.program.len()))
            .field(
                "proving_key",
                &format_args!("{} bytes", self.proving_key.len()),
            )
            .field(
                "verification_key",
                &format_args!("{} bytes", self.verification_key.len()),
            )
            .finish()
    }
}

/// What a successful proving run produces: the proof and the public signals
/// derived from the witness.
#[derive(Debug, Clone)]
pub struct ProveOutput {
    /// The generated proof.
    pub proof: Groth16Proof,
    /// Public signals in circuit order, as decimal strings.
    pub public_signals: Vec<String>,
}

/// A zero-knowledge proof backend.
///
/// Object-safe so the engine can hold `Arc<dyn ProofBackend>` injected at
/// construction.
pub trait ProofBackend: Send + Sync {
    /// Stable backend name for logs and policy errors.
    fn name(&self) -> &'static str;

    /// Whether proofs from this backend carry real cryptographic soundness.
    ///
    /// The deterministic development backend returns `false`;
    /// [`ProofPolicy::production()`](crate::policy::ProofPolicy::production)
    /// refuses such backends.
    fn is_cryptographic(&self) -> bool;

    /// Generate a proof for a prepared witness.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError::InvalidWitness`] for unusable witnesses and
    /// [`ProofError::GenerationFailed`] for internal failures. Generation
    /// failures are retryable; witness failures are not.
    fn prove(
        &self,
        circuit_id: &CircuitId,
        artifacts: &CircuitArtifacts,
        witness: &Witness,
    ) -> Result<ProveOutput, ProofError>;

    /// Verify a proof against public signals using the verification key.
    ///
    /// # Returns
    ///
    /// `Ok(true)` for a valid proof, `Ok(false)` for a well-formed proof
    /// that does not verify. Structural problems are [`VerifyError`]s, not
    /// `Ok(false)`.
    fn verify(
        &self,
        circuit_id: &CircuitId,
        verification_key: &[u8],
        proof: &Groth16Proof,
        public_signals: &[String],
    ) -> Result<bool, VerifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_artifacts_debug_is_lengths_only() {
        let artifacts = CircuitArtifacts {
            program: vec![1; 100],
            proving_key: vec![2; 5000],
            verification_key: vec![3; 300],
        };
        let rendered = format!("{artifacts:?}");
        assert!(rendered.contains("100 bytes"));
        assert!(rendered.contains("5000 bytes"));
        assert!(rendered.contains("300 bytes"));
        // No raw byte dumps.
        assert!(!rendered.contains("[1, 1"));
    }

    #[test]
    fn error_displays() {
        let err = ProofError::InvalidWitness("no assignments".into());
        assert!(format!("{err}").contains("invalid witness"));
        let err = VerifyError::MalformedProof("bad point".into());
        assert!(format!("{err}").contains("malformed proof"));
    }
}
