//! # Proof Verifier
//!
//! The relying-party path: check a submitted proof against its public
//! signals. Structural problems (wrong signal count, malformed proof,
//! foreign protocol tags) are [`EngineError::Verification`] errors; a
//! well-formed proof that simply does not verify is a normal outcome with
//! `is_valid: false`. Conflating the two would let a verifier treat
//! "could not check" as "checked and failed", which are different
//! security statements.

use std::sync::Arc;
use std::time::Instant;

use veil_core::{CircuitId, EngineError};
use veil_zkp::{Groth16Proof, ProofBackend, VerificationOutcome};

use crate::registry::CircuitRegistry;

/// Verifies proofs for registered circuits.
pub struct ProofVerifier {
    registry: Arc<CircuitRegistry>,
    backend: Arc<dyn ProofBackend>,
}

impl ProofVerifier {
    /// Wire a verifier from its collaborators.
    pub fn new(registry: Arc<CircuitRegistry>, backend: Arc<dyn ProofBackend>) -> Self {
        Self { registry, backend }
    }

    /// Verify `proof` against `public_signals` for `circuit_id`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::CircuitNotFound`] for an unregistered circuit.
    /// - [`EngineError::ArtifactLoad`] when the verification key cannot be
    ///   loaded.
    /// - [`EngineError::Verification`] when the submission does not match
    ///   the circuit's expected structure. Cryptographic invalidity is not
    ///   an error; it returns `Ok` with `is_valid: false`.
    pub async fn verify(
        &self,
        circuit_id: &CircuitId,
        proof: &Groth16Proof,
        public_signals: &[String],
    ) -> Result<VerificationOutcome, EngineError> {
        let descriptor = self.registry.descriptor(circuit_id)?;

        let expected = descriptor.signal_count();
        if public_signals.len() != expected {
            return Err(EngineError::Verification {
                reason: format!(
                    "expected {expected} public signals for circuit {circuit_id}, got {}",
                    public_signals.len()
                ),
            });
        }
        proof
            .check_shape()
            .map_err(|reason| EngineError::Verification { reason })?;

        let loaded = self.registry.get_circuit(circuit_id).await?;

        let started = Instant::now();
        let is_valid = {
            let backend = Arc::clone(&self.backend);
            let circuit = circuit_id.clone();
            let proof = proof.clone();
            let signals = public_signals.to_vec();
            tokio::task::spawn_blocking(move || {
                backend.verify(
                    &circuit,
                    &loaded.artifacts.verification_key,
                    &proof,
                    &signals,
                )
            })
            .await
            .map_err(|e| EngineError::Verification {
                reason: format!("verifier task failed: {e}"),
            })?
            .map_err(|e| EngineError::Verification {
                reason: e.to_string(),
            })?
        };
        let verification_time_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            circuit = %circuit_id,
            is_valid,
            verification_time_ms,
            "proof verification finished"
        );
        Ok(VerificationOutcome {
            is_valid,
            verification_time_ms,
        })
    }
}

impl std::fmt::Debug for ProofVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofVerifier")
            .field("backend", &self.backend.name())
            .finish()
    }
}
