//! # Deterministic Development Backend
//!
//! A stand-in proof backend for development and tests. Proof points are
//! derived by hashing the circuit id, the verification key, and the public
//! signals, so verification genuinely distinguishes matching from tampered
//! submissions: flip one character of a public signal and the proof no
//! longer verifies.
//!
//! What it does not do is zero knowledge or soundness. Anyone holding the
//! verification key can forge a "proof" for any public signals. The
//! backend reports `is_cryptographic() == false` and
//! [`ProofPolicy::production()`](crate::policy::ProofPolicy::production)
//! rejects it, so it cannot be mistaken for the real thing outside
//! development.

use sha2::{Digest, Sha256};

use veil_core::{sha256_digest, sha256_raw, CanonicalBytes, CircuitId, ContentDigest};

use crate::artifact::Groth16Proof;
use crate::backend::{CircuitArtifacts, ProofBackend, ProofError, ProveOutput, VerifyError};
use crate::witness::Witness;

/// Deterministic SHA-256-derived proof backend. See the module docs for
/// what it does and does not guarantee.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicBackend;

impl DeterministicBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }

    /// Derive the binding digest a proof commits to: circuit id, a digest
    /// of the verification key, and the public signals in order.
    fn binding(
        circuit_id: &CircuitId,
        verification_key: &[u8],
        public_signals: &[String],
    ) -> Result<ContentDigest, String> {
        let tuple = serde_json::json!({
            "circuitId": circuit_id.as_str(),
            "publicSignals": public_signals,
            "vk": sha256_raw(verification_key).to_hex(),
        });
        let canonical = CanonicalBytes::new(&tuple).map_err(|e| e.to_string())?;
        Ok(sha256_digest(&canonical))
    }

    /// Expand the binding digest into one decimal-string coordinate per
    /// component index.
    fn coordinate(binding: &ContentDigest, index: u8) -> String {
        let mut hasher = Sha256::new();
        hasher.update(binding.bytes);
        hasher.update([index]);
        let out = hasher.finalize();
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&out[..16]);
        u128::from_be_bytes(buf).to_string()
    }

    fn proof_for(binding: &ContentDigest) -> Groth16Proof {
        Groth16Proof {
            pi_a: [Self::coordinate(binding, 0), Self::coordinate(binding, 1)],
            pi_b: [
                [Self::coordinate(binding, 2), Self::coordinate(binding, 3)],
                [Self::coordinate(binding, 4), Self::coordinate(binding, 5)],
            ],
            pi_c: [Self::coordinate(binding, 6), Self::coordinate(binding, 7)],
            protocol: Groth16Proof::PROTOCOL.into(),
            curve: Groth16Proof::CURVE.into(),
        }
    }
}

impl ProofBackend for DeterministicBackend {
    fn name(&self) -> &'static str {
        "deterministic-sha256"
    }

    fn is_cryptographic(&self) -> bool {
        false
    }

    fn prove(
        &self,
        circuit_id: &CircuitId,
        artifacts: &CircuitArtifacts,
        witness: &Witness,
    ) -> Result<ProveOutput, ProofError> {
        if witness.is_empty() {
            return Err(ProofError::InvalidWitness(
                "witness has no assignments".into(),
            ));
        }
        if witness.circuit_id() != circuit_id {
            return Err(ProofError::InvalidWitness(format!(
                "witness was prepared for circuit {}, not {}",
                witness.circuit_id(),
                circuit_id
            )));
        }
        let public_signals = witness.public_signals();
        let binding = Self::binding(circuit_id, &artifacts.verification_key, &public_signals)
            .map_err(ProofError::GenerationFailed)?;
        Ok(ProveOutput {
            proof: Self::proof_for(&binding),
            public_signals,
        })
    }

    fn verify(
        &self,
        circuit_id: &CircuitId,
        verification_key: &[u8],
        proof: &Groth16Proof,
        public_signals: &[String],
    ) -> Result<bool, VerifyError> {
        proof.check_shape().map_err(VerifyError::MalformedProof)?;
        let binding = Self::binding(circuit_id, verification_key, public_signals)
            .map_err(VerifyError::VerificationFailed)?;
        Ok(*proof == Self::proof_for(&binding))
    }
}
