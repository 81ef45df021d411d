//! # Proof Artifact Types
//!
//! The wire shape of a generated proof. The layout is snarkjs-compatible
//! Groth16 JSON: three groups of decimal-string curve points, the public
//! signals as decimal strings, and camelCase metadata. Relying parties and
//! on-chain verifiers consume this shape directly, so field names are wire
//! contracts, not internal style.

use serde::{Deserialize, Serialize};

use veil_core::{CircuitId, Timestamp};

/// A Groth16 proof in snarkjs JSON layout.
///
/// Curve points travel as decimal strings: `pi_a` and `pi_c` are affine G1
/// points (two coordinates), `pi_b` is an affine G2 point (two coordinate
/// pairs over the extension field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    /// G1 point: two decimal-string coordinates.
    pub pi_a: [String; 2],
    /// G2 point: two pairs of decimal-string coordinates.
    pub pi_b: [[String; 2]; 2],
    /// G1 point: two decimal-string coordinates.
    pub pi_c: [String; 2],
    /// Proof system tag. Always `"groth16"` for this layout.
    pub protocol: String,
    /// Curve tag. Always `"bn128"` for this layout.
    pub curve: String,
}

impl Groth16Proof {
    /// The protocol tag this layout carries.
    pub const PROTOCOL: &'static str = "groth16";
    /// The curve tag this layout carries.
    pub const CURVE: &'static str = "bn128";

    /// Check structural well-formedness: correct protocol and curve tags,
    /// and every coordinate a non-empty decimal string (optionally signed).
    ///
    /// # Errors
    ///
    /// Returns a description of the first structural problem found.
    pub fn check_shape(&self) -> Result<(), String> {
        if self.protocol != Self::PROTOCOL {
            return Err(format!(
                "unsupported protocol \"{}\" (expected \"{}\")",
                self.protocol,
                Self::PROTOCOL
            ));
        }
        if self.curve != Self::CURVE {
            return Err(format!(
                "unsupported curve \"{}\" (expected \"{}\")",
                self.curve,
                Self::CURVE
            ));
        }
        let coords = self
            .pi_a
            .iter()
            .chain(self.pi_b.iter().flatten())
            .chain(self.pi_c.iter());
        for (i, coord) in coords.enumerate() {
            if !is_decimal_string(coord) {
                return Err(format!(
                    "proof coordinate {i} is not a decimal string: \"{coord}\""
                ));
            }
        }
        Ok(())
    }
}

/// True for non-empty strings of ASCII digits with an optional leading `-`.
fn is_decimal_string(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Metadata attached to every generated proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofMetadata {
    /// The circuit the proof was generated for.
    pub circuit_id: CircuitId,
    /// The circuit's proof-type label (e.g. `"age_verification"`).
    pub proof_type: String,
    /// When generation completed, UTC.
    pub generated_at: Timestamp,
    /// The circuit's constraint count, from its descriptor.
    pub constraint_count: u64,
    /// Wall-clock generation time in milliseconds.
    pub generation_time_ms: u64,
}

/// A complete proof artifact: proof, public signals, and metadata.
///
/// Immutable once created. The engine shares artifacts behind `Arc`; the
/// cache, concurrent callers of a deduplicated generation, and batch
/// results all hold the same allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofArtifact {
    /// The Groth16 proof.
    pub proof: Groth16Proof,
    /// Public signals as decimal strings, in circuit order.
    pub public_signals: Vec<String>,
    /// Generation metadata.
    pub metadata: ProofMetadata,
}

/// The outcome of a verification request.
///
/// A cryptographically invalid proof is a normal outcome with
/// `is_valid: false`, not an error. Errors are reserved for submissions
/// that are structurally unverifiable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    /// Whether the proof verified against the public signals.
    pub is_valid: bool,
    /// Wall-clock verification time in milliseconds.
    pub verification_time_ms: u64,
}
