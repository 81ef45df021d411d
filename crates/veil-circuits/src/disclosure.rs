//! # Selective Disclosure Circuit
//!
//! Proves that chosen attributes belong to a committed credential without
//! revealing the rest. The credential is bound by a SHA-256 commitment over
//! its full attribute map and a blinding value; the holder picks which
//! attribute names to disclose per proof.
//!
//! Public inputs:
//! - `disclose`: the attribute names being disclosed.
//! - `credentialCommitment`: the issuer's commitment to the credential,
//!   64-char hex.
//!
//! Witness (private):
//! - `attributeNames` / `attributeValues`: the credential's attributes as
//!   parallel lists.
//! - `blinding`: the commitment blinding value.
//!
//! Public signals, in order:
//! - `disclosedHash`: canonical hash over the disclosed name/value pairs.
//!   The relying party receives the disclosed pairs out of band and checks
//!   them against this signal with [`disclosed_hash`].
//! - `credentialCommitment`: echoed in canonical lowercase hex.
//!
//! This circuit fails closed: a commitment mismatch or a disclosure of an
//! attribute the credential does not carry rejects witness preparation.

use std::collections::{BTreeMap, BTreeSet};

use veil_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ProofInput, WitnessError};
use veil_zkp::Witness;

use crate::descriptor::{
    ArtifactLocations, CircuitDescriptor, FieldKind, FieldSpec, PredicatePolicy,
};
use crate::prepare::{list_field, text_field, WitnessStrategy};

/// Circuit identifier.
pub const CIRCUIT_ID: &str = "selective_disclosure";

/// Most attributes a committed credential may carry.
pub const MAX_ATTRIBUTES: usize = 64;

/// Descriptor for the selective disclosure circuit, with artifacts under
/// `artifact_base`.
pub fn descriptor(artifact_base: &str) -> CircuitDescriptor {
    let id = crate::builtin_id(CIRCUIT_ID);
    CircuitDescriptor {
        proof_type: CIRCUIT_ID.to_string(),
        description: "Proves chosen attributes of a committed credential without revealing the rest"
            .to_string(),
        constraint_count: 65_536,
        fields: vec![
            FieldSpec::private("attributeNames", FieldKind::List),
            FieldSpec::private("attributeValues", FieldKind::List),
            FieldSpec::private("blinding", FieldKind::Text),
            FieldSpec::public("disclose", FieldKind::List),
            FieldSpec::public("credentialCommitment", FieldKind::Text),
        ],
        public_signals: vec![
            "disclosedHash".to_string(),
            "credentialCommitment".to_string(),
        ],
        predicate_policy: PredicatePolicy::FailClosed,
        artifacts: ArtifactLocations::conventional(artifact_base, &id),
        id,
    }
}

/// The commitment an issuer publishes for a credential: canonical SHA-256
/// over the full attribute map and the blinding value, lowercase hex.
pub fn credential_commitment(
    attributes: &BTreeMap<String, String>,
    blinding: &str,
) -> Result<String, CanonicalizationError> {
    let canonical = CanonicalBytes::new(&serde_json::json!({
        "attributes": attributes,
        "blinding": blinding,
    }))?;
    Ok(sha256_digest(&canonical).to_hex())
}

/// The hash a relying party recomputes over disclosed name/value pairs to
/// check them against the proof's `disclosedHash` signal.
pub fn disclosed_hash(
    disclosed: &BTreeMap<String, String>,
) -> Result<String, CanonicalizationError> {
    let canonical = CanonicalBytes::new(disclosed)?;
    Ok(sha256_digest(&canonical).to_hex())
}

/// Witness strategy for the selective disclosure circuit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectiveDisclosure;

impl WitnessStrategy for SelectiveDisclosure {
    fn prepare(
        &self,
        descriptor: &CircuitDescriptor,
        input: &ProofInput,
    ) -> Result<Witness, WitnessError> {
        let names = string_entries(input, "attributeNames")?;
        let values = string_entries(input, "attributeValues")?;
        let blinding = text_field(input, "blinding")?;
        let disclose = string_entries(input, "disclose")?;
        let commitment_claim = text_field(input, "credentialCommitment")?;

        if blinding.is_empty() {
            return Err(WitnessError::InvalidValue {
                field: "blinding".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if names.len() != values.len() {
            return Err(WitnessError::InvalidValue {
                field: "attributeValues".to_string(),
                reason: format!(
                    "length {} does not match attributeNames length {}",
                    values.len(),
                    names.len()
                ),
            });
        }
        if names.len() > MAX_ATTRIBUTES {
            return Err(WitnessError::InvalidValue {
                field: "attributeNames".to_string(),
                reason: format!("{} attributes exceed maximum {MAX_ATTRIBUTES}", names.len()),
            });
        }

        let mut attributes = BTreeMap::new();
        for (name, value) in names.iter().zip(values.iter()) {
            if attributes.insert(name.clone(), value.clone()).is_some() {
                return Err(WitnessError::InvalidValue {
                    field: "attributeNames".to_string(),
                    reason: format!("duplicate attribute \"{name}\""),
                });
            }
        }

        let mut disclosed = BTreeMap::new();
        let mut seen = BTreeSet::new();
        for name in &disclose {
            if !seen.insert(name.clone()) {
                return Err(WitnessError::InvalidValue {
                    field: "disclose".to_string(),
                    reason: format!("duplicate entry \"{name}\""),
                });
            }
            let value = attributes
                .get(name)
                .ok_or_else(|| WitnessError::InvalidValue {
                    field: "disclose".to_string(),
                    reason: format!("\"{name}\" is not an attribute of the credential"),
                })?;
            disclosed.insert(name.clone(), value.clone());
        }

        let commitment =
            credential_commitment(&attributes, blinding).map_err(|e| WitnessError::InvalidValue {
                field: "attributeValues".to_string(),
                reason: e.to_string(),
            })?;
        if !commitment.eq_ignore_ascii_case(commitment_claim) {
            return Err(WitnessError::InvalidValue {
                field: "credentialCommitment".to_string(),
                reason: "does not match the credential's attributes and blinding".to_string(),
            });
        }
        let disclosed_digest =
            disclosed_hash(&disclosed).map_err(|e| WitnessError::InvalidValue {
                field: "disclose".to_string(),
                reason: e.to_string(),
            })?;

        let mut witness = Witness::new(descriptor.id.clone());
        for (position, (name, value)) in names.iter().zip(values.iter()).enumerate() {
            witness.push_private(format!("attributeNames[{position}]"), name.clone());
            witness.push_private(format!("attributeValues[{position}]"), value.clone());
        }
        witness.push_private("blinding", blinding);
        witness.push_public("disclosedHash", disclosed_digest);
        witness.push_public("credentialCommitment", commitment);
        Ok(witness)
    }
}

/// Read a declared-list field whose entries must all be strings.
fn string_entries(input: &ProofInput, field: &str) -> Result<Vec<String>, WitnessError> {
    let entries = list_field(input, field)?;
    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| WitnessError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("entry {position} must be a string"),
                })
        })
        .collect()
}
