//! # Age Verification Circuit
//!
//! Proves a credential holder meets a minimum age without revealing their
//! birth year.
//!
//! Public inputs:
//! - `currentYear`: the year the verification happens in.
//! - `minAge`: the minimum age the relying party requires.
//!
//! Witness (private):
//! - `birthYear`: the holder's birth year, taken from the credential. Only
//!   the derived `age` enters the witness; the birth year itself is dropped
//!   after preparation.
//!
//! Public signals, in order:
//! - `isOldEnough`: `"1"` when `currentYear - birthYear >= minAge`, else `"0"`.
//! - `currentYear`, `minAge`: echoed so the relying party can see which
//!   predicate the proof is about.
//!
//! The predicate outcome is revealed, not enforced: a holder below the
//! threshold still receives a valid proof, carrying `isOldEnough = "0"`.
//!
//! Approximate constraint count: 4096 (range checks + comparison).

use veil_core::{ProofInput, WitnessError};
use veil_zkp::Witness;

use crate::descriptor::{
    ArtifactLocations, CircuitDescriptor, FieldKind, FieldSpec, PredicatePolicy,
};
use crate::prepare::{integer_field, WitnessStrategy};

/// Circuit identifier.
pub const CIRCUIT_ID: &str = "age_verification";

const YEAR_MIN: i64 = 1;
const YEAR_MAX: i64 = 9999;
const MIN_AGE_MAX: i64 = 150;

/// Descriptor for the age verification circuit, with artifacts under
/// `artifact_base`.
pub fn descriptor(artifact_base: &str) -> CircuitDescriptor {
    let id = crate::builtin_id(CIRCUIT_ID);
    CircuitDescriptor {
        proof_type: CIRCUIT_ID.to_string(),
        description: "Proves the holder meets a minimum age without revealing their birth year"
            .to_string(),
        constraint_count: 4096,
        fields: vec![
            FieldSpec::private("birthYear", FieldKind::Integer),
            FieldSpec::public("currentYear", FieldKind::Integer),
            FieldSpec::public("minAge", FieldKind::Integer),
        ],
        public_signals: vec![
            "isOldEnough".to_string(),
            "currentYear".to_string(),
            "minAge".to_string(),
        ],
        predicate_policy: PredicatePolicy::RevealOutcome,
        artifacts: ArtifactLocations::conventional(artifact_base, &id),
        id,
    }
}

/// Witness strategy for the age verification circuit.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgeVerification;

impl WitnessStrategy for AgeVerification {
    fn prepare(
        &self,
        descriptor: &CircuitDescriptor,
        input: &ProofInput,
    ) -> Result<Witness, WitnessError> {
        let birth_year = integer_field(input, "birthYear")?;
        let current_year = integer_field(input, "currentYear")?;
        let min_age = integer_field(input, "minAge")?;

        check_year("birthYear", birth_year)?;
        check_year("currentYear", current_year)?;
        if !(0..=MIN_AGE_MAX).contains(&min_age) {
            return Err(WitnessError::InvalidValue {
                field: "minAge".to_string(),
                reason: format!("must be between 0 and {MIN_AGE_MAX}"),
            });
        }
        let age = current_year - birth_year;
        if age < 0 {
            return Err(WitnessError::InvalidValue {
                field: "birthYear".to_string(),
                reason: "is later than currentYear".to_string(),
            });
        }

        let is_old_enough = age >= min_age;
        let mut witness = Witness::new(descriptor.id.clone());
        witness.push_private("age", age.to_string());
        witness.push_public("isOldEnough", if is_old_enough { "1" } else { "0" });
        witness.push_public("currentYear", current_year.to_string());
        witness.push_public("minAge", min_age.to_string());
        Ok(witness)
    }
}

fn check_year(field: &str, value: i64) -> Result<(), WitnessError> {
    if (YEAR_MIN..=YEAR_MAX).contains(&value) {
        Ok(())
    } else {
        Err(WitnessError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be between {YEAR_MIN} and {YEAR_MAX}"),
        })
    }
}
