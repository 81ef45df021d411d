//! # Income Threshold Circuit
//!
//! Proves a credential holder's income reaches a threshold without revealing
//! the income itself. A range proof over a single attested value.
//!
//! Public inputs:
//! - `threshold`: the income floor the relying party requires.
//! - `periodYear`: the year the attested income covers.
//!
//! Witness (private):
//! - `annualIncome`: the attested income figure from the credential.
//!
//! Public signals, in order:
//! - `meetsThreshold`: `"1"` when `annualIncome >= threshold`, else `"0"`.
//! - `threshold`, `periodYear`: echoed for the relying party.
//!
//! Like age verification, the outcome is revealed rather than enforced, so
//! a below-threshold holder still receives a valid proof.
//!
//! Approximate constraint count: 4096 (range decomposition + comparison).

use veil_core::{ProofInput, WitnessError};
use veil_zkp::Witness;

use crate::descriptor::{
    ArtifactLocations, CircuitDescriptor, FieldKind, FieldSpec, PredicatePolicy,
};
use crate::prepare::{integer_field, WitnessStrategy};

/// Circuit identifier.
pub const CIRCUIT_ID: &str = "income_threshold";

const YEAR_MIN: i64 = 1;
const YEAR_MAX: i64 = 9999;

/// Descriptor for the income threshold circuit, with artifacts under
/// `artifact_base`.
pub fn descriptor(artifact_base: &str) -> CircuitDescriptor {
    let id = crate::builtin_id(CIRCUIT_ID);
    CircuitDescriptor {
        proof_type: CIRCUIT_ID.to_string(),
        description: "Proves attested income reaches a threshold without revealing the figure"
            .to_string(),
        constraint_count: 4096,
        fields: vec![
            FieldSpec::private("annualIncome", FieldKind::Integer),
            FieldSpec::public("threshold", FieldKind::Integer),
            FieldSpec::public("periodYear", FieldKind::Integer),
        ],
        public_signals: vec![
            "meetsThreshold".to_string(),
            "threshold".to_string(),
            "periodYear".to_string(),
        ],
        predicate_policy: PredicatePolicy::RevealOutcome,
        artifacts: ArtifactLocations::conventional(artifact_base, &id),
        id,
    }
}

/// Witness strategy for the income threshold circuit.
#[derive(Debug, Default, Clone, Copy)]
pub struct IncomeThreshold;

impl WitnessStrategy for IncomeThreshold {
    fn prepare(
        &self,
        descriptor: &CircuitDescriptor,
        input: &ProofInput,
    ) -> Result<Witness, WitnessError> {
        let annual_income = integer_field(input, "annualIncome")?;
        let threshold = integer_field(input, "threshold")?;
        let period_year = integer_field(input, "periodYear")?;

        if annual_income < 0 {
            return Err(WitnessError::InvalidValue {
                field: "annualIncome".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if threshold < 0 {
            return Err(WitnessError::InvalidValue {
                field: "threshold".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if !(YEAR_MIN..=YEAR_MAX).contains(&period_year) {
            return Err(WitnessError::InvalidValue {
                field: "periodYear".to_string(),
                reason: format!("must be between {YEAR_MIN} and {YEAR_MAX}"),
            });
        }

        let meets = annual_income >= threshold;
        let mut witness = Witness::new(descriptor.id.clone());
        witness.push_private("annualIncome", annual_income.to_string());
        witness.push_public("meetsThreshold", if meets { "1" } else { "0" });
        witness.push_public("threshold", threshold.to_string());
        witness.push_public("periodYear", period_year.to_string());
        Ok(witness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::PreparerRegistry;
    use std::sync::Arc;
    use veil_core::{CredentialRef, InputValue};

    fn registry() -> PreparerRegistry {
        let mut registry = PreparerRegistry::new();
        registry.register(crate::builtin_id(CIRCUIT_ID), Arc::new(IncomeThreshold));
        registry
    }

    fn input(income: i64, threshold: i64, year: i64) -> ProofInput {
        ProofInput::new(CredentialRef::new("did:veil:holder-2").unwrap())
            .with_private("annualIncome", income)
            .with_public("threshold", threshold)
            .with_public("periodYear", year)
    }

    // -- Witness computation --

    #[test]
    fn income_above_threshold_is_affirmative() {
        let witness = registry()
            .prepare(&descriptor("circuits"), &input(85_000, 60_000, 2024))
            .unwrap();
        assert_eq!(witness.value_of("meetsThreshold"), Some("1"));
        assert_eq!(
            witness.public_signals(),
            vec!["1".to_string(), "60000".to_string(), "2024".to_string()]
        );
    }

    #[test]
    fn income_below_threshold_still_proves() {
        let witness = registry()
            .prepare(&descriptor("circuits"), &input(40_000, 60_000, 2024))
            .unwrap();
        assert_eq!(witness.value_of("meetsThreshold"), Some("0"));
    }

    #[test]
    fn income_exactly_at_threshold_meets_it() {
        let witness = registry()
            .prepare(&descriptor("circuits"), &input(60_000, 60_000, 2024))
            .unwrap();
        assert_eq!(witness.value_of("meetsThreshold"), Some("1"));
    }

    #[test]
    fn income_stays_out_of_public_signals() {
        let witness = registry()
            .prepare(&descriptor("circuits"), &input(85_000, 60_000, 2024))
            .unwrap();
        assert!(!witness.public_signals().contains(&"85000".to_string()));
        assert_eq!(witness.value_of("annualIncome"), Some("85000"));
    }

    // -- Validation --

    #[test]
    fn negative_income_is_rejected() {
        let err = registry()
            .prepare(&descriptor("circuits"), &input(-1, 60_000, 2024))
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, .. } if field == "annualIncome"
        ));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let err = registry()
            .prepare(&descriptor("circuits"), &input(85_000, -5, 2024))
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, .. } if field == "threshold"
        ));
    }

    #[test]
    fn out_of_range_period_year_is_rejected() {
        let err = registry()
            .prepare(&descriptor("circuits"), &input(85_000, 60_000, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, .. } if field == "periodYear"
        ));
    }

    #[test]
    fn wrong_kind_threshold_is_rejected_before_the_strategy() {
        let input = ProofInput::new(CredentialRef::new("did:veil:holder-2").unwrap())
            .with_private("annualIncome", 85_000)
            .with_public("threshold", InputValue::List(Vec::new()))
            .with_public("periodYear", 2024);
        let err = registry()
            .prepare(&descriptor("circuits"), &input)
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::WrongKind { ref field, .. } if field == "threshold"
        ));
    }
}
