//! # Witness Preparation
//!
//! Transforms raw proof input into the private witness and public signals a
//! backend consumes. Every circuit registers a [`WitnessStrategy`]; the
//! [`PreparerRegistry`] owns the strategy table, enforces each descriptor's
//! field contract, and dispatches to the right strategy.
//!
//! Preparation is pure: a strategy reads the descriptor and the input and
//! produces a [`Witness`] or a [`WitnessError`], touching no I/O and no
//! shared state. That purity is what makes speculative precomputation safe,
//! since a precomputed witness is indistinguishable from a fresh one.
//!
//! ## Security Invariant
//!
//! Field validation runs before any strategy code. A request with a missing
//! field, a wrongly typed field, or an undeclared field is rejected with an
//! error naming that field, and the strategy never observes the input.

use std::collections::HashMap;
use std::sync::Arc;

use veil_core::{CircuitId, InputValue, ProofInput, WitnessError};
use veil_zkp::Witness;

use crate::descriptor::{CircuitDescriptor, FieldVisibility};

/// Circuit-specific witness computation.
///
/// Implementations must be pure and deterministic: same descriptor and input,
/// same assignments. The `prepared_at` stamp on the returned witness is
/// bookkeeping metadata and does not participate in proof generation.
pub trait WitnessStrategy: Send + Sync {
    /// Compute the witness for `input`.
    ///
    /// The registry has already checked the input against the descriptor's
    /// field table; implementations may assume every declared field is
    /// present with the declared kind, and perform only range and semantic
    /// validation of their own.
    fn prepare(
        &self,
        descriptor: &CircuitDescriptor,
        input: &ProofInput,
    ) -> Result<Witness, WitnessError>;
}

/// Registry mapping circuit ids to their witness strategies.
///
/// Strategies are registered at engine construction and shared immutably
/// afterward. Registering a strategy for an id that already has one replaces
/// the previous strategy.
#[derive(Default)]
pub struct PreparerRegistry {
    strategies: HashMap<CircuitId, Arc<dyn WitnessStrategy>>,
}

impl PreparerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        PreparerRegistry {
            strategies: HashMap::new(),
        }
    }

    /// Register `strategy` for `circuit_id`.
    pub fn register(&mut self, circuit_id: CircuitId, strategy: Arc<dyn WitnessStrategy>) {
        self.strategies.insert(circuit_id, strategy);
    }

    /// Whether a strategy is registered for `circuit_id`.
    pub fn contains(&self, circuit_id: &CircuitId) -> bool {
        self.strategies.contains_key(circuit_id)
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Validate `input` against `descriptor` and dispatch to the circuit's
    /// strategy.
    pub fn prepare(
        &self,
        descriptor: &CircuitDescriptor,
        input: &ProofInput,
    ) -> Result<Witness, WitnessError> {
        let strategy = self
            .strategies
            .get(&descriptor.id)
            .ok_or_else(|| WitnessError::StrategyMissing {
                circuit_id: descriptor.id.to_string(),
            })?;
        validate_fields(descriptor, input)?;
        strategy.prepare(descriptor, input)
    }
}

impl std::fmt::Debug for PreparerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparerRegistry")
            .field("strategies", &self.strategies.len())
            .finish()
    }
}

/// Check `input` against the descriptor's closed field table.
///
/// Declared fields must be present in the declared half with the declared
/// kind; fields the descriptor does not declare are rejected outright.
fn validate_fields(descriptor: &CircuitDescriptor, input: &ProofInput) -> Result<(), WitnessError> {
    for spec in &descriptor.fields {
        let half = match spec.visibility {
            FieldVisibility::Private => &input.private,
            FieldVisibility::Public => &input.public,
        };
        let value = half
            .get(&spec.name)
            .ok_or_else(|| WitnessError::MissingField {
                field: spec.name.clone(),
            })?;
        if !spec.kind.matches(value) {
            return Err(WitnessError::WrongKind {
                field: spec.name.clone(),
                expected: spec.kind.as_str().to_string(),
                actual: value.kind_name().to_string(),
            });
        }
    }
    for name in input.private.keys() {
        match descriptor.field(name) {
            Some(spec) if spec.visibility == FieldVisibility::Private => {}
            _ => {
                return Err(WitnessError::UnexpectedField {
                    field: name.clone(),
                })
            }
        }
    }
    for name in input.public.keys() {
        match descriptor.field(name) {
            Some(spec) if spec.visibility == FieldVisibility::Public => {}
            _ => {
                return Err(WitnessError::UnexpectedField {
                    field: name.clone(),
                })
            }
        }
    }
    Ok(())
}

/// Parse a declared-integer field into `i64`.
///
/// Helper for strategies; field presence and kind were already checked by the
/// registry, so a failure here means the strategy was called directly with an
/// unvalidated input.
pub(crate) fn integer_field(input: &ProofInput, field: &str) -> Result<i64, WitnessError> {
    let value = input.get(field).ok_or_else(|| WitnessError::MissingField {
        field: field.to_string(),
    })?;
    value.as_integer().ok_or_else(|| WitnessError::WrongKind {
        field: field.to_string(),
        expected: "integer".to_string(),
        actual: value.kind_name().to_string(),
    })
}

/// Parse a declared-text field into `&str`.
pub(crate) fn text_field<'a>(input: &'a ProofInput, field: &str) -> Result<&'a str, WitnessError> {
    let value = input.get(field).ok_or_else(|| WitnessError::MissingField {
        field: field.to_string(),
    })?;
    value.as_str().ok_or_else(|| WitnessError::WrongKind {
        field: field.to_string(),
        expected: "string".to_string(),
        actual: value.kind_name().to_string(),
    })
}

/// Parse a declared-list field into its elements.
pub(crate) fn list_field<'a>(
    input: &'a ProofInput,
    field: &str,
) -> Result<&'a [InputValue], WitnessError> {
    let value = input.get(field).ok_or_else(|| WitnessError::MissingField {
        field: field.to_string(),
    })?;
    value.as_list().ok_or_else(|| WitnessError::WrongKind {
        field: field.to_string(),
        expected: "list".to_string(),
        actual: value.kind_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        ArtifactLocations, FieldKind, FieldSpec, PredicatePolicy,
    };
    use veil_core::CredentialRef;

    struct EchoStrategy;

    impl WitnessStrategy for EchoStrategy {
        fn prepare(
            &self,
            descriptor: &CircuitDescriptor,
            input: &ProofInput,
        ) -> Result<Witness, WitnessError> {
            let secret = text_field(input, "secret")?;
            let threshold = integer_field(input, "threshold")?;
            let mut witness = Witness::new(descriptor.id.clone());
            witness.push_private("secret", secret);
            witness.push_public("threshold", threshold.to_string());
            Ok(witness)
        }
    }

    fn descriptor() -> CircuitDescriptor {
        let id = CircuitId::new("echo_circuit").unwrap();
        CircuitDescriptor {
            id: id.clone(),
            proof_type: "echo_circuit".to_string(),
            description: "test fixture".to_string(),
            constraint_count: 4,
            fields: vec![
                FieldSpec::private("secret", FieldKind::Text),
                FieldSpec::public("threshold", FieldKind::Integer),
            ],
            public_signals: vec!["threshold".to_string()],
            predicate_policy: PredicatePolicy::RevealOutcome,
            artifacts: ArtifactLocations::conventional("circuits", &id),
        }
    }

    fn registry() -> PreparerRegistry {
        let mut registry = PreparerRegistry::new();
        registry.register(
            CircuitId::new("echo_circuit").unwrap(),
            Arc::new(EchoStrategy),
        );
        registry
    }

    fn valid_input() -> ProofInput {
        ProofInput::new(CredentialRef::new("did:veil:holder-1").unwrap())
            .with_private("secret", "hunter2")
            .with_public("threshold", 21)
    }

    // -- Dispatch --

    #[test]
    fn prepares_valid_input_through_registered_strategy() {
        let witness = registry().prepare(&descriptor(), &valid_input()).unwrap();
        assert_eq!(witness.value_of("secret"), Some("hunter2"));
        assert_eq!(witness.public_signals(), vec!["21".to_string()]);
    }

    #[test]
    fn missing_strategy_is_reported_with_circuit_id() {
        let err = PreparerRegistry::new()
            .prepare(&descriptor(), &valid_input())
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::StrategyMissing { ref circuit_id } if circuit_id == "echo_circuit"
        ));
    }

    #[test]
    fn registering_twice_replaces_the_strategy() {
        struct ConstantStrategy;
        impl WitnessStrategy for ConstantStrategy {
            fn prepare(
                &self,
                descriptor: &CircuitDescriptor,
                _input: &ProofInput,
            ) -> Result<Witness, WitnessError> {
                let mut witness = Witness::new(descriptor.id.clone());
                witness.push_public("threshold", "0");
                Ok(witness)
            }
        }

        let mut registry = registry();
        registry.register(
            CircuitId::new("echo_circuit").unwrap(),
            Arc::new(ConstantStrategy),
        );
        assert_eq!(registry.len(), 1);
        let witness = registry.prepare(&descriptor(), &valid_input()).unwrap();
        assert_eq!(witness.public_signals(), vec!["0".to_string()]);
    }

    // -- Field validation --

    #[test]
    fn missing_field_error_names_the_field() {
        let input = ProofInput::new(CredentialRef::new("did:veil:holder-1").unwrap())
            .with_public("threshold", 21);
        let err = registry().prepare(&descriptor(), &input).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required input field \"secret\""
        );
    }

    #[test]
    fn wrong_kind_error_names_field_and_kinds() {
        let input = ProofInput::new(CredentialRef::new("did:veil:holder-1").unwrap())
            .with_private("secret", "hunter2")
            .with_public("threshold", "not a number");
        let err = registry().prepare(&descriptor(), &input).unwrap_err();
        assert!(matches!(
            err,
            WitnessError::WrongKind { ref field, .. } if field == "threshold"
        ));
    }

    #[test]
    fn undeclared_field_is_rejected() {
        let input = valid_input().with_public("extra", 1);
        let err = registry().prepare(&descriptor(), &input).unwrap_err();
        assert!(matches!(
            err,
            WitnessError::UnexpectedField { ref field } if field == "extra"
        ));
    }

    #[test]
    fn private_field_supplied_publicly_is_rejected() {
        let input = ProofInput::new(CredentialRef::new("did:veil:holder-1").unwrap())
            .with_public("secret", "hunter2")
            .with_public("threshold", 21);
        let err = registry().prepare(&descriptor(), &input).unwrap_err();
        assert!(matches!(err, WitnessError::MissingField { ref field } if field == "secret"));
    }

    #[test]
    fn validation_runs_before_the_strategy() {
        struct PanicStrategy;
        impl WitnessStrategy for PanicStrategy {
            fn prepare(
                &self,
                _descriptor: &CircuitDescriptor,
                _input: &ProofInput,
            ) -> Result<Witness, WitnessError> {
                panic!("strategy must not run on invalid input");
            }
        }

        let mut registry = PreparerRegistry::new();
        registry.register(
            CircuitId::new("echo_circuit").unwrap(),
            Arc::new(PanicStrategy),
        );
        let input = ProofInput::new(CredentialRef::new("did:veil:holder-1").unwrap());
        let err = registry.prepare(&descriptor(), &input).unwrap_err();
        assert!(matches!(err, WitnessError::MissingField { .. }));
    }
}
