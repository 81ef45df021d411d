//! # veil-circuits — Circuit Catalog and Witness Strategies
//!
//! The circuit catalog for the Veil proof engine. This crate owns what a
//! circuit *is* from the engine's point of view: its typed descriptor, its
//! witness preparation strategy, and the built-in credential circuits.
//!
//! ## Built-in Circuits
//!
//! - [`age::AgeVerification`]: minimum-age proof over a birth year.
//! - [`income::IncomeThreshold`]: income range proof over an attested figure.
//! - [`membership::MembershipProof`]: Merkle inclusion proof of group
//!   membership.
//! - [`disclosure::SelectiveDisclosure`]: per-proof attribute disclosure
//!   against a committed credential.
//!
//! ## Design
//!
//! Descriptors are data, strategies are behavior, and both are resolved per
//! circuit id from registries rather than matched in one central switch.
//! Adding a circuit means registering a descriptor and a strategy; no
//! engine code changes.

#![deny(missing_docs)]

pub mod age;
pub mod descriptor;
pub mod disclosure;
pub mod income;
pub mod membership;
pub mod prepare;

pub use descriptor::{
    ArtifactLocation, ArtifactLocations, CircuitDescriptor, FieldKind, FieldSpec,
    FieldVisibility, PredicatePolicy,
};
pub use prepare::{PreparerRegistry, WitnessStrategy};

use std::sync::Arc;

use veil_core::CircuitId;

/// One built-in circuit: its descriptor and its witness strategy.
pub struct BuiltinCircuit {
    /// The circuit's static descriptor.
    pub descriptor: CircuitDescriptor,
    /// The strategy that turns request input into a witness.
    pub strategy: Arc<dyn WitnessStrategy>,
}

/// All built-in circuits, with artifacts laid out under `artifact_base`.
pub fn builtin_circuits(artifact_base: &str) -> Vec<BuiltinCircuit> {
    vec![
        BuiltinCircuit {
            descriptor: age::descriptor(artifact_base),
            strategy: Arc::new(age::AgeVerification),
        },
        BuiltinCircuit {
            descriptor: income::descriptor(artifact_base),
            strategy: Arc::new(income::IncomeThreshold),
        },
        BuiltinCircuit {
            descriptor: membership::descriptor(artifact_base),
            strategy: Arc::new(membership::MembershipProof),
        },
        BuiltinCircuit {
            descriptor: disclosure::descriptor(artifact_base),
            strategy: Arc::new(disclosure::SelectiveDisclosure),
        },
    ]
}

/// Parse a compile-time circuit id constant.
pub(crate) fn builtin_id(raw: &str) -> CircuitId {
    CircuitId::new(raw).expect("builtin circuit id is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_the_four_builtin_circuits() {
        let ids: Vec<String> = builtin_circuits("circuits")
            .iter()
            .map(|b| b.descriptor.id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                "age_verification",
                "income_threshold",
                "membership_proof",
                "selective_disclosure",
            ]
        );
    }

    #[test]
    fn every_builtin_strategy_is_dispatchable() {
        let mut registry = PreparerRegistry::new();
        for builtin in builtin_circuits("circuits") {
            registry.register(builtin.descriptor.id.clone(), builtin.strategy);
        }
        for builtin in builtin_circuits("circuits") {
            assert!(registry.contains(&builtin.descriptor.id));
        }
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn proof_types_mirror_circuit_ids() {
        for builtin in builtin_circuits("circuits") {
            assert_eq!(builtin.descriptor.proof_type, builtin.descriptor.id.as_str());
        }
    }

    #[test]
    fn every_builtin_names_its_artifacts_under_the_base() {
        for builtin in builtin_circuits("artifacts/v1") {
            let id = builtin.descriptor.id.as_str();
            let program = &builtin.descriptor.artifacts.program.uri;
            assert!(program.starts_with("artifacts/v1/"));
            assert!(program.contains(id));
        }
    }
}
