//! # Witness Assignments
//!
//! The prepared witness a proof backend consumes: an ordered list of named
//! signal assignments, each rendered as a decimal field string and marked
//! public or private.
//!
//! ## Security Invariant
//!
//! Witnesses carry private credential data. The type deliberately does not
//! implement `Serialize`, and its `Debug` output never prints private
//! values, so a witness cannot leak through logging or accidental
//! persistence. Consumption is by move: a witness claimed from a pool is
//! owned by exactly one generation.

use veil_core::{CircuitId, Timestamp};

/// A single signal assignment inside a witness.
#[derive(Clone, PartialEq, Eq)]
pub struct Assignment {
    /// The circuit signal name (e.g. `age`, `isOldEnough`).
    pub signal: String,
    /// The assigned value as a decimal field string.
    pub value: String,
    /// Whether the signal is exposed as a public signal of the proof.
    pub public: bool,
}

impl std::fmt::Debug for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.public {
            write!(f, "{}={} (public)", self.signal, self.value)
        } else {
            write!(f, "{}=<private>", self.signal)
        }
    }
}

/// A prepared witness for one circuit, ready for the proof backend.
///
/// Assignment order is fixed by the preparation strategy and determines the
/// order of the proof's public signals.
#[derive(Clone)]
pub struct Witness {
    circuit_id: CircuitId,
    assignments: Vec<Assignment>,
    prepared_at: Timestamp,
}

impl Witness {
    /// Create an empty witness for a circuit.
    pub fn new(circuit_id: CircuitId) -> Self {
        Self {
            circuit_id,
            assignments: Vec::new(),
            prepared_at: Timestamp::now(),
        }
    }

    /// Append a private signal assignment.
    pub fn push_private(&mut self, signal: impl Into<String>, value: impl Into<String>) {
        self.assignments.push(Assignment {
            signal: signal.into(),
            value: value.into(),
            public: false,
        });
    }

    /// Append a public signal assignment.
    pub fn push_public(&mut self, signal: impl Into<String>, value: impl Into<String>) {
        self.assignments.push(Assignment {
            signal: signal.into(),
            value: value.into(),
            public: true,
        });
    }

    /// The circuit this witness was prepared for.
    pub fn circuit_id(&self) -> &CircuitId {
        &self.circuit_id
    }

    /// When the witness was prepared, UTC.
    pub fn prepared_at(&self) -> &Timestamp {
        &self.prepared_at
    }

    /// All assignments in preparation order.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Look up an assignment value by signal name.
    pub fn value_of(&self, signal: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.signal == signal)
            .map(|a| a.value.as_str())
    }

    /// The public signal values in assignment order. This is exactly the
    /// `publicSignals` list a backend emits alongside the proof.
    pub fn public_signals(&self) -> Vec<String> {
        self.assignments
            .iter()
            .filter(|a| a.public)
            .map(|a| a.value.clone())
            .collect()
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the witness has no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl std::fmt::Debug for Witness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Witness")
            .field("circuit_id", &self.circuit_id)
            .field("assignments", &self.assignments.len())
            .field("prepared_at", &self.prepared_at)
            .finish()
    }
}
