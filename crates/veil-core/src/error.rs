//! # Error Hierarchy
//!
//! Structured error types for the Veil proof engine, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Every variant carries enough context to act on: the circuit involved, the
//! offending input field, or the artifact role that failed to load. Results
//! cross the generation dedup boundary and are shared between concurrent
//! callers, so the whole hierarchy is `Clone`.

use thiserror::Error;

/// The three artifact roles a circuit needs before it can prove or verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The compiled circuit program (constraint system plus witness generator).
    Program,
    /// The proving key consumed during proof generation.
    ProvingKey,
    /// The verification key consumed during proof verification.
    VerificationKey,
}

impl ArtifactKind {
    /// Returns the artifact role as a lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Program => "program",
            Self::ProvingKey => "proving_key",
            Self::VerificationKey => "verification_key",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for proof engine operations.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// The requested circuit identifier is not registered.
    #[error("circuit not found: {circuit_id}")]
    CircuitNotFound {
        /// The identifier that failed to resolve.
        circuit_id: String,
    },

    /// A circuit artifact could not be fetched or failed its integrity check.
    ///
    /// Retryable from the caller's perspective. The registry has already
    /// applied bounded exponential backoff before surfacing this.
    #[error("failed to load {artifact} for circuit {circuit_id}: {reason}")]
    ArtifactLoad {
        /// The circuit whose artifact failed to load.
        circuit_id: String,
        /// Which of the three artifact roles failed.
        artifact: ArtifactKind,
        /// The underlying transport or integrity failure.
        reason: String,
    },

    /// Witness preparation rejected the supplied inputs.
    ///
    /// Not retryable: the same inputs produce the same rejection. The inner
    /// error names the offending field.
    #[error("witness preparation failed: {0}")]
    WitnessPreparation(#[from] WitnessError),

    /// The proof backend failed during generation. The inputs may be fine;
    /// callers may retry.
    #[error("proof generation failed for circuit {circuit_id}: {reason}")]
    ProofGeneration {
        /// The circuit being proved when the backend failed.
        circuit_id: String,
        /// The backend's failure description.
        reason: String,
    },

    /// The submitted proof or public signals do not match the circuit's
    /// expected shape. Distinct from a well-formed proof that fails
    /// cryptographic verification, which is a normal `is_valid: false`
    /// outcome and never an error.
    #[error("verification rejected: {reason}")]
    Verification {
        /// Why the submission was structurally rejected.
        reason: String,
    },

    /// The caller's deadline elapsed while waiting on generation. The
    /// generation itself keeps running and still populates the cache.
    #[error("proof generation timed out after {elapsed_ms} ms")]
    Timeout {
        /// How long the caller waited before abandoning.
        elapsed_ms: u64,
    },

    /// Canonical serialization failure during fingerprint or commitment
    /// computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Errors raised while validating inputs and preparing a circuit witness.
///
/// Every variant names the offending field or circuit so callers can repair
/// the request without guesswork.
#[derive(Error, Debug, Clone)]
pub enum WitnessError {
    /// A field declared by the circuit was absent from the inputs.
    #[error("missing required input field \"{field}\"")]
    MissingField {
        /// The declared field that was not supplied.
        field: String,
    },

    /// A supplied field does not match the declared kind.
    #[error("input field \"{field}\" has wrong kind: expected {expected}, got {actual}")]
    WrongKind {
        /// The field whose value was rejected.
        field: String,
        /// The kind the circuit declares for this field.
        expected: String,
        /// The kind the caller actually supplied.
        actual: String,
    },

    /// A supplied field is not declared by the circuit at all.
    #[error("unexpected input field \"{field}\" is not declared by the circuit")]
    UnexpectedField {
        /// The undeclared field.
        field: String,
    },

    /// A field had the right kind but an unusable value.
    #[error("invalid value for input field \"{field}\": {reason}")]
    InvalidValue {
        /// The field whose value was rejected.
        field: String,
        /// Why the value is unusable.
        reason: String,
    },

    /// No witness strategy is registered for the circuit.
    #[error("no witness strategy registered for circuit {circuit_id}")]
    StrategyMissing {
        /// The circuit that has a descriptor but no preparation strategy.
        circuit_id: String,
    },
}

/// Validation errors for identifier newtypes.
///
/// Each identifier enforces its format at construction time. These errors
/// carry the invalid input so misconfiguration is diagnosable directly.
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    /// Circuit identifier does not match the required format.
    #[error("invalid circuit ID: \"{0}\" (expected 1-64 chars of [a-z0-9_], starting with a letter)")]
    InvalidCircuitId(String),

    /// Credential reference is empty or too long.
    #[error("invalid credential reference: {0}")]
    InvalidCredentialRef(String),

    /// Digest string could not be parsed as a tagged or bare hex digest.
    #[error("invalid digest string: \"{value}\" ({reason})")]
    InvalidDigest {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors during canonical serialization.
///
/// The upstream `serde_json::Error` is rendered eagerly so the hierarchy
/// stays `Clone` across the generation dedup boundary.
#[derive(Error, Debug, Clone)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations. Circuit
    /// field values must be strings, integers, or booleans.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CanonicalizationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
