//! # Circuit Descriptors
//!
//! A [`CircuitDescriptor`] is the engine's complete, static picture of one
//! circuit: which input fields it accepts (name, kind, visibility), which
//! public signals its proofs expose and in what order, where its artifacts
//! live, and how it treats an unsatisfied predicate.
//!
//! Descriptors are constructed once, at registration time, and shared
//! immutably afterward. Everything the engine validates against at request
//! time (field kinds, signal counts, artifact digests) comes from the
//! descriptor rather than from the request, so a malformed request can never
//! widen what a circuit accepts.
//!
//! ## Security Invariant
//!
//! The field table is closed: a request field that no [`FieldSpec`] declares
//! is rejected before any strategy runs. Visibility is part of the contract,
//! not a hint. A field declared [`FieldVisibility::Private`] is never copied
//! into public signals by any built-in strategy, and the registry refuses a
//! private value supplied through the public half of the input.

use serde::{Deserialize, Serialize};

use veil_core::{ArtifactKind, CircuitId, ContentDigest, InputValue};

/// Value kind a circuit input field must carry.
///
/// Kinds are deliberately coarse. They gate the shape of the value before a
/// strategy sees it; range and semantic checks belong to the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A boolean flag.
    Bool,
    /// An integer that fits `i64`. Decimal strings are accepted and parsed.
    Integer,
    /// An arbitrary UTF-8 string.
    Text,
    /// A homogeneous list of values.
    List,
}

impl FieldKind {
    /// Human-readable kind name, matching [`InputValue::kind_name`] output.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Integer => "integer",
            FieldKind::Text => "string",
            FieldKind::List => "list",
        }
    }

    /// Whether `value` satisfies this kind.
    pub fn matches(&self, value: &InputValue) -> bool {
        match self {
            FieldKind::Bool => matches!(value, InputValue::Bool(_)),
            FieldKind::Integer => value.as_integer().is_some(),
            FieldKind::Text => matches!(value, InputValue::Text(_)),
            FieldKind::List => matches!(value, InputValue::List(_)),
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of the proof input a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldVisibility {
    /// Supplied in the private half; never leaves the prover.
    Private,
    /// Supplied in the public half; visible to the verifier.
    Public,
}

/// Declaration of one input field a circuit accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as it appears in the request input maps.
    pub name: String,
    /// Required value kind.
    pub kind: FieldKind,
    /// Which input half the field must be supplied in.
    pub visibility: FieldVisibility,
}

impl FieldSpec {
    /// A private field of the given kind.
    pub fn private(name: &str, kind: FieldKind) -> Self {
        FieldSpec {
            name: name.to_string(),
            kind,
            visibility: FieldVisibility::Private,
        }
    }

    /// A public field of the given kind.
    pub fn public(name: &str, kind: FieldKind) -> Self {
        FieldSpec {
            name: name.to_string(),
            kind,
            visibility: FieldVisibility::Public,
        }
    }
}

/// How a circuit treats inputs that do not satisfy its predicate.
///
/// Both stances are legitimate; which one applies is a property of the
/// circuit, fixed in its descriptor, never chosen per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicatePolicy {
    /// Witness preparation always succeeds and the predicate outcome rides
    /// along as a 0/1 public signal. Threshold circuits use this: a proof
    /// that the holder is *not* of age is still a valid, useful proof.
    RevealOutcome,
    /// Inputs that do not satisfy the predicate fail witness preparation,
    /// so no proof exists either way. Membership-style circuits use this:
    /// a "valid proof of non-membership" is not a meaningful object.
    FailClosed,
}

/// Where one artifact lives and, optionally, what it must hash to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    /// Resolver-interpreted URI (`https://`, `file://`, or a bare path).
    pub uri: String,
    /// Expected SHA-256 digest of the raw bytes. When present, the registry
    /// rejects fetched bytes that do not match.
    pub digest: Option<ContentDigest>,
}

impl ArtifactLocation {
    /// A location with no pinned digest.
    pub fn unpinned(uri: impl Into<String>) -> Self {
        ArtifactLocation {
            uri: uri.into(),
            digest: None,
        }
    }

    /// A location whose fetched bytes must hash to `digest`.
    pub fn pinned(uri: impl Into<String>, digest: ContentDigest) -> Self {
        ArtifactLocation {
            uri: uri.into(),
            digest: Some(digest),
        }
    }
}

/// Locations of the three artifacts every circuit ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocations {
    /// The compiled constraint program.
    pub program: ArtifactLocation,
    /// The proving key.
    pub proving_key: ArtifactLocation,
    /// The verification key.
    pub verification_key: ArtifactLocation,
}

impl ArtifactLocations {
    /// The conventional on-disk layout: `<base>/<circuit>/program.wasm`,
    /// `proving.zkey`, and `verification_key.json`.
    pub fn conventional(base: &str, circuit_id: &CircuitId) -> Self {
        let root = format!("{}/{}", base.trim_end_matches('/'), circuit_id);
        ArtifactLocations {
            program: ArtifactLocation::unpinned(format!("{root}/program.wasm")),
            proving_key: ArtifactLocation::unpinned(format!("{root}/proving.zkey")),
            verification_key: ArtifactLocation::unpinned(format!("{root}/verification_key.json")),
        }
    }

    /// The location for one artifact kind.
    pub fn location(&self, kind: ArtifactKind) -> &ArtifactLocation {
        match kind {
            ArtifactKind::Program => &self.program,
            ArtifactKind::ProvingKey => &self.proving_key,
            ArtifactKind::VerificationKey => &self.verification_key,
        }
    }
}

/// Complete static description of one registered circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitDescriptor {
    /// Stable circuit identifier.
    pub id: CircuitId,
    /// Proof type label recorded in proof metadata (for the built-in
    /// circuits this equals the circuit id).
    pub proof_type: String,
    /// One-line human description.
    pub description: String,
    /// Approximate constraint count, recorded in proof metadata.
    pub constraint_count: u64,
    /// Input fields the circuit accepts. The set is closed: undeclared
    /// fields are rejected.
    pub fields: Vec<FieldSpec>,
    /// Names of the public signals a proof exposes, in signal order. The
    /// verifier rejects proofs whose signal count disagrees with this list.
    pub public_signals: Vec<String>,
    /// How the circuit treats an unsatisfied predicate.
    pub predicate_policy: PredicatePolicy,
    /// Where the circuit's artifacts live.
    pub artifacts: ArtifactLocations,
}

impl CircuitDescriptor {
    /// The declared spec for `field`, if any.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of public signals proofs of this circuit expose.
    pub fn signal_count(&self) -> usize {
        self.public_signals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_descriptor() -> CircuitDescriptor {
        CircuitDescriptor {
            id: CircuitId::new("sample_circuit").unwrap(),
            proof_type: "sample_circuit".to_string(),
            description: "test fixture".to_string(),
            constraint_count: 16,
            fields: vec![
                FieldSpec::private("secret", FieldKind::Text),
                FieldSpec::public("threshold", FieldKind::Integer),
            ],
            public_signals: vec!["outcome".to_string(), "threshold".to_string()],
            predicate_policy: PredicatePolicy::RevealOutcome,
            artifacts: ArtifactLocations::conventional(
                "circuits",
                &CircuitId::new("sample_circuit").unwrap(),
            ),
        }
    }

    // -- Field kinds --

    #[test]
    fn integer_kind_accepts_integers_and_decimal_strings() {
        assert!(FieldKind::Integer.matches(&InputValue::Integer(1990)));
        assert!(FieldKind::Integer.matches(&InputValue::Text("1990".to_string())));
        assert!(!FieldKind::Integer.matches(&InputValue::Text("next year".to_string())));
        assert!(!FieldKind::Integer.matches(&InputValue::Bool(true)));
    }

    #[test]
    fn bool_kind_rejects_integer_zero_and_one() {
        assert!(FieldKind::Bool.matches(&InputValue::Bool(false)));
        assert!(!FieldKind::Bool.matches(&InputValue::Integer(0)));
        assert!(!FieldKind::Bool.matches(&InputValue::Integer(1)));
    }

    #[test]
    fn list_kind_matches_only_lists() {
        assert!(FieldKind::List.matches(&InputValue::List(vec![])));
        assert!(!FieldKind::List.matches(&InputValue::Text("[]".to_string())));
    }

    #[test]
    fn kind_names_align_with_input_value_kind_names() {
        assert_eq!(FieldKind::Bool.as_str(), InputValue::Bool(true).kind_name());
        assert_eq!(
            FieldKind::Integer.as_str(),
            InputValue::Integer(0).kind_name()
        );
        assert_eq!(
            FieldKind::Text.as_str(),
            InputValue::Text(String::new()).kind_name()
        );
        assert_eq!(FieldKind::List.as_str(), InputValue::List(vec![]).kind_name());
    }

    // -- Artifact locations --

    #[test]
    fn conventional_layout_names_all_three_artifacts() {
        let id = CircuitId::new("age_verification").unwrap();
        let locations = ArtifactLocations::conventional("circuits/", &id);
        assert_eq!(
            locations.program.uri,
            "circuits/age_verification/program.wasm"
        );
        assert_eq!(
            locations.proving_key.uri,
            "circuits/age_verification/proving.zkey"
        );
        assert_eq!(
            locations.verification_key.uri,
            "circuits/age_verification/verification_key.json"
        );
        assert!(locations.program.digest.is_none());
    }

    #[test]
    fn location_lookup_follows_artifact_kind() {
        let id = CircuitId::new("age_verification").unwrap();
        let locations = ArtifactLocations::conventional("circuits", &id);
        assert_eq!(
            locations.location(ArtifactKind::ProvingKey).uri,
            locations.proving_key.uri
        );
    }

    // -- Descriptor lookups --

    #[test]
    fn field_lookup_finds_declared_fields_only() {
        let descriptor = sample_descriptor();
        assert!(descriptor.field("secret").is_some());
        assert!(descriptor.field("threshold").is_some());
        assert!(descriptor.field("undeclared").is_none());
    }

    #[test]
    fn signal_count_matches_signal_list() {
        assert_eq!(sample_descriptor().signal_count(), 2);
    }

    #[test]
    fn descriptor_round_trips_through_json() {
        let descriptor = sample_descriptor();
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: CircuitDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
    }
}
