//! # Membership Proof Circuit
//!
//! Proves a credential holder belongs to a group without revealing which
//! member they are. The group is a SHA-256 Merkle tree over member leaf
//! hashes; the holder supplies their secret and an inclusion path, and only
//! the tree root becomes public.
//!
//! Public inputs:
//! - `groupRoot`: the Merkle root of the group, 64-char hex.
//!
//! Witness (private):
//! - `memberSecret`: the holder's membership secret. The leaf is its
//!   SHA-256 hash.
//! - `pathElements`: sibling node hashes from leaf to root, 64-char hex.
//! - `pathIndices`: one `0`/`1` per level; `0` means the current node is
//!   the left child at that level, `1` the right.
//!
//! Public signals, in order:
//! - `groupRoot`: echoed in canonical lowercase hex.
//!
//! This circuit fails closed: when the supplied path does not resolve to
//! the group root, witness preparation is rejected and no proof exists
//! either way. A "valid proof of non-membership" is not a meaningful
//! object.
//!
//! Approximate constraint count: 262144 (one SHA-256 compression per tree
//! level, up to depth 32).

use veil_core::{sha256_raw, ProofInput, WitnessError};
use veil_zkp::Witness;

use crate::descriptor::{
    ArtifactLocations, CircuitDescriptor, FieldKind, FieldSpec, PredicatePolicy,
};
use crate::prepare::{list_field, text_field, WitnessStrategy};

/// Circuit identifier.
pub const CIRCUIT_ID: &str = "membership_proof";

/// Deepest inclusion path the circuit accepts.
pub const MAX_PATH_DEPTH: usize = 32;

/// Descriptor for the membership proof circuit, with artifacts under
/// `artifact_base`.
pub fn descriptor(artifact_base: &str) -> CircuitDescriptor {
    let id = crate::builtin_id(CIRCUIT_ID);
    CircuitDescriptor {
        proof_type: CIRCUIT_ID.to_string(),
        description: "Proves membership in a group without revealing which member".to_string(),
        constraint_count: 262_144,
        fields: vec![
            FieldSpec::private("memberSecret", FieldKind::Text),
            FieldSpec::private("pathElements", FieldKind::List),
            FieldSpec::private("pathIndices", FieldKind::List),
            FieldSpec::public("groupRoot", FieldKind::Text),
        ],
        public_signals: vec!["groupRoot".to_string()],
        predicate_policy: PredicatePolicy::FailClosed,
        artifacts: ArtifactLocations::conventional(artifact_base, &id),
        id,
    }
}

/// SHA-256 leaf hash of a member secret, lowercase hex.
pub fn leaf_hash(secret: &str) -> String {
    sha256_raw(secret.as_bytes()).to_hex()
}

/// SHA-256 parent hash of two sibling nodes given as 64-char hex strings.
///
/// Returns `None` when either side is not a well-formed node hash. Group
/// maintainers use this to build the tree the circuit verifies against.
pub fn parent_hash(left: &str, right: &str) -> Option<String> {
    let left = decode_hex32(left)?;
    let right = decode_hex32(right)?;
    Some(encode_hex32(&parent(&left, &right)))
}

/// Witness strategy for the membership proof circuit.
#[derive(Debug, Default, Clone, Copy)]
pub struct MembershipProof;

impl WitnessStrategy for MembershipProof {
    fn prepare(
        &self,
        descriptor: &CircuitDescriptor,
        input: &ProofInput,
    ) -> Result<Witness, WitnessError> {
        let secret = text_field(input, "memberSecret")?;
        if secret.is_empty() {
            return Err(WitnessError::InvalidValue {
                field: "memberSecret".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let elements = list_field(input, "pathElements")?;
        let indices = list_field(input, "pathIndices")?;
        let root = text_field(input, "groupRoot")?;

        if elements.len() != indices.len() {
            return Err(WitnessError::InvalidValue {
                field: "pathIndices".to_string(),
                reason: format!(
                    "length {} does not match pathElements length {}",
                    indices.len(),
                    elements.len()
                ),
            });
        }
        if elements.len() > MAX_PATH_DEPTH {
            return Err(WitnessError::InvalidValue {
                field: "pathElements".to_string(),
                reason: format!("path depth {} exceeds maximum {MAX_PATH_DEPTH}", elements.len()),
            });
        }
        let root_bytes = decode_hex32(root).ok_or_else(|| WitnessError::InvalidValue {
            field: "groupRoot".to_string(),
            reason: "must be a 64-character hex digest".to_string(),
        })?;

        let mut node = sha256_raw(secret.as_bytes()).bytes;
        let mut path = Vec::with_capacity(elements.len());
        for (position, (element, index)) in elements.iter().zip(indices.iter()).enumerate() {
            let sibling_hex =
                element
                    .as_str()
                    .ok_or_else(|| WitnessError::InvalidValue {
                        field: "pathElements".to_string(),
                        reason: format!("entry {position} must be a hex string"),
                    })?;
            let sibling =
                decode_hex32(sibling_hex).ok_or_else(|| WitnessError::InvalidValue {
                    field: "pathElements".to_string(),
                    reason: format!("entry {position} must be a 64-character hex digest"),
                })?;
            let side = index
                .as_integer()
                .filter(|side| *side == 0 || *side == 1)
                .ok_or_else(|| WitnessError::InvalidValue {
                    field: "pathIndices".to_string(),
                    reason: format!("entry {position} must be 0 or 1"),
                })?;
            node = if side == 0 {
                parent(&node, &sibling)
            } else {
                parent(&sibling, &node)
            };
            path.push((sibling_hex.to_string(), side));
        }

        if node != root_bytes {
            return Err(WitnessError::InvalidValue {
                field: "groupRoot".to_string(),
                reason: "membership path does not resolve to the group root".to_string(),
            });
        }

        let mut witness = Witness::new(descriptor.id.clone());
        witness.push_private("memberSecret", secret);
        for (level, (sibling, side)) in path.iter().enumerate() {
            witness.push_private(format!("pathElements[{level}]"), sibling.clone());
            witness.push_private(format!("pathIndices[{level}]"), side.to_string());
        }
        witness.push_public("groupRoot", encode_hex32(&root_bytes));
        Ok(witness)
    }
}

fn parent(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    sha256_raw(&buf).bytes
}

fn decode_hex32(hex: &str) -> Option<[u8; 32]> {
    if hex.len() != 64 {
        return None;
    }
    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(bytes)
}

fn encode_hex32(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::PreparerRegistry;
    use std::sync::Arc;
    use veil_core::{CredentialRef, InputValue};

    fn registry() -> PreparerRegistry {
        let mut registry = PreparerRegistry::new();
        registry.register(crate::builtin_id(CIRCUIT_ID), Arc::new(MembershipProof));
        registry
    }

    /// Four-member tree:
    ///
    /// ```text
    ///        root
    ///       /    \
    ///     n01    n23
    ///    /  \   /  \
    ///   l0  l1 l2  l3
    /// ```
    struct FourMemberTree {
        leaves: Vec<String>,
        n01: String,
        n23: String,
        root: String,
    }

    fn tree() -> FourMemberTree {
        let secrets = ["alice-pass", "bob-pass", "carol-pass", "dave-pass"];
        let leaves: Vec<String> = secrets.iter().map(|s| leaf_hash(s)).collect();
        let n01 = parent_hash(&leaves[0], &leaves[1]).unwrap();
        let n23 = parent_hash(&leaves[2], &leaves[3]).unwrap();
        let root = parent_hash(&n01, &n23).unwrap();
        FourMemberTree {
            leaves,
            n01,
            n23,
            root,
        }
    }

    /// Inclusion input for carol (position 2: left child of n23, which is
    /// the right child of the root).
    fn carol_input(tree: &FourMemberTree) -> ProofInput {
        ProofInput::new(CredentialRef::new("did:veil:carol").unwrap())
            .with_private("memberSecret", "carol-pass")
            .with_private(
                "pathElements",
                InputValue::List(vec![
                    tree.leaves[3].as_str().into(),
                    tree.n01.as_str().into(),
                ]),
            )
            .with_private(
                "pathIndices",
                InputValue::List(vec![0.into(), 1.into()]),
            )
            .with_public("groupRoot", tree.root.as_str())
    }

    // -- Witness computation --

    #[test]
    fn valid_member_path_prepares() {
        let tree = tree();
        let witness = registry()
            .prepare(&descriptor("circuits"), &carol_input(&tree))
            .unwrap();
        assert_eq!(witness.public_signals(), vec![tree.root.clone()]);
        assert_eq!(witness.value_of("memberSecret"), Some("carol-pass"));
        assert_eq!(witness.value_of("pathIndices[1]"), Some("1"));
    }

    #[test]
    fn member_secret_never_becomes_public() {
        let tree = tree();
        let witness = registry()
            .prepare(&descriptor("circuits"), &carol_input(&tree))
            .unwrap();
        let publics: Vec<&str> = witness
            .assignments()
            .iter()
            .filter(|a| a.public)
            .map(|a| a.signal.as_str())
            .collect();
        assert_eq!(publics, vec!["groupRoot"]);
    }

    #[test]
    fn single_member_group_proves_with_empty_path() {
        let root = leaf_hash("only-member");
        let input = ProofInput::new(CredentialRef::new("did:veil:solo").unwrap())
            .with_private("memberSecret", "only-member")
            .with_private("pathElements", InputValue::List(vec![]))
            .with_private("pathIndices", InputValue::List(vec![]))
            .with_public("groupRoot", root.as_str());
        let witness = registry().prepare(&descriptor("circuits"), &input).unwrap();
        assert_eq!(witness.public_signals(), vec![root]);
    }

    #[test]
    fn uppercase_root_is_normalized_in_signals() {
        let root = leaf_hash("only-member");
        let input = ProofInput::new(CredentialRef::new("did:veil:solo").unwrap())
            .with_private("memberSecret", "only-member")
            .with_private("pathElements", InputValue::List(vec![]))
            .with_private("pathIndices", InputValue::List(vec![]))
            .with_public("groupRoot", root.to_uppercase());
        let witness = registry().prepare(&descriptor("circuits"), &input).unwrap();
        assert_eq!(witness.public_signals(), vec![root]);
    }

    // -- Fail-closed behavior --

    #[test]
    fn non_member_fails_preparation() {
        let tree = tree();
        let input = ProofInput::new(CredentialRef::new("did:veil:mallory").unwrap())
            .with_private("memberSecret", "mallory-pass")
            .with_private(
                "pathElements",
                InputValue::List(vec![
                    tree.leaves[3].as_str().into(),
                    tree.n01.as_str().into(),
                ]),
            )
            .with_private("pathIndices", InputValue::List(vec![0.into(), 1.into()]))
            .with_public("groupRoot", tree.root.as_str());
        let err = registry()
            .prepare(&descriptor("circuits"), &input)
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, ref reason }
                if field == "groupRoot" && reason.contains("does not resolve")
        ));
    }

    #[test]
    fn tampered_sibling_fails_preparation() {
        let tree = tree();
        let input = ProofInput::new(CredentialRef::new("did:veil:carol").unwrap())
            .with_private("memberSecret", "carol-pass")
            .with_private(
                "pathElements",
                InputValue::List(vec![
                    tree.n23.as_str().into(),
                    tree.n01.as_str().into(),
                ]),
            )
            .with_private("pathIndices", InputValue::List(vec![0.into(), 1.into()]))
            .with_public("groupRoot", tree.root.as_str());
        let err = registry()
            .prepare(&descriptor("circuits"), &input)
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, .. } if field == "groupRoot"
        ));
    }

    // -- Validation --

    #[test]
    fn path_length_mismatch_is_rejected() {
        let tree = tree();
        let input = ProofInput::new(CredentialRef::new("did:veil:carol").unwrap())
            .with_private("memberSecret", "carol-pass")
            .with_private(
                "pathElements",
                InputValue::List(vec![tree.leaves[3].as_str().into()]),
            )
            .with_private("pathIndices", InputValue::List(vec![0.into(), 1.into()]))
            .with_public("groupRoot", tree.root.as_str());
        let err = registry()
            .prepare(&descriptor("circuits"), &input)
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, .. } if field == "pathIndices"
        ));
    }

    #[test]
    fn malformed_sibling_hex_names_the_entry() {
        let tree = tree();
        let input = ProofInput::new(CredentialRef::new("did:veil:carol").unwrap())
            .with_private("memberSecret", "carol-pass")
            .with_private(
                "pathElements",
                InputValue::List(vec!["not-hex".into(), tree.n01.as_str().into()]),
            )
            .with_private("pathIndices", InputValue::List(vec![0.into(), 1.into()]))
            .with_public("groupRoot", tree.root.as_str());
        let err = registry()
            .prepare(&descriptor("circuits"), &input)
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, ref reason }
                if field == "pathElements" && reason.contains("entry 0")
        ));
    }

    #[test]
    fn path_index_other_than_zero_or_one_is_rejected() {
        let tree = tree();
        let input = ProofInput::new(CredentialRef::new("did:veil:carol").unwrap())
            .with_private("memberSecret", "carol-pass")
            .with_private(
                "pathElements",
                InputValue::List(vec![tree.leaves[3].as_str().into()]),
            )
            .with_private("pathIndices", InputValue::List(vec![2.into()]))
            .with_public("groupRoot", tree.root.as_str());
        let err = registry()
            .prepare(&descriptor("circuits"), &input)
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, .. } if field == "pathIndices"
        ));
    }

    #[test]
    fn overdeep_path_is_rejected() {
        let sibling = leaf_hash("sibling");
        let elements: Vec<InputValue> = (0..MAX_PATH_DEPTH + 1)
            .map(|_| sibling.as_str().into())
            .collect();
        let indices: Vec<InputValue> = (0..MAX_PATH_DEPTH + 1).map(|_| 0.into()).collect();
        let input = ProofInput::new(CredentialRef::new("did:veil:deep").unwrap())
            .with_private("memberSecret", "deep-pass")
            .with_private("pathElements", InputValue::List(elements))
            .with_private("pathIndices", InputValue::List(indices))
            .with_public("groupRoot", leaf_hash("whatever"));
        let err = registry()
            .prepare(&descriptor("circuits"), &input)
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, .. } if field == "pathElements"
        ));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let input = ProofInput::new(CredentialRef::new("did:veil:empty").unwrap())
            .with_private("memberSecret", "")
            .with_private("pathElements", InputValue::List(vec![]))
            .with_private("pathIndices", InputValue::List(vec![]))
            .with_public("groupRoot", leaf_hash(""));
        let err = registry()
            .prepare(&descriptor("circuits"), &input)
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::InvalidValue { ref field, .. } if field == "memberSecret"
        ));
    }

    // -- Helpers --

    #[test]
    fn parent_hash_rejects_malformed_nodes() {
        assert!(parent_hash("abc", &leaf_hash("x")).is_none());
        assert!(parent_hash(&leaf_hash("x"), "").is_none());
        assert!(parent_hash(&leaf_hash("x"), &leaf_hash("y")).is_some());
    }

    #[test]
    fn parent_hash_is_order_sensitive() {
        let left = leaf_hash("a");
        let right = leaf_hash("b");
        assert_ne!(
            parent_hash(&left, &right).unwrap(),
            parent_hash(&right, &left).unwrap()
        );
    }
}
