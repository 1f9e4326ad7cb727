//! Trace records emitted by the accumulator operations.
//!
//! Every trace carries the prior and posterior sub-tree roots, the affected
//! leaf pre-images with their inclusion proofs, and the `next_free_node`
//! counter at emission time: enough for a stateless verifier to check the
//! prior root against its cache, recompute the posterior root, and advance
//! its own counter. Traces own their proof paths and reference no live state.
//!
//! Where an operation rewires two leaves (insertion, deletion), the second
//! proof is taken against the intermediate tree, i.e. after the first leaf
//! was rewritten; the verifier replays the writes in the same order.

use serde::{Deserialize, Serialize};

use crate::smt::{MerkleProof, SmtConfig};
use crate::Bytes32;

/// One occupied leaf of the accumulator.
///
/// The live leaves form a singly-linked list sorted by key: `next_key` is the
/// smallest live key strictly greater than `key`, and `next_index` is the
/// tree position of that successor. Hashed as
/// `H(H(key) || H(value) || next_key || next_index)`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Leaf {
    pub key: Bytes32,
    pub value: Bytes32,
    pub next_key: Bytes32,
    pub next_index: u64,
}

impl Leaf {
    /// Head sentinel: the minimum of the key order, stored at index 0.
    pub fn head() -> Leaf {
        Leaf { key: Bytes32::ZERO, value: Bytes32::ZERO, next_key: Bytes32::MAX, next_index: 1 }
    }

    /// Tail sentinel: the maximum of the key order, stored at index 1. Its
    /// successor link points to itself.
    pub fn tail() -> Leaf {
        Leaf { key: Bytes32::MAX, value: Bytes32::ZERO, next_key: Bytes32::MAX, next_index: 1 }
    }

    /// Leaf hash under the tree's hash function.
    pub fn hash(&self, config: &SmtConfig) -> Bytes32 {
        let mut pre = [0u8; 128];
        pre[..32].copy_from_slice(&config.hash.hash_bytes(&self.key.0).0);
        pre[32..64].copy_from_slice(&config.hash.hash_bytes(&self.value.0).0);
        pre[64..96].copy_from_slice(&self.next_key.0);
        pre[120..128].copy_from_slice(&self.next_index.to_be_bytes());
        config.hash.hash_bytes(&pre)
    }
}

/// A leaf pre-image at a known position, with its inclusion proof.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ProvenLeaf {
    pub index: u64,
    pub leaf: Leaf,
    pub proof: MerkleProof,
}

/// Witness that a key is absent: the sandwich `(prev, next)` with
/// `prev.key < key < next.key`, both proven against the unchanged root.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ReadZeroTrace {
    pub location: String,
    pub key: Bytes32,
    pub prev: ProvenLeaf,
    pub next: ProvenLeaf,
    pub root: Bytes32,
    pub next_free_node: u64,
}

/// Witness that a key is present, with its value.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ReadNonZeroTrace {
    pub location: String,
    pub key: Bytes32,
    pub value: Bytes32,
    pub leaf: ProvenLeaf,
    pub root: Bytes32,
    pub next_free_node: u64,
}

/// Record of an insertion: the sandwich pre-images against the prior root,
/// plus the proof of the (empty) slot the new leaf lands in, taken after the
/// predecessor was rewired.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct InsertionTrace {
    pub location: String,
    pub key: Bytes32,
    pub value: Bytes32,
    pub prev: ProvenLeaf,
    pub next: ProvenLeaf,
    pub new_slot_proof: MerkleProof,
    pub prior_root: Bytes32,
    pub posterior_root: Bytes32,
    /// Counter value at emission; the new leaf's index.
    pub next_free_node: u64,
}

/// Record of a value update: the leaf pre-image against the prior root.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct UpdateTrace {
    pub location: String,
    pub key: Bytes32,
    pub old_value: Bytes32,
    pub new_value: Bytes32,
    pub leaf: ProvenLeaf,
    pub prior_root: Bytes32,
    pub posterior_root: Bytes32,
    pub next_free_node: u64,
}

/// Record of a deletion: the predecessor pre-image against the prior root,
/// and the deleted leaf proven against the intermediate tree; the slot
/// becomes the empty tombstone.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DeletionTrace {
    pub location: String,
    pub key: Bytes32,
    pub prev: ProvenLeaf,
    pub deleted: ProvenLeaf,
    pub prior_root: Bytes32,
    pub posterior_root: Bytes32,
    pub next_free_node: u64,
}
