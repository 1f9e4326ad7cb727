//! Stateless verification of accumulator traces.
//!
//! A [`VerifierState`] holds only the sub-tree root, the `next_free_node`
//! counter and the shared tree configuration; it replays root transitions
//! from traces alone. Each check follows the same schedule: match the prior
//! root against the cache, verify every inclusion proof, check the structural
//! conditions of the operation, recompute the posterior root along the
//! modified paths, and advance the counter. Any failure is fatal for the
//! trace and leaves the cached state untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accumulator::trace::{
    DeletionTrace, InsertionTrace, Leaf, ProvenLeaf, ReadNonZeroTrace, ReadZeroTrace, UpdateTrace,
};
use crate::smt::SmtConfig;
use crate::Bytes32;

/// Cryptographic verification failure of a Merkle trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("prior root {got} does not match the cached root {expected}")]
    RootMismatch { expected: Bytes32, got: Bytes32 },
    #[error("inclusion proof of the {what} leaf does not hash to the expected root")]
    BadInclusionProof { what: &'static str },
    #[error("sandwich violation: {detail}")]
    BadSandwich { detail: String },
    #[error("linked-list violation: {detail}")]
    BadLink { detail: String },
    #[error("posterior root {got} does not match the recomputed root {expected}")]
    PosteriorMismatch { expected: Bytes32, got: Bytes32 },
    #[error("next free node {got} does not match the cached counter {expected}")]
    NextFreeNodeMismatch { expected: u64, got: u64 },
    #[error("trace was emitted for location {got}, expected {expected}")]
    WrongLocation { expected: String, got: String },
    #[error("leaf key does not match the trace key")]
    KeyMismatch,
}

/// The verifier's view of an accumulator: a small, freely cloneable value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifierState {
    pub config: SmtConfig,
    pub location: String,
    pub root: Bytes32,
    pub next_free_node: u64,
}

impl VerifierState {
    fn check_location(&self, got: &str) -> Result<(), TraceError> {
        if got != self.location {
            return Err(TraceError::WrongLocation {
                expected: self.location.clone(),
                got: got.to_owned(),
            });
        }
        Ok(())
    }

    fn check_prior_root(&self, got: Bytes32) -> Result<(), TraceError> {
        if got != self.root {
            return Err(TraceError::RootMismatch { expected: self.root, got });
        }
        Ok(())
    }

    fn check_counter(&self, got: u64) -> Result<(), TraceError> {
        if got != self.next_free_node {
            return Err(TraceError::NextFreeNodeMismatch { expected: self.next_free_node, got });
        }
        Ok(())
    }

    fn check_inclusion(
        &self,
        proven: &ProvenLeaf,
        root: Bytes32,
        what: &'static str,
    ) -> Result<(), TraceError> {
        if proven.proof.leaf_index != proven.index
            || !proven.proof.verify(&self.config, proven.leaf.hash(&self.config), root)
        {
            return Err(TraceError::BadInclusionProof { what });
        }
        Ok(())
    }

    /// The sandwich condition plus the adjacency of `prev` and `next` in the
    /// linked list.
    fn check_sandwich(
        &self,
        key: Bytes32,
        prev: &ProvenLeaf,
        next: &ProvenLeaf,
    ) -> Result<(), TraceError> {
        if prev.leaf.next_key != next.leaf.key || prev.leaf.next_index != next.index {
            return Err(TraceError::BadLink {
                detail: format!(
                    "prev at index {} does not link to next at index {}",
                    prev.index, next.index
                ),
            });
        }
        if !(prev.leaf.key < key && key < next.leaf.key) {
            return Err(TraceError::BadSandwich {
                detail: format!(
                    "{} < {key} < {} does not hold",
                    prev.leaf.key, next.leaf.key
                ),
            });
        }
        Ok(())
    }

    /// Check an absence witness. The cached state is unchanged.
    pub fn verify_read_zero(&mut self, t: &ReadZeroTrace) -> Result<(), TraceError> {
        self.check_location(&t.location)?;
        self.check_prior_root(t.root)?;
        self.check_counter(t.next_free_node)?;
        self.check_inclusion(&t.prev, t.root, "predecessor")?;
        self.check_inclusion(&t.next, t.root, "successor")?;
        self.check_sandwich(t.key, &t.prev, &t.next)
    }

    /// Check a membership witness. The cached state is unchanged.
    pub fn verify_read_non_zero(&mut self, t: &ReadNonZeroTrace) -> Result<(), TraceError> {
        self.check_location(&t.location)?;
        self.check_prior_root(t.root)?;
        self.check_counter(t.next_free_node)?;
        self.check_inclusion(&t.leaf, t.root, "read")?;
        if t.leaf.leaf.key != t.key || t.leaf.leaf.value != t.value {
            return Err(TraceError::KeyMismatch);
        }
        Ok(())
    }

    /// Check an insertion and advance the cached root and counter.
    pub fn verify_insertion(&mut self, t: &InsertionTrace) -> Result<(), TraceError> {
        self.check_location(&t.location)?;
        self.check_prior_root(t.prior_root)?;
        self.check_counter(t.next_free_node)?;
        self.check_inclusion(&t.prev, t.prior_root, "predecessor")?;
        self.check_inclusion(&t.next, t.prior_root, "successor")?;
        self.check_sandwich(t.key, &t.prev, &t.next)?;

        let new_index = self.next_free_node;
        if t.new_slot_proof.leaf_index != new_index {
            return Err(TraceError::BadLink {
                detail: format!(
                    "new leaf lands at index {}, expected the next free node {new_index}",
                    t.new_slot_proof.leaf_index
                ),
            });
        }

        // Replay the two writes: rewire the predecessor, then fill the slot.
        let mut prev_after = t.prev.leaf.clone();
        prev_after.next_key = t.key;
        prev_after.next_index = new_index;
        let mid_root = t.prev.proof.root_from(&self.config, prev_after.hash(&self.config));

        if !t
            .new_slot_proof
            .verify(&self.config, self.config.empty_leaf_hash(), mid_root)
        {
            return Err(TraceError::BadInclusionProof { what: "new slot" });
        }
        let new_leaf = Leaf {
            key: t.key,
            value: t.value,
            next_key: t.prev.leaf.next_key,
            next_index: t.prev.leaf.next_index,
        };
        let final_root = t
            .new_slot_proof
            .root_from(&self.config, new_leaf.hash(&self.config));
        if final_root != t.posterior_root {
            return Err(TraceError::PosteriorMismatch {
                expected: final_root,
                got: t.posterior_root,
            });
        }

        self.root = final_root;
        self.next_free_node += 1;
        Ok(())
    }

    /// Check a value update and advance the cached root.
    pub fn verify_update(&mut self, t: &UpdateTrace) -> Result<(), TraceError> {
        self.check_location(&t.location)?;
        self.check_prior_root(t.prior_root)?;
        self.check_counter(t.next_free_node)?;
        self.check_inclusion(&t.leaf, t.prior_root, "updated")?;
        if t.leaf.leaf.key != t.key || t.leaf.leaf.value != t.old_value {
            return Err(TraceError::KeyMismatch);
        }

        let mut after = t.leaf.leaf.clone();
        after.value = t.new_value;
        let final_root = t.leaf.proof.root_from(&self.config, after.hash(&self.config));
        if final_root != t.posterior_root {
            return Err(TraceError::PosteriorMismatch {
                expected: final_root,
                got: t.posterior_root,
            });
        }

        self.root = final_root;
        Ok(())
    }

    /// Check a deletion and advance the cached root. The counter does not
    /// move: the slot is tombstoned, never reclaimed.
    pub fn verify_deletion(&mut self, t: &DeletionTrace) -> Result<(), TraceError> {
        self.check_location(&t.location)?;
        self.check_prior_root(t.prior_root)?;
        self.check_counter(t.next_free_node)?;
        self.check_inclusion(&t.prev, t.prior_root, "predecessor")?;
        if t.deleted.leaf.key != t.key {
            return Err(TraceError::KeyMismatch);
        }
        if t.prev.leaf.next_key != t.key || t.prev.leaf.next_index != t.deleted.index {
            return Err(TraceError::BadLink {
                detail: format!(
                    "prev at index {} does not link to the deleted leaf at index {}",
                    t.prev.index, t.deleted.index
                ),
            });
        }

        // Replay: rewire the predecessor, then tombstone the slot. The
        // deleted leaf proves against the intermediate tree.
        let mut prev_after = t.prev.leaf.clone();
        prev_after.next_key = t.deleted.leaf.next_key;
        prev_after.next_index = t.deleted.leaf.next_index;
        let mid_root = t.prev.proof.root_from(&self.config, prev_after.hash(&self.config));

        self.check_inclusion(&t.deleted, mid_root, "deleted")?;
        let final_root = t
            .deleted
            .proof
            .root_from(&self.config, self.config.empty_leaf_hash());
        if final_root != t.posterior_root {
            return Err(TraceError::PosteriorMismatch {
                expected: final_root,
                got: t.posterior_root,
            });
        }

        self.root = final_root;
        Ok(())
    }
}
