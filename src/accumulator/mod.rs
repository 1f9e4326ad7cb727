//! Authenticated key/value accumulator over a sparse Merkle tree.
//!
//! The live keys form a sorted singly-linked list threaded through the
//! leaves (see [`Leaf`]), with two sentinels present from initialization:
//! *Head* (the key-order minimum, index 0) and *Tail* (the maximum, index 1).
//! The list makes both membership and non-membership provable: a key is
//! absent iff some live leaf satisfies `leaf.key < key < leaf.next_key` (the
//! sandwich witness).
//!
//! Every mutation emits a [trace](trace) sufficient for a stateless verifier
//! ([`verify::VerifierState`]) to replay the root transition. Leaf slots are
//! allocated by a monotone `next_free_node` counter and never reclaimed:
//! deletion empties the slot but the index stays used, preserving history.
//!
//! Operations validate all their preconditions before the first write, so an
//! error leaves the prover state unchanged.

pub mod pattern;
pub mod trace;
pub mod verify;

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::debug;

use crate::smt::{Smt, SmtConfig};
use crate::Bytes32;

pub use trace::{
    DeletionTrace, InsertionTrace, Leaf, ProvenLeaf, ReadNonZeroTrace, ReadZeroTrace, UpdateTrace,
};
pub use verify::{TraceError, VerifierState};

/// Precondition failure of an accumulator operation. The state is unchanged.
#[derive(Debug, Error)]
pub enum AccumulatorError {
    #[error("key {key} is already present")]
    KeyPresent { key: Bytes32 },
    #[error("key {key} is absent")]
    KeyAbsent { key: Bytes32 },
    #[error("key {key} is reserved for the sentinel leaves")]
    ReservedKey { key: Bytes32 },
}

/// The prover's accumulator state: the full tree, the leaf pre-images and
/// the key index. Owned by a single logical caller.
pub struct ProverState {
    config: SmtConfig,
    location: String,
    tree: Smt,
    /// Pre-images of the occupied leaves, by tree index.
    leaves: HashMap<u64, Leaf>,
    /// Live keys (sentinels included) to tree indices; doubles as the
    /// sandwich finder.
    key_index: BTreeMap<Bytes32, u64>,
    next_free_node: u64,
}

impl ProverState {
    /// Fresh accumulator holding only the sentinel leaves.
    pub fn initialize(config: SmtConfig, location: impl Into<String>) -> ProverState {
        let mut tree = Smt::new(config);
        let head = Leaf::head();
        let tail = Leaf::tail();
        tree.update_leaf(0, head.hash(&config));
        tree.update_leaf(1, tail.hash(&config));

        let mut leaves = HashMap::new();
        leaves.insert(0, head);
        leaves.insert(1, tail);
        let mut key_index = BTreeMap::new();
        key_index.insert(Bytes32::ZERO, 0);
        key_index.insert(Bytes32::MAX, 1);

        let location = location.into();
        debug!(%location, depth = config.depth, "accumulator initialized");
        ProverState { config, location, tree, leaves, key_index, next_free_node: 2 }
    }

    /// Snapshot the verifier's view: root, counter and configuration.
    pub fn verifier_state(&self) -> VerifierState {
        VerifierState {
            config: self.config,
            location: self.location.clone(),
            root: self.tree.root(),
            next_free_node: self.next_free_node,
        }
    }

    pub fn config(&self) -> &SmtConfig {
        &self.config
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Current sub-tree root.
    pub fn sub_tree_root(&self) -> Bytes32 {
        self.tree.root()
    }

    /// Next unused leaf index: the number of leaves ever inserted plus 2.
    pub fn next_free_node(&self) -> u64 {
        self.next_free_node
    }

    /// Hash stored at a leaf slot (tests and diagnostics).
    pub fn leaf_hash(&self, index: u64) -> Bytes32 {
        self.tree.get_leaf(index)
    }

    fn check_usable_key(&self, key: Bytes32) -> Result<(), AccumulatorError> {
        if key == Bytes32::ZERO || key == Bytes32::MAX {
            return Err(AccumulatorError::ReservedKey { key });
        }
        Ok(())
    }

    /// Index of the live predecessor of `key`: the greatest live key
    /// strictly below it. Head guarantees existence.
    fn predecessor_index(&self, key: Bytes32) -> u64 {
        *self
            .key_index
            .range(..key)
            .next_back()
            .expect("the head sentinel precedes every usable key")
            .1
    }

    fn proven(&self, index: u64) -> ProvenLeaf {
        ProvenLeaf {
            index,
            leaf: self.leaves[&index].clone(),
            proof: self.tree.prove(index),
        }
    }

    /// Insert an absent key and prove the transition.
    pub fn insert_and_prove(
        &mut self,
        key: Bytes32,
        value: Bytes32,
    ) -> Result<InsertionTrace, AccumulatorError> {
        self.check_usable_key(key)?;
        if self.key_index.contains_key(&key) {
            return Err(AccumulatorError::KeyPresent { key });
        }

        let prev_index = self.predecessor_index(key);
        let prior_root = self.tree.root();
        let prev = self.proven(prev_index);
        let next = self.proven(prev.leaf.next_index);
        let new_index = self.next_free_node;

        // Rewire the predecessor, then place the new leaf; the second proof
        // is taken against the intermediate tree.
        let mut prev_after = prev.leaf.clone();
        prev_after.next_key = key;
        prev_after.next_index = new_index;
        self.tree.update_leaf(prev_index, prev_after.hash(&self.config));
        self.leaves.insert(prev_index, prev_after);

        let new_slot_proof = self.tree.prove(new_index);
        let new_leaf = Leaf {
            key,
            value,
            next_key: prev.leaf.next_key,
            next_index: prev.leaf.next_index,
        };
        self.tree.update_leaf(new_index, new_leaf.hash(&self.config));
        self.leaves.insert(new_index, new_leaf);
        self.key_index.insert(key, new_index);
        self.next_free_node += 1;

        Ok(InsertionTrace {
            location: self.location.clone(),
            key,
            value,
            prev,
            next,
            new_slot_proof,
            prior_root,
            posterior_root: self.tree.root(),
            next_free_node: new_index,
        })
    }

    /// Prove that a key is absent. The state is unchanged.
    pub fn read_zero_and_prove(&mut self, key: Bytes32) -> Result<ReadZeroTrace, AccumulatorError> {
        self.check_usable_key(key)?;
        if self.key_index.contains_key(&key) {
            return Err(AccumulatorError::KeyPresent { key });
        }
        let prev_index = self.predecessor_index(key);
        let prev = self.proven(prev_index);
        let next = self.proven(prev.leaf.next_index);
        Ok(ReadZeroTrace {
            location: self.location.clone(),
            key,
            prev,
            next,
            root: self.tree.root(),
            next_free_node: self.next_free_node,
        })
    }

    /// Prove that a key is present and read its value. The state is
    /// unchanged.
    pub fn read_non_zero_and_prove(
        &mut self,
        key: Bytes32,
    ) -> Result<ReadNonZeroTrace, AccumulatorError> {
        self.check_usable_key(key)?;
        let index = *self
            .key_index
            .get(&key)
            .ok_or(AccumulatorError::KeyAbsent { key })?;
        let leaf = self.proven(index);
        Ok(ReadNonZeroTrace {
            location: self.location.clone(),
            key,
            value: leaf.leaf.value,
            leaf,
            root: self.tree.root(),
            next_free_node: self.next_free_node,
        })
    }

    /// Replace the value of a present key and prove the transition.
    pub fn update_and_prove(
        &mut self,
        key: Bytes32,
        new_value: Bytes32,
    ) -> Result<UpdateTrace, AccumulatorError> {
        self.check_usable_key(key)?;
        let index = *self
            .key_index
            .get(&key)
            .ok_or(AccumulatorError::KeyAbsent { key })?;
        let prior_root = self.tree.root();
        let leaf = self.proven(index);

        let mut after = leaf.leaf.clone();
        after.value = new_value;
        self.tree.update_leaf(index, after.hash(&self.config));
        let old_value = leaf.leaf.value;
        self.leaves.insert(index, after);

        Ok(UpdateTrace {
            location: self.location.clone(),
            key,
            old_value,
            new_value,
            leaf,
            prior_root,
            posterior_root: self.tree.root(),
            next_free_node: self.next_free_node,
        })
    }

    /// Remove a present key and prove the transition. The slot becomes the
    /// empty tombstone; its index is never reused.
    pub fn delete_and_prove(&mut self, key: Bytes32) -> Result<DeletionTrace, AccumulatorError> {
        self.check_usable_key(key)?;
        let index = *self
            .key_index
            .get(&key)
            .ok_or(AccumulatorError::KeyAbsent { key })?;
        let prev_index = self.predecessor_index(key);
        let prior_root = self.tree.root();
        let prev = self.proven(prev_index);
        let deleted_leaf = self.leaves[&index].clone();

        let mut prev_after = prev.leaf.clone();
        prev_after.next_key = deleted_leaf.next_key;
        prev_after.next_index = deleted_leaf.next_index;
        self.tree.update_leaf(prev_index, prev_after.hash(&self.config));
        self.leaves.insert(prev_index, prev_after);

        let deleted = ProvenLeaf {
            index,
            leaf: deleted_leaf,
            proof: self.tree.prove(index),
        };
        self.tree.update_leaf(index, self.config.empty_leaf_hash());
        self.leaves.remove(&index);
        self.key_index.remove(&key);

        Ok(DeletionTrace {
            location: self.location.clone(),
            key,
            prev,
            deleted,
            prior_root,
            posterior_root: self.tree.root(),
            next_free_node: self.next_free_node,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::HashKind;

    const NUM_REPETITIONS: u64 = 255;
    const LOCATION_TESTING: &str = "location";

    fn dumkey(i: u64) -> Bytes32 {
        Bytes32::dummy(i)
    }

    fn dumval(i: u64) -> Bytes32 {
        Bytes32::dummy(i)
    }

    fn new_test_accumulator_keccak() -> ProverState {
        let config = SmtConfig { hash: HashKind::Keccak, depth: 40 };
        ProverState::initialize(config, LOCATION_TESTING)
    }

    #[test]
    fn initialization() {
        let acc = new_test_accumulator_keccak();
        let ver = acc.verifier_state();

        assert_eq!(acc.next_free_node(), 2, "bad next free node for the prover state");
        assert_eq!(ver.next_free_node, 2, "bad next free node for the verifier state");
        assert_eq!(acc.sub_tree_root(), ver.root, "inconsistent roots");

        // The sentinel leaves occupy the first two slots.
        assert_eq!(acc.leaf_hash(0), Leaf::head().hash(acc.config()));
        assert_eq!(acc.leaf_hash(1), Leaf::tail().hash(acc.config()));
    }

    #[test]
    fn insertion_round_trip() {
        crate::init_test_logging();
        let mut acc = new_test_accumulator_keccak();
        let mut ver = acc.verifier_state();

        for i in 0..NUM_REPETITIONS {
            let trace = acc.insert_and_prove(dumkey(i), dumval(i)).unwrap();
            ver.verify_insertion(&trace)
                .unwrap_or_else(|e| panic!("check #{i}: {e}"));
        }

        assert_eq!(acc.next_free_node(), 2 + NUM_REPETITIONS);
        assert_eq!(acc.next_free_node(), ver.next_free_node);
        assert_eq!(acc.sub_tree_root(), ver.root);

        // Every inserted key reads back with its value.
        for i in 0..NUM_REPETITIONS {
            let trace = acc.read_non_zero_and_prove(dumkey(i)).unwrap();
            assert_eq!(trace.value, dumval(i));
        }
    }

    #[test]
    fn read_zero() {
        let mut acc = new_test_accumulator_keccak();
        let mut ver = acc.verifier_state();

        for i in 0..NUM_REPETITIONS {
            let trace = acc.read_zero_and_prove(dumkey(i)).unwrap();
            ver.verify_read_zero(&trace)
                .unwrap_or_else(|e| panic!("check #{i}: {e}"));
        }

        assert_eq!(acc.next_free_node(), ver.next_free_node);
        assert_eq!(acc.sub_tree_root(), ver.root);
    }

    #[test]
    fn read_non_zero() {
        let mut acc = new_test_accumulator_keccak();
        for i in 0..NUM_REPETITIONS {
            acc.insert_and_prove(dumkey(i), dumval(i)).unwrap();
        }

        // Snapshot after the insertions so the verifier holds the right root.
        let mut ver = acc.verifier_state();
        for i in 0..NUM_REPETITIONS {
            let trace = acc.read_non_zero_and_prove(dumkey(i)).unwrap();
            ver.verify_read_non_zero(&trace)
                .unwrap_or_else(|e| panic!("check #{i}: {e}"));
            assert_eq!(trace.value, dumval(i));
        }

        assert_eq!(acc.next_free_node(), ver.next_free_node);
        assert_eq!(acc.sub_tree_root(), ver.root);
    }

    #[test]
    fn update() {
        let mut acc = new_test_accumulator_keccak();
        for i in 0..NUM_REPETITIONS {
            acc.insert_and_prove(dumkey(i), dumval(i)).unwrap();
        }

        let mut ver = acc.verifier_state();
        for i in 0..NUM_REPETITIONS {
            let trace = acc.update_and_prove(dumkey(i), dumval(i + 1000)).unwrap();
            ver.verify_update(&trace)
                .unwrap_or_else(|e| panic!("check #{i}: {e}"));
        }

        assert_eq!(acc.next_free_node(), ver.next_free_node);
        assert_eq!(acc.sub_tree_root(), ver.root);

        let trace = acc.read_non_zero_and_prove(dumkey(7)).unwrap();
        assert_eq!(trace.value, dumval(1007));
    }

    #[test]
    fn deletion() {
        let mut acc = new_test_accumulator_keccak();
        for i in 0..NUM_REPETITIONS {
            acc.insert_and_prove(dumkey(i), dumval(i)).unwrap();
        }

        let mut ver = acc.verifier_state();
        for i in 0..NUM_REPETITIONS {
            let trace = acc.delete_and_prove(dumkey(i)).unwrap();
            ver.verify_deletion(&trace)
                .unwrap_or_else(|e| panic!("check #{i}: {e}"));
        }

        assert_eq!(acc.next_free_node(), ver.next_free_node);
        assert_eq!(acc.sub_tree_root(), ver.root);
    }

    #[test]
    fn delete_then_read_zero_verifies() {
        let mut acc = new_test_accumulator_keccak();
        acc.insert_and_prove(dumkey(0), dumval(0)).unwrap();
        acc.insert_and_prove(dumkey(1), dumval(1)).unwrap();

        let mut ver = acc.verifier_state();
        let del = acc.delete_and_prove(dumkey(0)).unwrap();
        ver.verify_deletion(&del).unwrap();

        let rz = acc.read_zero_and_prove(dumkey(0)).unwrap();
        ver.verify_read_zero(&rz).unwrap();
    }

    #[test]
    fn empty_tree_read_zero() {
        let mut acc = new_test_accumulator_keccak();
        let mut ver = acc.verifier_state();
        let initial_root = acc.sub_tree_root();

        let trace = acc.read_zero_and_prove(Bytes32::dummy(0)).unwrap();
        assert_eq!(trace.root, initial_root);
        ver.verify_read_zero(&trace).unwrap();
        assert_eq!(ver.next_free_node, 2);
        assert_eq!(ver.root, initial_root);
    }

    #[test]
    fn read_zero_traces_stay_valid_as_absence_at_emission_time() {
        let mut acc = new_test_accumulator_keccak();
        let mut early_ver = acc.verifier_state();

        let rz = acc.read_zero_and_prove(dumkey(3)).unwrap();

        // Inserting the key afterwards succeeds, and the earlier trace still
        // verifies against its own prior root.
        let mut late_ver = acc.verifier_state();
        let ins = acc.insert_and_prove(dumkey(3), dumval(3)).unwrap();
        late_ver.verify_insertion(&ins).unwrap();

        early_ver.verify_read_zero(&rz).unwrap();
        // But not against the post-insertion root.
        assert!(late_ver.verify_read_zero(&rz).is_err());
    }

    #[test]
    fn preconditions_leave_state_unchanged() {
        let mut acc = new_test_accumulator_keccak();
        acc.insert_and_prove(dumkey(0), dumval(0)).unwrap();
        let root = acc.sub_tree_root();

        assert!(matches!(
            acc.insert_and_prove(dumkey(0), dumval(1)),
            Err(AccumulatorError::KeyPresent { .. })
        ));
        assert!(matches!(
            acc.read_non_zero_and_prove(dumkey(9)),
            Err(AccumulatorError::KeyAbsent { .. })
        ));
        assert!(matches!(
            acc.delete_and_prove(dumkey(9)),
            Err(AccumulatorError::KeyAbsent { .. })
        ));
        assert!(matches!(
            acc.insert_and_prove(Bytes32::ZERO, dumval(0)),
            Err(AccumulatorError::ReservedKey { .. })
        ));
        assert_eq!(acc.sub_tree_root(), root);
        assert_eq!(acc.next_free_node(), 3);
    }

    #[test]
    fn mimc_accumulator_round_trip() {
        let config = SmtConfig { hash: HashKind::Mimc, depth: 10 };
        let mut acc = ProverState::initialize(config, LOCATION_TESTING);
        let mut ver = acc.verifier_state();

        for i in 0..16 {
            let trace = acc.insert_and_prove(dumkey(i), dumval(i)).unwrap();
            ver.verify_insertion(&trace).unwrap();
        }
        let trace = acc.update_and_prove(dumkey(3), dumval(33)).unwrap();
        ver.verify_update(&trace).unwrap();
        assert_eq!(acc.sub_tree_root(), ver.root);
    }
}
