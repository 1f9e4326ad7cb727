//! Fixed-depth sparse Merkle tree.
//!
//! A binary Merkle tree of depth `D` over `2^D` leaves, almost all of which
//! are empty: only the nodes on paths to written leaves are stored, everything
//! else hashes to the cached per-level default. The hash function is part of
//! the tree configuration and must be shared by whoever replays the proofs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha3::{Digest as _, Keccak256};

use crate::mimc;
use crate::Bytes32;

/// Hash function backing a tree. `Keccak` is the cheap native choice; `Mimc`
/// is the SNARK-friendly one. Both sides of a protocol must agree on it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum HashKind {
    Keccak,
    Mimc,
}

impl HashKind {
    /// Hash a byte string into a digest.
    pub fn hash_bytes(&self, data: &[u8]) -> Bytes32 {
        match self {
            HashKind::Keccak => {
                let mut h = Keccak256::new();
                h.update(data);
                Bytes32(h.finalize().into())
            }
            HashKind::Mimc => {
                // Consume 32-byte words as field elements, zero-padding the
                // tail word.
                let fields = data.chunks(32).map(|chunk| {
                    let mut word = [0u8; 32];
                    word[..chunk.len()].copy_from_slice(chunk);
                    Bytes32(word).to_field()
                });
                Bytes32::from_field(&mimc::hash_fields(fields))
            }
        }
    }

    /// Hash an ordered node pair.
    pub fn hash_pair(&self, left: &Bytes32, right: &Bytes32) -> Bytes32 {
        match self {
            HashKind::Keccak => {
                let mut h = Keccak256::new();
                h.update(left.0);
                h.update(right.0);
                Bytes32(h.finalize().into())
            }
            HashKind::Mimc => Bytes32::from_field(&mimc::hash_fields([
                left.to_field(),
                right.to_field(),
            ])),
        }
    }
}

/// Tree configuration shared between prover and verifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SmtConfig {
    pub hash: HashKind,
    pub depth: usize,
}

impl SmtConfig {
    /// Hash of an empty leaf: the hash of an all-zero leaf pre-image.
    pub fn empty_leaf_hash(&self) -> Bytes32 {
        self.hash.hash_bytes(&[0u8; 128])
    }
}

/// Sparse Merkle tree with cached per-level defaults.
///
/// Levels are numbered from the leaves: level 0 holds leaf hashes, level
/// `depth` is the root. Node indices at each level follow the usual binary
/// layout (`index >> 1` is the parent, `index ^ 1` the sibling).
#[derive(Clone, Debug)]
pub struct Smt {
    config: SmtConfig,
    /// Written nodes only, keyed by `(level, index)`.
    nodes: HashMap<(usize, u64), Bytes32>,
    /// Default hash per level: `empty[0]` is the empty leaf hash.
    empty: Vec<Bytes32>,
    root: Bytes32,
}

/// Inclusion proof: bottom-up sibling hashes for one leaf.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: u64,
    pub siblings: Vec<Bytes32>,
}

impl Smt {
    /// Empty tree of the configured depth.
    pub fn new(config: SmtConfig) -> Self {
        assert!(config.depth >= 1 && config.depth <= 63, "unsupported tree depth");
        let mut empty = Vec::with_capacity(config.depth + 1);
        empty.push(config.empty_leaf_hash());
        for level in 0..config.depth {
            let child = empty[level];
            empty.push(config.hash.hash_pair(&child, &child));
        }
        let root = empty[config.depth];
        Smt { config, nodes: HashMap::new(), empty, root }
    }

    pub fn config(&self) -> &SmtConfig {
        &self.config
    }

    pub fn root(&self) -> Bytes32 {
        self.root
    }

    /// Hash currently stored at a leaf slot (the empty-leaf default when the
    /// slot was never written).
    pub fn get_leaf(&self, index: u64) -> Bytes32 {
        self.node(0, index)
    }

    fn node(&self, level: usize, index: u64) -> Bytes32 {
        *self.nodes.get(&(level, index)).unwrap_or(&self.empty[level])
    }

    /// Write a leaf hash and re-hash its path to the root.
    pub fn update_leaf(&mut self, index: u64, value: Bytes32) {
        assert!(index < self.capacity(), "leaf index {index} out of range");
        self.nodes.insert((0, index), value);
        let mut idx = index;
        for level in 0..self.config.depth {
            let sibling = self.node(level, idx ^ 1);
            let (left, right) = if idx & 1 == 0 {
                (self.node(level, idx), sibling)
            } else {
                (sibling, self.node(level, idx))
            };
            let parent = self.config.hash.hash_pair(&left, &right);
            idx >>= 1;
            self.nodes.insert((level + 1, idx), parent);
        }
        self.root = self.node(self.config.depth, 0);
    }

    /// Inclusion proof for a leaf slot (occupied or empty).
    pub fn prove(&self, index: u64) -> MerkleProof {
        assert!(index < self.capacity(), "leaf index {index} out of range");
        let mut siblings = Vec::with_capacity(self.config.depth);
        let mut idx = index;
        for level in 0..self.config.depth {
            siblings.push(self.node(level, idx ^ 1));
            idx >>= 1;
        }
        MerkleProof { leaf_index: index, siblings }
    }

    /// Proofs for many independent leaves. The paths are independent, so the
    /// walk is data-parallel.
    pub fn prove_many(&self, indices: &[u64]) -> Vec<MerkleProof> {
        use rayon::prelude::*;
        indices.par_iter().map(|&i| self.prove(i)).collect()
    }

    fn capacity(&self) -> u64 {
        1u64 << self.config.depth
    }
}

impl MerkleProof {
    /// Root obtained by placing `leaf` at the proven slot.
    pub fn root_from(&self, config: &SmtConfig, leaf: Bytes32) -> Bytes32 {
        let mut current = leaf;
        let mut idx = self.leaf_index;
        for sibling in &self.siblings {
            current = if idx & 1 == 0 {
                config.hash.hash_pair(&current, sibling)
            } else {
                config.hash.hash_pair(sibling, &current)
            };
            idx >>= 1;
        }
        current
    }

    /// Whether the proof binds `leaf` at its slot under `root`.
    pub fn verify(&self, config: &SmtConfig, leaf: Bytes32, root: Bytes32) -> bool {
        self.root_from(config, leaf) == root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(hash: HashKind) -> Smt {
        Smt::new(SmtConfig { hash, depth: 6 })
    }

    #[test]
    fn empty_tree_proofs_verify() {
        for hash in [HashKind::Keccak, HashKind::Mimc] {
            let tree = small(hash);
            let proof = tree.prove(17);
            assert!(proof.verify(tree.config(), tree.config().empty_leaf_hash(), tree.root()));
        }
    }

    #[test]
    fn update_changes_root_and_proofs_track_it() {
        let mut tree = small(HashKind::Keccak);
        let initial = tree.root();

        tree.update_leaf(5, Bytes32::dummy(42));
        assert_ne!(tree.root(), initial);

        let proof = tree.prove(5);
        assert!(proof.verify(tree.config(), Bytes32::dummy(42), tree.root()));
        assert!(!proof.verify(tree.config(), Bytes32::dummy(43), tree.root()));

        // An untouched slot still proves empty against the new root.
        let other = tree.prove(6);
        assert!(other.verify(tree.config(), tree.config().empty_leaf_hash(), tree.root()));
    }

    #[test]
    fn proofs_recompute_roots_after_hypothetical_writes() {
        let mut tree = small(HashKind::Mimc);
        tree.update_leaf(0, Bytes32::dummy(1));

        // A proof taken before a write predicts the root after it.
        let proof = tree.prove(9);
        let predicted = proof.root_from(tree.config(), Bytes32::dummy(2));
        tree.update_leaf(9, Bytes32::dummy(2));
        assert_eq!(predicted, tree.root());
    }

    #[test]
    fn batch_proofs_match_single_proofs() {
        let mut tree = small(HashKind::Keccak);
        for i in 0..8u64 {
            tree.update_leaf(i * 3, Bytes32::dummy(i));
        }
        let indices: Vec<u64> = (0..8).map(|i| i * 3).collect();
        let proofs = tree.prove_many(&indices);
        for (proof, &i) in proofs.iter().zip(&indices) {
            assert_eq!(*proof, tree.prove(i));
        }
    }

    #[test]
    fn keccak_and_mimc_disagree() {
        // Shared config is load-bearing; a mismatch must not verify.
        let k = small(HashKind::Keccak);
        let m = small(HashKind::Mimc);
        assert_ne!(k.root(), m.root());
    }
}
