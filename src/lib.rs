//! Interactive-oracle-proof engine and authenticated state accumulator.
//!
//! This crate has two tightly-coupled halves:
//!
//! - the **protocol engine**: a registry of polynomial-valued columns, verifier
//!   coins and queries ([`registry::CompiledIop`]), an expression language over
//!   them ([`expression::Expression`]), a pipeline of compiler passes that
//!   rewrite the registry ([`compiler`]), and the prover/verifier runtimes that
//!   execute the compiled protocol over concrete field values ([`prover`],
//!   [`verifier`]);
//! - the **state accumulator**: a sparse-Merkle-backed authenticated key/value
//!   store whose operations emit replayable traces ([`accumulator`]), plus the
//!   access-pattern classifier that polices per-account trace sequences
//!   ([`accumulator::pattern`]).
//!
//! ## Invariants
//!
//! - **Field.** The scalar field is `ark_bn254::Fr` (`F` in this crate). All
//!   arithmetic comes from Arkworks; we forbid unsafe throughout.
//! - **Fiat–Shamir.** BLAKE3 with explicit domain separation, length-delimited
//!   absorbs and an XOF for challenge derivation. Prover and verifier replay
//!   the exact same absorb schedule: round-by-round, within a round in
//!   (columns, query parameters, coins) order.
//! - **Registry freezing.** The registry is mutable only while the definer and
//!   the compiler passes run. [`compiler::compile`] freezes it; the runtimes
//!   refuse to operate on an unfrozen registry.
//! - **Error discipline.** Every public call returns a typed error. Panics are
//!   reserved for programmer errors: duplicate identifiers, non-power-of-two
//!   sizes where a power of two is required, out-of-range indices.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};

pub mod accumulator;
pub mod builder;
pub mod coin;
pub mod column;
pub mod compiler;
pub mod expression;
pub mod fft;
pub mod mimc;
pub mod prover;
pub mod query;
pub mod registry;
pub mod runtime;
pub mod smartvectors;
pub mod smt;
pub mod transcript;
pub mod verifier;

#[cfg(test)]
mod test_cases;

/// Route `tracing` output through the test harness. Idempotent; tests that
/// exercise the compile/prove/verify paths call this so `RUST_LOG` works on
/// them.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scalar field used across the crate.
pub type F = ark_bn254::Fr;

pub use builder::Builder;
pub use compiler::{compile, CompilerPass};
pub use prover::{prove, Proof, ProverRuntime};
pub use registry::CompiledIop;
pub use smartvectors::SmartVector;
pub use verifier::{verify, VerifierRuntime};

/// Fixed-width digest used for Merkle hashes and key/value identities.
///
/// Ordering is the byte-lexicographic order, i.e. the order of the digest read
/// as a big-endian unsigned integer. This is the tie-break rule used by the
/// accumulator's sorted linked list.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Bytes32(pub [u8; 32]);

impl Bytes32 {
    /// The all-zero digest. Reserved as the head sentinel key.
    pub const ZERO: Bytes32 = Bytes32([0u8; 32]);

    /// The all-ones digest. Reserved as the tail sentinel key.
    pub const MAX: Bytes32 = Bytes32([0xffu8; 32]);

    /// Deterministic non-zero digest for tests and examples: `i + 1` encoded
    /// big-endian in the trailing bytes, so `dummy(i) < dummy(j)` iff `i < j`
    /// and no collision with the sentinel keys is possible.
    pub fn dummy(i: u64) -> Bytes32 {
        let mut b = [0u8; 32];
        b[24..].copy_from_slice(&(i + 1).to_be_bytes());
        Bytes32(b)
    }

    /// Reduce the digest into a field element (big-endian, mod p).
    pub fn to_field(self) -> F {
        F::from_be_bytes_mod_order(&self.0)
    }

    /// Canonical big-endian encoding of a field element as a digest.
    pub fn from_field(f: &F) -> Bytes32 {
        let be = f.into_bigint().to_bytes_be();
        let mut b = [0u8; 32];
        b[32 - be.len()..].copy_from_slice(&be);
        Bytes32(b)
    }
}

impl std::fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bytes32({self})")
    }
}

impl From<[u8; 32]> for Bytes32 {
    fn from(b: [u8; 32]) -> Self {
        Bytes32(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;

    #[test]
    fn digest_order_is_big_endian() {
        assert!(Bytes32::ZERO < Bytes32::dummy(0));
        assert!(Bytes32::dummy(0) < Bytes32::dummy(1));
        assert!(Bytes32::dummy(u64::MAX - 1) < Bytes32::MAX);
    }

    #[test]
    fn field_round_trip() {
        let one = F::one();
        let d = Bytes32::from_field(&one);
        assert_eq!(d.to_field(), one);
        let mut expect = [0u8; 32];
        expect[31] = 1;
        assert_eq!(d.0, expect);
    }
}
