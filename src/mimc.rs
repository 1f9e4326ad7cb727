//! MiMC permutation and compression over `F`.
//!
//! SNARK-friendly hash used by the accumulator when configured with
//! [`HashKind::Mimc`](crate::smt::HashKind) and by the vortex pass for its
//! column digests. The permutation is the classic `x ← (x + k + cᵢ)⁵` round
//! function (the quintic S-box is a bijection on this field) with 110 rounds;
//! the two-to-one compression is Miyaguchi–Preneel over the permutation.
//!
//! Round constants are nothing-up-my-sleeve values: the BLAKE3 XOF of a fixed
//! tag, reduced into the field.

use std::io::Read;
use std::sync::OnceLock;

use ark_ff::{PrimeField, Zero};

use crate::F;

/// Number of rounds of the permutation.
pub const ROUNDS: usize = 110;

const CONSTANTS_DST: &str = "ziop.mimc.bn254.v1";

fn round_constants() -> &'static [F; ROUNDS] {
    static CONSTANTS: OnceLock<[F; ROUNDS]> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        let mut xof = blake3::Hasher::new()
            .update(CONSTANTS_DST.as_bytes())
            .finalize_xof();
        let mut buf = [0u8; 64];
        std::array::from_fn(|_| {
            xof.read_exact(&mut buf).expect("XOF read cannot fail");
            F::from_le_bytes_mod_order(&buf)
        })
    })
}

/// Keyed MiMC permutation of `x`.
pub fn permute(key: F, x: F) -> F {
    let mut state = x;
    for c in round_constants() {
        let t = state + key + *c;
        let t2 = t * t;
        state = t2 * t2 * t;
    }
    state + key
}

/// Miyaguchi–Preneel two-to-one compression: `H(h, m) = E_h(m) + h + m`.
pub fn compress(h: F, m: F) -> F {
    permute(h, m) + h + m
}

/// Hash a sequence of field elements by chaining the compression from zero.
pub fn hash_fields(inputs: impl IntoIterator<Item = F>) -> F {
    let mut h = F::zero();
    for m in inputs {
        h = compress(h, m);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;

    #[test]
    fn deterministic_and_input_sensitive() {
        let a = hash_fields([F::one(), F::from(2u64)]);
        let b = hash_fields([F::one(), F::from(2u64)]);
        let c = hash_fields([F::from(2u64), F::one()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn compression_is_not_the_identity() {
        assert_ne!(compress(F::zero(), F::zero()), F::zero());
        assert_ne!(permute(F::one(), F::one()), F::one());
    }
}
