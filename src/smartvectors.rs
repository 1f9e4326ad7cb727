//! Semantic containers for column assignments.
//!
//! A [`SmartVector`] is an immutable view over a fixed-length sequence of
//! field elements. The representation is a semantic detail: a constant column
//! is stored as `(value, len)`, a rotated column as a base vector plus an
//! offset, a padded column as its payload plus the padding value. All variants
//! answer `get(i)` in O(1) and all comparisons are over the *observed*
//! sequence, never the representation.
//!
//! Rotation is lazy (O(1)); the FFT and the linear-combination helpers
//! materialize their results as regular vectors.

use std::sync::Arc;

use ark_ff::Zero;
use rand::Rng;
use rayon::prelude::*;

use crate::fft::{self, Direction};
use crate::F;

// Below this length the rayon fan-out costs more than it saves.
const PAR_THRESHOLD: usize = 1 << 12;

/// Immutable, representation-aware view over a sequence of field elements.
#[derive(Clone, Debug)]
pub enum SmartVector {
    /// Explicitly materialized values.
    Regular(Arc<Vec<F>>),
    /// A single value repeated `len` times.
    Constant { value: F, len: usize },
    /// Cyclic rotation of a base vector: entry `i` reads
    /// `base[(i + shift) % len]`.
    Rotated { base: Arc<Vec<F>>, shift: usize },
    /// A payload extended with a padding value up to `len`.
    Padded { inner: Arc<Vec<F>>, pad: F, len: usize },
}

impl SmartVector {
    /// Wrap an explicit vector. Panics on an empty input: columns always have
    /// a positive length.
    pub fn regular(values: Vec<F>) -> Self {
        assert!(!values.is_empty(), "a column cannot be empty");
        SmartVector::Regular(Arc::new(values))
    }

    /// The constant vector `value` repeated `len` times.
    pub fn constant(value: F, len: usize) -> Self {
        assert!(len > 0, "a column cannot be empty");
        SmartVector::Constant { value, len }
    }

    /// Test-friendly constructor from small integers.
    pub fn from_u64s(values: &[u64]) -> Self {
        Self::regular(values.iter().copied().map(F::from).collect())
    }

    /// Uniformly random vector, for tests.
    pub fn random<R: Rng>(len: usize, rng: &mut R) -> Self {
        Self::regular((0..len).map(|_| F::from(rng.gen::<u64>())).collect())
    }

    /// Extend `inner` with copies of `pad` up to `len`.
    pub fn padded(inner: Vec<F>, pad: F, len: usize) -> Self {
        assert!(len >= inner.len(), "padding target shorter than the payload");
        assert!(len > 0, "a column cannot be empty");
        SmartVector::Padded { inner: Arc::new(inner), pad, len }
    }

    pub fn len(&self) -> usize {
        match self {
            SmartVector::Regular(v) => v.len(),
            SmartVector::Constant { len, .. } => *len,
            SmartVector::Rotated { base, .. } => base.len(),
            SmartVector::Padded { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// O(1) indexed access. Panics out of bounds.
    pub fn get(&self, i: usize) -> F {
        let n = self.len();
        assert!(i < n, "index {i} out of bounds for column of size {n}");
        match self {
            SmartVector::Regular(v) => v[i],
            SmartVector::Constant { value, .. } => *value,
            SmartVector::Rotated { base, shift } => base[(i + shift) % base.len()],
            SmartVector::Padded { inner, pad, .. } => {
                if i < inner.len() {
                    inner[i]
                } else {
                    *pad
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<F> {
        match self {
            SmartVector::Regular(v) => v.as_ref().clone(),
            _ => self.iter().collect(),
        }
    }

    /// Cyclic rotation by `k` (possibly negative): entry `i` of the result
    /// reads entry `(i + k) mod len` of `self`. O(1); double rotations
    /// collapse.
    pub fn rotate(&self, k: i64) -> Self {
        let n = self.len() as i64;
        let k = k.rem_euclid(n) as usize;
        match self {
            SmartVector::Constant { .. } => self.clone(),
            SmartVector::Rotated { base, shift } => SmartVector::Rotated {
                base: base.clone(),
                shift: (shift + k) % base.len(),
            },
            SmartVector::Regular(v) => SmartVector::Rotated { base: v.clone(), shift: k },
            SmartVector::Padded { .. } => SmartVector::Rotated {
                base: Arc::new(self.to_vec()),
                shift: k,
            },
        }
    }

    /// Radix-2 transform of the observed sequence; `coset` shifts the
    /// evaluation domain by the field's multiplicative generator. The length
    /// must be a power of two. Returns a regular vector.
    pub fn fft(&self, direction: Direction, coset: bool) -> Self {
        let mut values = self.to_vec();
        if coset {
            fft::ntt_in_place_coset(&mut values, direction);
        } else {
            fft::ntt_in_place(&mut values, direction);
        }
        SmartVector::Regular(Arc::new(values))
    }

    /// The contiguous sub-range `[from, to)`, materialized.
    pub fn sub_range(&self, from: usize, to: usize) -> Self {
        assert!(from < to && to <= self.len(), "invalid sub-range [{from}, {to})");
        match self {
            SmartVector::Constant { value, .. } => SmartVector::constant(*value, to - from),
            _ => SmartVector::regular((from..to).map(|i| self.get(i)).collect()),
        }
    }

    /// `Σᵢ coeffs[i] · vectors[i]`, pointwise. All vectors must share one
    /// length, and at least one operand is required.
    pub fn linear_combination(coeffs: &[F], vectors: &[SmartVector]) -> Self {
        assert_eq!(coeffs.len(), vectors.len(), "coefficient/vector count mismatch");
        assert!(!vectors.is_empty(), "empty linear combination");
        let n = vectors[0].len();
        for v in vectors {
            assert_eq!(v.len(), n, "length mismatch in linear combination");
        }

        if vectors.iter().all(|v| matches!(v, SmartVector::Constant { .. })) {
            let mut acc = F::zero();
            for (c, v) in coeffs.iter().zip(vectors) {
                acc += *c * v.get(0);
            }
            return SmartVector::constant(acc, n);
        }

        let combine = |i: usize| {
            let mut acc = F::zero();
            for (c, v) in coeffs.iter().zip(vectors) {
                acc += *c * v.get(i);
            }
            acc
        };
        let out: Vec<F> = if n >= PAR_THRESHOLD {
            (0..n).into_par_iter().map(combine).collect()
        } else {
            (0..n).map(combine).collect()
        };
        SmartVector::Regular(Arc::new(out))
    }

    fn zip_with(&self, other: &SmartVector, f: impl Fn(F, F) -> F + Sync) -> SmartVector {
        assert_eq!(self.len(), other.len(), "length mismatch in pointwise operation");
        if let (SmartVector::Constant { value: a, len }, SmartVector::Constant { value: b, .. }) =
            (self, other)
        {
            return SmartVector::constant(f(*a, *b), *len);
        }
        let n = self.len();
        let out: Vec<F> = if n >= PAR_THRESHOLD {
            (0..n).into_par_iter().map(|i| f(self.get(i), other.get(i))).collect()
        } else {
            (0..n).map(|i| f(self.get(i), other.get(i))).collect()
        };
        SmartVector::Regular(Arc::new(out))
    }

    /// Pointwise sum.
    pub fn add(&self, other: &SmartVector) -> SmartVector {
        self.zip_with(other, |a, b| a + b)
    }

    /// Pointwise difference.
    pub fn sub(&self, other: &SmartVector) -> SmartVector {
        self.zip_with(other, |a, b| a - b)
    }

    /// Pointwise product.
    pub fn mul(&self, other: &SmartVector) -> SmartVector {
        self.zip_with(other, |a, b| a * b)
    }

    /// Scalar multiple.
    pub fn scale(&self, scalar: F) -> SmartVector {
        match self {
            SmartVector::Constant { value, len } => SmartVector::constant(*value * scalar, *len),
            _ => SmartVector::Regular(Arc::new(self.iter().map(|v| v * scalar).collect())),
        }
    }

    /// True iff every entry is zero.
    pub fn is_zero(&self) -> bool {
        match self {
            SmartVector::Constant { value, .. } => value.is_zero(),
            _ => self.iter().all(|v| v.is_zero()),
        }
    }
}

/// Equality of the observed sequences, regardless of representation.
impl PartialEq for SmartVector {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for SmartVector {}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;

    #[test]
    fn equality_ignores_representation() {
        let a = SmartVector::constant(F::from(7u64), 4);
        let b = SmartVector::from_u64s(&[7, 7, 7, 7]);
        assert_eq!(a, b);

        let c = SmartVector::padded(vec![F::from(7u64); 2], F::from(7u64), 4);
        assert_eq!(a, c);
    }

    #[test]
    fn rotation_is_cyclic_and_collapses() {
        let v = SmartVector::from_u64s(&[0, 1, 2, 3]);
        let r = v.rotate(1);
        assert_eq!(r.get(0), F::one());
        assert_eq!(r.get(3), F::zero());

        // rotate(1) twice == rotate(2); negative rotation wraps.
        assert_eq!(r.rotate(1), v.rotate(2));
        assert_eq!(v.rotate(-1), v.rotate(3));

        // A constant is rotation-invariant.
        let c = SmartVector::constant(F::one(), 8);
        assert_eq!(c.rotate(5), c);
    }

    #[test]
    fn fft_round_trip_matches_identity() {
        let v = SmartVector::from_u64s(&[3, 1, 4, 1, 5, 9, 2, 6]);
        let round = v.fft(Direction::Forward, false).fft(Direction::Inverse, false);
        assert_eq!(round, v);
    }

    #[test]
    fn linear_combination_of_constants_stays_constant() {
        let a = SmartVector::constant(F::from(2u64), 8);
        let b = SmartVector::constant(F::from(3u64), 8);
        let lc = SmartVector::linear_combination(&[F::from(10u64), F::one()], &[a, b]);
        assert!(matches!(lc, SmartVector::Constant { .. }));
        assert_eq!(lc.get(5), F::from(23u64));
    }

    #[test]
    fn pointwise_ops() {
        let a = SmartVector::from_u64s(&[1, 2, 3, 4]);
        let b = SmartVector::constant(F::from(10u64), 4);
        assert_eq!(a.add(&b), SmartVector::from_u64s(&[11, 12, 13, 14]));
        assert_eq!(b.sub(&a), SmartVector::from_u64s(&[9, 8, 7, 6]));
        assert_eq!(a.mul(&a), SmartVector::from_u64s(&[1, 4, 9, 16]));
    }
}
