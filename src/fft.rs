//! Radix-2 number-theoretic transforms over `F`.
//!
//! The column model works over power-of-two evaluation domains, i.e. the
//! 2-adic subgroups of `F*`. This module provides the in-place forward and
//! inverse transforms (with optional coset shift), barycentric interpolation
//! of an evaluation table at an off-domain point, Horner evaluation of a
//! coefficient table, and a batch helper that transforms many polynomials in
//! parallel.
//!
//! Domain sizes that are not powers of two are programmer errors and panic.

use ark_ff::{batch_inversion, FftField, Field, One, Zero};
use rayon::prelude::*;

use crate::F;

/// Transform direction for [`ntt_in_place`] and friends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Coefficients to evaluations.
    Forward,
    /// Evaluations to coefficients.
    Inverse,
}

/// Generator of the order-`n` subgroup of `F*`. Panics if `n` is not a power
/// of two within the field's two-adicity.
pub fn root_of_unity(n: usize) -> F {
    assert!(n.is_power_of_two(), "domain size {n} is not a power of two");
    F::get_root_of_unity(n as u64).expect("domain size exceeds the field two-adicity")
}

fn bit_reverse_permute(values: &mut [F]) {
    let n = values.len();
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = (i as u32).reverse_bits() >> (32 - bits);
        let j = j as usize;
        if i < j {
            values.swap(i, j);
        }
    }
}

/// In-place radix-2 transform. `Forward` maps a coefficient table to the
/// evaluations over the subgroup; `Inverse` maps back (including the `1/n`
/// scaling). Panics if the length is not a power of two.
pub fn ntt_in_place(values: &mut [F], direction: Direction) {
    let n = values.len();
    assert!(n.is_power_of_two(), "transform length {n} is not a power of two");
    if n <= 1 {
        return;
    }

    let omega = match direction {
        Direction::Forward => root_of_unity(n),
        Direction::Inverse => root_of_unity(n)
            .inverse()
            .expect("root of unity is non-zero"),
    };

    bit_reverse_permute(values);

    let mut len = 2;
    while len <= n {
        let step = omega.pow([(n / len) as u64]);
        for chunk in values.chunks_mut(len) {
            let mut w = F::one();
            let half = len / 2;
            for i in 0..half {
                let lo = chunk[i];
                let hi = chunk[i + half] * w;
                chunk[i] = lo + hi;
                chunk[i + half] = lo - hi;
                w *= step;
            }
        }
        len <<= 1;
    }

    if direction == Direction::Inverse {
        let n_inv = F::from(n as u64).inverse().expect("n is non-zero mod p");
        for v in values.iter_mut() {
            *v *= n_inv;
        }
    }
}

/// Coset variant: `Forward` evaluates over `g·H` (multiply coefficients by
/// powers of the multiplicative generator `g` first), `Inverse` undoes it.
pub fn ntt_in_place_coset(values: &mut [F], direction: Direction) {
    let g = F::GENERATOR;
    match direction {
        Direction::Forward => {
            scale_by_powers(values, g);
            ntt_in_place(values, Direction::Forward);
        }
        Direction::Inverse => {
            ntt_in_place(values, Direction::Inverse);
            let g_inv = g.inverse().expect("generator is non-zero");
            scale_by_powers(values, g_inv);
        }
    }
}

fn scale_by_powers(values: &mut [F], base: F) {
    let mut pow = F::one();
    for v in values.iter_mut() {
        *v *= pow;
        pow *= base;
    }
}

/// Transform many polynomials of the same length at once. The per-polynomial
/// work is independent, so the batch is data-parallel.
pub fn ntt_batch(polys: &mut [Vec<F>], direction: Direction) {
    polys
        .par_iter_mut()
        .for_each(|p| ntt_in_place(p, direction));
}

/// Horner evaluation of a coefficient table at `x`.
pub fn horner(coeffs: &[F], x: F) -> F {
    let mut acc = F::zero();
    for c in coeffs.iter().rev() {
        acc = acc * x + c;
    }
    acc
}

/// Barycentric evaluation at `x` of the polynomial interpolating `evals` over
/// the order-`n` subgroup: `P(x) = (xⁿ − 1)/n · Σᵢ ωⁱ·vᵢ/(x − ωⁱ)`.
///
/// If `x` lies on the domain the corresponding table entry is returned
/// directly.
pub fn interpolate_at(evals: &[F], x: F) -> F {
    let n = evals.len();
    assert!(n.is_power_of_two(), "evaluation table length {n} is not a power of two");
    let omega = root_of_unity(n);

    // Denominators x − ωⁱ, inverted in batch.
    let mut denoms = Vec::with_capacity(n);
    let mut w = F::one();
    for i in 0..n {
        let d = x - w;
        if d.is_zero() {
            return evals[i];
        }
        denoms.push(d);
        w *= omega;
    }
    batch_inversion(&mut denoms);

    let mut sum = F::zero();
    let mut w = F::one();
    for i in 0..n {
        sum += evals[i] * w * denoms[i];
        w *= omega;
    }

    let zh = x.pow([n as u64]) - F::one();
    let n_inv = F::from(n as u64).inverse().expect("n is non-zero mod p");
    zh * n_inv * sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slow_dft(coeffs: &[F]) -> Vec<F> {
        let n = coeffs.len();
        let omega = root_of_unity(n);
        (0..n)
            .map(|i| horner(coeffs, omega.pow([i as u64])))
            .collect()
    }

    #[test]
    fn forward_matches_slow_dft() {
        let coeffs: Vec<F> = (0..16u64).map(F::from).collect();
        let mut evals = coeffs.clone();
        ntt_in_place(&mut evals, Direction::Forward);
        assert_eq!(evals, slow_dft(&coeffs));
    }

    #[test]
    fn inverse_round_trip() {
        let coeffs: Vec<F> = (5..5 + 32u64).map(F::from).collect();
        let mut work = coeffs.clone();
        ntt_in_place(&mut work, Direction::Forward);
        ntt_in_place(&mut work, Direction::Inverse);
        assert_eq!(work, coeffs);
    }

    #[test]
    fn batch_matches_single_transforms() {
        let polys: Vec<Vec<F>> = (0..4u64)
            .map(|p| (0..16u64).map(|i| F::from(p * 100 + i)).collect())
            .collect();
        let mut batched = polys.clone();
        ntt_batch(&mut batched, Direction::Forward);
        for (mut poly, transformed) in polys.into_iter().zip(batched) {
            ntt_in_place(&mut poly, Direction::Forward);
            assert_eq!(poly, transformed);
        }
    }

    #[test]
    fn coset_round_trip() {
        let coeffs: Vec<F> = (1..=8u64).map(F::from).collect();
        let mut work = coeffs.clone();
        ntt_in_place_coset(&mut work, Direction::Forward);
        ntt_in_place_coset(&mut work, Direction::Inverse);
        assert_eq!(work, coeffs);
    }

    #[test]
    fn interpolation_agrees_with_horner() {
        let coeffs: Vec<F> = (0..8u64).map(|i| F::from(3 * i + 1)).collect();
        let mut evals = coeffs.clone();
        ntt_in_place(&mut evals, Direction::Forward);

        let x = F::from(987654321u64);
        assert_eq!(interpolate_at(&evals, x), horner(&coeffs, x));

        // On-domain point returns the table entry.
        let omega = root_of_unity(8);
        assert_eq!(interpolate_at(&evals, omega.pow([3])), evals[3]);
    }
}
