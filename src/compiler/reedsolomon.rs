//! Low-degree check for evaluation-form columns.
//!
//! `check_reed_solomon(comp, rate, col)` enforces that `col`, read as
//! evaluations over its power-of-two domain, is a codeword of the given rate:
//! its interpolation has degree below `len / rate`. The sub-protocol commits
//! the coefficient table, lets the verifier sample a random point one round
//! later, claims the coefficient evaluation there through a univariate query,
//! and adds a verifier step comparing the claim against the barycentric
//! interpolation of the codeword at the same point.
//!
//! A prover whose column is not low-degree fails inside its own step (the
//! high coefficients are non-zero) before anything is claimed.

use crate::coin::CoinKind;
use crate::column::{ColumnRef, Status};
use crate::fft::{self, Direction};
use crate::query::{QueryId, QueryParams};
use crate::registry::{CompiledIop, UsageError};
use crate::smartvectors::SmartVector;
use crate::verifier::VerifierError;

/// Register the low-degree sub-protocol for `col` with the given rate
/// (a power of two, at least 2).
pub fn check_reed_solomon(comp: &mut CompiledIop, rate: usize, col: ColumnRef) {
    assert!(rate.is_power_of_two() && rate >= 2, "reed-solomon rate {rate} is invalid");
    let size = comp.ref_size(&col);
    let round = comp.ref_round(&col);
    let degree = size / rate;
    assert!(degree >= 1, "rate {rate} leaves no coefficients for size {size}");

    let tag = col.display_id();
    let coeffs_id = crate::column::ColId(format!("RS_COEFFS_{tag}"));
    let coin_name = crate::coin::CoinName(format!("RS_X_{tag}"));
    let query_id = QueryId(format!("RS_EVAL_{tag}"));

    comp.register_column(round, coeffs_id.clone(), degree, Status::Committed);
    comp.register_coin(round + 1, coin_name.clone(), CoinKind::Field);
    comp.insert_univariate_eval(
        round + 1,
        query_id.clone(),
        vec![ColumnRef::Natural(coeffs_id.clone())],
    );

    // Prover, commitment round: extract and commit the coefficients.
    let step_col = col.clone();
    let step_coeffs = coeffs_id.clone();
    comp.add_prover_step(round, format!("reed-solomon/coeffs/{tag}"), move |rt| {
        let mut values = rt.get_column(&step_col)?.to_vec();
        fft::ntt_in_place(&mut values, Direction::Inverse);
        if values[degree..].iter().any(|v| !ark_ff::Zero::is_zero(v)) {
            return Err(UsageError::NotLowDegree { column: step_col.display_id() });
        }
        values.truncate(degree);
        rt.assign_column(step_coeffs.clone(), SmartVector::regular(values))
    });

    // Prover, query round: open the coefficients at the sampled point.
    let step_coeffs = coeffs_id;
    let step_coin = coin_name.clone();
    let step_query = query_id.clone();
    comp.add_prover_step(round + 1, format!("reed-solomon/open/{tag}"), move |rt| {
        let x = rt.get_coin_field(step_coin.clone())?;
        let coeffs = rt.get_column(&ColumnRef::Natural(step_coeffs.clone()))?;
        let y = fft::horner(&coeffs.to_vec(), x);
        rt.assign_univariate(step_query.clone(), x, vec![y])
    });

    // Verifier, query round: the claim must sit at the sampled point and
    // agree with the codeword's interpolation there.
    let check_tag = tag.clone();
    comp.add_verifier_step(round + 1, format!("reed-solomon/check/{tag}"), move |rt| {
        let x = rt.get_coin_field(coin_name.clone())?;
        let (x_claimed, ys) = match rt.get_query_params(&query_id)? {
            QueryParams::UnivariateEval { x, ys } => (x, ys),
            _ => unreachable!("univariate parameters"),
        };
        let fail = |detail: String| VerifierError::Constraint {
            query: query_id.0.clone(),
            detail,
        };
        if x_claimed != x {
            return Err(fail("claim is not at the sampled point".into()));
        }
        let codeword = rt.get_column(&col)?.to_vec();
        if fft::interpolate_at(&codeword, x) != ys[0] {
            return Err(fail(format!("column {check_tag} is not low-degree at the sampled point")));
        }
        Ok(())
    });
}
