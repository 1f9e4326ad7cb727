//! Shared runtime plumbing for the prover and verifier.
//!
//! Both runtimes expose the same lookups (natural column assignments, sampled
//! coins, query parameters); the composite column references (`Shifted`,
//! `FromYs`, `RandLinComb`) resolve on top of those lookups identically on
//! both sides, so the resolution lives here.

use std::collections::HashMap;

use ark_ff::One;

use crate::coin::{CoinName, CoinValue};
use crate::column::{ColId, ColumnRef};
use crate::query::{QueryId, QueryKind, QueryParams};
use crate::registry::{CompiledIop, UsageError};
use crate::smartvectors::SmartVector;
use crate::F;

/// Lookup surface a runtime offers to reference resolution.
pub trait Runtime {
    fn comp(&self) -> &CompiledIop;
    /// Assignment of a registered non-precomputed column.
    fn natural_column(&self, id: &ColId) -> Result<SmartVector, UsageError>;
    /// Value of a sampled coin.
    fn coin(&self, name: &CoinName) -> Result<CoinValue, UsageError>;
    /// Parameters of a query, if assigned.
    fn query_params(&self, id: &QueryId) -> Result<QueryParams, UsageError>;
}

/// Field value of a coin, or a kind error.
pub fn coin_field<R: Runtime + ?Sized>(rt: &R, name: &CoinName) -> Result<F, UsageError> {
    rt.coin(name)?
        .as_field()
        .ok_or_else(|| UsageError::WrongCoinKind { name: name.0.clone() })
}

/// Resolve a column reference to its concrete value.
pub fn resolve_column_ref<R: Runtime + ?Sized>(
    rt: &R,
    r: &ColumnRef,
) -> Result<SmartVector, UsageError> {
    match r {
        ColumnRef::Natural(id) => match rt.comp().precomputed(id) {
            Some(v) => Ok(v.clone()),
            None => rt.natural_column(id),
        },
        ColumnRef::Shifted { inner, offset } => {
            Ok(resolve_column_ref(rt, inner)?.rotate(*offset))
        }
        ColumnRef::FromYs { query, ranges } => from_ys(rt, query, ranges),
        ColumnRef::RandLinComb { coin, parents } => {
            let r = coin_field(rt, coin)?;
            let vectors = parents
                .iter()
                .map(|p| resolve_column_ref(rt, p))
                .collect::<Result<Vec<_>, _>>()?;
            let mut coeffs = Vec::with_capacity(vectors.len());
            let mut pow = F::one();
            for _ in 0..vectors.len() {
                coeffs.push(pow);
                pow *= r;
            }
            Ok(SmartVector::linear_combination(&coeffs, &vectors))
        }
    }
}

/// Populate a verifier column from the alleged Ys of a univariate query:
/// entry `j` is the claimed evaluation of `ranges[j]`, or zero when that
/// column is not part of the query.
fn from_ys<R: Runtime + ?Sized>(
    rt: &R,
    query: &QueryId,
    ranges: &[ColId],
) -> Result<SmartVector, UsageError> {
    let decl = rt
        .comp()
        .query(query)
        .ok_or_else(|| UsageError::NotRegistered { what: query.0.clone() })?;
    let cols = match &decl.kind {
        QueryKind::UnivariateEval { cols } => cols,
        _ => return Err(UsageError::WrongParamsKind { query: query.0.clone() }),
    };
    let ys = match rt.query_params(query)? {
        QueryParams::UnivariateEval { ys, .. } => ys,
        _ => return Err(UsageError::WrongParamsKind { query: query.0.clone() }),
    };

    let mut by_id: HashMap<&ColId, F> = HashMap::new();
    for (col, y) in cols.iter().zip(ys.iter()) {
        if let ColumnRef::Natural(id) = col {
            by_id.insert(id, *y);
        }
    }
    let values = ranges
        .iter()
        .map(|id| by_id.get(id).copied().unwrap_or_default())
        .collect();
    Ok(SmartVector::regular(values))
}
