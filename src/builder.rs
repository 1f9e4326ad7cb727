//! Definer-facing builder.
//!
//! A definer populates the registry through this thin layer, which picks the
//! declaration rounds automatically: committed columns land at round 0 unless
//! placed explicitly, and each query lands at the latest round among the
//! entities it references (the round at which its parameters can exist).

use crate::coin::{CoinKind, CoinName};
use crate::column::{ColId, ColumnRef, Status};
use crate::expression::Expression;
use crate::query::QueryId;
use crate::registry::CompiledIop;
use crate::smartvectors::SmartVector;

/// Mutable view over a registry under definition.
pub struct Builder {
    comp: CompiledIop,
}

impl Builder {
    pub(crate) fn new() -> Self {
        Self { comp: CompiledIop::new() }
    }

    pub(crate) fn into_compiled(self) -> CompiledIop {
        self.comp
    }

    /// Access the underlying registry, for dedicated sub-protocols that
    /// register their own columns and steps (e.g. the low-degree check).
    pub fn compiled(&mut self) -> &mut CompiledIop {
        &mut self.comp
    }

    /// Register a committed column at round 0.
    pub fn register_commit(&mut self, id: impl Into<ColId>, size: usize) -> ColumnRef {
        self.comp.register_column(0, id, size, Status::Committed)
    }

    /// Register a committed column at an explicit round.
    pub fn register_commit_at(
        &mut self,
        round: usize,
        id: impl Into<ColId>,
        size: usize,
    ) -> ColumnRef {
        self.comp.register_column(round, id, size, Status::Committed)
    }

    /// Register a precomputed column, known to both sides.
    pub fn register_precomputed(
        &mut self,
        id: impl Into<ColId>,
        values: SmartVector,
    ) -> ColumnRef {
        self.comp.register_precomputed(id, values)
    }

    /// Register a verifier coin.
    pub fn register_coin(&mut self, name: impl Into<CoinName>, round: usize, kind: CoinKind) {
        self.comp.register_coin(round, name, kind);
    }

    /// Cyclic shift of a column reference. Pure sugar over
    /// [`ColumnRef::shift`].
    pub fn shift(&self, col: ColumnRef, offset: i64) -> ColumnRef {
        col.shift(offset)
    }

    /// Register a global constraint: `expr` vanishes on every row.
    pub fn global(&mut self, id: impl Into<QueryId>, size: usize, expr: Expression) {
        let round = self.expr_round(&expr);
        self.comp.insert_global(round, id, size, expr);
    }

    /// Register a local opening of (row 0 of) `col`.
    pub fn local_opening(&mut self, id: impl Into<QueryId>, col: ColumnRef) {
        let round = self.comp.ref_round(&col);
        self.comp.insert_local_opening(round, id, col);
    }

    /// Register a univariate evaluation claim over `cols`.
    pub fn univariate_eval(&mut self, id: impl Into<QueryId>, cols: Vec<ColumnRef>) {
        let round = cols.iter().map(|c| self.comp.ref_round(c)).max().unwrap_or(0);
        self.comp.insert_univariate_eval(round, id, cols);
    }

    /// Register a fixed-permutation claim.
    pub fn fixed_permutation(
        &mut self,
        id: impl Into<QueryId>,
        sigma: Vec<u64>,
        left: Vec<ColumnRef>,
        right: Vec<ColumnRef>,
    ) {
        let round = left
            .iter()
            .chain(right.iter())
            .map(|c| self.comp.ref_round(c))
            .max()
            .unwrap_or(0);
        self.comp.insert_fixed_permutation(round, id, sigma, left, right);
    }

    /// Register a range claim on `col`.
    pub fn range(&mut self, id: impl Into<QueryId>, col: ColumnRef, bits: usize) {
        let round = self.comp.ref_round(&col);
        self.comp.insert_range(round, id, col, bits);
    }

    /// Register an inner-product claim.
    pub fn inner_product(&mut self, id: impl Into<QueryId>, a: ColumnRef, b: ColumnRef) {
        let round = self.comp.ref_round(&a).max(self.comp.ref_round(&b));
        self.comp.insert_inner_product(round, id, a, b);
    }

    fn expr_round(&self, expr: &Expression) -> usize {
        let board = expr.board();
        let col_round = board
            .columns
            .iter()
            .map(|&c| self.comp.ref_round(c))
            .max()
            .unwrap_or(0);
        let coin_round = board
            .coins
            .iter()
            .map(|&n| self.comp.coin(n).map(|d| d.round).unwrap_or(0))
            .max()
            .unwrap_or(0);
        col_round.max(coin_round)
    }
}
