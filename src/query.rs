//! Queries: testable assertions over columns.
//!
//! A query declares *what* the verifier will check; some kinds additionally
//! carry runtime parameters (the prover's claims) that travel with the proof.
//! The verifier evaluates the underlying algebraic predicate in
//! [`crate::verifier`]; the definitions here are pure data.

use serde::{Deserialize, Serialize};

use crate::column::ColumnRef;
use crate::expression::Expression;
use crate::F;

/// Query identifier, unique within a registry.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueryId(pub String);

impl QueryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QueryId {
    fn from(s: &str) -> Self {
        QueryId(s.to_owned())
    }
}

impl From<String> for QueryId {
    fn from(s: String) -> Self {
        QueryId(s)
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QueryId({})", self.0)
    }
}

/// The testable predicate a query stands for.
#[derive(Clone, Debug)]
pub enum QueryKind {
    /// Polynomial identity over all rows: the expression row-evaluates to
    /// zero on `[0, size)`.
    Global { size: usize, expr: Expression },
    /// Assertion at row 0 of the (possibly shifted) column; the claimed value
    /// is a runtime parameter.
    LocalOpening { col: ColumnRef },
    /// Claim that each column, read as a coefficient table, evaluates to the
    /// matching Y at a single point X. X and the Ys are runtime parameters.
    UnivariateEval { cols: Vec<ColumnRef> },
    /// The concatenated right columns equal the sigma-permutation of the
    /// concatenated left columns: `right[i] == left[sigma[i]]`.
    FixedPermutation {
        sigma: Vec<u64>,
        left: Vec<ColumnRef>,
        right: Vec<ColumnRef>,
    },
    /// Inner product of two columns; the claimed scalar is a runtime
    /// parameter.
    InnerProduct { a: ColumnRef, b: ColumnRef },
    /// Every entry of the column, read as an integer, is below `2^bits`.
    Range { col: ColumnRef, bits: usize },
}

impl QueryKind {
    /// Whether this kind carries runtime parameters the prover must assign.
    pub fn needs_params(&self) -> bool {
        matches!(
            self,
            QueryKind::LocalOpening { .. }
                | QueryKind::UnivariateEval { .. }
                | QueryKind::InnerProduct { .. }
        )
    }

    /// Every column reference the query reads.
    pub fn column_refs(&self) -> Vec<&ColumnRef> {
        match self {
            QueryKind::Global { expr, .. } => expr.board().columns,
            QueryKind::LocalOpening { col } => vec![col],
            QueryKind::UnivariateEval { cols } => cols.iter().collect(),
            QueryKind::FixedPermutation { left, right, .. } => {
                left.iter().chain(right.iter()).collect()
            }
            QueryKind::InnerProduct { a, b } => vec![a, b],
            QueryKind::Range { col, .. } => vec![col],
        }
    }
}

/// A query declaration as stored in the registry.
#[derive(Clone, Debug)]
pub struct QueryDecl {
    pub id: QueryId,
    /// Round at which the query's parameters become available.
    pub round: usize,
    pub kind: QueryKind,
    /// Set by compiler passes that replace the query's check with their own;
    /// the verifier runtime skips ignored queries.
    pub ignored: bool,
}

/// Runtime parameters (the prover's claims) for queries that carry them.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum QueryParams {
    LocalOpening { y: F },
    UnivariateEval { x: F, ys: Vec<F> },
    InnerProduct { ip: F },
}

impl QueryParams {
    /// Field elements absorbed by the transcript, in a fixed order.
    pub fn transcript_elements(&self) -> Vec<F> {
        match self {
            QueryParams::LocalOpening { y } => vec![*y],
            QueryParams::UnivariateEval { x, ys } => {
                let mut out = Vec::with_capacity(1 + ys.len());
                out.push(*x);
                out.extend_from_slice(ys);
                out
            }
            QueryParams::InnerProduct { ip } => vec![*ip],
        }
    }
}
