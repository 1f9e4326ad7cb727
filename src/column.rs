//! Columns: named polynomial-valued oracles.
//!
//! The registry stores *declarations* ([`ColumnDecl`]) keyed by [`ColId`];
//! everything else manipulates [`ColumnRef`]s, which reference declarations by
//! id and resolve to concrete values only at use time. Storing ids rather than
//! values is what keeps the column/query graph acyclic: a query may reference
//! a column whose status a later compiler pass changes, and the reference
//! stays valid.

use serde::{Deserialize, Serialize};

use crate::coin::CoinName;
use crate::query::QueryId;

/// Column identifier, unique within a registry.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColId(pub String);

impl ColId {
    /// Derived identifier `{self}_{suffix}`, used by compiler passes when they
    /// register companions of an existing column.
    pub fn derived(&self, suffix: &str) -> ColId {
        ColId(format!("{}_{}", self.0, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ColId {
    fn from(s: &str) -> Self {
        ColId(s.to_owned())
    }
}

impl From<String> for ColId {
    fn from(s: String) -> Self {
        ColId(s)
    }
}

impl std::fmt::Display for ColId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for ColId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ColId({})", self.0)
    }
}

/// Lifecycle status of a column.
///
/// The definer creates columns as `Committed` (oracle messages) or
/// `Precomputed` (known to both sides ahead of time). Compiler passes move
/// columns across the remaining statuses; [`Status::may_become`] is the
/// transition filter the registry enforces.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Status {
    /// Known to both sides before the protocol runs. Terminal.
    Precomputed,
    /// An oracle message: absorbed by the transcript, not sent in the clear.
    Committed,
    /// Sent in the clear as part of the proof.
    Proof,
    /// Reconstructed by the verifier from other runtime data; never assigned
    /// by the prover and never part of the proof.
    VerifierDefined,
    /// Superseded by a compiler pass; still assignable (later steps may read
    /// it) but absent from the transcript and the proof.
    Ignored,
}

impl Status {
    /// Whether the prover runtime accepts assignments for this status.
    pub fn assignable(self) -> bool {
        matches!(self, Status::Committed | Status::Proof | Status::Ignored)
    }

    /// Whether the Fiat–Shamir transcript absorbs columns of this status.
    pub fn absorbed(self) -> bool {
        matches!(self, Status::Committed | Status::Proof)
    }

    /// Whether the column's assignment is shipped in the proof.
    pub fn in_proof(self) -> bool {
        matches!(self, Status::Proof)
    }

    /// Status-transition filter for [`set_status`](crate::CompiledIop::set_status).
    ///
    /// `Proof` may be promoted to `Committed` or `Ignored` (self-recursion);
    /// `Committed` may surface as `Proof` (dummy compilation) or retire to
    /// `Ignored` when a pass replaces the commitment by another
    /// representation. `Precomputed` is terminal.
    pub fn may_become(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Proof, Status::Committed)
                | (Status::Proof, Status::Ignored)
                | (Status::Committed, Status::Proof)
                | (Status::Committed, Status::Ignored)
        )
    }
}

/// A column declaration as stored in the registry.
#[derive(Clone, Debug)]
pub struct ColumnDecl {
    pub id: ColId,
    /// Round of definition. A column's round is at least the round of every
    /// column it depends on.
    pub round: usize,
    /// Number of entries; a power of two for natural columns.
    pub size: usize,
    pub status: Status,
}

/// Reference to a column value, resolved against a runtime at use time.
#[derive(Clone, PartialEq, Debug)]
pub enum ColumnRef {
    /// A registered column, by id.
    Natural(ColId),
    /// Cyclic shift of a parent: entry `i` reads entry `(i + offset) mod n`
    /// of the parent.
    Shifted { inner: Box<ColumnRef>, offset: i64 },
    /// Verifier-defined column populated from the alleged Ys of a univariate
    /// query: entry `j` is the claimed evaluation of `ranges[j]`, or zero if
    /// that column is not part of the query.
    FromYs { query: QueryId, ranges: Vec<ColId> },
    /// Verifier-defined random linear combination of the parents by powers of
    /// a field coin: `Σᵢ coinⁱ · parentᵢ`.
    RandLinComb { coin: CoinName, parents: Vec<ColumnRef> },
}

impl ColumnRef {
    /// Reference a registered column by id.
    pub fn natural(id: impl Into<ColId>) -> Self {
        ColumnRef::Natural(id.into())
    }

    /// Shift by `offset`, collapsing nested shifts.
    pub fn shift(self, offset: i64) -> Self {
        match self {
            ColumnRef::Shifted { inner, offset: prior } => {
                ColumnRef::Shifted { inner, offset: prior + offset }
            }
            other => ColumnRef::Shifted { inner: Box::new(other), offset },
        }
    }

    /// Ids of every natural column this reference reads, in reference order.
    pub fn natural_ids(&self) -> Vec<ColId> {
        let mut out = Vec::new();
        self.collect_natural_ids(&mut out);
        out
    }

    fn collect_natural_ids(&self, out: &mut Vec<ColId>) {
        match self {
            ColumnRef::Natural(id) => out.push(id.clone()),
            ColumnRef::Shifted { inner, .. } => inner.collect_natural_ids(out),
            ColumnRef::FromYs { .. } => {}
            ColumnRef::RandLinComb { parents, .. } => {
                for p in parents {
                    p.collect_natural_ids(out);
                }
            }
        }
    }

    /// Coins this reference samples (only `RandLinComb` does).
    pub fn coin_names(&self) -> Vec<CoinName> {
        match self {
            ColumnRef::RandLinComb { coin, parents } => {
                let mut out = vec![coin.clone()];
                for p in parents {
                    out.extend(p.coin_names());
                }
                out
            }
            ColumnRef::Shifted { inner, .. } => inner.coin_names(),
            _ => Vec::new(),
        }
    }

    /// Stable display form, used in error messages and canonical bytes.
    pub fn display_id(&self) -> String {
        match self {
            ColumnRef::Natural(id) => id.0.clone(),
            ColumnRef::Shifted { inner, offset } => {
                format!("SHIFT_{}_{}", offset, inner.display_id())
            }
            ColumnRef::FromYs { query, .. } => format!("FROM_YS_{}", query),
            ColumnRef::RandLinComb { coin, .. } => format!("RLC_{}", coin),
        }
    }
}

impl From<ColId> for ColumnRef {
    fn from(id: ColId) -> Self {
        ColumnRef::Natural(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_collapse() {
        let p = ColumnRef::natural("P").shift(1).shift(2);
        match p {
            ColumnRef::Shifted { ref inner, offset } => {
                assert_eq!(offset, 3);
                assert_eq!(**inner, ColumnRef::natural("P"));
            }
            _ => panic!("expected a shifted reference"),
        }
    }

    #[test]
    fn status_transitions() {
        assert!(Status::Proof.may_become(Status::Committed));
        assert!(Status::Proof.may_become(Status::Ignored));
        assert!(Status::Committed.may_become(Status::Proof));
        assert!(Status::Committed.may_become(Status::Ignored));
        assert!(!Status::Precomputed.may_become(Status::Ignored));
        assert!(!Status::Ignored.may_become(Status::Proof));
        assert!(!Status::VerifierDefined.may_become(Status::Proof));
    }
}
