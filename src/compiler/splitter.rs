//! Column splitter.
//!
//! Rewrites every committed or proof column larger than the target size into
//! power-of-two sub-columns of exactly the target size, re-routing the
//! queries that read them:
//!
//! - local openings move into the owning chunk (with the residual shift);
//! - univariate evaluations are re-issued over the sub-columns, and a
//!   verifier step checks the coefficient-basis recombination
//!   `y = Σₖ x^(k·target) · yₖ`;
//! - shift-free global constraints are re-issued once per chunk (periodic
//!   samples survive when the target is a multiple of their period).
//!
//! Shifted references into a split column, split precomputed columns and
//! split columns under permutation/inner-product/range queries are outside
//! this pass's contract and panic naming the offender.

use std::collections::{BTreeMap, BTreeSet};

use ark_ff::{Field, One};
use tracing::debug;

use crate::column::{ColId, ColumnRef, Status};
use crate::compiler::CompilerPass;
use crate::fft;
use crate::query::{QueryId, QueryKind, QueryParams};
use crate::registry::CompiledIop;
use crate::verifier::VerifierError;
use crate::F;

/// How the Ys of a rewritten univariate query line up with the original ones.
enum YLayout {
    /// Original column untouched; one Y at this position of the new query.
    Kept { new_index: usize },
    /// Original column split; the chunk Ys occupy `new_indices` in order.
    Split { new_indices: Vec<usize> },
}

/// Build the splitting pass for the given target size (a power of two).
pub fn split_columns(target: usize) -> CompilerPass {
    assert!(target.is_power_of_two(), "split target {target} is not a power of two");
    Box::new(move |comp| apply(comp, target))
}

fn apply(mut comp: CompiledIop, target: usize) -> CompiledIop {
    // Snapshot of the columns to split.
    let mut split: BTreeMap<ColId, usize> = BTreeMap::new();
    for id in comp.all_column_ids() {
        let decl = comp.column(id).expect("registered id");
        if decl.size <= target {
            continue;
        }
        match decl.status {
            Status::Committed | Status::Proof => {
                split.insert(id.clone(), decl.size);
            }
            Status::Precomputed => {
                panic!("splitter: precomputed column {id} exceeds the target size")
            }
            _ => {}
        }
    }
    if split.is_empty() {
        return comp;
    }
    debug!(columns = split.len(), target, "splitting oversized columns");

    // Sub-column registration + slicing prover steps.
    for (id, size) in &split {
        let decl = comp.column(id).expect("registered id").clone();
        let chunks = size / target;
        for k in 0..chunks {
            comp.register_column(decl.round, sub_id(id, k), target, decl.status);
        }
        comp.set_status(id, Status::Ignored);

        let parent = id.clone();
        comp.add_prover_step(decl.round, format!("split/{parent}"), move |rt| {
            let values = rt.get_column(&ColumnRef::Natural(parent.clone()))?;
            for k in 0..chunks {
                rt.assign_column(sub_id(&parent, k), values.sub_range(k * target, (k + 1) * target))?;
            }
            Ok(())
        });
    }

    // Query rewrites over a snapshot of the declarations.
    let query_ids: Vec<QueryId> = comp.all_query_ids().cloned().collect();
    for qid in query_ids {
        let decl = comp.query(&qid).expect("registered id");
        if decl.ignored {
            continue;
        }
        let (round, kind) = (decl.round, decl.kind.clone());
        let touched: BTreeSet<ColId> = kind
            .column_refs()
            .iter()
            .flat_map(|r| r.natural_ids())
            .filter(|id| split.contains_key(id))
            .collect();
        if touched.is_empty() {
            continue;
        }

        match kind {
            QueryKind::LocalOpening { col } => {
                rewrite_local_opening(&mut comp, &qid, round, col, &split, target)
            }
            QueryKind::UnivariateEval { cols } => {
                rewrite_univariate(&mut comp, &qid, round, cols, &split, target)
            }
            QueryKind::Global { size, expr } => {
                rewrite_global(&mut comp, &qid, round, size, expr, &split, target)
            }
            _ => panic!("splitter: query {qid} kind is not supported over split columns"),
        }
    }

    comp
}

fn sub_id(parent: &ColId, chunk: usize) -> ColId {
    parent.derived(&format!("SPLIT_{chunk}"))
}

/// Root id and normalized row-0 offset of a (possibly shifted) natural
/// reference. Anything else is outside the splitter's contract.
fn shifted_natural(r: &ColumnRef, size: usize) -> (ColId, usize) {
    match r {
        ColumnRef::Natural(id) => (id.clone(), 0),
        ColumnRef::Shifted { inner, offset } => match inner.as_ref() {
            ColumnRef::Natural(id) => (id.clone(), offset.rem_euclid(size as i64) as usize),
            _ => panic!("splitter: nested composite reference {}", r.display_id()),
        },
        _ => panic!("splitter: composite reference {} cannot be split", r.display_id()),
    }
}

fn rewrite_local_opening(
    comp: &mut CompiledIop,
    qid: &QueryId,
    round: usize,
    col: ColumnRef,
    split: &BTreeMap<ColId, usize>,
    target: usize,
) {
    let size = split[&col.natural_ids()[0]];
    let (root, offset) = shifted_natural(&col, size);
    let chunk = offset / target;
    let rem = offset % target;
    let mut new_col = ColumnRef::Natural(sub_id(&root, chunk));
    if rem != 0 {
        new_col = new_col.shift(rem as i64);
    }

    let new_id = QueryId(format!("{qid}_SPLIT"));
    comp.insert_local_opening(round, new_id.clone(), new_col);
    comp.ignore_query(qid);

    let old_id = qid.clone();
    comp.add_prover_step(round, format!("split/transport/{old_id}"), move |rt| {
        match rt.get_query_params(&old_id)? {
            QueryParams::LocalOpening { y } => rt.assign_local_point(new_id.clone(), y),
            _ => unreachable!("local opening parameters"),
        }
    });
}

fn rewrite_univariate(
    comp: &mut CompiledIop,
    qid: &QueryId,
    round: usize,
    cols: Vec<ColumnRef>,
    split: &BTreeMap<ColId, usize>,
    target: usize,
) {
    let mut new_cols: Vec<ColumnRef> = Vec::new();
    let mut layout: Vec<YLayout> = Vec::new();
    for col in &cols {
        match col {
            ColumnRef::Natural(id) if split.contains_key(id) => {
                let chunks = split[id] / target;
                let indices = (0..chunks)
                    .map(|k| {
                        new_cols.push(ColumnRef::Natural(sub_id(id, k)));
                        new_cols.len() - 1
                    })
                    .collect();
                layout.push(YLayout::Split { new_indices: indices });
            }
            _ => {
                assert!(
                    col.natural_ids().iter().all(|id| !split.contains_key(id)),
                    "splitter: shifted reference into split column {}",
                    col.display_id()
                );
                new_cols.push(col.clone());
                layout.push(YLayout::Kept { new_index: new_cols.len() - 1 });
            }
        }
    }

    let new_id = QueryId(format!("{qid}_SPLIT"));
    comp.insert_univariate_eval(round, new_id.clone(), new_cols.clone());
    comp.ignore_query(qid);

    // Prover: evaluate every new column at the original point.
    let old_id = qid.clone();
    let prover_new_id = new_id.clone();
    comp.add_prover_step(round, format!("split/eval/{old_id}"), move |rt| {
        let x = match rt.get_query_params(&old_id)? {
            QueryParams::UnivariateEval { x, .. } => x,
            _ => unreachable!("univariate parameters"),
        };
        let ys = new_cols
            .iter()
            .map(|c| Ok(fft::horner(&rt.get_column(c)?.to_vec(), x)))
            .collect::<Result<Vec<F>, _>>()?;
        rt.assign_univariate(prover_new_id.clone(), x, ys)
    });

    // Verifier: the original claims recombine from the chunk claims in
    // coefficient basis.
    let old_id = qid.clone();
    comp.add_verifier_step(round, format!("split/recombine/{old_id}"), move |rt| {
        let (x_old, ys_old) = match rt.get_query_params(&old_id)? {
            QueryParams::UnivariateEval { x, ys } => (x, ys),
            _ => unreachable!("univariate parameters"),
        };
        let (x_new, ys_new) = match rt.get_query_params(&new_id)? {
            QueryParams::UnivariateEval { x, ys } => (x, ys),
            _ => unreachable!("univariate parameters"),
        };
        let fail = |detail: String| VerifierError::Constraint {
            query: old_id.0.clone(),
            detail,
        };
        if x_old != x_new {
            return Err(fail("split query evaluated at a different point".into()));
        }
        let x_pow_target = x_old.pow([target as u64]);
        for (i, entry) in layout.iter().enumerate() {
            let recombined = match entry {
                YLayout::Kept { new_index } => ys_new[*new_index],
                YLayout::Split { new_indices } => {
                    let mut acc = F::from(0u64);
                    let mut shift = F::one();
                    for &j in new_indices {
                        acc += shift * ys_new[j];
                        shift *= x_pow_target;
                    }
                    acc
                }
            };
            if recombined != ys_old[i] {
                return Err(fail(format!("chunk claims do not recombine at position {i}")));
            }
        }
        Ok(())
    });
}

fn rewrite_global(
    comp: &mut CompiledIop,
    qid: &QueryId,
    round: usize,
    size: usize,
    expr: crate::expression::Expression,
    split: &BTreeMap<ColId, usize>,
    target: usize,
) {
    // Every reference must be shift-free and split; periodic samples must
    // align with the chunk size.
    for col in expr.board().columns {
        let (root, offset) = shifted_natural(col, size);
        assert!(
            offset == 0,
            "splitter: global {qid} shifts column {root} across chunk boundaries"
        );
        assert!(
            split.contains_key(&root),
            "splitter: global {qid} mixes split and unsplit columns ({root})"
        );
    }
    assert_periods_align(&expr, target, qid);

    let chunks = size / target;
    for c in 0..chunks {
        let chunk_expr = expr.map_natural_ids(&|id| {
            if split.contains_key(id) {
                sub_id(id, c)
            } else {
                id.clone()
            }
        });
        comp.insert_global(round, QueryId(format!("{qid}_SPLIT_{c}")), target, chunk_expr);
    }
    comp.ignore_query(qid);
}

fn assert_periods_align(expr: &crate::expression::Expression, target: usize, qid: &QueryId) {
    use crate::expression::Expression as E;
    match expr {
        E::PeriodicSample { period, .. } => assert!(
            target % period == 0,
            "splitter: global {qid} samples period {period} across the chunk size {target}"
        ),
        E::Add(a, b) | E::Sub(a, b) | E::Mul(a, b) => {
            assert_periods_align(a, target, qid);
            assert_periods_align(b, target, qid);
        }
        _ => {}
    }
}
