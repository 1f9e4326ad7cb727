//! Vortex: batch commitment of the committed columns into hash digests.
//!
//! After this pass the verifier never receives a committed column in the
//! clear. Instead, per round, the prover sends one digest entry per matrix
//! position (`Dh_r[j]` hashes the round-`r` committed values at position
//! `j`); after the digests, the verifier samples `α` and receives the
//! α-combination row `Ualpha = Σᵢ αⁱ·rowᵢ`, then samples the integer-vector
//! coin `Q` and receives the matrix columns at the selected positions in
//! whole (the preimages). The vortex verifier step checks, per selected
//! position, that the preimages hash to the digest entries and match the
//! α-combination, and that every taken-over univariate claim is consistent
//! with `Ualpha`.
//!
//! Univariate queries over committed columns are re-issued over the full
//! committed row set (missing rows claim their own evaluations) so the
//! `Ualpha` consistency check closes over every row; the re-issued query is
//! what self-recursion later reads its alleged Ys from.
//!
//! Run the splitter first: the committed columns must share one size.

use ark_ff::{One, Zero};
use tracing::debug;

use crate::coin::{CoinKind, CoinName};
use crate::column::{ColId, ColumnRef, Status};
use crate::runtime::Runtime;
use crate::compiler::CompilerPass;
use crate::fft;
use crate::mimc;
use crate::query::{QueryId, QueryKind, QueryParams};
use crate::registry::CompiledIop;
use crate::smartvectors::SmartVector;
use crate::verifier::VerifierError;
use crate::F;

/// Tuning knobs of the vortex pass.
#[derive(Clone, Copy, Debug)]
pub struct VortexParams {
    /// Number of matrix positions the verifier opens.
    pub nb_opened_columns: usize,
}

impl Default for VortexParams {
    fn default() -> Self {
        Self { nb_opened_columns: 16 }
    }
}

/// Compilation bookkeeping the pass leaves on the registry; self-recursion
/// consumes it.
#[derive(Clone, Debug)]
pub struct VortexCtx {
    pub params: VortexParams,
    /// Shared size of the committed columns.
    pub width: usize,
    /// Committed column ids per round (dried rounds are absent).
    pub rows_by_round: Vec<(usize, Vec<ColId>)>,
    /// All committed column ids in global row order.
    pub row_ids: Vec<ColId>,
    /// Digest column per non-dried round.
    pub digests: Vec<(usize, ColId)>,
    pub alpha: CoinName,
    pub q: CoinName,
    pub ualpha: ColId,
    /// Opened preimage columns, in `Q` order.
    pub opened: Vec<ColId>,
    /// Power-of-two size of the opened columns (row count, padded).
    pub opened_size: usize,
    /// `(original, re-issued over all rows)` univariate query pairs.
    pub univariate: Vec<(QueryId, QueryId)>,
    /// Stamped by self-recursion: the vortex verifier step stands down, its
    /// work re-expressed as a sub-protocol.
    pub is_self_recursed: bool,
}

/// Build the vortex pass.
pub fn compile(params: VortexParams) -> CompilerPass {
    assert!(params.nb_opened_columns >= 1, "vortex must open at least one position");
    Box::new(move |comp| apply(comp, params))
}

fn apply(mut comp: CompiledIop, params: VortexParams) -> CompiledIop {
    // Snapshot the committed matrix.
    let mut rows_by_round: Vec<(usize, Vec<ColId>)> = Vec::new();
    for round in 0..comp.num_rounds() {
        let ids: Vec<ColId> = comp
            .columns_at_round(round)
            .iter()
            .filter(|&id| comp.column(id).expect("registered id").status == Status::Committed)
            .cloned()
            .collect();
        if !ids.is_empty() {
            rows_by_round.push((round, ids));
        }
    }
    if rows_by_round.is_empty() {
        return comp;
    }
    let row_ids: Vec<ColId> = rows_by_round.iter().flat_map(|(_, ids)| ids.clone()).collect();
    let width = comp
        .column(&row_ids[0])
        .expect("registered id")
        .size;
    for id in &row_ids {
        assert_eq!(
            comp.column(id).expect("registered id").size,
            width,
            "vortex: committed column {id} does not match the shared size (run the splitter first)"
        );
    }
    let num_rows = row_ids.len();
    let opened_size = num_rows.next_power_of_two();
    debug!(rows = num_rows, width, "vortex commits the committed matrix");

    // Take over the univariate queries on committed columns; no other query
    // kind may still read them.
    let univariate = take_over_queries(&mut comp, &row_ids);

    let r0 = comp.num_rounds();

    // Per-round digest columns.
    let mut digests = Vec::new();
    for (round, ids) in &rows_by_round {
        let dh_id = ColId(format!("VORTEX_DH_{round}"));
        comp.register_column(*round, dh_id.clone(), width, Status::Proof);
        digests.push((*round, dh_id.clone()));

        let ids = ids.clone();
        comp.add_prover_step(*round, format!("vortex/digest/{round}"), move |rt| {
            let cols = ids
                .iter()
                .map(|id| rt.get_column(&ColumnRef::Natural(id.clone())))
                .collect::<Result<Vec<_>, _>>()?;
            let values = (0..cols[0].len())
                .map(|j| mimc::hash_fields(cols.iter().map(|c| c.get(j))))
                .collect();
            rt.assign_column(dh_id.clone(), SmartVector::regular(values))
        });
    }

    // α and the combined row.
    let alpha = CoinName("VORTEX_ALPHA".into());
    comp.register_coin(r0, alpha.clone(), CoinKind::Field);
    let ualpha = ColId("VORTEX_UALPHA".into());
    comp.register_column(r0, ualpha.clone(), width, Status::Proof);
    {
        let alpha = alpha.clone();
        let ualpha = ualpha.clone();
        let row_ids = row_ids.clone();
        comp.add_prover_step(r0, "vortex/ualpha", move |rt| {
            let a = rt.get_coin_field(alpha.clone())?;
            let vectors = row_ids
                .iter()
                .map(|id| rt.get_column(&ColumnRef::Natural(id.clone())))
                .collect::<Result<Vec<_>, _>>()?;
            let mut coeffs = Vec::with_capacity(vectors.len());
            let mut pow = F::one();
            for _ in 0..vectors.len() {
                coeffs.push(pow);
                pow *= a;
            }
            rt.assign_column(ualpha.clone(), SmartVector::linear_combination(&coeffs, &vectors))
        });
    }

    // Q and the opened preimages.
    let q = CoinName("VORTEX_Q".into());
    comp.register_coin(
        r0 + 1,
        q.clone(),
        CoinKind::IntegerVec { size: params.nb_opened_columns, upper_bound: width },
    );
    let opened: Vec<ColId> = (0..params.nb_opened_columns)
        .map(|k| ColId(format!("VORTEX_OPENED_{k}")))
        .collect();
    for id in &opened {
        comp.register_column(r0 + 1, id.clone(), opened_size, Status::Proof);
    }
    {
        let q = q.clone();
        let opened = opened.clone();
        let row_ids = row_ids.clone();
        comp.add_prover_step(r0 + 1, "vortex/open", move |rt| {
            let positions = rt
                .get_coin(q.clone())?
                .as_integers()
                .expect("Q is an integer-vector coin")
                .to_vec();
            let rows = row_ids
                .iter()
                .map(|id| rt.get_column(&ColumnRef::Natural(id.clone())))
                .collect::<Result<Vec<_>, _>>()?;
            for (k, &j) in positions.iter().enumerate() {
                let mut column: Vec<F> = rows.iter().map(|row| row.get(j)).collect();
                column.resize(opened_size, F::zero());
                rt.assign_column(opened[k].clone(), SmartVector::regular(column))?;
            }
            Ok(())
        });
    }

    // Retire the committed columns from the transcript and the proof.
    for id in &row_ids {
        comp.set_status(id, Status::Ignored);
    }

    let ctx = VortexCtx {
        params,
        width,
        rows_by_round: rows_by_round.clone(),
        row_ids: row_ids.clone(),
        digests: digests.clone(),
        alpha: alpha.clone(),
        q: q.clone(),
        ualpha: ualpha.clone(),
        opened: opened.clone(),
        opened_size,
        univariate: univariate.clone(),
        is_self_recursed: false,
    };
    comp.set_vortex_ctx(ctx);

    comp.add_verifier_step(r0 + 1, "vortex/check", move |rt| {
        // Self-recursion re-expresses this check as a sub-protocol.
        if rt.comp().vortex_ctx().map(|c| c.is_self_recursed) == Some(true) {
            return Ok(());
        }
        let fail = |detail: String| VerifierError::Constraint {
            query: "vortex/check".into(),
            detail,
        };

        let a = rt.get_coin_field(alpha.clone())?;
        let positions = rt
            .get_coin(q.clone())?
            .as_integers()
            .expect("Q is an integer-vector coin")
            .to_vec();
        let ualpha_values = rt.get_column(&ColumnRef::Natural(ualpha.clone()))?;

        for (k, &j) in positions.iter().enumerate() {
            let preimage = rt.get_column(&ColumnRef::Natural(opened[k].clone()))?;

            // The preimage tail is padding.
            for i in row_ids.len()..opened_size {
                if !preimage.get(i).is_zero() {
                    return Err(fail(format!("opened column {k} has a non-zero padding tail")));
                }
            }

            // Per-round digest binding.
            let mut offset = 0usize;
            for ((_, ids), (_, dh_id)) in rows_by_round.iter().zip(digests.iter()) {
                let segment = (offset..offset + ids.len()).map(|i| preimage.get(i));
                let expected = mimc::hash_fields(segment);
                let dh = rt.get_column(&ColumnRef::Natural(dh_id.clone()))?;
                if dh.get(j) != expected {
                    return Err(fail(format!(
                        "opened column {k} does not match the digest at position {j}"
                    )));
                }
                offset += ids.len();
            }

            // α-combination spot check.
            let mut acc = F::zero();
            let mut pow = F::one();
            for i in 0..row_ids.len() {
                acc += pow * preimage.get(i);
                pow *= a;
            }
            if acc != ualpha_values.get(j) {
                return Err(fail(format!(
                    "α-combination mismatch at selected position {j}"
                )));
            }
        }

        // Evaluation claims close over Ualpha.
        for (old_id, full_id) in &univariate {
            let (x, ys) = match rt.get_query_params(full_id)? {
                QueryParams::UnivariateEval { x, ys } => (x, ys),
                _ => unreachable!("univariate parameters"),
            };
            let (x_old, ys_old) = match rt.get_query_params(old_id)? {
                QueryParams::UnivariateEval { x, ys } => (x, ys),
                _ => unreachable!("univariate parameters"),
            };
            if x_old != x {
                return Err(fail(format!("{full_id} is not at {old_id}'s point")));
            }
            // The original claims embed into the full row claims.
            let old_cols = match &rt.comp().query(old_id).expect("registered id").kind {
                QueryKind::UnivariateEval { cols } => cols.clone(),
                _ => unreachable!("taken-over query kind"),
            };
            for (col, y_old) in old_cols.iter().zip(ys_old.iter()) {
                if let ColumnRef::Natural(id) = col {
                    let pos = row_ids.iter().position(|r| r == id).expect("committed row");
                    if ys[pos] != *y_old {
                        return Err(fail(format!(
                            "{old_id} claim for {id} disagrees with the full row claims"
                        )));
                    }
                }
            }
            let mut acc = F::zero();
            let mut pow = F::one();
            for y in &ys {
                acc += pow * y;
                pow *= a;
            }
            if fft::horner(&ualpha_values.to_vec(), x) != acc {
                return Err(fail(format!(
                    "Ualpha does not match the α-combined claims of {full_id}"
                )));
            }
        }
        Ok(())
    });

    comp
}

/// Ignore the univariate queries fully supported by committed columns and
/// re-issue each over the complete committed row set. Panics if any other
/// live query still reads a committed column: vortex expects the earlier
/// passes to have reduced everything else.
fn take_over_queries(comp: &mut CompiledIop, row_ids: &[ColId]) -> Vec<(QueryId, QueryId)> {
    let committed: std::collections::BTreeSet<&ColId> = row_ids.iter().collect();
    let ids: Vec<QueryId> = comp.all_query_ids().cloned().collect();
    let mut pairs = Vec::new();

    for qid in ids {
        let (round, kind) = {
            let decl = comp.query(&qid).expect("registered id");
            if decl.ignored {
                continue;
            }
            (decl.round, decl.kind.clone())
        };
        let reads_committed = kind
            .column_refs()
            .iter()
            .flat_map(|r| r.natural_ids())
            .any(|id| committed.contains(&id));
        if !reads_committed {
            continue;
        }
        match &kind {
            QueryKind::UnivariateEval { cols } => {
                let fully_committed = cols.iter().all(|c| match c {
                    ColumnRef::Natural(id) => committed.contains(id),
                    _ => false,
                });
                assert!(
                    fully_committed,
                    "vortex: univariate query {qid} mixes committed and other columns"
                );

                let full_id = QueryId(format!("{qid}_VORTEX_FULL"));
                let full_cols: Vec<ColumnRef> =
                    row_ids.iter().cloned().map(ColumnRef::Natural).collect();
                // The full row set may span later rounds than the original
                // query; the re-issued claim lives at the latest of them.
                let full_round = row_ids
                    .iter()
                    .map(|id| comp.column(id).expect("registered id").round)
                    .fold(round, usize::max);
                comp.insert_univariate_eval(full_round, full_id.clone(), full_cols.clone());
                comp.ignore_query(&qid);
                // The re-issued query reads retired columns; the vortex
                // verifier step owns its checking.
                comp.ignore_query(&full_id);

                let old_id = qid.clone();
                let prover_full_id = full_id.clone();
                comp.add_prover_step(full_round, format!("vortex/extend/{old_id}"), move |rt| {
                    let x = match rt.get_query_params(&old_id)? {
                        QueryParams::UnivariateEval { x, .. } => x,
                        _ => unreachable!("univariate parameters"),
                    };
                    let ys = full_cols
                        .iter()
                        .map(|c| Ok(fft::horner(&rt.get_column(c)?.to_vec(), x)))
                        .collect::<Result<Vec<F>, _>>()?;
                    rt.assign_univariate(prover_full_id.clone(), x, ys)
                });

                pairs.push((qid, full_id));
            }
            _ => panic!(
                "vortex: query {qid} still reads a committed column; run the full pipeline first"
            ),
        }
    }
    pairs
}
