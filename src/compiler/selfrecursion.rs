//! One level of self-recursion over a vortex-compiled registry.
//!
//! The vortex verifier step checks hash preimages and an α-combination in
//! the clear; self-recursion re-expresses that work as protocol objects so a
//! later cryptographic pass can compile it again. Concretely the pass:
//!
//! - stamps the vortex context, standing its verifier step down;
//! - re-labels the round digests and `Ualpha` (sent in the clear until now)
//!   as commitments, and retires the whole preimages;
//! - re-introduces the preimages in limb-expanded form as fresh commitments,
//!   with range queries bounding every limb;
//! - folds the preimages with a collapse coin and ties the fold to a
//!   precomputed key through an inner-product query;
//! - re-checks digests (merge-folded), the α-combination and the evaluation
//!   claims (through the alleged-Ys verifier column) against the recomposed
//!   preimages in its own verifier step.
//!
//! One level only: applying the pass twice is a programmer error.

use ark_ff::{One, Zero};
use tracing::debug;

use crate::coin::{CoinKind, CoinName};
use crate::column::{ColId, ColumnRef, Status};
use crate::compiler::CompilerPass;
use crate::fft;
use crate::mimc;
use crate::query::{QueryId, QueryParams};
use crate::registry::CompiledIop;
use crate::smartvectors::SmartVector;
use crate::verifier::VerifierError;
use crate::F;

/// Limb width of the preimage expansion.
const LIMB_BITS: usize = 16;
/// Limbs per field element (16 × 16 bits covers the 254-bit field).
const LIMBS_PER_FIELD: usize = 16;

/// Build the self-recursion pass.
pub fn compile() -> CompilerPass {
    Box::new(apply)
}

fn apply(mut comp: CompiledIop) -> CompiledIop {
    let ctx = match comp.vortex_ctx() {
        Some(ctx) => ctx.clone(),
        None => panic!("self-recursion requires a vortex-compiled registry"),
    };
    assert!(!ctx.is_self_recursed, "self-recursion was already applied");
    if let Some(live) = comp.vortex_ctx_mut() {
        live.is_self_recursed = true;
    }
    debug!(opened = ctx.opened.len(), "self-recursion over the vortex context");

    // Round digests and Ualpha were proof messages; they become commitments
    // for the next compilation level. The whole preimages retire in favor of
    // the limb expansion.
    for (_, dh) in &ctx.digests {
        let status = comp.column(dh).expect("registered id").status;
        assert!(
            status == Status::Proof,
            "expected digest {dh} to have status Proof, found {status:?}"
        );
        comp.set_status(dh, Status::Committed);
    }
    let status = comp.column(&ctx.ualpha).expect("registered id").status;
    assert!(
        status == Status::Proof,
        "expected {} to have status Proof, found {status:?}",
        ctx.ualpha
    );
    comp.set_status(&ctx.ualpha, Status::Committed);
    for opened in &ctx.opened {
        let status = comp.column(opened).expect("registered id").status;
        assert!(
            status == Status::Proof,
            "expected preimage {opened} to have status Proof, found {status:?}"
        );
        comp.set_status(opened, Status::Ignored);
    }

    let r1 = comp.num_rounds();
    let limb_size = ctx.opened_size * LIMBS_PER_FIELD;

    // Folding coins.
    let merge = CoinName("SELFREC_MERGE".into());
    let collapse = CoinName("SELFREC_COLLAPSE".into());
    comp.register_coin(r1, merge.clone(), CoinKind::Field);
    comp.register_coin(r1, collapse.clone(), CoinKind::Field);

    // Limb-expanded preimages, with range queries bounding every limb.
    let limb_ids: Vec<ColId> = ctx.opened.iter().map(|id| id.derived("LIMBS")).collect();
    for (k, limb_id) in limb_ids.iter().enumerate() {
        comp.register_column(r1, limb_id.clone(), limb_size, Status::Committed);
        comp.insert_range(
            r1,
            QueryId(format!("SELFREC_SHORT_{k}")),
            ColumnRef::Natural(limb_id.clone()),
            LIMB_BITS,
        );
    }
    {
        let opened = ctx.opened.clone();
        let limb_ids = limb_ids.clone();
        comp.add_prover_step(r1, "selfrecursion/limbs", move |rt| {
            for (opened_id, limb_id) in opened.iter().zip(limb_ids.iter()) {
                let values = rt.get_column(&ColumnRef::Natural(opened_id.clone()))?;
                let mut limbs = Vec::with_capacity(values.len() * LIMBS_PER_FIELD);
                for i in 0..values.len() {
                    limbs.extend(decompose(values.get(i)));
                }
                rt.assign_column(limb_id.clone(), SmartVector::regular(limbs))?;
            }
            Ok(())
        });
    }

    // Precomputed folding key, tied to the collapsed preimage by an
    // inner-product query.
    let key_id = ColId("SELFREC_KEY".into());
    let key_values: Vec<F> = (0..limb_size)
        .map(|i| mimc::hash_fields([F::from(i as u64)]))
        .collect();
    comp.register_precomputed(key_id.clone(), SmartVector::regular(key_values));

    let collapsed_ref = ColumnRef::RandLinComb {
        coin: collapse.clone(),
        parents: limb_ids.iter().cloned().map(ColumnRef::Natural).collect(),
    };
    let ip_id = QueryId("SELFREC_LATTICE_IP".into());
    comp.insert_inner_product(
        r1,
        ip_id.clone(),
        collapsed_ref.clone(),
        ColumnRef::Natural(key_id.clone()),
    );
    {
        let ip_id = ip_id.clone();
        let key_id = key_id.clone();
        comp.add_prover_step(r1, "selfrecursion/lattice-ip", move |rt| {
            let folded = rt.get_column(&collapsed_ref)?;
            let key = rt.get_column(&ColumnRef::Natural(key_id.clone()))?;
            let ip = folded.iter().zip(key.iter()).map(|(a, b)| a * b).sum();
            rt.assign_inner_product(ip_id.clone(), ip)
        });
    }

    // The replacement for the vortex verifier step.
    comp.add_verifier_step(r1, "selfrecursion/check", move |rt| {
        let fail = |detail: String| VerifierError::Constraint {
            query: "selfrecursion/check".into(),
            detail,
        };

        let a = rt.get_coin_field(ctx.alpha.clone())?;
        let m = rt.get_coin_field(merge.clone())?;
        let positions = rt
            .get_coin(ctx.q.clone())?
            .as_integers()
            .expect("Q is an integer-vector coin")
            .to_vec();
        let ualpha_values = rt.get_column(&ColumnRef::Natural(ctx.ualpha.clone()))?;

        // Merge-folded digests, resolved as a verifier column.
        let dmerge_ref = ColumnRef::RandLinComb {
            coin: merge.clone(),
            parents: ctx
                .digests
                .iter()
                .map(|(_, dh)| ColumnRef::Natural(dh.clone()))
                .collect(),
        };
        let dmerge = rt.get_column(&dmerge_ref)?;

        for (k, &j) in positions.iter().enumerate() {
            let limbs = rt.get_column(&ColumnRef::Natural(limb_ids[k].clone()))?;
            let preimage: Vec<F> = (0..ctx.opened_size)
                .map(|i| recompose(&limbs, i))
                .collect();

            for v in preimage.iter().skip(ctx.row_ids.len()) {
                if !v.is_zero() {
                    return Err(fail(format!("preimage {k} has a non-zero padding tail")));
                }
            }

            // Digest binding, folded by the merge coin.
            let mut offset = 0usize;
            let mut folded = F::zero();
            let mut pow = F::one();
            for (_, ids) in &ctx.rows_by_round {
                let segment = preimage[offset..offset + ids.len()].iter().copied();
                folded += pow * mimc::hash_fields(segment);
                offset += ids.len();
                pow *= m;
            }
            if folded != dmerge.get(j) {
                return Err(fail(format!(
                    "recomposed preimage {k} does not match the folded digests at position {j}"
                )));
            }

            // α-combination spot check.
            let mut acc = F::zero();
            let mut pow = F::one();
            for v in preimage.iter().take(ctx.row_ids.len()) {
                acc += pow * v;
                pow *= a;
            }
            if acc != ualpha_values.get(j) {
                return Err(fail(format!("α-combination mismatch at selected position {j}")));
            }
        }

        // Evaluation claims, through the alleged-Ys column.
        for (_, full_id) in &ctx.univariate {
            let x = match rt.get_query_params(full_id)? {
                QueryParams::UnivariateEval { x, .. } => x,
                _ => unreachable!("univariate parameters"),
            };
            let ys_ref = ColumnRef::FromYs {
                query: full_id.clone(),
                ranges: ctx.row_ids.clone(),
            };
            let ys = rt.get_column(&ys_ref)?;
            let mut acc = F::zero();
            let mut pow = F::one();
            for i in 0..ys.len() {
                acc += pow * ys.get(i);
                pow *= a;
            }
            if fft::horner(&ualpha_values.to_vec(), x) != acc {
                return Err(fail(format!(
                    "Ualpha does not match the α-combined alleged Ys of {full_id}"
                )));
            }
        }
        Ok(())
    });

    comp
}

/// Little-endian `LIMB_BITS`-bit limbs of a field element.
fn decompose(v: F) -> Vec<F> {
    use ark_ff::{BigInteger, PrimeField};
    let bytes = v.into_bigint().to_bytes_le();
    (0..LIMBS_PER_FIELD)
        .map(|l| {
            let lo = bytes.get(2 * l).copied().unwrap_or(0) as u64;
            let hi = bytes.get(2 * l + 1).copied().unwrap_or(0) as u64;
            F::from(lo | (hi << 8))
        })
        .collect()
}

/// Inverse of [`decompose`] over the limb column layout.
fn recompose(limbs: &SmartVector, i: usize) -> F {
    let mut acc = F::zero();
    let mut shift = F::one();
    let base = F::from(1u64 << LIMB_BITS);
    for l in 0..LIMBS_PER_FIELD {
        acc += shift * limbs.get(i * LIMBS_PER_FIELD + l);
        shift *= base;
    }
    acc
}
