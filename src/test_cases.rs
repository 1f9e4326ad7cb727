//! End-to-end protocol scenarios: definer → compiler pipeline → prove →
//! verify, with accept and reject cases for every query kind and pass.

use ark_ff::{One, Zero};

use crate::coin::CoinKind;
use crate::column::{ColId, Status};
use crate::compiler::{compile, dummy, reedsolomon, selfrecursion, splitter, vortex};
use crate::expression::Expression;
use crate::fft::{self, Direction};
use crate::prover::{prove, Proof, ProverRuntime};
use crate::query::{QueryId, QueryParams};
use crate::smartvectors::SmartVector;
use crate::verifier::{verify, VerifierError};
use crate::F;

/// The row index as an expression: `Σₖ k · periodic_sample(size, k)`.
fn row_index_expr(size: usize) -> Expression {
    (0..size)
        .map(|k| Expression::constant(F::from(k as u64)) * Expression::periodic_sample(size, k))
        .reduce(|a, b| a + b)
        .expect("size is positive")
}

fn assert_constraint_failure(result: Result<(), VerifierError>, query: &str) {
    match result {
        Err(VerifierError::Constraint { query: q, .. }) => {
            assert_eq!(q, query, "failure names the wrong query")
        }
        other => panic!("expected a constraint failure on {query}, got {other:?}"),
    }
}

#[test]
fn global_constraint_over_the_row_index() {
    crate::init_test_logging();
    let comp = compile(
        |b| {
            let p = b.register_commit("P", 64);
            b.global("GLOBAL", 64, Expression::column(p) - row_index_expr(64));
        },
        vec![dummy::compile()],
    );

    let assignment: Vec<u64> = (0..64).collect();
    let proof = prove(&comp, |run| {
        run.assign_column("P", SmartVector::from_u64s(&assignment))
    })
    .unwrap();
    verify(&comp, &proof).unwrap();

    // Corrupting one entry breaks the identity.
    let mut bad = proof;
    let mut values = bad.columns[&ColId::from("P")].to_vec();
    values[0] = F::one();
    bad.columns.insert("P".into(), SmartVector::regular(values));
    assert_constraint_failure(verify(&comp, &bad), "GLOBAL");
}

#[test]
fn local_opening_at_shifted_index() {
    let comp = compile(
        |b| {
            let p = b.register_commit("P", 8);
            b.local_opening("OPEN", b.shift(p, 1));
        },
        vec![dummy::compile()],
    );

    let assign = |claim: u64| {
        prove(&comp, move |run| {
            run.assign_column("P", SmartVector::from_u64s(&[0, 1, 2, 3, 4, 5, 6, 7]))?;
            run.assign_local_point("OPEN", F::from(claim))
        })
        .unwrap()
    };

    verify(&comp, &assign(1)).unwrap();
    assert_constraint_failure(verify(&comp, &assign(2)), "OPEN");
}

#[test]
fn local_openings_at_every_shift() {
    let n = 16usize;
    let comp = compile(
        |b| {
            let p = b.register_commit("P", n);
            for i in 0..n {
                b.local_opening(format!("Q_{i}"), p.clone().shift(i as i64));
            }
        },
        vec![dummy::compile()],
    );

    let proof = prove(&comp, |run| {
        let values: Vec<u64> = (0..n as u64).collect();
        run.assign_column("P", SmartVector::from_u64s(&values))?;
        for i in 0..n {
            run.assign_local_point(format!("Q_{i}"), F::from(i as u64))?;
        }
        Ok(())
    })
    .unwrap();
    verify(&comp, &proof).unwrap();
}

#[test]
fn univariate_fixed_permutation_range_and_inner_product() {
    let comp = compile(
        |b| {
            let p = b.register_commit("P", 8);
            let q = b.register_commit("Q", 8);
            b.univariate_eval("EVAL", vec![p.clone()]);
            // Q is P reversed.
            let sigma: Vec<u64> = (0..8).rev().collect();
            b.fixed_permutation("PERM", sigma, vec![p.clone()], vec![q.clone()]);
            b.range("RANGE", p.clone(), 8);
            b.inner_product("IP", p, q);
        },
        vec![dummy::compile()],
    );

    let p_vals: Vec<u64> = (0..8).collect();
    let q_vals: Vec<u64> = (0..8).rev().collect();
    let x = F::from(3u64);

    let proof = prove(&comp, |run| {
        run.assign_column("P", SmartVector::from_u64s(&p_vals))?;
        run.assign_column("Q", SmartVector::from_u64s(&q_vals))?;
        let coeffs: Vec<F> = p_vals.iter().copied().map(F::from).collect();
        run.assign_univariate("EVAL", x, vec![fft::horner(&coeffs, x)])?;
        let ip = p_vals
            .iter()
            .zip(&q_vals)
            .map(|(a, b)| F::from(*a) * F::from(*b))
            .sum();
        run.assign_inner_product("IP", ip)
    })
    .unwrap();
    verify(&comp, &proof).unwrap();

    // A wrong inner product claim is caught.
    let mut bad = proof;
    bad.query_params
        .insert("IP".into(), QueryParams::InnerProduct { ip: F::one() });
    assert_constraint_failure(verify(&comp, &bad), "IP");
}

#[test]
fn range_rejects_wide_entries() {
    let comp = compile(
        |b| {
            let p = b.register_commit("P", 8);
            b.range("RANGE", p, 8);
        },
        vec![dummy::compile()],
    );

    let proof = prove(&comp, |run| {
        run.assign_column("P", SmartVector::from_u64s(&[0, 1, 2, 3, 4, 5, 6, 255]))
    })
    .unwrap();
    verify(&comp, &proof).unwrap();

    let mut bad = proof;
    let mut values = bad.columns[&ColId::from("P")].to_vec();
    values[3] = F::from(1u64 << 20);
    bad.columns.insert("P".into(), SmartVector::regular(values));
    assert_constraint_failure(verify(&comp, &bad), "RANGE");
}

#[test]
fn compile_determinism() {
    crate::init_test_logging();
    let build = || {
        compile(
            |b| {
                let p = b.register_commit("P", 32);
                b.register_coin("alpha", 1, CoinKind::Field);
                b.global("SQ", 32, {
                    let p = Expression::column(p.clone());
                    p.clone() * p.clone() - p.clone() * p
                });
                b.local_opening("OPEN", p.shift(3));
            },
            vec![splitter::split_columns(8), dummy::compile()],
        )
    };
    assert_eq!(build().canonical_bytes(), build().canonical_bytes());
}

#[test]
fn transcript_binds_committed_columns_to_later_coins() {
    let comp = compile(
        |b| {
            b.register_commit("P", 8);
            b.register_coin("alpha", 1, CoinKind::Field);
        },
        vec![dummy::compile()],
    );

    let run_with = |values: &'static [u64]| {
        ProverRuntime::run(&comp, move |run| {
            run.assign_column("P", SmartVector::from_u64s(values))
        })
        .unwrap()
    };

    let a1 = run_with(&[1, 2, 3, 4, 5, 6, 7, 8]).get_coin_field("alpha").unwrap();
    let a2 = run_with(&[1, 2, 3, 4, 5, 6, 7, 8]).get_coin_field("alpha").unwrap();
    // One flipped field element reseeds every later coin.
    let a3 = run_with(&[1, 2, 3, 4, 5, 6, 7, 9]).get_coin_field("alpha").unwrap();
    assert_eq!(a1, a2);
    assert_ne!(a1, a3);
}

#[test]
fn coins_are_not_available_before_their_round() {
    let comp = compile(
        |b| {
            b.register_commit("P", 4);
            b.register_coin("alpha", 1, CoinKind::Field);
        },
        vec![dummy::compile()],
    );

    let result = prove(&comp, |run| {
        run.assign_column("P", SmartVector::from_u64s(&[1, 2, 3, 4]))?;
        run.get_coin_field("alpha").map(|_| ())
    });
    assert!(matches!(
        result,
        Err(crate::registry::UsageError::CoinNotYetSampled { .. })
    ));
}

#[test]
fn assignment_usage_errors() {
    let comp = compile(
        |b| {
            b.register_commit("P", 4);
        },
        vec![dummy::compile()],
    );

    // Size mismatch.
    let r = prove(&comp, |run| {
        run.assign_column("P", SmartVector::from_u64s(&[1, 2]))
    });
    assert!(matches!(r, Err(crate::registry::UsageError::SizeMismatch { .. })));

    // Double assignment.
    let r = prove(&comp, |run| {
        run.assign_column("P", SmartVector::from_u64s(&[1, 2, 3, 4]))?;
        run.assign_column("P", SmartVector::from_u64s(&[1, 2, 3, 4]))
    });
    assert!(matches!(r, Err(crate::registry::UsageError::AlreadyAssigned { .. })));

    // Missing assignment surfaces at the end of the run.
    let r = prove(&comp, |_| Ok(()));
    assert!(matches!(r, Err(crate::registry::UsageError::MissingAssignment { .. })));
}

#[test]
fn reed_solomon_accepts_codewords_and_rejects_high_degree() {
    crate::init_test_logging();
    // A degree-8 coefficient table evaluated over a size-16 domain: a valid
    // rate-2 codeword.
    let coeffs: Vec<F> = [1u64, 2, 4, 8, 16, 32, 64, 128]
        .iter()
        .copied()
        .map(F::from)
        .chain(std::iter::repeat(F::zero()).take(8))
        .collect();
    let codeword = SmartVector::regular(coeffs).fft(Direction::Forward, false);

    let comp = compile(
        |b| {
            let p = b.register_commit("P", 16);
            reedsolomon::check_reed_solomon(b.compiled(), 2, p);
        },
        vec![dummy::compile()],
    );

    let word = codeword.clone();
    let proof = prove(&comp, move |run| run.assign_column("P", word.clone())).unwrap();
    verify(&comp, &proof).unwrap();

    // A random-looking word of full degree is refused by the prover itself.
    let bad_word = SmartVector::from_u64s(&[3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7, 9, 3]);
    let r = prove(&comp, move |run| run.assign_column("P", bad_word.clone()));
    assert!(matches!(r, Err(crate::registry::UsageError::NotLowDegree { .. })));
}

#[test]
fn splitter_end_to_end() {
    crate::init_test_logging();
    let comp = compile(
        |b| {
            let p = b.register_commit("P", 32);
            let q = b.register_commit("Q", 32);
            // Q is the square of P, rowwise.
            b.global(
                "SQUARE",
                32,
                Expression::column(q) - Expression::column(p.clone()) * Expression::column(p.clone()),
            );
            b.local_opening("OPEN", p.clone().shift(9));
            b.univariate_eval("EVAL", vec![p]);
        },
        vec![splitter::split_columns(8), dummy::compile()],
    );

    // The oversized parents are retired in favor of their chunks.
    assert_eq!(comp.column(&"P".into()).unwrap().status, Status::Ignored);
    assert_eq!(comp.column(&"P_SPLIT_0".into()).unwrap().size, 8);

    let p_vals: Vec<u64> = (0..32).collect();
    let q_vals: Vec<u64> = p_vals.iter().map(|v| v * v).collect();
    let x = F::from(7u64);
    let p_coeffs: Vec<F> = p_vals.iter().copied().map(F::from).collect();

    let proof = prove(&comp, move |run| {
        run.assign_column("P", SmartVector::from_u64s(&p_vals))?;
        run.assign_column("Q", SmartVector::from_u64s(&q_vals))?;
        run.assign_local_point("OPEN", F::from(9u64))?;
        run.assign_univariate("EVAL", x, vec![fft::horner(&p_coeffs, x)])
    })
    .unwrap();

    // The split parents are no longer part of the proof; their chunks are.
    assert!(!proof.columns.contains_key(&ColId::from("P")));
    assert!(proof.columns.contains_key(&ColId::from("P_SPLIT_3")));

    verify(&comp, &proof).unwrap();

    // Corrupting one chunk trips the per-chunk square constraint.
    let mut bad = proof;
    let mut values = bad.columns[&ColId::from("Q_SPLIT_1")].to_vec();
    values[2] += F::one();
    bad.columns.insert("Q_SPLIT_1".into(), SmartVector::regular(values));
    assert_constraint_failure(verify(&comp, &bad), "SQUARE_SPLIT_1");
}

fn vortex_definer(b: &mut crate::builder::Builder) {
    let p = b.register_commit("P", 16);
    let q = b.register_commit("Q", 16);
    b.univariate_eval("EVAL", vec![p, q]);
}

fn vortex_prover(run: &mut ProverRuntime<'_>) -> Result<(), crate::registry::UsageError> {
    let p_vals: Vec<u64> = (1..=16).collect();
    let q_vals: Vec<u64> = (0..16).map(|v| v * v).collect();
    run.assign_column("P", SmartVector::from_u64s(&p_vals))?;
    run.assign_column("Q", SmartVector::from_u64s(&q_vals))?;
    let x = F::from(5u64);
    let p_coeffs: Vec<F> = p_vals.iter().copied().map(F::from).collect();
    let q_coeffs: Vec<F> = q_vals.iter().copied().map(F::from).collect();
    run.assign_univariate("EVAL", x, vec![fft::horner(&p_coeffs, x), fft::horner(&q_coeffs, x)])
}

#[test]
fn vortex_end_to_end() {
    crate::init_test_logging();
    let comp = compile(
        vortex_definer,
        vec![
            vortex::compile(vortex::VortexParams { nb_opened_columns: 4 }),
            dummy::compile(),
        ],
    );

    // The committed columns retired; digests and the combined row replaced
    // them in the proof.
    assert_eq!(comp.column(&"P".into()).unwrap().status, Status::Ignored);
    assert_eq!(comp.column(&"VORTEX_DH_0".into()).unwrap().status, Status::Proof);

    let proof = prove(&comp, vortex_prover).unwrap();
    assert!(!proof.columns.contains_key(&ColId::from("P")));
    verify(&comp, &proof).unwrap();

    // Tampering with the claimed evaluations breaks the vortex check.
    let mut bad = proof;
    let (x, mut ys) = match bad.query_params[&QueryId::from("EVAL")].clone() {
        QueryParams::UnivariateEval { x, ys } => (x, ys),
        _ => unreachable!(),
    };
    ys[0] += F::one();
    bad.query_params
        .insert("EVAL".into(), QueryParams::UnivariateEval { x, ys });
    assert!(verify(&comp, &bad).is_err());
}

#[test]
fn self_recursion_end_to_end() {
    crate::init_test_logging();
    let comp = compile(
        vortex_definer,
        vec![
            vortex::compile(vortex::VortexParams { nb_opened_columns: 2 }),
            selfrecursion::compile(),
            dummy::compile(),
        ],
    );

    // Self-recursion retired the whole preimages and re-committed the
    // digests; the final dummy pass surfaces them again.
    let ctx = comp.vortex_ctx().unwrap();
    assert!(ctx.is_self_recursed);
    assert_eq!(
        comp.column(&"VORTEX_OPENED_0".into()).unwrap().status,
        Status::Ignored
    );
    assert_eq!(
        comp.column(&"VORTEX_OPENED_0_LIMBS".into()).unwrap().status,
        Status::Proof
    );

    let proof = prove(&comp, vortex_prover).unwrap();
    assert!(!proof.columns.contains_key(&ColId::from("VORTEX_OPENED_0")));
    assert!(proof.columns.contains_key(&ColId::from("VORTEX_OPENED_0_LIMBS")));
    verify(&comp, &proof).unwrap();

    // Corrupting a limb breaks either the digest fold or the range bound.
    let mut bad = proof;
    let mut values = bad.columns[&ColId::from("VORTEX_OPENED_0_LIMBS")].to_vec();
    values[0] += F::one();
    bad.columns
        .insert("VORTEX_OPENED_0_LIMBS".into(), SmartVector::regular(values));
    assert!(verify(&comp, &bad).is_err());
}

#[test]
fn proof_shape_is_checked() {
    let comp = compile(
        |b| {
            b.register_commit("P", 4);
        },
        vec![dummy::compile()],
    );
    let proof = prove(&comp, |run| {
        run.assign_column("P", SmartVector::from_u64s(&[1, 2, 3, 4]))
    })
    .unwrap();

    // Missing column.
    let empty = Proof { columns: Default::default(), query_params: Default::default() };
    assert!(matches!(verify(&comp, &empty), Err(VerifierError::Transcript(_))));

    // Extra column.
    let mut extra = proof.clone();
    extra
        .columns
        .insert("UNKNOWN".into(), SmartVector::from_u64s(&[1]));
    assert!(matches!(verify(&comp, &extra), Err(VerifierError::Transcript(_))));

    // Wrong size.
    let mut resized = proof;
    resized.columns.insert("P".into(), SmartVector::from_u64s(&[1, 2]));
    assert!(matches!(verify(&comp, &resized), Err(VerifierError::Transcript(_))));
}
