//! Verifier runtime.
//!
//! [`verify`] replays the prover's transcript from the proof, re-derives
//! every coin, runs the compiler-contributed verifier steps in order, and
//! finally evaluates every non-ignored query's algebraic predicate. The first
//! failure is reported with the query id.

use std::collections::HashMap;

use ark_ff::{BigInteger, PrimeField, Zero};
use thiserror::Error;
use tracing::debug;

use crate::coin::{CoinName, CoinValue};
use crate::column::{ColId, ColumnRef};
use crate::expression::EvalCtx;
use crate::fft;
use crate::prover::Proof;
use crate::query::{QueryDecl, QueryId, QueryKind, QueryParams};
use crate::registry::{CompiledIop, UsageError};
use crate::runtime::{self, Runtime};
use crate::smartvectors::SmartVector;
use crate::transcript::Transcript;
use crate::F;

/// Verification failure.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// A query's predicate is unsatisfied.
    #[error("query {query} unsatisfied: {detail}")]
    Constraint { query: String, detail: String },
    /// The proof does not match the transcript the registry prescribes
    /// (missing, extra or malformed entries).
    #[error("transcript replay failure: {0}")]
    Transcript(String),
    /// Invalid sequencing bubbled up from shared runtime plumbing.
    #[error(transparent)]
    Usage(#[from] UsageError),
}

/// Replay and check a proof against a frozen registry.
pub fn verify(comp: &CompiledIop, proof: &Proof) -> Result<(), VerifierError> {
    VerifierRuntime::run(comp, proof).map(|_| ())
}

/// Per-run verifier state.
pub struct VerifierRuntime<'a> {
    comp: &'a CompiledIop,
    proof: &'a Proof,
    coins: HashMap<CoinName, CoinValue>,
    current_round: usize,
}

impl<'a> VerifierRuntime<'a> {
    /// Replay the transcript, run verifier steps, evaluate all queries.
    pub fn run(comp: &'a CompiledIop, proof: &'a Proof) -> Result<VerifierRuntime<'a>, VerifierError> {
        assert!(comp.is_frozen(), "the registry must be compiled before verifying");

        let mut rt = VerifierRuntime { comp, proof, coins: HashMap::new(), current_round: 0 };
        rt.check_proof_shape()?;

        let mut transcript = Transcript::new("ziop.protocol");
        transcript.absorb_bytes("registry", &comp.canonical_digest());

        for round in 0..comp.num_rounds() {
            rt.current_round = round;
            if round > 0 {
                rt.absorb_round(&mut transcript, round - 1)?;
                for name in comp.coins_at_round(round) {
                    let decl = comp.coin(name).expect("registered name");
                    rt.coins.insert(name.clone(), decl.sample(&mut transcript));
                }
            }
            for step in comp.verifier_steps().iter().filter(|s| s.round == round) {
                debug!(round, step = %step.name, "verifier step");
                (step.run)(&rt)?;
            }
        }

        for id in comp.all_query_ids() {
            let decl = comp.query(id).expect("registered id");
            if decl.ignored {
                continue;
            }
            rt.check_query(decl)?;
        }
        Ok(rt)
    }

    /// Structural binding: the proof must contain exactly the declared
    /// `Proof` columns (with the declared sizes) and exactly the declared
    /// parameter sets.
    fn check_proof_shape(&self) -> Result<(), VerifierError> {
        for (id, values) in &self.proof.columns {
            let decl = self
                .comp
                .column(id)
                .ok_or_else(|| VerifierError::Transcript(format!("unknown column {id} in proof")))?;
            if !decl.status.in_proof() {
                return Err(VerifierError::Transcript(format!(
                    "column {id} of status {:?} does not belong in the proof",
                    decl.status
                )));
            }
            if values.len() != decl.size {
                return Err(VerifierError::Transcript(format!(
                    "column {id} has size {} in the proof, expected {}",
                    values.len(),
                    decl.size
                )));
            }
        }
        for id in self.comp.all_column_ids() {
            let decl = self.comp.column(id).expect("registered id");
            if decl.status.in_proof() && !self.proof.columns.contains_key(id) {
                return Err(VerifierError::Transcript(format!("missing column {id} in proof")));
            }
        }
        for id in self.proof.query_params.keys() {
            let decl = self
                .comp
                .query(id)
                .ok_or_else(|| VerifierError::Transcript(format!("unknown query {id} in proof")))?;
            if !decl.kind.needs_params() {
                return Err(VerifierError::Transcript(format!(
                    "query {id} does not carry parameters"
                )));
            }
        }
        for id in self.comp.all_query_ids() {
            let decl = self.comp.query(id).expect("registered id");
            if decl.kind.needs_params() && !self.proof.query_params.contains_key(id) {
                return Err(VerifierError::Transcript(format!("missing parameters for {id}")));
            }
        }
        Ok(())
    }

    fn absorb_round(&self, transcript: &mut Transcript, round: usize) -> Result<(), VerifierError> {
        for id in self.comp.columns_at_round(round) {
            let decl = self.comp.column(id).expect("registered id");
            if !decl.status.absorbed() {
                continue;
            }
            let values = self.proof.columns.get(id).ok_or_else(|| {
                VerifierError::Transcript(format!(
                    "column {id} is absorbed at round {round} but not available to the verifier"
                ))
            })?;
            transcript.absorb_fields(id.as_str(), values.iter());
        }
        for id in self.comp.queries_at_round(round) {
            let decl = self.comp.query(id).expect("registered id");
            if !decl.kind.needs_params() {
                continue;
            }
            let params = self
                .proof
                .query_params
                .get(id)
                .ok_or_else(|| VerifierError::Transcript(format!("missing parameters for {id}")))?;
            transcript.absorb_fields(id.as_str(), params.transcript_elements().into_iter());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Query predicates
    // ------------------------------------------------------------------

    fn check_query(&self, decl: &QueryDecl) -> Result<(), VerifierError> {
        let fail = |detail: String| VerifierError::Constraint {
            query: decl.id.0.clone(),
            detail,
        };
        match &decl.kind {
            QueryKind::Global { size, expr } => {
                let values = expr.eval_column(*size, self)?;
                for i in 0..*size {
                    if !values.get(i).is_zero() {
                        return Err(fail(format!("non-zero at row {i}")));
                    }
                }
                Ok(())
            }
            QueryKind::LocalOpening { col } => {
                let claimed = match self.query_params(&decl.id)? {
                    QueryParams::LocalOpening { y } => y,
                    _ => return Err(fail("parameter kind mismatch".into())),
                };
                let actual = self.get_column(col)?.get(0);
                if actual != claimed {
                    return Err(fail("claimed opening does not match the column".into()));
                }
                Ok(())
            }
            QueryKind::UnivariateEval { cols } => {
                let (x, ys) = match self.query_params(&decl.id)? {
                    QueryParams::UnivariateEval { x, ys } => (x, ys),
                    _ => return Err(fail("parameter kind mismatch".into())),
                };
                if ys.len() != cols.len() {
                    return Err(fail("one claimed Y per column is required".into()));
                }
                for (col, y) in cols.iter().zip(ys.iter()) {
                    let actual = fft::horner(&self.get_column(col)?.to_vec(), x);
                    if actual != *y {
                        return Err(fail(format!(
                            "column {} does not evaluate to the claimed Y",
                            col.display_id()
                        )));
                    }
                }
                Ok(())
            }
            QueryKind::FixedPermutation { sigma, left, right } => {
                let mut lhs = Vec::new();
                for col in left {
                    lhs.extend(self.get_column(col)?.iter());
                }
                let mut rhs = Vec::new();
                for col in right {
                    rhs.extend(self.get_column(col)?.iter());
                }
                for (i, &s) in sigma.iter().enumerate() {
                    if rhs[i] != lhs[s as usize] {
                        return Err(fail(format!("permutation mismatch at position {i}")));
                    }
                }
                Ok(())
            }
            QueryKind::InnerProduct { a, b } => {
                let claimed = match self.query_params(&decl.id)? {
                    QueryParams::InnerProduct { ip } => ip,
                    _ => return Err(fail("parameter kind mismatch".into())),
                };
                let va = self.get_column(a)?;
                let vb = self.get_column(b)?;
                let actual: F = va.iter().zip(vb.iter()).map(|(x, y)| x * y).sum();
                if actual != claimed {
                    return Err(fail("claimed inner product does not match".into()));
                }
                Ok(())
            }
            QueryKind::Range { col, bits } => {
                let values = self.get_column(col)?;
                for i in 0..values.len() {
                    if values.get(i).into_bigint().num_bits() as usize > *bits {
                        return Err(fail(format!("entry {i} exceeds 2^{bits}")));
                    }
                }
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Read API (verifier steps use these)
    // ------------------------------------------------------------------

    /// Value of a re-derived coin.
    pub fn get_coin(&self, name: impl Into<CoinName>) -> Result<CoinValue, UsageError> {
        let name = name.into();
        if let Some(v) = self.coins.get(&name) {
            return Ok(v.clone());
        }
        match self.comp.coin(&name) {
            Some(decl) => Err(UsageError::CoinNotYetSampled {
                name: name.0.clone(),
                round: decl.round,
                current: self.current_round,
            }),
            None => Err(UsageError::NotRegistered { what: name.0.clone() }),
        }
    }

    /// Field value of a re-derived coin.
    pub fn get_coin_field(&self, name: impl Into<CoinName>) -> Result<F, UsageError> {
        runtime::coin_field(self, &name.into())
    }

    /// Resolve a column reference against the proof and the precomputed
    /// tables.
    pub fn get_column(&self, r: &ColumnRef) -> Result<SmartVector, UsageError> {
        runtime::resolve_column_ref(self, r)
    }

    /// Declared parameters of a query, from the proof.
    pub fn get_query_params(&self, id: &QueryId) -> Result<QueryParams, UsageError> {
        self.proof
            .query_params
            .get(id)
            .cloned()
            .ok_or_else(|| UsageError::MissingAssignment { what: id.0.clone() })
    }
}

impl Runtime for VerifierRuntime<'_> {
    fn comp(&self) -> &CompiledIop {
        self.comp
    }

    fn natural_column(&self, id: &ColId) -> Result<SmartVector, UsageError> {
        match self.comp.column(id) {
            None => Err(UsageError::NotRegistered { what: id.0.clone() }),
            Some(_) => self
                .proof
                .columns
                .get(id)
                .cloned()
                .ok_or_else(|| UsageError::NotVisible { id: id.0.clone() }),
        }
    }

    fn coin(&self, name: &CoinName) -> Result<CoinValue, UsageError> {
        self.get_coin(name.clone())
    }

    fn query_params(&self, id: &QueryId) -> Result<QueryParams, UsageError> {
        self.get_query_params(id)
    }
}

impl EvalCtx for VerifierRuntime<'_> {
    fn column(&self, r: &ColumnRef) -> Result<SmartVector, UsageError> {
        self.get_column(r)
    }

    fn coin_field(&self, name: &CoinName) -> Result<F, UsageError> {
        runtime::coin_field(self, name)
    }
}
