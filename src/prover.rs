//! Prover runtime.
//!
//! [`prove`] executes a frozen registry against the user's assignment
//! callback. The round loop is the Fiat–Shamir discipline in code: entering
//! round `r`, the runtime absorbs everything of status `Proof` or `Committed`
//! declared at round `r − 1` (columns first, then query parameters, in
//! registry order), samples round-`r` coins, and only then runs the round's
//! prover steps in insertion order. The user callback is the first step of
//! round 0 and runs exactly once.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::coin::{CoinName, CoinValue};
use crate::column::{ColId, ColumnRef};
use crate::expression::EvalCtx;
use crate::query::{QueryId, QueryKind, QueryParams};
use crate::registry::{CompiledIop, UsageError};
use crate::runtime::{self, Runtime};
use crate::smartvectors::SmartVector;
use crate::transcript::Transcript;
use crate::F;

/// The prover's output: every column of status `Proof` plus every declared
/// query parameter set. Serialization to an on-disk format is left to an
/// external codec.
#[derive(Clone, Debug, PartialEq)]
pub struct Proof {
    pub columns: BTreeMap<ColId, SmartVector>,
    pub query_params: BTreeMap<QueryId, QueryParams>,
}

/// Run the prover over a frozen registry and extract the proof.
pub fn prove(
    comp: &CompiledIop,
    user: impl Fn(&mut ProverRuntime<'_>) -> Result<(), UsageError>,
) -> Result<Proof, UsageError> {
    Ok(ProverRuntime::run(comp, user)?.into_proof())
}

/// Per-run prover state: the assignments, sampled coins and declared
/// parameters of one execution.
pub struct ProverRuntime<'a> {
    comp: &'a CompiledIop,
    columns: HashMap<ColId, SmartVector>,
    coins: HashMap<CoinName, CoinValue>,
    params: HashMap<QueryId, QueryParams>,
    transcript: Transcript,
    current_round: usize,
}

impl<'a> ProverRuntime<'a> {
    /// Execute all rounds. Exposed (rather than only [`prove`]) so tests and
    /// embedding code can inspect sampled coins after the run.
    pub fn run(
        comp: &'a CompiledIop,
        user: impl Fn(&mut ProverRuntime<'_>) -> Result<(), UsageError>,
    ) -> Result<ProverRuntime<'a>, UsageError> {
        assert!(comp.is_frozen(), "the registry must be compiled before proving");

        let mut rt = ProverRuntime {
            comp,
            columns: HashMap::new(),
            coins: HashMap::new(),
            params: HashMap::new(),
            transcript: Transcript::new("ziop.protocol"),
            current_round: 0,
        };
        rt.transcript.absorb_bytes("registry", &comp.canonical_digest());

        for round in 0..comp.num_rounds() {
            rt.current_round = round;
            if round > 0 {
                rt.absorb_round(round - 1)?;
                rt.sample_coins(round);
            }
            if round == 0 {
                user(&mut rt)?;
            }
            for step in comp.prover_steps().iter().filter(|s| s.round == round) {
                debug!(round, step = %step.name, "prover step");
                (step.run)(&mut rt)?;
            }
        }

        rt.check_complete()?;
        Ok(rt)
    }

    fn absorb_round(&mut self, round: usize) -> Result<(), UsageError> {
        for id in self.comp.columns_at_round(round) {
            let decl = self.comp.column(id).expect("registered id");
            if !decl.status.absorbed() {
                continue;
            }
            let values = self
                .columns
                .get(id)
                .ok_or_else(|| UsageError::MissingAssignment { what: id.0.clone() })?;
            self.transcript.absorb_fields(id.as_str(), values.iter());
        }
        for id in self.comp.queries_at_round(round) {
            let decl = self.comp.query(id).expect("registered id");
            if !decl.kind.needs_params() {
                continue;
            }
            let params = self
                .params
                .get(id)
                .ok_or_else(|| UsageError::MissingAssignment { what: id.0.clone() })?;
            self.transcript
                .absorb_fields(id.as_str(), params.transcript_elements().into_iter());
        }
        Ok(())
    }

    fn sample_coins(&mut self, round: usize) {
        for name in self.comp.coins_at_round(round) {
            let decl = self.comp.coin(name).expect("registered name");
            let value = decl.sample(&mut self.transcript);
            self.coins.insert(name.clone(), value);
        }
    }

    fn check_complete(&self) -> Result<(), UsageError> {
        for id in self.comp.all_column_ids() {
            let decl = self.comp.column(id).expect("registered id");
            if decl.status.absorbed() && !self.columns.contains_key(id) {
                return Err(UsageError::MissingAssignment { what: id.0.clone() });
            }
        }
        for id in self.comp.all_query_ids() {
            let decl = self.comp.query(id).expect("registered id");
            if decl.kind.needs_params() && !self.params.contains_key(id) {
                return Err(UsageError::MissingAssignment { what: id.0.clone() });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Assignment API
    // ------------------------------------------------------------------

    /// Assign a column's value for this run.
    pub fn assign_column(&mut self, id: impl Into<ColId>, values: SmartVector) -> Result<(), UsageError> {
        let id = id.into();
        let decl = self
            .comp
            .column(&id)
            .ok_or_else(|| UsageError::NotRegistered { what: id.0.clone() })?;
        if !decl.status.assignable() {
            return Err(UsageError::NotAssignable { id: id.0.clone(), status: decl.status });
        }
        if decl.round != self.current_round {
            return Err(UsageError::WrongRound {
                what: id.0.clone(),
                expected: decl.round,
                current: self.current_round,
            });
        }
        if values.len() != decl.size {
            return Err(UsageError::SizeMismatch {
                what: id.0.clone(),
                expected: decl.size,
                got: values.len(),
            });
        }
        if self.columns.contains_key(&id) {
            return Err(UsageError::AlreadyAssigned { what: id.0.clone() });
        }
        self.columns.insert(id, values);
        Ok(())
    }

    /// Declare the claimed value of a local opening.
    pub fn assign_local_point(&mut self, id: impl Into<QueryId>, y: F) -> Result<(), UsageError> {
        let id = id.into();
        self.assign_params_checked(id, |kind| matches!(kind, QueryKind::LocalOpening { .. }), QueryParams::LocalOpening { y })
    }

    /// Declare the claimed evaluations of a univariate query.
    pub fn assign_univariate(
        &mut self,
        id: impl Into<QueryId>,
        x: F,
        ys: Vec<F>,
    ) -> Result<(), UsageError> {
        let id = id.into();
        let expected = match self.comp.query(&id) {
            Some(decl) => match &decl.kind {
                QueryKind::UnivariateEval { cols } => cols.len(),
                _ => return Err(UsageError::WrongParamsKind { query: id.0.clone() }),
            },
            None => return Err(UsageError::NotRegistered { what: id.0.clone() }),
        };
        if ys.len() != expected {
            return Err(UsageError::SizeMismatch {
                what: id.0.clone(),
                expected,
                got: ys.len(),
            });
        }
        self.assign_params_checked(
            id,
            |kind| matches!(kind, QueryKind::UnivariateEval { .. }),
            QueryParams::UnivariateEval { x, ys },
        )
    }

    /// Declare the claimed scalar of an inner-product query.
    pub fn assign_inner_product(&mut self, id: impl Into<QueryId>, ip: F) -> Result<(), UsageError> {
        let id = id.into();
        self.assign_params_checked(id, |kind| matches!(kind, QueryKind::InnerProduct { .. }), QueryParams::InnerProduct { ip })
    }

    fn assign_params_checked(
        &mut self,
        id: QueryId,
        kind_ok: impl Fn(&QueryKind) -> bool,
        params: QueryParams,
    ) -> Result<(), UsageError> {
        let decl = self
            .comp
            .query(&id)
            .ok_or_else(|| UsageError::NotRegistered { what: id.0.clone() })?;
        if !kind_ok(&decl.kind) {
            return Err(UsageError::WrongParamsKind { query: id.0.clone() });
        }
        if decl.round != self.current_round {
            return Err(UsageError::WrongRound {
                what: id.0.clone(),
                expected: decl.round,
                current: self.current_round,
            });
        }
        if self.params.contains_key(&id) {
            return Err(UsageError::AlreadyAssigned { what: id.0.clone() });
        }
        self.params.insert(id, params);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read API
    // ------------------------------------------------------------------

    /// Value of a sampled coin. Calling this before the coin's round is
    /// entered is a usage error.
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

    /// Field value of a sampled coin.
    pub fn get_coin_field(&self, name: impl Into<CoinName>) -> Result<F, UsageError> {
        runtime::coin_field(self, &name.into())
    }

    /// Resolve a column reference against this run's assignments.
    pub fn get_column(&self, r: &ColumnRef) -> Result<SmartVector, UsageError> {
        runtime::resolve_column_ref(self, r)
    }

    /// Parameters already declared for a query.
    pub fn get_query_params(&self, id: &QueryId) -> Result<QueryParams, UsageError> {
        self.params
            .get(id)
            .cloned()
            .ok_or_else(|| UsageError::MissingAssignment { what: id.0.clone() })
    }

    /// Round the runtime is currently executing.
    pub fn round(&self) -> usize {
        self.current_round
    }

    /// Extract the proof: `Proof`-status columns and all declared parameters.
    pub fn into_proof(self) -> Proof {
        let mut columns = BTreeMap::new();
        for (id, values) in &self.columns {
            let decl = self.comp.column(id).expect("registered id");
            if decl.status.in_proof() {
                columns.insert(id.clone(), values.clone());
            }
        }
        Proof { columns, query_params: self.params.into_iter().collect() }
    }
}

impl Runtime for ProverRuntime<'_> {
    fn comp(&self) -> &CompiledIop {
        self.comp
    }

    fn natural_column(&self, id: &ColId) -> Result<SmartVector, UsageError> {
        if !self.comp.columns_contains(id) {
            return Err(UsageError::NotRegistered { what: id.0.clone() });
        }
        self.columns
            .get(id)
            .cloned()
            .ok_or_else(|| UsageError::MissingAssignment { what: id.0.clone() })
    }

    fn coin(&self, name: &CoinName) -> Result<CoinValue, UsageError> {
        self.get_coin(name.clone())
    }

    fn query_params(&self, id: &QueryId) -> Result<QueryParams, UsageError> {
        self.get_query_params(id)
    }
}

impl EvalCtx for ProverRuntime<'_> {
    fn column(&self, r: &ColumnRef) -> Result<SmartVector, UsageError> {
        self.get_column(r)
    }

    fn coin_field(&self, name: &CoinName) -> Result<F, UsageError> {
        runtime::coin_field(self, name)
    }
}
