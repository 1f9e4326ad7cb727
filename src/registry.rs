//! The compiled protocol registry.
//!
//! A [`CompiledIop`] is the full description of a protocol: which columns are
//! committed at which round, which coins the verifier samples, which queries
//! are opened, and the ordered prover/verifier steps contributed by compiler
//! passes. It is mutable only during definition and compilation; `freeze`
//! makes it immutable, after which it may back any number of prover runs.
//!
//! Every store is a [`RoundRegister`]: items are bucketed by round and keep
//! their insertion order within the round. That order is load-bearing twice
//! over: it is the Fiat–Shamir absorption order, and it is the iteration
//! order behind [`CompiledIop::canonical_bytes`], the registry's
//! deterministic serialization.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use ark_serialize::CanonicalSerialize;
use thiserror::Error;
use tracing::debug;

use crate::coin::{CoinDecl, CoinKind, CoinName};
use crate::column::{ColId, ColumnDecl, ColumnRef, Status};
use crate::compiler::vortex::VortexCtx;
use crate::expression::Expression;
use crate::prover::ProverRuntime;
use crate::query::{QueryDecl, QueryId, QueryKind};
use crate::smartvectors::SmartVector;
use crate::verifier::{VerifierError, VerifierRuntime};
use crate::F;

/// Invalid API sequencing. Fatal to the current run; the state the call would
/// have touched is left unchanged.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("{what} is not registered")]
    NotRegistered { what: String },
    #[error("{what} has size {got}, expected {expected}")]
    SizeMismatch { what: String, expected: usize, got: usize },
    #[error("column {id} with status {status:?} cannot be assigned")]
    NotAssignable { id: String, status: Status },
    #[error("{what} belongs to round {expected} but the runtime is at round {current}")]
    WrongRound { what: String, expected: usize, current: usize },
    #[error("{what} is already assigned")]
    AlreadyAssigned { what: String },
    #[error("coin {name} is sampled at round {round}, not available at round {current}")]
    CoinNotYetSampled { name: String, round: usize, current: usize },
    #[error("missing assignment for {what}")]
    MissingAssignment { what: String },
    #[error("coin {name} does not carry the requested kind of value")]
    WrongCoinKind { name: String },
    #[error("query {query} does not carry the requested kind of parameters")]
    WrongParamsKind { query: String },
    #[error("column {id} is not visible to the verifier")]
    NotVisible { id: String },
    #[error("column {column} is not a low-degree codeword of the declared rate")]
    NotLowDegree { column: String },
}

/// Round-bucketed, insertion-ordered store.
pub struct RoundRegister<Id, T> {
    rounds: Vec<Vec<Id>>,
    map: HashMap<Id, T>,
}

impl<Id, T> RoundRegister<Id, T>
where
    Id: Eq + Hash + Clone + std::fmt::Display,
{
    fn new() -> Self {
        Self { rounds: Vec::new(), map: HashMap::new() }
    }

    /// Insert at `round`. Re-registration of an existing id is a programmer
    /// error and panics.
    fn insert(&mut self, round: usize, id: Id, item: T) {
        if self.map.contains_key(&id) {
            panic!("duplicate registration of {id}");
        }
        if self.rounds.len() <= round {
            self.rounds.resize_with(round + 1, Vec::new);
        }
        self.rounds[round].push(id.clone());
        self.map.insert(id, item);
    }

    pub fn get(&self, id: &Id) -> Option<&T> {
        self.map.get(id)
    }

    fn get_mut(&mut self, id: &Id) -> Option<&mut T> {
        self.map.get_mut(id)
    }

    /// Lookup that treats absence as a programmer error.
    pub fn expect(&self, id: &Id) -> &T {
        match self.map.get(id) {
            Some(t) => t,
            None => panic!("{id} is not registered"),
        }
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.map.contains_key(id)
    }

    /// Ids registered at `round`, in insertion order.
    pub fn at_round(&self, round: usize) -> &[Id] {
        self.rounds.get(round).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of rounds spanned (index of the last non-empty round + 1).
    pub fn num_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// All ids, round-by-round then insertion order.
    pub fn ids_ordered(&self) -> impl Iterator<Item = &Id> {
        self.rounds.iter().flatten()
    }
}

pub(crate) type ProverStepFn =
    Arc<dyn Fn(&mut ProverRuntime<'_>) -> Result<(), UsageError> + Send + Sync>;
pub(crate) type VerifierStepFn =
    Arc<dyn Fn(&VerifierRuntime<'_>) -> Result<(), VerifierError> + Send + Sync>;

/// A compiler-contributed prover step, run at its round in insertion order.
pub struct ProverStep {
    pub round: usize,
    pub name: String,
    pub(crate) run: ProverStepFn,
}

/// A compiler-contributed verifier step, run at its round in insertion order.
pub struct VerifierStep {
    pub round: usize,
    pub name: String,
    pub(crate) run: VerifierStepFn,
}

/// The compiled protocol description. See the module docs.
pub struct CompiledIop {
    pub(crate) columns: RoundRegister<ColId, ColumnDecl>,
    pub(crate) coins: RoundRegister<CoinName, CoinDecl>,
    pub(crate) queries: RoundRegister<QueryId, QueryDecl>,
    pub(crate) precomputed: BTreeMap<ColId, SmartVector>,
    pub(crate) prover_steps: Vec<ProverStep>,
    pub(crate) verifier_steps: Vec<VerifierStep>,
    /// Bookkeeping left behind by the vortex pass for self-recursion.
    pub(crate) vortex_ctx: Option<VortexCtx>,
    frozen: bool,
}

impl Default for CompiledIop {
    fn default() -> Self {
        Self::new()
    }
}

impl CompiledIop {
    pub fn new() -> Self {
        Self {
            columns: RoundRegister::new(),
            coins: RoundRegister::new(),
            queries: RoundRegister::new(),
            precomputed: BTreeMap::new(),
            prover_steps: Vec::new(),
            verifier_steps: Vec::new(),
            vortex_ctx: None,
            frozen: false,
        }
    }

    fn assert_mutable(&self) {
        assert!(!self.frozen, "the registry is frozen");
    }

    /// Make the registry immutable. Runtimes require a frozen registry.
    pub fn freeze(&mut self) {
        self.frozen = true;
        debug!(
            rounds = self.num_rounds(),
            prover_steps = self.prover_steps.len(),
            verifier_steps = self.verifier_steps.len(),
            "registry frozen"
        );
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of rounds spanned by the whole protocol.
    pub fn num_rounds(&self) -> usize {
        let steps = self
            .prover_steps
            .iter()
            .map(|s| s.round + 1)
            .chain(self.verifier_steps.iter().map(|s| s.round + 1))
            .max()
            .unwrap_or(0);
        self.columns
            .num_rounds()
            .max(self.coins.num_rounds())
            .max(self.queries.num_rounds())
            .max(steps)
            .max(1)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a column. The size must be a power of two; duplicate ids
    /// panic.
    pub fn register_column(
        &mut self,
        round: usize,
        id: impl Into<ColId>,
        size: usize,
        status: Status,
    ) -> ColumnRef {
        self.assert_mutable();
        let id = id.into();
        assert!(size.is_power_of_two(), "column {id} has non-power-of-two size {size}");
        self.columns
            .insert(round, id.clone(), ColumnDecl { id: id.clone(), round, size, status });
        ColumnRef::Natural(id)
    }

    /// Register a precomputed column and its assignment in one go.
    pub fn register_precomputed(&mut self, id: impl Into<ColId>, values: SmartVector) -> ColumnRef {
        self.assert_mutable();
        let id = id.into();
        let r = self.register_column(0, id.clone(), values.len(), Status::Precomputed);
        self.precomputed.insert(id, values);
        r
    }

    /// Register a coin. Coins live at strictly positive rounds.
    pub fn register_coin(&mut self, round: usize, name: impl Into<CoinName>, kind: CoinKind) {
        self.assert_mutable();
        let name = name.into();
        assert!(round >= 1, "coin {name} registered at round 0; coins need a prior message");
        if let CoinKind::IntegerVec { size, upper_bound } = kind {
            assert!(size > 0 && upper_bound > 0, "coin {name} has a degenerate shape");
        }
        self.coins.insert(round, name.clone(), CoinDecl { name, round, kind });
    }

    fn insert_query(&mut self, round: usize, id: QueryId, kind: QueryKind) {
        self.assert_mutable();
        for r in kind.column_refs() {
            for nat in r.natural_ids() {
                if !self.columns.contains(&nat) {
                    panic!("query {id} references unregistered column {nat}");
                }
                let col_round = self.columns.expect(&nat).round;
                assert!(
                    round >= col_round,
                    "query {id} at round {round} references column {nat} of later round {col_round}"
                );
            }
        }
        self.queries.insert(round, id.clone(), QueryDecl { id, round, kind, ignored: false });
    }

    /// Register a global constraint: `expr` row-evaluates to zero on
    /// `[0, size)`. All referenced columns must have length `size`.
    pub fn insert_global(
        &mut self,
        round: usize,
        id: impl Into<QueryId>,
        size: usize,
        expr: Expression,
    ) {
        let id = id.into();
        for col in expr.board().columns {
            let got = self.ref_size(col);
            assert!(
                got == size,
                "global {id}: column {} has size {got}, expected {size}",
                col.display_id()
            );
        }
        self.insert_query(round, id, QueryKind::Global { size, expr });
    }

    /// Register a local opening of (the row 0 of) `col`.
    pub fn insert_local_opening(&mut self, round: usize, id: impl Into<QueryId>, col: ColumnRef) {
        self.insert_query(round, id.into(), QueryKind::LocalOpening { col });
    }

    /// Register a univariate evaluation claim over `cols`.
    pub fn insert_univariate_eval(
        &mut self,
        round: usize,
        id: impl Into<QueryId>,
        cols: Vec<ColumnRef>,
    ) {
        assert!(!cols.is_empty(), "univariate evaluation over an empty column set");
        self.insert_query(round, id.into(), QueryKind::UnivariateEval { cols });
    }

    /// Register a fixed-permutation claim `right[i] == left[sigma[i]]` over
    /// the concatenated columns.
    pub fn insert_fixed_permutation(
        &mut self,
        round: usize,
        id: impl Into<QueryId>,
        sigma: Vec<u64>,
        left: Vec<ColumnRef>,
        right: Vec<ColumnRef>,
    ) {
        let id = id.into();
        let total: usize = left.iter().map(|c| self.ref_size(c)).sum();
        let total_right: usize = right.iter().map(|c| self.ref_size(c)).sum();
        assert!(
            sigma.len() == total && total == total_right,
            "fixed permutation {id}: sigma/columns length mismatch"
        );
        assert!(
            sigma.iter().all(|&i| (i as usize) < total),
            "fixed permutation {id}: sigma entry out of range"
        );
        self.insert_query(round, id, QueryKind::FixedPermutation { sigma, left, right });
    }

    /// Register an inner-product claim between `a` and `b`.
    pub fn insert_inner_product(
        &mut self,
        round: usize,
        id: impl Into<QueryId>,
        a: ColumnRef,
        b: ColumnRef,
    ) {
        let id = id.into();
        assert!(
            self.ref_size(&a) == self.ref_size(&b),
            "inner product {id}: operand size mismatch"
        );
        self.insert_query(round, id, QueryKind::InnerProduct { a, b });
    }

    /// Register a range claim: every entry of `col` is below `2^bits`.
    pub fn insert_range(&mut self, round: usize, id: impl Into<QueryId>, col: ColumnRef, bits: usize) {
        assert!(bits > 0 && bits < F_MODULUS_BITS, "range width {bits} out of range");
        self.insert_query(round, id.into(), QueryKind::Range { col, bits });
    }

    /// Change a column's status. Transitions outside
    /// [`Status::may_become`] are compiler bugs and panic.
    pub fn set_status(&mut self, id: &ColId, status: Status) {
        self.assert_mutable();
        let decl = match self.columns.get_mut(id) {
            Some(d) => d,
            None => panic!("{id} is not registered"),
        };
        assert!(
            decl.status.may_become(status),
            "column {id}: illegal status transition {:?} -> {status:?}",
            decl.status
        );
        decl.status = status;
    }

    /// Mark a query as replaced by a compiler-contributed check.
    pub fn ignore_query(&mut self, id: &QueryId) {
        self.assert_mutable();
        match self.queries.get_mut(id) {
            Some(q) => q.ignored = true,
            None => panic!("{id} is not registered"),
        }
    }

    /// Append a prover step at `round`, after every step already registered
    /// there.
    pub fn add_prover_step(
        &mut self,
        round: usize,
        name: impl Into<String>,
        run: impl Fn(&mut ProverRuntime<'_>) -> Result<(), UsageError> + Send + Sync + 'static,
    ) {
        self.assert_mutable();
        self.prover_steps.push(ProverStep { round, name: name.into(), run: Arc::new(run) });
    }

    /// Append a verifier step at `round`.
    pub fn add_verifier_step(
        &mut self,
        round: usize,
        name: impl Into<String>,
        run: impl Fn(&VerifierRuntime<'_>) -> Result<(), VerifierError> + Send + Sync + 'static,
    ) {
        self.assert_mutable();
        self.verifier_steps.push(VerifierStep { round, name: name.into(), run: Arc::new(run) });
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn column(&self, id: &ColId) -> Option<&ColumnDecl> {
        self.columns.get(id)
    }

    pub fn coin(&self, name: &CoinName) -> Option<&CoinDecl> {
        self.coins.get(name)
    }

    pub fn query(&self, id: &QueryId) -> Option<&QueryDecl> {
        self.queries.get(id)
    }

    pub fn precomputed(&self, id: &ColId) -> Option<&SmartVector> {
        self.precomputed.get(id)
    }

    pub fn columns_contains(&self, id: &ColId) -> bool {
        self.columns.contains(id)
    }

    /// Column ids declared at `round`, in insertion order.
    pub fn columns_at_round(&self, round: usize) -> &[ColId] {
        self.columns.at_round(round)
    }

    /// Coin names declared at `round`, in insertion order.
    pub fn coins_at_round(&self, round: usize) -> &[CoinName] {
        self.coins.at_round(round)
    }

    /// Query ids declared at `round`, in insertion order.
    pub fn queries_at_round(&self, round: usize) -> &[QueryId] {
        self.queries.at_round(round)
    }

    /// All column ids, round-by-round then insertion order.
    pub fn all_column_ids(&self) -> impl Iterator<Item = &ColId> {
        self.columns.ids_ordered()
    }

    /// All query ids, round-by-round then insertion order.
    pub fn all_query_ids(&self) -> impl Iterator<Item = &QueryId> {
        self.queries.ids_ordered()
    }

    /// Bookkeeping the vortex pass left behind, if it ran.
    pub fn vortex_ctx(&self) -> Option<&VortexCtx> {
        self.vortex_ctx.as_ref()
    }

    pub fn vortex_ctx_mut(&mut self) -> Option<&mut VortexCtx> {
        self.assert_mutable();
        self.vortex_ctx.as_mut()
    }

    pub fn set_vortex_ctx(&mut self, ctx: VortexCtx) {
        self.assert_mutable();
        assert!(self.vortex_ctx.is_none(), "vortex was already applied");
        self.vortex_ctx = Some(ctx);
    }

    pub fn prover_steps(&self) -> &[ProverStep] {
        &self.prover_steps
    }

    pub fn verifier_steps(&self) -> &[VerifierStep] {
        &self.verifier_steps
    }

    /// Length of the value a reference resolves to.
    pub fn ref_size(&self, r: &ColumnRef) -> usize {
        match r {
            ColumnRef::Natural(id) => self.columns.expect(id).size,
            ColumnRef::Shifted { inner, .. } => self.ref_size(inner),
            ColumnRef::FromYs { ranges, .. } => ranges.len(),
            ColumnRef::RandLinComb { parents, .. } => {
                self.ref_size(parents.first().expect("empty random linear combination"))
            }
        }
    }

    /// Round at which a reference becomes resolvable.
    pub fn ref_round(&self, r: &ColumnRef) -> usize {
        match r {
            ColumnRef::Natural(id) => self.columns.expect(id).round,
            ColumnRef::Shifted { inner, .. } => self.ref_round(inner),
            ColumnRef::FromYs { query, .. } => self.queries.expect(query).round,
            ColumnRef::RandLinComb { coin, parents } => {
                let coin_round = self.coins.expect(coin).round;
                parents
                    .iter()
                    .map(|p| self.ref_round(p))
                    .fold(coin_round, usize::max)
            }
        }
    }

    // ------------------------------------------------------------------
    // Canonical serialization
    // ------------------------------------------------------------------

    /// Deterministic byte serialization of the registry.
    ///
    /// Compiling the same definer through the same passes twice yields
    /// byte-identical output; the BLAKE3 hash of these bytes seeds the
    /// Fiat–Shamir transcript.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for round in 0..self.num_rounds() {
            out.push(b'R');
            put_u64(&mut out, round as u64);
            for id in self.columns.at_round(round) {
                let c = self.columns.expect(id);
                out.push(b'C');
                put_str(&mut out, &c.id.0);
                put_u64(&mut out, c.size as u64);
                out.push(status_tag(c.status));
                if let Some(values) = self.precomputed.get(id) {
                    let mut h = blake3::Hasher::new();
                    for v in values.iter() {
                        let mut buf = Vec::with_capacity(32);
                        v.serialize_compressed(&mut buf)
                            .expect("field serialization into a Vec cannot fail");
                        h.update(&buf);
                    }
                    out.extend_from_slice(h.finalize().as_bytes());
                }
            }
            for name in self.coins.at_round(round) {
                let c = self.coins.expect(name);
                out.push(b'K');
                put_str(&mut out, &c.name.0);
                match c.kind {
                    CoinKind::Field => out.push(0),
                    CoinKind::IntegerVec { size, upper_bound } => {
                        out.push(1);
                        put_u64(&mut out, size as u64);
                        put_u64(&mut out, upper_bound as u64);
                    }
                }
            }
            for id in self.queries.at_round(round) {
                let q = self.queries.expect(id);
                out.push(b'Q');
                put_str(&mut out, &q.id.0);
                out.push(q.ignored as u8);
                put_query_kind(&mut out, &q.kind);
            }
        }
        for step in &self.prover_steps {
            out.push(b'P');
            put_u64(&mut out, step.round as u64);
            put_str(&mut out, &step.name);
        }
        for step in &self.verifier_steps {
            out.push(b'V');
            put_u64(&mut out, step.round as u64);
            put_str(&mut out, &step.name);
        }
        out
    }

    /// BLAKE3 hash of [`canonical_bytes`](Self::canonical_bytes).
    pub fn canonical_digest(&self) -> [u8; 32] {
        *blake3::hash(&self.canonical_bytes()).as_bytes()
    }
}

const F_MODULUS_BITS: usize = 254;

fn status_tag(s: Status) -> u8 {
    match s {
        Status::Precomputed => 0,
        Status::Committed => 1,
        Status::Proof => 2,
        Status::VerifierDefined => 3,
        Status::Ignored => 4,
    }
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    put_u64(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn put_field(out: &mut Vec<u8>, f: &F) {
    f.serialize_compressed(out)
        .expect("field serialization into a Vec cannot fail");
}

fn put_ref(out: &mut Vec<u8>, r: &ColumnRef) {
    match r {
        ColumnRef::Natural(id) => {
            out.push(0);
            put_str(out, &id.0);
        }
        ColumnRef::Shifted { inner, offset } => {
            out.push(1);
            put_u64(out, *offset as u64);
            put_ref(out, inner);
        }
        ColumnRef::FromYs { query, ranges } => {
            out.push(2);
            put_str(out, &query.0);
            put_u64(out, ranges.len() as u64);
            for id in ranges {
                put_str(out, &id.0);
            }
        }
        ColumnRef::RandLinComb { coin, parents } => {
            out.push(3);
            put_str(out, &coin.0);
            put_u64(out, parents.len() as u64);
            for p in parents {
                put_ref(out, p);
            }
        }
    }
}

fn put_expr(out: &mut Vec<u8>, e: &Expression) {
    match e {
        Expression::Constant(f) => {
            out.push(0);
            put_field(out, f);
        }
        Expression::Column(r) => {
            out.push(1);
            put_ref(out, r);
        }
        Expression::Coin(name) => {
            out.push(2);
            put_str(out, &name.0);
        }
        Expression::PeriodicSample { period, offset } => {
            out.push(3);
            put_u64(out, *period as u64);
            put_u64(out, *offset as u64);
        }
        Expression::Add(a, b) => {
            out.push(4);
            put_expr(out, a);
            put_expr(out, b);
        }
        Expression::Sub(a, b) => {
            out.push(5);
            put_expr(out, a);
            put_expr(out, b);
        }
        Expression::Mul(a, b) => {
            out.push(6);
            put_expr(out, a);
            put_expr(out, b);
        }
    }
}

fn put_query_kind(out: &mut Vec<u8>, k: &QueryKind) {
    match k {
        QueryKind::Global { size, expr } => {
            out.push(0);
            put_u64(out, *size as u64);
            put_expr(out, expr);
        }
        QueryKind::LocalOpening { col } => {
            out.push(1);
            put_ref(out, col);
        }
        QueryKind::UnivariateEval { cols } => {
            out.push(2);
            put_u64(out, cols.len() as u64);
            for c in cols {
                put_ref(out, c);
            }
        }
        QueryKind::FixedPermutation { sigma, left, right } => {
            out.push(3);
            put_u64(out, sigma.len() as u64);
            for s in sigma {
                put_u64(out, *s);
            }
            put_u64(out, left.len() as u64);
            for c in left {
                put_ref(out, c);
            }
            put_u64(out, right.len() as u64);
            for c in right {
                put_ref(out, c);
            }
        }
        QueryKind::InnerProduct { a, b } => {
            out.push(4);
            put_ref(out, a);
            put_ref(out, b);
        }
        QueryKind::Range { col, bits } => {
            out.push(5);
            put_ref(out, col);
            put_u64(out, *bits as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "duplicate registration")]
    fn duplicate_column_panics() {
        let mut comp = CompiledIop::new();
        comp.register_column(0, "P", 8, Status::Committed);
        comp.register_column(0, "P", 8, Status::Committed);
    }

    #[test]
    #[should_panic(expected = "non-power-of-two")]
    fn odd_size_panics() {
        let mut comp = CompiledIop::new();
        comp.register_column(0, "P", 6, Status::Committed);
    }

    #[test]
    #[should_panic(expected = "illegal status transition")]
    fn precomputed_is_terminal() {
        let mut comp = CompiledIop::new();
        comp.register_precomputed("P", SmartVector::from_u64s(&[1, 2, 3, 4]));
        comp.set_status(&ColId::from("P"), Status::Ignored);
    }

    #[test]
    fn canonical_bytes_are_stable() {
        let build = || {
            let mut comp = CompiledIop::new();
            let p = comp.register_column(0, "P", 8, Status::Committed);
            comp.register_coin(1, "alpha", CoinKind::Field);
            comp.insert_local_opening(1, "OPEN", p.clone().shift(1));
            comp.insert_global(
                0,
                "GLOBAL",
                8,
                Expression::column(p) * Expression::from_u64(2),
            );
            comp
        };
        assert_eq!(build().canonical_bytes(), build().canonical_bytes());

        let mut other = build();
        other.set_status(&ColId::from("P"), Status::Proof);
        assert_ne!(build().canonical_bytes(), other.canonical_bytes());
    }

    #[test]
    fn round_register_orders_by_round_then_insertion() {
        let mut comp = CompiledIop::new();
        comp.register_column(1, "B", 8, Status::Committed);
        comp.register_column(0, "A", 8, Status::Committed);
        comp.register_column(1, "C", 8, Status::Committed);
        let ids: Vec<String> = comp.columns.ids_ordered().map(|i| i.0.clone()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(comp.num_rounds(), 2);
    }
}
