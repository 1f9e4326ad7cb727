//! Compiler pipeline.
//!
//! A pass is a value-passing transformation `CompiledIop -> CompiledIop`:
//! [`compile`] runs the definer, folds the passes left to right (each pass
//! receives the registry its predecessors produced), then freezes the result.
//! Passes may insert columns, coins, queries and prover/verifier steps and
//! may move statuses through the allowed transitions; they never remove or
//! reorder entries of earlier rounds.

use tracing::info;

use crate::builder::Builder;
use crate::registry::CompiledIop;

pub mod dummy;
pub mod reedsolomon;
pub mod selfrecursion;
pub mod splitter;
pub mod vortex;

/// A registry-to-registry transformation.
pub type CompilerPass = Box<dyn Fn(CompiledIop) -> CompiledIop>;

/// Run the definer, apply the passes in order, freeze the result.
pub fn compile(define: impl FnOnce(&mut Builder), passes: Vec<CompilerPass>) -> CompiledIop {
    let mut builder = Builder::new();
    define(&mut builder);
    let mut comp = builder.into_compiled();
    for (i, pass) in passes.iter().enumerate() {
        comp = pass(comp);
        info!(pass = i, rounds = comp.num_rounds(), "compiler pass applied");
    }
    comp.freeze();
    comp
}
