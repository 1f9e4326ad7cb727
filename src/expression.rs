//! Symbolic polynomial expressions over columns, coins and constants.
//!
//! An [`Expression`] is an algebraic DAG whose leaves are constants, column
//! references, coin references and periodic samples. Expressions stay
//! multilinear in the coin variables by construction of the compiler passes
//! that emit them; the type itself does not enforce it.
//!
//! A *row evaluation* at index `i` resolves column references through
//! `get(i)`, coin references through the runtime sample, and
//! `periodic_sample(L, k)` to 1 if `i mod L == k`, else 0. A global
//! constraint is satisfied iff the row evaluation is zero for every row.

use std::ops;

use ark_ff::{One, Zero};

use crate::coin::CoinName;
use crate::column::ColumnRef;
use crate::registry::UsageError;
use crate::smartvectors::SmartVector;
use crate::F;

/// Resolution context for expression evaluation, implemented by the runtimes.
pub trait EvalCtx {
    /// Resolve a column reference to its assignment.
    fn column(&self, r: &ColumnRef) -> Result<SmartVector, UsageError>;
    /// Resolve a field coin to its sampled value.
    fn coin_field(&self, name: &CoinName) -> Result<F, UsageError>;
}

/// Symbolic expression node.
#[derive(Clone, PartialEq, Debug)]
pub enum Expression {
    Constant(F),
    Column(ColumnRef),
    Coin(CoinName),
    /// 1 on rows congruent to `offset` modulo `period`, 0 elsewhere.
    PeriodicSample { period: usize, offset: usize },
    Add(Box<Expression>, Box<Expression>),
    Sub(Box<Expression>, Box<Expression>),
    Mul(Box<Expression>, Box<Expression>),
}

/// Deduplicated leaves of an expression, in first-occurrence order.
pub struct Board<'a> {
    pub columns: Vec<&'a ColumnRef>,
    pub coins: Vec<&'a CoinName>,
}

impl Expression {
    pub fn constant(f: F) -> Self {
        Expression::Constant(f)
    }

    /// Constant from a small integer, convenient in definers and tests.
    pub fn from_u64(v: u64) -> Self {
        Expression::Constant(F::from(v))
    }

    pub fn column(r: impl Into<ColumnRef>) -> Self {
        Expression::Column(r.into())
    }

    pub fn coin(name: impl Into<CoinName>) -> Self {
        Expression::Coin(name.into())
    }

    /// Periodic indicator. `period` must be a power of two and
    /// `offset < period` (programmer errors otherwise).
    pub fn periodic_sample(period: usize, offset: usize) -> Self {
        assert!(period.is_power_of_two(), "period {period} is not a power of two");
        assert!(offset < period, "offset {offset} out of range for period {period}");
        Expression::PeriodicSample { period, offset }
    }

    /// Leaves of the DAG, deduplicated in first-occurrence order. This order
    /// is part of the registry's canonical serialization.
    pub fn board(&self) -> Board<'_> {
        let mut board = Board { columns: Vec::new(), coins: Vec::new() };
        self.walk(&mut board);
        board
    }

    fn walk<'a>(&'a self, board: &mut Board<'a>) {
        match self {
            Expression::Constant(_) | Expression::PeriodicSample { .. } => {}
            Expression::Column(r) => {
                if !board.columns.contains(&r) {
                    board.columns.push(r);
                }
            }
            Expression::Coin(name) => {
                if !board.coins.contains(&name) {
                    board.coins.push(name);
                }
            }
            Expression::Add(a, b) | Expression::Sub(a, b) | Expression::Mul(a, b) => {
                a.walk(board);
                b.walk(board);
            }
        }
    }

    /// Evaluate over every row of a size-`size` domain.
    pub fn eval_column(&self, size: usize, ctx: &dyn EvalCtx) -> Result<SmartVector, UsageError> {
        match self {
            Expression::Constant(f) => Ok(SmartVector::constant(*f, size)),
            Expression::Coin(name) => Ok(SmartVector::constant(ctx.coin_field(name)?, size)),
            Expression::Column(r) => {
                let v = ctx.column(r)?;
                if v.len() != size {
                    return Err(UsageError::SizeMismatch {
                        what: r.display_id(),
                        expected: size,
                        got: v.len(),
                    });
                }
                Ok(v)
            }
            Expression::PeriodicSample { period, offset } => {
                assert!(
                    size % period == 0,
                    "period {period} does not divide the domain size {size}"
                );
                let values = (0..size)
                    .map(|i| if i % period == *offset { F::one() } else { F::zero() })
                    .collect();
                Ok(SmartVector::regular(values))
            }
            Expression::Add(a, b) => Ok(a.eval_column(size, ctx)?.add(&b.eval_column(size, ctx)?)),
            Expression::Sub(a, b) => Ok(a.eval_column(size, ctx)?.sub(&b.eval_column(size, ctx)?)),
            Expression::Mul(a, b) => Ok(a.eval_column(size, ctx)?.mul(&b.eval_column(size, ctx)?)),
        }
    }

    /// Evaluate at a single row of a size-`size` domain.
    pub fn eval_at(&self, i: usize, size: usize, ctx: &dyn EvalCtx) -> Result<F, UsageError> {
        match self {
            Expression::Constant(f) => Ok(*f),
            Expression::Coin(name) => ctx.coin_field(name),
            Expression::Column(r) => Ok(ctx.column(r)?.get(i)),
            Expression::PeriodicSample { period, offset } => {
                Ok(if i % period == *offset { F::one() } else { F::zero() })
            }
            Expression::Add(a, b) => Ok(a.eval_at(i, size, ctx)? + b.eval_at(i, size, ctx)?),
            Expression::Sub(a, b) => Ok(a.eval_at(i, size, ctx)? - b.eval_at(i, size, ctx)?),
            Expression::Mul(a, b) => Ok(a.eval_at(i, size, ctx)? * b.eval_at(i, size, ctx)?),
        }
    }

    /// Rewrite every natural column id through `f` (compiler passes use this
    /// to re-target expressions at sub-columns).
    pub fn map_natural_ids(&self, f: &dyn Fn(&crate::column::ColId) -> crate::column::ColId) -> Expression {
        match self {
            Expression::Constant(_) | Expression::Coin(_) | Expression::PeriodicSample { .. } => {
                self.clone()
            }
            Expression::Column(r) => Expression::Column(map_ref_ids(r, f)),
            Expression::Add(a, b) => Expression::Add(
                Box::new(a.map_natural_ids(f)),
                Box::new(b.map_natural_ids(f)),
            ),
            Expression::Sub(a, b) => Expression::Sub(
                Box::new(a.map_natural_ids(f)),
                Box::new(b.map_natural_ids(f)),
            ),
            Expression::Mul(a, b) => Expression::Mul(
                Box::new(a.map_natural_ids(f)),
                Box::new(b.map_natural_ids(f)),
            ),
        }
    }
}

fn map_ref_ids(r: &ColumnRef, f: &dyn Fn(&crate::column::ColId) -> crate::column::ColId) -> ColumnRef {
    match r {
        ColumnRef::Natural(id) => ColumnRef::Natural(f(id)),
        ColumnRef::Shifted { inner, offset } => ColumnRef::Shifted {
            inner: Box::new(map_ref_ids(inner, f)),
            offset: *offset,
        },
        other => other.clone(),
    }
}

impl ops::Add for Expression {
    type Output = Expression;
    fn add(self, rhs: Expression) -> Expression {
        Expression::Add(Box::new(self), Box::new(rhs))
    }
}

impl ops::Sub for Expression {
    type Output = Expression;
    fn sub(self, rhs: Expression) -> Expression {
        Expression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl ops::Mul for Expression {
    type Output = Expression;
    fn mul(self, rhs: Expression) -> Expression {
        Expression::Mul(Box::new(self), Box::new(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeCtx {
        cols: HashMap<String, SmartVector>,
        coins: HashMap<String, F>,
    }

    impl EvalCtx for FakeCtx {
        fn column(&self, r: &ColumnRef) -> Result<SmartVector, UsageError> {
            match r {
                ColumnRef::Natural(id) => Ok(self.cols[id.as_str()].clone()),
                ColumnRef::Shifted { inner, offset } => Ok(self.column(inner)?.rotate(*offset)),
                _ => unreachable!("not needed in these tests"),
            }
        }
        fn coin_field(&self, name: &CoinName) -> Result<F, UsageError> {
            Ok(self.coins[name.as_str()])
        }
    }

    fn ctx() -> FakeCtx {
        let mut cols = HashMap::new();
        cols.insert("P".to_owned(), SmartVector::from_u64s(&[1, 2, 3, 4]));
        let mut coins = HashMap::new();
        coins.insert("r".to_owned(), F::from(10u64));
        FakeCtx { cols, coins }
    }

    #[test]
    fn row_evaluation() {
        // P(i) * r + 1 at row 2 = 3*10 + 1.
        let e = Expression::column(ColumnRef::natural("P")) * Expression::coin("r")
            + Expression::from_u64(1);
        assert_eq!(e.eval_at(2, 4, &ctx()).unwrap(), F::from(31u64));
    }

    #[test]
    fn periodic_sample_indicator() {
        let e = Expression::periodic_sample(2, 1);
        let v = e.eval_column(4, &ctx()).unwrap();
        assert_eq!(v, SmartVector::from_u64s(&[0, 1, 0, 1]));
    }

    #[test]
    fn board_collects_leaves_once() {
        let p = Expression::column(ColumnRef::natural("P"));
        let e = p.clone() * p + Expression::coin("r");
        let board = e.board();
        assert_eq!(board.columns.len(), 1);
        assert_eq!(board.coins.len(), 1);
    }

    #[test]
    fn shifted_column_in_expression() {
        let e = Expression::column(ColumnRef::natural("P").shift(1))
            - Expression::column(ColumnRef::natural("P"));
        let v = e.eval_column(4, &ctx()).unwrap();
        // [2,3,4,1] - [1,2,3,4] = [1,1,1,-3]
        assert_eq!(v.get(0), F::from(1u64));
        assert_eq!(v.get(3), F::from(1u64) - F::from(4u64));
    }
}
