//! Formula language shared by the compiler and the engines.
//!
//! Decision variables are referenced by [`VarId`]. Integer terms are linear
//! expressions `Σ cᵢ·xᵢ + k` ([`LinExpr`]); boolean variables may appear in
//! them as 0/1 terms. Assertions are [`Formula`] trees over comparisons of
//! linear expressions, boolean variables and the usual connectives.
//!
//! The language is the quantifier-free fragment every SMT backend accepts,
//! which keeps the compiled problem portable across backends.
//!
//! # Reference
//! Barrett, Fontaine & Tinelli (2017), "The SMT-LIB Standard: Version 2.6", §3

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Not, Sub};

/// Handle of a decision variable registered with a problem or engine.
///
/// Ids are dense indexes in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub(crate) u32);

impl VarId {
    /// Position of the variable in its declaration list.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

/// Sort of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sort {
    /// Bounded integer.
    Int,
    /// Boolean, valued 0 or 1 inside arithmetic.
    Bool,
}

/// Declaration of a decision variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    /// Unique variable name.
    pub name: String,
    /// Variable sort.
    pub sort: Sort,
    /// Smallest admissible value.
    pub lower: i64,
    /// Largest admissible value.
    pub upper: i64,
}

impl VarDecl {
    /// Declares an integer variable with domain `[lower, upper]`.
    pub fn int(name: impl Into<String>, lower: i64, upper: i64) -> Self {
        Self {
            name: name.into(),
            sort: Sort::Int,
            lower,
            upper,
        }
    }

    /// Declares a boolean variable.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort: Sort::Bool,
            lower: 0,
            upper: 1,
        }
    }

    /// Whether this is a boolean variable.
    pub fn is_bool(&self) -> bool {
        self.sort == Sort::Bool
    }
}

/// Linear integer expression `Σ cᵢ·xᵢ + k`.
///
/// Terms are kept sorted by variable with merged, non-zero coefficients, so
/// structurally equal expressions compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinExpr {
    terms: Vec<(VarId, i64)>,
    constant: i64,
}

impl LinExpr {
    /// The expression `1·var`.
    pub fn var(var: VarId) -> Self {
        Self {
            terms: vec![(var, 1)],
            constant: 0,
        }
    }

    /// A constant expression.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Builds `Σ coefficient·var + constant`.
    pub fn from_terms(terms: impl IntoIterator<Item = (VarId, i64)>, constant: i64) -> Self {
        Self {
            terms: terms.into_iter().collect(),
            constant,
        }
        .normalized()
    }

    /// Sums a sequence of expressions.
    pub fn sum<T: Into<LinExpr>>(items: impl IntoIterator<Item = T>) -> Self {
        items
            .into_iter()
            .fold(LinExpr::default(), |acc, item| acc + item.into())
    }

    /// Variable terms, sorted by variable.
    pub fn terms(&self) -> &[(VarId, i64)] {
        &self.terms
    }

    /// Constant offset.
    pub fn offset(&self) -> i64 {
        self.constant
    }

    /// Whether the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterates over the variables of this expression.
    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.terms.iter().map(|&(v, _)| v)
    }

    fn normalized(mut self) -> Self {
        self.terms.sort_by_key(|&(v, _)| v);
        let mut merged: Vec<(VarId, i64)> = Vec::with_capacity(self.terms.len());
        for (var, coef) in self.terms {
            match merged.last_mut() {
                Some((last, c)) if *last == var => *c += coef,
                _ => merged.push((var, coef)),
            }
        }
        merged.retain(|&(_, c)| c != 0);
        self.terms = merged;
        self
    }
}

impl From<VarId> for LinExpr {
    fn from(var: VarId) -> Self {
        LinExpr::var(var)
    }
}

impl From<i64> for LinExpr {
    fn from(value: i64) -> Self {
        LinExpr::constant(value)
    }
}

impl From<&LinExpr> for LinExpr {
    fn from(expr: &LinExpr) -> Self {
        expr.clone()
    }
}

impl<T: Into<LinExpr>> Add<T> for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: T) -> LinExpr {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self.normalized()
    }
}

impl<T: Into<LinExpr>> Sub<T> for LinExpr {
    type Output = LinExpr;

    fn sub(self, rhs: T) -> LinExpr {
        self + (-rhs.into())
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self * -1
    }
}

impl Mul<i64> for LinExpr {
    type Output = LinExpr;

    fn mul(mut self, factor: i64) -> LinExpr {
        for (_, c) in &mut self.terms {
            *c *= factor;
        }
        self.constant *= factor;
        self.normalized()
    }
}

impl<T: Into<LinExpr>> Add<T> for VarId {
    type Output = LinExpr;

    fn add(self, rhs: T) -> LinExpr {
        LinExpr::var(self) + rhs
    }
}

impl<T: Into<LinExpr>> Sub<T> for VarId {
    type Output = LinExpr;

    fn sub(self, rhs: T) -> LinExpr {
        LinExpr::var(self) - rhs
    }
}

impl Mul<i64> for VarId {
    type Output = LinExpr;

    fn mul(self, factor: i64) -> LinExpr {
        LinExpr::var(self) * factor
    }
}

/// Comparison operator of an arithmetic atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

/// A quantifier-free assertion over decision variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formula {
    /// `true` or `false`.
    Const(bool),
    /// A boolean variable.
    Var(VarId),
    /// `lhs ⋈ rhs`.
    Cmp {
        lhs: LinExpr,
        op: CmpOp,
        rhs: LinExpr,
    },
    /// Negation.
    Not(Box<Formula>),
    /// Conjunction; empty is `true`.
    And(Vec<Formula>),
    /// Disjunction; empty is `false`.
    Or(Vec<Formula>),
    /// Exclusive or.
    Xor(Box<Formula>, Box<Formula>),
    /// Implication.
    Implies(Box<Formula>, Box<Formula>),
    /// All expressions take pairwise different values.
    Distinct(Vec<LinExpr>),
}

impl Formula {
    /// Boolean variable atom.
    pub fn var(var: VarId) -> Self {
        Formula::Var(var)
    }

    /// Comparison atom.
    pub fn cmp(lhs: impl Into<LinExpr>, op: CmpOp, rhs: impl Into<LinExpr>) -> Self {
        Formula::Cmp {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
        }
    }

    /// `lhs < rhs`
    pub fn lt(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::cmp(lhs, CmpOp::Lt, rhs)
    }

    /// `lhs <= rhs`
    pub fn le(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::cmp(lhs, CmpOp::Le, rhs)
    }

    /// `lhs == rhs`
    pub fn equal(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::cmp(lhs, CmpOp::Eq, rhs)
    }

    /// `lhs != rhs`
    pub fn not_equal(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::cmp(lhs, CmpOp::Ne, rhs)
    }

    /// `lhs >= rhs`
    pub fn ge(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::cmp(lhs, CmpOp::Ge, rhs)
    }

    /// `lhs > rhs`
    pub fn gt(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::cmp(lhs, CmpOp::Gt, rhs)
    }

    /// Conjunction of all given formulas.
    pub fn and(items: impl IntoIterator<Item = Formula>) -> Self {
        Formula::And(items.into_iter().collect())
    }

    /// Disjunction of all given formulas.
    pub fn or(items: impl IntoIterator<Item = Formula>) -> Self {
        Formula::Or(items.into_iter().collect())
    }

    /// Exactly one of `a` and `b` holds.
    pub fn xor(a: Formula, b: Formula) -> Self {
        Formula::Xor(Box::new(a), Box::new(b))
    }

    /// `premise => conclusion`
    pub fn implies(premise: Formula, conclusion: Formula) -> Self {
        Formula::Implies(Box::new(premise), Box::new(conclusion))
    }

    /// If `cond` then `then` else `otherwise`.
    pub fn ite(cond: Formula, then: Formula, otherwise: Formula) -> Self {
        Formula::and([
            Formula::implies(cond.clone(), then),
            Formula::implies(!cond, otherwise),
        ])
    }

    /// Pairwise distinct values.
    pub fn distinct<T: Into<LinExpr>>(items: impl IntoIterator<Item = T>) -> Self {
        Formula::Distinct(items.into_iter().map(Into::into).collect())
    }

    /// Collects every variable mentioned by this formula.
    pub fn collect_vars(&self, out: &mut Vec<VarId>) {
        match self {
            Formula::Const(_) => {}
            Formula::Var(v) => out.push(*v),
            Formula::Cmp { lhs, rhs, .. } => {
                out.extend(lhs.vars());
                out.extend(rhs.vars());
            }
            Formula::Not(f) => f.collect_vars(out),
            Formula::And(fs) | Formula::Or(fs) => {
                for f in fs {
                    f.collect_vars(out);
                }
            }
            Formula::Xor(a, b) | Formula::Implies(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Formula::Distinct(es) => {
                for e in es {
                    out.extend(e.vars());
                }
            }
        }
    }
}

impl Not for Formula {
    type Output = Formula;

    fn not(self) -> Formula {
        match self {
            Formula::Const(b) => Formula::Const(!b),
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }
}
