//! Decision-procedure engine interface and its Z3 implementation.
//!
//! The compiler and orchestrator only talk to a backend through the
//! [`Engine`] trait: declare bounded variables, add (optionally tracked)
//! assertions, open and close scopes, `check`, read a [`Model`]. Native
//! multi-objective optimization is an optional capability.
//!
//! [`Z3Engine`] implements the whole trait on the Z3 SMT solver; test doubles
//! and other backends plug in by implementing [`Engine`].
//!
//! # Key Components
//!
//! - [`Engine`]: backend capability trait
//! - [`Z3Engine`]: `Solver` / `Optimize` backed engine
//! - [`CheckResult`]: sat / unsat / unknown-with-reason
//! - [`Model`]: valuation produced by a satisfiable check
//! - [`EngineParams`]: timeout, threads, seed, solving mode
//!
//! # Reference
//! de Moura & Bjørner (2008), "Z3: An Efficient SMT Solver", TACAS

mod backend;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, SchedError};
use crate::formula::{Formula, LinExpr, VarDecl, VarId};

pub use backend::{new_context, Z3Engine};
pub use z3::Context;

/// Outcome of a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// A model exists and can be read with [`Engine::model`].
    Sat,
    /// No model exists under the current assertions.
    Unsat,
    /// The engine could not decide; carries the engine's own reason.
    Unknown(String),
}

impl CheckResult {
    /// Whether the check produced a model.
    pub fn is_sat(&self) -> bool {
        matches!(self, CheckResult::Sat)
    }
}

/// Optimization direction of an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Minimize,
    Maximize,
}

impl FromStr for Direction {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" | "minimize" => Ok(Direction::Minimize),
            "max" | "maximize" => Ok(Direction::Maximize),
            other => Err(SchedError::InvalidConfiguration(format!(
                "unknown optimization direction '{other}', choose either 'min' or 'max'"
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Minimize => f.write_str("min"),
            Direction::Maximize => f.write_str("max"),
        }
    }
}

/// Priority discipline between several native objectives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Objectives optimized in declaration order, later ones constrained by
    /// the optima of earlier ones.
    #[default]
    #[serde(alias = "lexicographic")]
    Lex,
    /// Every objective optimized independently.
    Box,
    /// Non-dominated trade-offs, as far as the backend supports them.
    Pareto,
}

impl FromStr for Priority {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lex" | "lexicographic" => Ok(Priority::Lex),
            "box" => Ok(Priority::Box),
            "pareto" => Ok(Priority::Pareto),
            other => Err(SchedError::InvalidConfiguration(format!(
                "unknown objective priority '{other}', choose one of 'lex', 'box', 'pareto'"
            ))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Lex => f.write_str("lex"),
            Priority::Box => f.write_str("box"),
            Priority::Pareto => f.write_str("pareto"),
        }
    }
}

/// Theory fragment hint, named after the SMT-LIB logics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    /// Integer difference logic.
    #[default]
    #[serde(rename = "QF_IDL")]
    QfIdl,
    /// Linear integer arithmetic.
    #[serde(rename = "QF_LIA")]
    QfLia,
    /// Linear integer/real arithmetic, needed by cost functions.
    #[serde(rename = "QF_LIRA")]
    QfLira,
}

impl Logic {
    /// SMT-LIB name of the logic.
    pub fn smtlib_name(self) -> &'static str {
        match self {
            Logic::QfIdl => "QF_IDL",
            Logic::QfLia => "QF_LIA",
            Logic::QfLira => "QF_LIRA",
        }
    }
}

impl FromStr for Logic {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QF_IDL" => Ok(Logic::QfIdl),
            "QF_LIA" => Ok(Logic::QfLia),
            "QF_LIRA" => Ok(Logic::QfLira),
            other => Err(SchedError::InvalidConfiguration(format!(
                "unsupported logic '{other}'"
            ))),
        }
    }
}

/// Solving mode requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Plain incremental satisfiability, optionally restricted to a logic.
    Incremental { logic: Option<Logic> },
    /// Native optimization of the registered objectives.
    Optimize { priority: Priority },
}

/// Engine-level parameters derived from the solver configuration.
#[derive(Debug, Clone)]
pub struct EngineParams {
    /// Wall-clock limit of a single `check`.
    pub timeout: Duration,
    /// Worker threads the engine may use internally.
    pub threads: usize,
    /// Random seed; 0 means the engine's deterministic default.
    pub seed: u64,
    /// Solving mode.
    pub mode: EngineMode,
    /// Keep provenance of tracked assertions to report unsatisfiable cores.
    pub unsat_cores: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            threads: 1,
            seed: 0,
            mode: EngineMode::Incremental { logic: None },
            unsat_cores: false,
        }
    }
}

/// A complete valuation of the declared variables.
///
/// Booleans are valued 0 or 1. Reading a variable the engine did not value
/// yields 0 (model completion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    values: Vec<i64>,
}

impl Model {
    /// Creates a model from values indexed by [`VarId`].
    pub fn new(values: Vec<i64>) -> Self {
        Self { values }
    }

    /// Value of a variable, if the model contains it.
    pub fn value(&self, var: VarId) -> Option<i64> {
        self.values.get(var.index()).copied()
    }

    /// Integer value of a variable.
    pub fn int(&self, var: VarId) -> i64 {
        self.value(var).unwrap_or(0)
    }

    /// Boolean value of a variable.
    pub fn bool(&self, var: VarId) -> bool {
        self.int(var) != 0
    }

    /// Evaluates a linear expression.
    pub fn eval(&self, expr: &LinExpr) -> i64 {
        expr.terms()
            .iter()
            .fold(expr.offset(), |acc, &(v, c)| acc + c * self.int(v))
    }

    /// Number of valued variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the model is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(variable, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, i64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (VarId::from_index(i), v))
    }
}

/// Counters reported by an engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    /// Number of `check` calls.
    pub checks: u64,
    /// Time spent inside `check`.
    pub solve_time: Duration,
    /// Worker threads granted by the parameters.
    pub threads: usize,
    /// Backend-specific counters, in the backend's order.
    pub backend: Vec<(String, String)>,
}

impl Statistics {
    /// Key/value listing for diagnostics.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![
            ("checks".to_string(), self.checks.to_string()),
            (
                "time".to_string(),
                format!("{:.3}s", self.solve_time.as_secs_f64()),
            ),
            ("threads".to_string(), self.threads.to_string()),
        ];
        entries.extend(self.backend.iter().cloned());
        entries
    }
}

/// Capability interface of a decision-procedure backend.
///
/// Variables must be declared in [`VarId`] order before they are used.
/// Implementations are single-threaded handles: every method takes `&mut self`
/// or `&self` and no internal locking is expected.
pub trait Engine {
    /// Applies parameters; called once before any declaration.
    fn configure(&mut self, params: &EngineParams);

    /// Declares a variable and returns its id.
    fn declare(&mut self, decl: &VarDecl) -> VarId;

    /// Adds an assertion to the current scope.
    fn assert(&mut self, formula: Formula);

    /// Adds an assertion labelled for unsatisfiable-core reporting.
    fn assert_tracked(&mut self, formula: Formula, label: String) {
        let _ = label;
        self.assert(formula);
    }

    /// Opens a scope.
    fn push(&mut self);

    /// Drops the innermost scope and every assertion added in it.
    fn pop(&mut self);

    /// Checks satisfiability of the current assertions.
    fn check(&mut self) -> CheckResult;

    /// Model of the last satisfiable check.
    fn model(&self) -> Option<Model>;

    /// Labels of a minimal conflicting subset after an unsatisfiable check.
    fn unsat_core(&self) -> Vec<String> {
        Vec::new()
    }

    /// Registers a native objective (optimizing mode only).
    fn add_objective(&mut self, direction: Direction, target: VarId) -> Result<()> {
        let _ = (direction, target);
        Err(SchedError::Unsupported("native optimization".into()))
    }

    /// Best values of the native objectives after the last check.
    fn objective_values(&self) -> Vec<Option<i64>> {
        Vec::new()
    }

    /// Declared variables, in id order.
    fn declarations(&self) -> &[VarDecl];

    /// Current assertions rendered as SMT-LIB2 terms, outermost scope first.
    fn assertions(&self) -> Vec<String>;

    /// Engine counters.
    fn statistics(&self) -> Statistics {
        Statistics::default()
    }

    /// Serializes the current state to SMT-LIB2 text.
    fn to_smt2(&self) -> String {
        self.assertions()
            .iter()
            .map(|a| format!("(assert {a})\n"))
            .collect()
    }
}
