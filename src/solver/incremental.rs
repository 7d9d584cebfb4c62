//! Incremental single-objective optimizer.
//!
//! A state machine that repeatedly checks, reads the objective value `v` of
//! the model, opens a scope and asserts `target < v` (minimize) or
//! `target > v` (maximize), until the engine reports unsat/unknown or a
//! [`Termination`] predicate stops the search.
//!
//! ```text
//! Checking ──sat──▶ Tightening ──push+assert──▶ Checking
//!    │ unsat/unknown          │ budget
//!    ▼                        ▼
//! Converged | Infeasible   TimedOut | Exhausted
//! ```
//!
//! Accepted values are strictly monotone. Every scope opened by the run is
//! popped before [`IncrementalOptimizer::run`] returns.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AssertionTracker;
use crate::config::SolverConfig;
use crate::engine::{CheckResult, Direction, Engine, Model};
use crate::formula::{Formula, VarId};

/// State of the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerState {
    /// About to issue a check.
    Checking,
    /// A model with objective `value` was accepted; about to tighten.
    Tightening { value: i64 },
    /// No better model exists (or none could be found); best model kept.
    Converged,
    /// Time budget exhausted; best model kept.
    TimedOut,
    /// Iteration budget exhausted; best model kept.
    Exhausted,
    /// The first check produced no model.
    Infeasible,
}

impl OptimizerState {
    /// Whether the run is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            OptimizerState::Checking | OptimizerState::Tightening { .. }
        )
    }
}

/// Work done so far by a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Checks issued.
    pub iterations: usize,
    /// Accumulated check time.
    pub elapsed: Duration,
}

/// Why a budget stopped the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    TimeBudget,
    IterationBudget,
}

/// Decides when to stop improving, evaluated after every accepted model.
pub trait Termination: Debug {
    /// Returns the reason to stop, if any.
    fn is_terminated(&self, progress: &Progress) -> Option<StopReason>;
}

/// Stops once accumulated check time exceeds a limit.
#[derive(Debug, Clone)]
pub struct TimeTermination {
    limit: Duration,
}

impl TimeTermination {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl Termination for TimeTermination {
    fn is_terminated(&self, progress: &Progress) -> Option<StopReason> {
        (progress.elapsed > self.limit).then_some(StopReason::TimeBudget)
    }
}

/// Stops after a number of checks.
#[derive(Debug, Clone)]
pub struct IterationTermination {
    limit: usize,
}

impl IterationTermination {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Termination for IterationTermination {
    fn is_terminated(&self, progress: &Progress) -> Option<StopReason> {
        (progress.iterations >= self.limit).then_some(StopReason::IterationBudget)
    }
}

/// Time budget plus optional iteration ceiling, as configured.
#[derive(Debug, Clone)]
pub struct BudgetTermination {
    time: TimeTermination,
    iterations: Option<IterationTermination>,
}

impl BudgetTermination {
    pub fn new(limit: Duration, max_iterations: Option<usize>) -> Self {
        Self {
            time: TimeTermination::new(limit),
            iterations: max_iterations.map(IterationTermination::new),
        }
    }

    /// Budget of a solver configuration.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(config.time_limit(), config.max_iterations)
    }
}

impl Termination for BudgetTermination {
    fn is_terminated(&self, progress: &Progress) -> Option<StopReason> {
        self.time.is_terminated(progress).or_else(|| {
            self.iterations
                .as_ref()
                .and_then(|t| t.is_terminated(progress))
        })
    }
}

/// Result of an optimizer run.
#[derive(Debug, Clone)]
pub struct OptimizerRun {
    /// Terminal state.
    pub state: OptimizerState,
    /// Best model, absent when infeasible.
    pub model: Option<Model>,
    /// Accepted objective values, strictly monotone.
    pub accepted: Vec<i64>,
    /// Work done.
    pub progress: Progress,
    /// Result of the last check.
    pub last_check: CheckResult,
}

impl OptimizerRun {
    /// Best objective value.
    pub fn best_value(&self) -> Option<i64> {
        self.accepted.last().copied()
    }
}

/// Single-objective tightening loop.
#[derive(Debug)]
pub struct IncrementalOptimizer<T: Termination> {
    direction: Direction,
    target: VarId,
    termination: T,
}

impl<T: Termination> IncrementalOptimizer<T> {
    pub fn new(direction: Direction, target: VarId, termination: T) -> Self {
        Self {
            direction,
            target,
            termination,
        }
    }

    fn improves(&self, value: i64, previous: i64) -> bool {
        match self.direction {
            Direction::Minimize => value < previous,
            Direction::Maximize => value > previous,
        }
    }

    fn tightening(&self, value: i64) -> Formula {
        match self.direction {
            Direction::Minimize => Formula::lt(self.target, value),
            Direction::Maximize => Formula::gt(self.target, value),
        }
    }

    /// Runs the loop on `engine`, leaving its scope depth unchanged.
    pub fn run<E: Engine>(&self, engine: &mut E, tracker: &mut AssertionTracker) -> OptimizerRun {
        let mut state = OptimizerState::Checking;
        let mut progress = Progress::default();
        let mut accepted: Vec<i64> = Vec::new();
        let mut best: Option<Model> = None;
        let mut last_check = CheckResult::Unsat;
        let mut depth = 0usize;

        while !state.is_terminal() {
            state = match state {
                OptimizerState::Checking => {
                    let started = Instant::now();
                    let result = engine.check();
                    progress.elapsed += started.elapsed();
                    progress.iterations += 1;
                    last_check = result.clone();
                    let no_more = if best.is_some() {
                        OptimizerState::Converged
                    } else {
                        OptimizerState::Infeasible
                    };
                    match (result, engine.model()) {
                        (CheckResult::Sat, Some(model)) => {
                            let value = model.int(self.target);
                            match accepted.last() {
                                Some(&previous) if !self.improves(value, previous) => {
                                    warn!(
                                        value,
                                        previous, "engine returned a non-improving model"
                                    );
                                    OptimizerState::Converged
                                }
                                _ => {
                                    accepted.push(value);
                                    best = Some(model);
                                    info!(
                                        event = "incremental_step",
                                        iteration = progress.iterations,
                                        value,
                                        elapsed_ms = progress.elapsed.as_millis() as u64,
                                    );
                                    match self.termination.is_terminated(&progress) {
                                        Some(StopReason::TimeBudget) => OptimizerState::TimedOut,
                                        Some(StopReason::IterationBudget) => {
                                            OptimizerState::Exhausted
                                        }
                                        None => OptimizerState::Tightening { value },
                                    }
                                }
                            }
                        }
                        (CheckResult::Sat, None) => {
                            warn!("satisfiable check without a model");
                            no_more
                        }
                        _ => no_more,
                    }
                }
                OptimizerState::Tightening { value } => {
                    engine.push();
                    depth += 1;
                    tracker.assert(engine, self.tightening(value));
                    OptimizerState::Checking
                }
                terminal => terminal,
            };
        }

        for _ in 0..depth {
            engine.pop();
        }

        match state {
            OptimizerState::TimedOut => warn!("time budget exceeded, there might be a better solution"),
            OptimizerState::Exhausted => {
                warn!("iteration budget exceeded, there might be a better solution")
            }
            _ => {}
        }

        OptimizerRun {
            state,
            model: best,
            accepted,
            progress,
            last_check,
        }
    }
}
