//! Scheduling solver: compile, solve, decode.
//!
//! [`SchedulingSolver`] owns one engine handle. Construction validates the
//! configuration and the problem, declares every variable, asserts the
//! compiled constraint set and registers native objectives. [`solve`] then
//! runs the regime chosen by [`Regime::select`] and decodes the model.
//!
//! # Pipeline
//!
//! ```text
//! SchedulingProblem ──compile──▶ assertions ──▶ Engine
//!                                                 │ check / optimize
//!                                                 ▼
//!          SolveReport ◀──decode── Model | unsat core | unknown reason
//! ```
//!
//! # Examples
//!
//! ```
//! use u_schedule_smt::config::SolverConfig;
//! use u_schedule_smt::engine::new_context;
//! use u_schedule_smt::models::{SchedulingProblem, TaskSpec};
//! use u_schedule_smt::solver::SchedulingSolver;
//!
//! let mut problem = SchedulingProblem::new("one").with_horizon_bound(20);
//! problem.add_task(TaskSpec::fixed("T", 3));
//! problem.add_objective_makespan();
//!
//! let ctx = new_context();
//! let mut solver = SchedulingSolver::new(&problem, &ctx, SolverConfig::default()).unwrap();
//! let report = solver.solve();
//! let solution = report.solution().unwrap();
//! assert_eq!(solution.horizon, 3);
//! assert_eq!(solution.task("T").unwrap().start, 0);
//! ```
//!
//! [`solve`]: SchedulingSolver::solve

mod compile;
mod decode;
mod incremental;
mod objective;
mod overlap;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use compile::{compile, task_assertions};
pub use decode::decode;
pub use incremental::{
    BudgetTermination, IncrementalOptimizer, IterationTermination, OptimizerRun, OptimizerState,
    Progress, StopReason, Termination, TimeTermination,
};
pub use objective::Regime;
pub use overlap::OverlapMode;

use crate::config::SolverConfig;
use crate::engine::{
    CheckResult, Context, Engine, EngineParams, Logic, Model, Statistics, Z3Engine,
};
use crate::error::{Result, SchedError};
use crate::formula::{Formula, VarId};
use crate::models::{ScheduleSolution, SchedulingProblem};
use crate::validation::validate_problem;

/// Routes assertions to the engine, labelling them `asst_NNNN` when
/// unsatisfiable cores are requested.
#[derive(Debug, Clone, Default)]
pub struct AssertionTracker {
    enabled: bool,
    next: usize,
}

impl AssertionTracker {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, next: 0 }
    }

    /// Number of labels handed out.
    pub fn labelled(&self) -> usize {
        self.next
    }

    pub fn assert<E: Engine>(&mut self, engine: &mut E, formula: Formula) {
        if self.enabled {
            let label = format!("asst_{:04}", self.next);
            self.next += 1;
            engine.assert_tracked(formula, label);
        } else {
            engine.assert(formula);
        }
    }
}

/// Final outcome of a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// A model was found and decoded.
    Solved(ScheduleSolution),
    /// The assertion set is unsatisfiable. `conflict` lists the labels of a
    /// minimal conflicting subset when the solver runs in debug mode.
    Infeasible { conflict: Option<Vec<String>> },
    /// The engine gave up; `reason` is its message verbatim.
    Indeterminate { reason: String },
}

impl Outcome {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Solved(_) => "solved",
            Outcome::Infeasible { .. } => "infeasible",
            Outcome::Indeterminate { .. } => "indeterminate",
        }
    }
}

/// Soft degradation attached to a solved outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advisory {
    /// The time budget stopped the optimizer; a better solution may exist.
    TimeBudgetExceeded,
    /// The iteration ceiling stopped the optimizer.
    IterationBudgetExceeded,
}

/// Everything a solve produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub outcome: Outcome,
    pub advisories: Vec<Advisory>,
    /// Wall time of the solve.
    pub elapsed: Duration,
    /// Checks issued.
    pub iterations: usize,
    /// Objective name → best value, in declaration order.
    pub objective_values: Vec<(String, Option<i64>)>,
}

impl SolveReport {
    pub fn is_solved(&self) -> bool {
        matches!(self.outcome, Outcome::Solved(_))
    }

    pub fn solution(&self) -> Option<&ScheduleSolution> {
        match &self.outcome {
            Outcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<ScheduleSolution> {
        match self.outcome {
            Outcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    /// Best value of a named objective.
    pub fn objective_value(&self, name: &str) -> Option<i64> {
        self.objective_values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| *v)
    }
}

/// Compile-solve-decode pipeline over one engine handle.
///
/// The solver borrows the problem (and, for [`Z3Engine`], the Z3 context)
/// for its whole life; the problem cannot change between construction and
/// solving.
#[derive(Debug)]
pub struct SchedulingSolver<'p, E: Engine = Z3Engine<'p>> {
    problem: &'p SchedulingProblem,
    config: SolverConfig,
    engine: E,
    tracker: AssertionTracker,
    overlap_mode: OverlapMode,
    regime: Regime,
    logic: Logic,
    current: Option<Model>,
}

impl<'p> SchedulingSolver<'p, Z3Engine<'p>> {
    /// Builds a solver on a [`Z3Engine`] in `ctx`.
    pub fn new(
        problem: &'p SchedulingProblem,
        ctx: &'p Context,
        config: SolverConfig,
    ) -> Result<Self> {
        Self::with_engine(problem, config, Z3Engine::new(ctx))
    }
}

impl<'p, E: Engine> SchedulingSolver<'p, E> {
    /// Builds a solver on a caller-supplied engine with no prior declarations.
    pub fn with_engine(
        problem: &'p SchedulingProblem,
        config: SolverConfig,
        mut engine: E,
    ) -> Result<Self> {
        config.validate()?;
        if let Err(errors) = validate_problem(problem) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(SchedError::InvalidProblem(messages.join("; ")));
        }

        let logic = if problem.has_cost_function() {
            Logic::QfLira
        } else {
            config.logic
        };
        let regime = Regime::select(problem, config.optimize_priority);
        let overlap_mode = OverlapMode::select(problem);

        engine.configure(&EngineParams {
            timeout: config.time_limit(),
            threads: config.engine_threads(),
            seed: config.engine_seed(),
            mode: regime.engine_mode(logic),
            unsat_cores: config.debug,
        });

        for (index, decl) in problem.vars().iter().enumerate() {
            if engine.declare(decl).index() != index {
                return Err(SchedError::InvalidProblem(format!(
                    "engine declared '{}' out of order; it must start without declarations",
                    decl.name
                )));
            }
        }

        let mut tracker = AssertionTracker::new(config.debug);
        let assertions = compile(problem, overlap_mode);
        debug!(
            event = "compiled",
            problem = %problem.name(),
            assertions = assertions.len(),
            overlap = ?overlap_mode,
            regime = regime.name(),
            logic = logic.smtlib_name(),
        );
        for formula in assertions {
            tracker.assert(&mut engine, formula);
        }

        if let Regime::Native { objectives, .. } = &regime {
            for objective in objectives {
                engine.add_objective(objective.direction, objective.target)?;
            }
        }

        Ok(Self {
            problem,
            config,
            engine,
            tracker,
            overlap_mode,
            regime,
            logic,
            current: None,
        })
    }

    /// Runs the regime and decodes the result.
    pub fn solve(&mut self) -> SolveReport {
        let started = Instant::now();
        info!(
            event = "solve_start",
            problem = %self.problem.name(),
            tasks = self.problem.tasks().len(),
            resources = self.problem.resources().len(),
            objectives = self.problem.objectives().len(),
            regime = self.regime.name(),
            logic = self.logic.smtlib_name(),
        );
        if self.config.debug {
            for line in self.assertions() {
                debug!(event = "assertion", %line);
            }
        }

        let mut advisories = Vec::new();
        let mut objective_values = Vec::new();
        let (result, model, iterations) = match &self.regime {
            Regime::Incremental { objective } => {
                let optimizer = IncrementalOptimizer::new(
                    objective.direction,
                    objective.target,
                    BudgetTermination::from_config(&self.config),
                );
                let run = optimizer.run(&mut self.engine, &mut self.tracker);
                match run.state {
                    OptimizerState::TimedOut => advisories.push(Advisory::TimeBudgetExceeded),
                    OptimizerState::Exhausted => {
                        advisories.push(Advisory::IterationBudgetExceeded)
                    }
                    _ => {}
                }
                objective_values.push((objective.name.clone(), run.best_value()));
                let result = if run.model.is_some() {
                    CheckResult::Sat
                } else {
                    run.last_check
                };
                (result, run.model, run.progress.iterations)
            }
            Regime::Native { objectives, .. } => {
                let result = self.engine.check();
                let values = self.engine.objective_values();
                objective_values.extend(
                    objectives
                        .iter()
                        .enumerate()
                        .map(|(i, o)| (o.name.clone(), values.get(i).copied().flatten())),
                );
                (result, self.engine.model(), 1)
            }
            Regime::Satisfy => (self.engine.check(), self.engine.model(), 1),
        };

        let outcome = match (result, model) {
            (CheckResult::Sat, Some(model)) => {
                let solution = decode(&model, self.problem);
                self.current = Some(model);
                Outcome::Solved(solution)
            }
            (CheckResult::Sat, None) => Outcome::Indeterminate {
                reason: "engine reported sat without a model".into(),
            },
            (CheckResult::Unsat, _) => {
                let conflict = if self.config.debug {
                    Some(self.engine.unsat_core()).filter(|core| !core.is_empty())
                } else {
                    None
                };
                Outcome::Infeasible { conflict }
            }
            (CheckResult::Unknown(reason), _) => Outcome::Indeterminate { reason },
        };

        if self.config.debug {
            for (key, value) in self.engine.statistics().entries() {
                debug!(event = "statistics", %key, %value);
            }
            if let Outcome::Infeasible {
                conflict: Some(labels),
            } = &outcome
            {
                debug!(event = "unsat_core", labels = ?labels);
            }
        }

        let elapsed = started.elapsed();
        info!(
            event = "solve_end",
            outcome = outcome.name(),
            iterations,
            elapsed_ms = elapsed.as_millis() as u64,
        );
        SolveReport {
            outcome,
            advisories,
            elapsed,
            iterations,
            objective_values,
        }
    }

    /// Forbids the current value of `var` permanently and solves again.
    pub fn find_another_solution(&mut self, var: VarId) -> Result<SolveReport> {
        let value = match &self.current {
            Some(model) => model.int(var),
            None => {
                warn!("no current solution, call solve() first");
                return Err(SchedError::PreconditionViolation(
                    "find_another_solution needs a previous successful solve".into(),
                ));
            }
        };
        if var.index() >= self.problem.vars().len() {
            return Err(SchedError::InvalidProblem(format!(
                "variable {} is not declared in problem '{}'",
                var.index(),
                self.problem.name()
            )));
        }
        info!(
            event = "find_another_solution",
            variable = %self.problem.vars()[var.index()].name,
            forbidden = value,
        );
        self.tracker
            .assert(&mut self.engine, Formula::not_equal(var, value));
        Ok(self.solve())
    }

    fn require_solution(&self, operation: &str) -> Result<&Model> {
        self.current.as_ref().ok_or_else(|| {
            warn!(operation, "no solution available, call solve() first");
            SchedError::PreconditionViolation(format!(
                "{operation} needs a previous successful solve"
            ))
        })
    }

    /// Current assertion set as SMT-LIB2 text.
    pub fn to_smt2(&self) -> Result<String> {
        self.require_solution("to_smt2")?;
        Ok(self.engine.to_smt2())
    }

    /// Writes [`to_smt2`](Self::to_smt2) to `path`.
    pub fn export_to_smt2(&self, path: impl AsRef<Path>) -> Result<()> {
        let script = self.to_smt2()?;
        std::fs::write(path.as_ref(), script)?;
        info!(event = "smt2_exported", path = %path.as_ref().display());
        Ok(())
    }

    /// `(variable, value)` pairs of the current model, in declaration order.
    pub fn model_listing(&self) -> Result<Vec<(String, i64)>> {
        let model = self.require_solution("model_listing")?;
        Ok(self
            .engine
            .declarations()
            .iter()
            .zip(model.iter())
            .map(|(decl, (_, value))| (decl.name.clone(), value))
            .collect())
    }

    /// Decoded current model, if any.
    pub fn current_solution(&self) -> Option<ScheduleSolution> {
        self.current
            .as_ref()
            .map(|model| decode(model, self.problem))
    }

    /// Current assertions rendered as SMT-LIB2 terms.
    pub fn assertions(&self) -> Vec<String> {
        self.engine.assertions()
    }

    /// Engine counters.
    pub fn statistics(&self) -> Statistics {
        self.engine.statistics()
    }

    pub fn problem(&self) -> &'p SchedulingProblem {
        self.problem
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn overlap_mode(&self) -> OverlapMode {
        self.overlap_mode
    }

    pub fn regime(&self) -> &Regime {
        &self.regime
    }

    /// Logic hint given to the engine.
    pub fn logic(&self) -> Logic {
        self.logic
    }
}
