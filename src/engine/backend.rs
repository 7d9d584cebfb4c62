//! [`Engine`] implementation on the Z3 SMT solver.
//!
//! Plain checks run on a logic-specific `Solver` (`SolverFor` in Z3 terms);
//! several native objectives switch to `Optimize` with the configured
//! priority discipline. Formulas are translated term by term; variable
//! domains are asserted once at declaration, outside any scope.
//!
//! Tracked assertions go through `assert_and_track` on a `Solver`. An
//! `Optimize` has no tracking API, so each label becomes an assumption
//! literal `label => formula` passed to every check; both report the labels
//! of the failed assumptions as the unsatisfiable core.
//!
//! The core is read from Z3 only when [`Engine::unsat_core`] asks for it, so
//! the final unsatisfiable tightening check of an incremental run costs
//! nothing extra.
//!
//! # Reference
//! de Moura & Bjørner (2008), "Z3: An Efficient SMT Solver", TACAS
//! Bjørner, Phan & Fleckenstein (2015), "νZ - An Optimizing SMT Solver", TACAS

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use z3::ast::{Ast, Bool, Int};
use z3::{Context, Optimize, Params, SatResult, Solver};

use super::{CheckResult, Direction, Engine, EngineMode, EngineParams, Model, Statistics};
use crate::error::{Result, SchedError};
use crate::formula::{CmpOp, Formula, LinExpr, Sort, VarDecl, VarId};

/// Creates a Z3 context with default settings.
pub fn new_context() -> Context {
    Context::new(&z3::Config::new())
}

enum Term<'ctx> {
    Int(Int<'ctx>),
    Bool(Bool<'ctx>),
}

enum Backend<'ctx> {
    Plain(Solver<'ctx>),
    Optimizing(Optimize<'ctx>),
}

/// Scope mark: lengths of the assertion and assumption lists at `push`.
#[derive(Debug, Clone, Copy)]
struct Mark {
    asserted: usize,
    assumptions: usize,
}

/// Engine backed by a Z3 solver living in a caller-owned [`Context`].
///
/// # Examples
///
/// ```
/// use u_schedule_smt::engine::{new_context, CheckResult, Engine, Z3Engine};
/// use u_schedule_smt::formula::{Formula, VarDecl};
///
/// let ctx = new_context();
/// let mut engine = Z3Engine::new(&ctx);
/// let x = engine.declare(&VarDecl::int("x", 0, 10));
/// engine.assert(Formula::gt(x, 7));
/// engine.assert(Formula::lt(x, 9));
/// assert_eq!(engine.check(), CheckResult::Sat);
/// assert_eq!(engine.model().unwrap().int(x), 8);
/// ```
pub struct Z3Engine<'ctx> {
    ctx: &'ctx Context,
    backend: Backend<'ctx>,
    params: EngineParams,
    decls: Vec<VarDecl>,
    terms: Vec<Term<'ctx>>,
    asserted: Vec<Formula>,
    assumptions: Vec<Bool<'ctx>>,
    marks: Vec<Mark>,
    objectives: Vec<VarId>,
    model: Option<Model>,
    unsat: bool,
    checks: u64,
    solve_time: Duration,
}

impl fmt::Debug for Z3Engine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Z3Engine")
            .field("mode", &self.params.mode)
            .field("vars", &self.decls.len())
            .field("assertions", &self.asserted.len())
            .field("scopes", &self.marks.len())
            .field("checks", &self.checks)
            .finish()
    }
}

impl<'ctx> Z3Engine<'ctx> {
    /// Creates an engine on a plain solver with default parameters.
    pub fn new(ctx: &'ctx Context) -> Self {
        Self {
            ctx,
            backend: Backend::Plain(Solver::new(ctx)),
            params: EngineParams::default(),
            decls: Vec::new(),
            terms: Vec::new(),
            asserted: Vec::new(),
            assumptions: Vec::new(),
            marks: Vec::new(),
            objectives: Vec::new(),
            model: None,
            unsat: false,
            checks: 0,
            solve_time: Duration::ZERO,
        }
    }

    /// Number of open scopes.
    pub fn scope_depth(&self) -> usize {
        self.marks.len()
    }

    fn build_backend(&self) -> Backend<'ctx> {
        let timeout_ms = u32::try_from(self.params.timeout.as_millis()).unwrap_or(u32::MAX);
        let mut params = Params::new(self.ctx);
        params.set_u32("timeout", timeout_ms.max(1));

        if self.params.threads > 1 {
            z3::set_global_param("parallel.enable", "true");
        }

        match self.params.mode {
            EngineMode::Optimize { priority } => {
                if self.params.seed != 0 {
                    z3::set_global_param("smt.random_seed", &self.params.seed.to_string());
                }
                params.set_symbol("priority", priority.to_string());
                let optimize = Optimize::new(self.ctx);
                optimize.set_params(&params);
                Backend::Optimizing(optimize)
            }
            EngineMode::Incremental { logic } => {
                if self.params.seed != 0 {
                    params.set_u32("random_seed", (self.params.seed % u64::from(u32::MAX)) as u32);
                }
                if self.params.unsat_cores {
                    params.set_bool("core.minimize", true);
                }
                let solver = match logic {
                    Some(logic) => Solver::new_for_logic(self.ctx, logic.smtlib_name())
                        .unwrap_or_else(|| {
                            warn!(
                                logic = logic.smtlib_name(),
                                "logic not recognized, using the default solver"
                            );
                            Solver::new(self.ctx)
                        }),
                    None => Solver::new(self.ctx),
                };
                solver.set_params(&params);
                Backend::Plain(solver)
            }
        }
    }

    fn int_const(&self, value: i64) -> Int<'ctx> {
        Int::from_i64(self.ctx, value)
    }

    fn int_of(&self, var: VarId) -> Int<'ctx> {
        match self.terms.get(var.index()) {
            Some(Term::Int(x)) => x.clone(),
            Some(Term::Bool(b)) => b.ite(&self.int_const(1), &self.int_const(0)),
            None => Int::new_const(self.ctx, format!("undeclared_{}", var.index())),
        }
    }

    fn bool_of(&self, var: VarId) -> Bool<'ctx> {
        match self.terms.get(var.index()) {
            Some(Term::Bool(b)) => b.clone(),
            Some(Term::Int(x)) => x._eq(&self.int_const(0)).not(),
            None => Bool::new_const(self.ctx, format!("undeclared_{}", var.index())),
        }
    }

    fn linear(&self, expr: &LinExpr) -> Int<'ctx> {
        let mut parts: Vec<Int<'ctx>> = expr
            .terms()
            .iter()
            .map(|&(var, coef)| {
                let x = self.int_of(var);
                if coef == 1 {
                    x
                } else {
                    Int::mul(self.ctx, &[&self.int_const(coef), &x])
                }
            })
            .collect();
        if expr.offset() != 0 || parts.is_empty() {
            parts.push(self.int_const(expr.offset()));
        }
        match parts.len() {
            1 => parts.remove(0),
            _ => Int::add(self.ctx, &parts.iter().collect::<Vec<_>>()),
        }
    }

    fn translate(&self, formula: &Formula) -> Bool<'ctx> {
        match formula {
            Formula::Const(b) => Bool::from_bool(self.ctx, *b),
            Formula::Var(v) => self.bool_of(*v),
            Formula::Cmp { lhs, op, rhs } => {
                let (l, r) = (self.linear(lhs), self.linear(rhs));
                match op {
                    CmpOp::Lt => l.lt(&r),
                    CmpOp::Le => l.le(&r),
                    CmpOp::Eq => l._eq(&r),
                    CmpOp::Ne => l._eq(&r).not(),
                    CmpOp::Ge => l.ge(&r),
                    CmpOp::Gt => l.gt(&r),
                }
            }
            Formula::Not(f) => self.translate(f).not(),
            Formula::And(fs) if fs.is_empty() => Bool::from_bool(self.ctx, true),
            Formula::Or(fs) if fs.is_empty() => Bool::from_bool(self.ctx, false),
            Formula::And(fs) => {
                let parts: Vec<Bool<'ctx>> = fs.iter().map(|f| self.translate(f)).collect();
                Bool::and(self.ctx, &parts.iter().collect::<Vec<_>>())
            }
            Formula::Or(fs) => {
                let parts: Vec<Bool<'ctx>> = fs.iter().map(|f| self.translate(f)).collect();
                Bool::or(self.ctx, &parts.iter().collect::<Vec<_>>())
            }
            Formula::Xor(a, b) => self.translate(a).xor(&self.translate(b)),
            Formula::Implies(a, b) => self.translate(a).implies(&self.translate(b)),
            Formula::Distinct(es) if es.len() < 2 => Bool::from_bool(self.ctx, true),
            Formula::Distinct(es) => {
                let items: Vec<Int<'ctx>> = es.iter().map(|e| self.linear(e)).collect();
                Int::distinct(self.ctx, &items.iter().collect::<Vec<_>>())
            }
        }
    }

    fn read_model(&self, model: &z3::Model<'ctx>) -> Model {
        Model::new(
            self.terms
                .iter()
                .map(|term| match term {
                    Term::Int(x) => model.eval(x, true).and_then(|v| v.as_i64()).unwrap_or(0),
                    Term::Bool(b) => model
                        .eval(b, true)
                        .and_then(|v| v.as_bool())
                        .map_or(0, i64::from),
                })
                .collect(),
        )
    }

    fn invalidate(&mut self) {
        self.unsat = false;
    }
}

impl Engine for Z3Engine<'_> {
    fn configure(&mut self, params: &EngineParams) {
        if !self.decls.is_empty() {
            warn!(
                declared = self.decls.len(),
                "engine reconfigured after declarations; they are dropped"
            );
            self.decls.clear();
            self.terms.clear();
            self.asserted.clear();
            self.assumptions.clear();
            self.marks.clear();
            self.objectives.clear();
        }
        self.params = params.clone();
        self.backend = self.build_backend();
        self.model = None;
        self.invalidate();
    }

    fn declare(&mut self, decl: &VarDecl) -> VarId {
        let id = VarId::from_index(self.decls.len());
        let name = decl.name.as_str();
        match decl.sort {
            Sort::Bool => self.terms.push(Term::Bool(Bool::new_const(self.ctx, name))),
            Sort::Int => {
                let x = Int::new_const(self.ctx, name);
                let domain = Bool::and(
                    self.ctx,
                    &[
                        &x.ge(&self.int_const(decl.lower)),
                        &x.le(&self.int_const(decl.upper)),
                    ],
                );
                match &self.backend {
                    Backend::Plain(s) => s.assert(&domain),
                    Backend::Optimizing(o) => o.assert(&domain),
                }
                self.terms.push(Term::Int(x));
            }
        }
        self.decls.push(decl.clone());
        self.invalidate();
        id
    }

    fn assert(&mut self, formula: Formula) {
        let term = self.translate(&formula);
        match &self.backend {
            Backend::Plain(s) => s.assert(&term),
            Backend::Optimizing(o) => o.assert(&term),
        }
        self.asserted.push(formula);
        self.invalidate();
    }

    fn assert_tracked(&mut self, formula: Formula, label: String) {
        if !self.params.unsat_cores {
            self.assert(formula);
            return;
        }
        let term = self.translate(&formula);
        let literal = Bool::new_const(self.ctx, label.as_str());
        match &self.backend {
            Backend::Plain(s) => s.assert_and_track(&term, &literal),
            Backend::Optimizing(o) => {
                o.assert(&literal.implies(&term));
                self.assumptions.push(literal);
            }
        }
        self.asserted.push(formula);
        self.invalidate();
    }

    fn push(&mut self) {
        match &self.backend {
            Backend::Plain(s) => s.push(),
            Backend::Optimizing(o) => o.push(),
        }
        self.marks.push(Mark {
            asserted: self.asserted.len(),
            assumptions: self.assumptions.len(),
        });
        self.invalidate();
    }

    fn pop(&mut self) {
        let Some(mark) = self.marks.pop() else {
            warn!("pop without a matching push ignored");
            return;
        };
        match &self.backend {
            Backend::Plain(s) => s.pop(1),
            Backend::Optimizing(o) => o.pop(),
        }
        self.asserted.truncate(mark.asserted);
        self.assumptions.truncate(mark.assumptions);
        self.invalidate();
    }

    fn check(&mut self) -> CheckResult {
        let started = Instant::now();
        self.checks += 1;
        self.model = None;
        self.invalidate();

        let (result, model, reason) = match &self.backend {
            Backend::Plain(s) => {
                let result = s.check();
                (result, s.get_model(), s.get_reason_unknown())
            }
            Backend::Optimizing(o) => {
                let result = o.check(&self.assumptions);
                (result, o.get_model(), o.get_reason_unknown())
            }
        };
        self.solve_time += started.elapsed();

        match result {
            SatResult::Sat => match model {
                Some(model) => {
                    self.model = Some(self.read_model(&model));
                    CheckResult::Sat
                }
                None => CheckResult::Unknown("no model after a satisfiable check".into()),
            },
            SatResult::Unsat => {
                self.unsat = true;
                CheckResult::Unsat
            }
            SatResult::Unknown => {
                let reason = reason.unwrap_or_else(|| "unknown".into());
                debug!(event = "check_unknown", reason = %reason);
                CheckResult::Unknown(reason)
            }
        }
    }

    fn model(&self) -> Option<Model> {
        self.model.clone()
    }

    fn unsat_core(&self) -> Vec<String> {
        if !self.unsat || !self.params.unsat_cores {
            return Vec::new();
        }
        let core = match &self.backend {
            Backend::Plain(s) => s.get_unsat_core(),
            Backend::Optimizing(o) => o.get_unsat_core(),
        };
        let mut labels: Vec<String> = core.iter().map(|b| b.to_string()).collect();
        labels.sort();
        labels
    }

    fn add_objective(&mut self, direction: Direction, target: VarId) -> Result<()> {
        let Backend::Optimizing(optimize) = &self.backend else {
            return Err(SchedError::Unsupported(
                "objectives need the engine configured in optimizing mode".into(),
            ));
        };
        let term = self.int_of(target);
        match direction {
            Direction::Minimize => optimize.minimize(&term),
            Direction::Maximize => optimize.maximize(&term),
        }
        self.objectives.push(target);
        Ok(())
    }

    fn objective_values(&self) -> Vec<Option<i64>> {
        self.objectives
            .iter()
            .map(|&target| self.model.as_ref().and_then(|m| m.value(target)))
            .collect()
    }

    fn declarations(&self) -> &[VarDecl] {
        &self.decls
    }

    fn assertions(&self) -> Vec<String> {
        self.asserted
            .iter()
            .map(|f| self.translate(f).to_string())
            .collect()
    }

    fn statistics(&self) -> Statistics {
        let stats = match &self.backend {
            Backend::Plain(s) => s.get_statistics(),
            Backend::Optimizing(o) => o.get_statistics(),
        };
        Statistics {
            checks: self.checks,
            solve_time: self.solve_time,
            threads: self.params.threads,
            backend: stats
                .entries()
                .map(|entry| {
                    let value = match entry.value {
                        z3::StatisticsValue::UInt(v) => v.to_string(),
                        z3::StatisticsValue::Double(v) => format!("{v:.3}"),
                    };
                    (entry.key, value)
                })
                .collect(),
        }
    }

    fn to_smt2(&self) -> String {
        let mut out = String::new();
        if let EngineMode::Incremental { logic: Some(logic) } = self.params.mode {
            out.push_str(&format!("(set-logic {})\n", logic.smtlib_name()));
        }
        match &self.backend {
            Backend::Plain(s) => {
                out.push_str(&s.to_string());
                out.push_str("(check-sat)\n");
            }
            Backend::Optimizing(o) => out.push_str(&o.to_string()),
        }
        out
    }
}
