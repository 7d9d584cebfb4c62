//! Problem context.
//!
//! [`SchedulingProblem`] owns everything the solver compiles: the variable
//! registry (horizon first), tasks, resources with their busy intervals,
//! cumulative groups, lowered constraints, indicators and objectives, plus
//! an optional wall-clock time scale.
//!
//! Variables are declared here, in [`VarId`] order, and declared again with
//! the engine by the solver, so ids are shared between problem and engine.
//!
//! # Examples
//!
//! ```
//! use u_schedule_smt::models::{Constraint, SchedulingProblem, TaskSpec, Worker};
//!
//! let mut problem = SchedulingProblem::new("picnic");
//! let lunch = problem.add_task(TaskSpec::fixed("Lunch", 1));
//! let carry = problem.add_task(TaskSpec::fixed("Carry", 6));
//! let bob = problem.add_resource(Worker::new("Bob"));
//! problem.add_required_resource(lunch, bob).unwrap();
//! problem.add_required_resource(carry, bob).unwrap();
//! problem.add_constraint(Constraint::start_at(lunch, 4)).unwrap();
//! problem.add_objective_makespan();
//!
//! assert_eq!(problem.tasks().len(), 2);
//! assert_eq!(problem.objectives().len(), 1);
//! assert!(!problem.has_cost_function());
//! ```

use serde::{Deserialize, Serialize};

use super::{
    BusyInterval, Constraint, CumulativeGroup, GroupId, Indicator, Objective, Resource,
    ResourceId, SelectionKind, Task, TaskId, TaskKind, TaskSpec, Worker,
};
use crate::engine::Direction;
use crate::error::{Result, SchedError};
use crate::formula::{Formula, LinExpr, VarDecl, VarId};

/// Default upper bound of the horizon and of every time variable.
pub const DEFAULT_HORIZON_BOUND: i64 = 1_000;

/// Name of the horizon variable.
pub const HORIZON_NAME: &str = "horizon";

/// A scheduling problem: the read-only input of the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingProblem {
    name: String,
    horizon: VarId,
    horizon_bound: i64,
    vars: Vec<VarDecl>,
    tasks: Vec<Task>,
    resources: Vec<Resource>,
    groups: Vec<CumulativeGroup>,
    constraints: Vec<Formula>,
    precedences: Vec<(TaskId, TaskId)>,
    indicators: Vec<Indicator>,
    objectives: Vec<Objective>,
    delta_time_ms: Option<i64>,
    start_time_ms: Option<i64>,
}

impl SchedulingProblem {
    /// Creates an empty problem with horizon domain `[0, DEFAULT_HORIZON_BOUND]`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            horizon: VarId(0),
            horizon_bound: DEFAULT_HORIZON_BOUND,
            vars: vec![VarDecl::int(HORIZON_NAME, 0, DEFAULT_HORIZON_BOUND)],
            tasks: Vec::new(),
            resources: Vec::new(),
            groups: Vec::new(),
            constraints: Vec::new(),
            precedences: Vec::new(),
            indicators: Vec::new(),
            objectives: Vec::new(),
            delta_time_ms: None,
            start_time_ms: None,
        }
    }

    /// Sets the largest admissible horizon; applies to tasks added later.
    pub fn with_horizon_bound(mut self, bound: i64) -> Self {
        self.horizon_bound = bound;
        self.vars[self.horizon.index()].upper = bound;
        self
    }

    /// Fixes the horizon to `value`.
    pub fn with_fixed_horizon(mut self, value: i64) -> Self {
        self.horizon_bound = value;
        let decl = &mut self.vars[self.horizon.index()];
        decl.lower = value;
        decl.upper = value;
        self
    }

    /// Sets the length of one period in milliseconds.
    pub fn with_delta_time_ms(mut self, delta_ms: i64) -> Self {
        self.delta_time_ms = Some(delta_ms);
        self
    }

    /// Sets the wall-clock time (ms) of period 0.
    pub fn with_start_time_ms(mut self, start_ms: i64) -> Self {
        self.start_time_ms = Some(start_ms);
        self
    }

    fn declare(&mut self, decl: VarDecl) -> VarId {
        let id = VarId::from_index(self.vars.len());
        self.vars.push(decl);
        id
    }

    /// Declares an integer variable for custom constraints.
    pub fn declare_int(&mut self, name: impl Into<String>, lower: i64, upper: i64) -> VarId {
        self.declare(VarDecl::int(name, lower, upper))
    }

    /// Declares a boolean variable for custom constraints.
    pub fn declare_bool(&mut self, name: impl Into<String>) -> VarId {
        self.declare(VarDecl::boolean(name))
    }

    /// Adds a task; a breakable task also adds its unit pieces.
    pub fn add_task(&mut self, spec: TaskSpec) -> TaskId {
        let TaskSpec {
            name,
            kind,
            optional,
            work_amount,
        } = spec;
        let scheduled = optional.then(|| self.declare_bool(format!("{name}_scheduled")));
        let id = self.push_task(name.clone(), kind.clone(), optional, scheduled, work_amount, None);

        if let TaskKind::Breakable(pieces) = kind {
            let piece_ids: Vec<TaskId> = (0..pieces.max(0))
                .map(|i| {
                    self.push_task(
                        format!("{name}_part{i}"),
                        TaskKind::FixedDuration(1),
                        optional,
                        scheduled,
                        0,
                        Some(id),
                    )
                })
                .collect();
            self.tasks[id.index()].pieces = piece_ids;
        }
        id
    }

    fn push_task(
        &mut self,
        name: String,
        kind: TaskKind,
        optional: bool,
        scheduled: Option<VarId>,
        work_amount: i64,
        parent: Option<TaskId>,
    ) -> TaskId {
        let bound = self.horizon_bound;
        let start = self.declare(VarDecl::int(format!("{name}_start"), 0, bound));
        let end = self.declare(VarDecl::int(format!("{name}_end"), 0, bound));
        let duration = matches!(kind, TaskKind::VariableDuration { .. })
            .then(|| self.declare(VarDecl::int(format!("{name}_duration"), 0, bound)));
        let id = TaskId(self.tasks.len());
        self.tasks.push(Task {
            name,
            kind,
            start,
            end,
            duration,
            optional,
            scheduled,
            work_amount,
            pieces: Vec::new(),
            parent,
        });
        id
    }

    /// Adds a unary worker.
    pub fn add_resource(&mut self, worker: Worker) -> ResourceId {
        let id = ResourceId(self.resources.len());
        self.resources.push(Resource::from_worker(worker, None));
        id
    }

    /// Adds a cumulative resource of `size` unit workers.
    pub fn add_cumulative_resource(&mut self, name: impl Into<String>, size: usize) -> GroupId {
        let name = name.into();
        let group = GroupId(self.groups.len());
        let members = (0..size)
            .map(|i| {
                let id = ResourceId(self.resources.len());
                self.resources.push(Resource::from_worker(
                    Worker::new(format!("{name}_unit{i}")),
                    Some(group),
                ));
                id
            })
            .collect();
        self.groups.push(CumulativeGroup { name, members });
        group
    }

    /// Requires `resource` to serve `task` for its whole duration.
    ///
    /// On a breakable task every piece requires the resource.
    pub fn add_required_resource(&mut self, task: TaskId, resource: ResourceId) -> Result<()> {
        self.resource_ref(resource)?;
        for target in self.serving_tasks(task)? {
            if self.resources[resource.index()].serves(target) {
                return Err(SchedError::InvalidProblem(format!(
                    "resource '{}' already serves task '{}'",
                    self.resources[resource.index()].name,
                    self.tasks[target.index()].name
                )));
            }
            let scheduled = self.tasks[target.index()].scheduled;
            let interval = match scheduled {
                None => {
                    let t = &self.tasks[target.index()];
                    BusyInterval {
                        task: target,
                        start: t.start,
                        end: t.end,
                        selected: None,
                    }
                }
                Some(scheduled) => {
                    let interval = self.alternative_interval(target, resource);
                    if let Some(selected) = interval.selected {
                        self.constraints
                            .push(Formula::equal(selected, scheduled));
                    }
                    interval
                }
            };
            self.resources[resource.index()].busy.push(interval);
        }
        Ok(())
    }

    /// Requires `units` workers of a cumulative group.
    pub fn add_required_cumulative(
        &mut self,
        task: TaskId,
        group: GroupId,
        units: usize,
    ) -> Result<()> {
        let members = self
            .groups
            .get(group.index())
            .map(|g| g.members.clone())
            .ok_or_else(|| SchedError::InvalidProblem(format!("unknown group {}", group.0)))?;
        self.select_workers(task, &members, units, SelectionKind::AtLeast)
    }

    /// Lets the solver choose which `candidates` serve `task`, under a
    /// cardinality rule on the number of selected workers.
    pub fn select_workers(
        &mut self,
        task: TaskId,
        candidates: &[ResourceId],
        n: usize,
        kind: SelectionKind,
    ) -> Result<()> {
        if candidates.is_empty() {
            return Err(SchedError::InvalidProblem(
                "worker selection needs at least one candidate".into(),
            ));
        }
        if n > candidates.len() {
            return Err(SchedError::InvalidProblem(format!(
                "cannot select {n} workers among {} candidates",
                candidates.len()
            )));
        }
        for &r in candidates {
            self.resource_ref(r)?;
        }
        for target in self.serving_tasks(task)? {
            let mut flags = Vec::with_capacity(candidates.len());
            for &r in candidates {
                if self.resources[r.index()].serves(target) {
                    return Err(SchedError::InvalidProblem(format!(
                        "resource '{}' already serves task '{}'",
                        self.resources[r.index()].name,
                        self.tasks[target.index()].name
                    )));
                }
                let interval = self.alternative_interval(target, r);
                if let Some(selected) = interval.selected {
                    flags.push(selected);
                }
                self.resources[r.index()].busy.push(interval);
            }
            let count = LinExpr::sum(flags.iter().copied());
            let n = n as i64;
            let cardinality = match kind {
                SelectionKind::AtLeast => Formula::ge(count, n),
                SelectionKind::AtMost => Formula::le(count, n),
                SelectionKind::Exact => Formula::equal(count, n),
            };
            let scheduled = self.tasks[target.index()].scheduled;
            match scheduled {
                None => self.constraints.push(cardinality),
                Some(scheduled) => {
                    self.constraints
                        .push(Formula::implies(Formula::var(scheduled), cardinality));
                    for &flag in &flags {
                        self.constraints
                            .push(Formula::implies(Formula::var(flag), Formula::var(scheduled)));
                    }
                }
            }
        }
        Ok(())
    }

    /// Pairing with its own interval and selection flag.
    fn alternative_interval(&mut self, task: TaskId, resource: ResourceId) -> BusyInterval {
        let bound = self.horizon_bound;
        let prefix = format!(
            "{}@{}",
            self.tasks[task.index()].name,
            self.resources[resource.index()].name
        );
        let start = self.declare(VarDecl::int(format!("{prefix}_busy_start"), -bound, bound));
        let end = self.declare(VarDecl::int(format!("{prefix}_busy_end"), -bound, bound));
        let selected = self.declare(VarDecl::boolean(format!("{prefix}_selected")));
        BusyInterval {
            task,
            start,
            end,
            selected: Some(selected),
        }
    }

    /// Tasks that actually occupy resources on behalf of `task`.
    fn serving_tasks(&self, task: TaskId) -> Result<Vec<TaskId>> {
        let t = self.task_ref(task)?;
        Ok(if t.is_breakable() {
            t.pieces.clone()
        } else {
            vec![task]
        })
    }

    fn task_ref(&self, task: TaskId) -> Result<&Task> {
        self.tasks
            .get(task.index())
            .ok_or_else(|| SchedError::InvalidProblem(format!("unknown task {}", task.0)))
    }

    fn resource_ref(&self, resource: ResourceId) -> Result<&Resource> {
        self.resources
            .get(resource.index())
            .ok_or_else(|| SchedError::InvalidProblem(format!("unknown resource {}", resource.0)))
    }

    fn check_vars(&self, vars: impl IntoIterator<Item = VarId>) -> Result<()> {
        match vars.into_iter().find(|v| v.index() >= self.vars.len()) {
            Some(v) => Err(SchedError::InvalidProblem(format!(
                "variable {} is not declared in problem '{}'",
                v.index(),
                self.name
            ))),
            None => Ok(()),
        }
    }

    /// Adds a constraint.
    ///
    /// Constraints on optional tasks only bind when those tasks are
    /// scheduled.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<()> {
        let ids = constraint.tasks();
        let tasks = ids
            .iter()
            .map(|&id| self.task_ref(id))
            .collect::<Result<Vec<&Task>>>()?;
        let formula = constraint.lower(&tasks);
        let guards: Vec<Formula> = tasks
            .iter()
            .filter_map(|t| t.scheduled)
            .map(Formula::var)
            .collect();
        let mut vars = Vec::new();
        formula.collect_vars(&mut vars);
        self.check_vars(vars)?;
        let formula = if guards.is_empty() {
            formula
        } else {
            Formula::implies(Formula::and(guards), formula)
        };
        if let Constraint::Precedence { before, after, .. } = constraint {
            self.precedences.push((before, after));
        }
        self.constraints.push(formula);
        Ok(())
    }

    /// Adds an arbitrary formula over declared variables.
    pub fn add_formula(&mut self, formula: Formula) -> Result<()> {
        self.add_constraint(Constraint::Custom(formula))
    }

    /// Adds an indicator `name == expr` and returns its variable.
    pub fn add_indicator(&mut self, name: impl Into<String>, expr: LinExpr) -> Result<VarId> {
        self.check_vars(expr.vars())?;
        let name = name.into();
        let (lower, upper) = self.expr_bounds(&expr);
        let var = self.declare(VarDecl::int(format!("{name}_indicator"), lower, upper));
        self.indicators.push(Indicator { name, var, expr });
        Ok(var)
    }

    /// Sum of the end times of `tasks`.
    pub fn add_indicator_flowtime(
        &mut self,
        name: impl Into<String>,
        tasks: &[TaskId],
    ) -> Result<VarId> {
        let ends = tasks
            .iter()
            .map(|&t| self.task_ref(t).map(|t| t.end))
            .collect::<Result<Vec<VarId>>>()?;
        self.add_indicator(name, LinExpr::sum(ends))
    }

    /// Total cost of the busy time of `resources`.
    pub fn add_indicator_resource_cost(
        &mut self,
        name: impl Into<String>,
        resources: &[ResourceId],
    ) -> Result<VarId> {
        let mut cost = LinExpr::default();
        for &r in resources {
            let res = self.resource_ref(r)?;
            let Some(per_period) = res.cost_per_period else {
                continue;
            };
            for b in &res.busy {
                cost = cost + (b.end - b.start) * per_period;
            }
        }
        self.add_indicator(name, cost)
    }

    /// Adds an objective on any declared variable.
    pub fn add_objective(
        &mut self,
        name: impl Into<String>,
        direction: Direction,
        target: VarId,
    ) -> Result<()> {
        self.check_vars([target])?;
        self.objectives.push(Objective::new(name, direction, target));
        Ok(())
    }

    /// Minimizes the horizon.
    pub fn add_objective_makespan(&mut self) {
        self.objectives
            .push(Objective::new("makespan", Direction::Minimize, self.horizon));
    }

    /// Optimizes a previously added indicator.
    pub fn add_objective_indicator(&mut self, indicator: &str, direction: Direction) -> Result<()> {
        let var = self
            .indicators
            .iter()
            .find(|i| i.name == indicator)
            .map(|i| i.var)
            .ok_or_else(|| SchedError::InvalidProblem(format!("unknown indicator '{indicator}'")))?;
        self.objectives
            .push(Objective::new(indicator, direction, var));
        Ok(())
    }

    /// Bounds of a linear expression under the declared domains.
    pub fn expr_bounds(&self, expr: &LinExpr) -> (i64, i64) {
        let clamp = |v: i128| v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
        let (lo, hi) = expr.terms().iter().fold(
            (i128::from(expr.offset()), i128::from(expr.offset())),
            |(lo, hi), &(v, c)| match self.vars.get(v.index()) {
                Some(decl) => {
                    let a = i128::from(c) * i128::from(decl.lower);
                    let b = i128::from(c) * i128::from(decl.upper);
                    (lo + a.min(b), hi + a.max(b))
                }
                None => (lo, hi),
            },
        );
        (clamp(lo), clamp(hi))
    }

    /// Whether any resource carries a cost function.
    pub fn has_cost_function(&self) -> bool {
        self.resources.iter().any(|r| r.cost_per_period.is_some())
    }

    /// Whether any task has a solver-chosen duration.
    pub fn has_variable_duration(&self) -> bool {
        self.tasks.iter().any(Task::has_variable_duration)
    }

    /// Problem name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Horizon variable.
    pub fn horizon(&self) -> VarId {
        self.horizon
    }

    /// Upper bound of the time variables.
    pub fn horizon_bound(&self) -> i64 {
        self.horizon_bound
    }

    /// Declared variables in id order.
    pub fn vars(&self) -> &[VarDecl] {
        &self.vars
    }

    /// Tasks in insertion order; pieces follow their breakable parent.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks up a task.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index())
    }

    /// Looks up a task by name.
    pub fn task_by_name(&self, name: &str) -> Option<TaskId> {
        self.tasks.iter().position(|t| t.name == name).map(TaskId)
    }

    /// Resources in insertion order; group members included.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Looks up a resource.
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    /// Cumulative groups.
    pub fn groups(&self) -> &[CumulativeGroup] {
        &self.groups
    }

    /// Looks up a cumulative group.
    pub fn group(&self, id: GroupId) -> Option<&CumulativeGroup> {
        self.groups.get(id.index())
    }

    /// Lowered user constraints in insertion order.
    pub fn constraints(&self) -> &[Formula] {
        &self.constraints
    }

    /// `(before, after)` pairs of the precedence constraints.
    pub fn precedences(&self) -> &[(TaskId, TaskId)] {
        &self.precedences
    }

    /// Indicators in insertion order.
    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    /// Objectives in declaration order.
    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Length of one period (ms).
    pub fn delta_time_ms(&self) -> Option<i64> {
        self.delta_time_ms
    }

    /// Wall-clock time (ms) of period 0.
    pub fn start_time_ms(&self) -> Option<i64> {
        self.start_time_ms
    }
}
