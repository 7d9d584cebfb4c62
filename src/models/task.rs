//! Task model.
//!
//! A task is an interval `[start, end)` on the integer time line. Its
//! duration is either a constant, a decision variable bounded by
//! min/max/allowed values, or, for a breakable task, the span of a chain of
//! unit pieces that may be interrupted.
//!
//! # Time Representation
//! Times are integer periods relative to t=0. A problem may map periods to
//! milliseconds through `delta_time_ms` / `start_time_ms`.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1 (preemption)

use serde::{Deserialize, Serialize};

use crate::formula::{LinExpr, VarId};

/// Handle of a task inside its [`super::SchedulingProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Position of the task in the problem's task list.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// How the duration of a task is determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Constant duration (periods).
    FixedDuration(i64),
    /// Duration chosen by the solver.
    VariableDuration {
        /// Smallest admissible duration.
        min: Option<i64>,
        /// Largest admissible duration.
        max: Option<i64>,
        /// Exhaustive list of admissible durations.
        allowed: Option<Vec<i64>>,
    },
    /// Total work of `n` unit pieces, which may be interrupted.
    Breakable(i64),
}

impl TaskKind {
    /// Label reported in solutions.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::FixedDuration(_) => "FixedDurationTask",
            TaskKind::VariableDuration { .. } => "VariableDurationTask",
            TaskKind::Breakable(_) => "BreakableTask",
        }
    }
}

/// Description of a task to add to a problem.
///
/// # Examples
///
/// ```
/// use u_schedule_smt::models::{TaskKind, TaskSpec};
///
/// let spec = TaskSpec::variable("Drill")
///     .with_min_duration(2)
///     .with_max_duration(8)
///     .with_work_amount(10)
///     .with_optional(true);
///
/// assert!(spec.optional);
/// assert!(matches!(spec.kind, TaskKind::VariableDuration { min: Some(2), max: Some(8), .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique task name.
    pub name: String,
    /// Duration model.
    pub kind: TaskKind,
    /// Whether the solver may leave the task unscheduled.
    pub optional: bool,
    /// Work the assigned resources must deliver (`0` = none).
    pub work_amount: i64,
}

impl TaskSpec {
    fn new(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            work_amount: 0,
        }
    }

    /// Task with a constant duration.
    pub fn fixed(name: impl Into<String>, duration: i64) -> Self {
        Self::new(name, TaskKind::FixedDuration(duration))
    }

    /// Task with a solver-chosen duration.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(
            name,
            TaskKind::VariableDuration {
                min: None,
                max: None,
                allowed: None,
            },
        )
    }

    /// Task split into `duration` unit pieces.
    pub fn breakable(name: impl Into<String>, duration: i64) -> Self {
        Self::new(name, TaskKind::Breakable(duration))
    }

    /// Sets the minimum duration of a variable-duration task.
    pub fn with_min_duration(mut self, value: i64) -> Self {
        if let TaskKind::VariableDuration { min, .. } = &mut self.kind {
            *min = Some(value);
        }
        self
    }

    /// Sets the maximum duration of a variable-duration task.
    pub fn with_max_duration(mut self, value: i64) -> Self {
        if let TaskKind::VariableDuration { max, .. } = &mut self.kind {
            *max = Some(value);
        }
        self
    }

    /// Restricts a variable-duration task to the listed durations.
    pub fn with_allowed_durations(mut self, values: Vec<i64>) -> Self {
        if let TaskKind::VariableDuration { allowed, .. } = &mut self.kind {
            *allowed = Some(values);
        }
        self
    }

    /// Marks the task as optional.
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Sets the work amount.
    pub fn with_work_amount(mut self, amount: i64) -> Self {
        self.work_amount = amount;
        self
    }
}

/// A task registered with a problem, with its decision variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task name.
    pub name: String,
    /// Duration model.
    pub kind: TaskKind,
    /// Start variable.
    pub start: VarId,
    /// End variable.
    pub end: VarId,
    /// Duration variable of a variable-duration task.
    pub duration: Option<VarId>,
    /// Whether the task is optional.
    pub optional: bool,
    /// Boolean "is scheduled" flag of an optional task.
    pub scheduled: Option<VarId>,
    /// Work amount.
    pub work_amount: i64,
    /// Unit pieces of a breakable task, in order.
    pub pieces: Vec<TaskId>,
    /// Breakable parent of a piece.
    pub parent: Option<TaskId>,
}

impl Task {
    /// Duration when it is a compile-time constant.
    pub fn fixed_duration(&self) -> Option<i64> {
        match self.kind {
            TaskKind::FixedDuration(d) => Some(d),
            _ => None,
        }
    }

    /// Whether the duration is a decision variable.
    pub fn has_variable_duration(&self) -> bool {
        matches!(self.kind, TaskKind::VariableDuration { .. })
    }

    /// Whether this is the parent of a chain of pieces.
    pub fn is_breakable(&self) -> bool {
        matches!(self.kind, TaskKind::Breakable(_))
    }

    /// Duration as a term: constant, variable, or `end - start`.
    pub fn duration_expr(&self) -> LinExpr {
        match (&self.kind, self.duration) {
            (TaskKind::FixedDuration(d), _) => LinExpr::constant(*d),
            (_, Some(d)) => LinExpr::var(d),
            _ => self.end - self.start,
        }
    }
}
