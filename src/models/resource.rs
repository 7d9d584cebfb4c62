//! Resource model.
//!
//! A resource is a unary worker: the tasks it serves occupy it through
//! busy intervals that must not overlap. A cumulative resource of size `n`
//! is modelled as `n` unit workers sharing a [`CumulativeGroup`]; solutions
//! report them merged under the group name.
//!
//! # Reference
//! Baptiste, Le Pape & Nuijten (2001), "Constraint-Based Scheduling", Ch. 2

use serde::{Deserialize, Serialize};

use super::TaskId;
use crate::formula::VarId;

/// Handle of a resource inside its [`super::SchedulingProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
    /// Position of the resource in the problem's resource list.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle of a cumulative group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub(crate) usize);

impl GroupId {
    /// Position of the group in the problem's group list.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Description of a worker to add to a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    /// Unique resource name.
    pub name: String,
    /// Work delivered per period of busy time (default: 1).
    pub productivity: i64,
    /// Cost per busy period, if the worker is priced.
    pub cost_per_period: Option<i64>,
}

impl Worker {
    /// Creates a worker with productivity 1 and no cost.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            productivity: 1,
            cost_per_period: None,
        }
    }

    /// Sets the productivity.
    pub fn with_productivity(mut self, productivity: i64) -> Self {
        self.productivity = productivity;
        self
    }

    /// Sets the cost per busy period.
    pub fn with_cost_per_period(mut self, cost: i64) -> Self {
        self.cost_per_period = Some(cost);
        self
    }
}

/// Occupation of a resource by one task.
///
/// A mandatory pairing (`selected == None`) shares the task's own start and
/// end variables. Otherwise the pairing has its own interval: when selected
/// it copies the task interval, when not selected it is parked as an empty
/// interval at a negative time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    /// Occupying task.
    pub task: TaskId,
    /// Start of the occupation.
    pub start: VarId,
    /// End of the occupation.
    pub end: VarId,
    /// Selection flag of an alternative or conditional pairing.
    pub selected: Option<VarId>,
}

impl BusyInterval {
    /// Whether the pairing is fixed to the task interval.
    pub fn is_mandatory(&self) -> bool {
        self.selected.is_none()
    }
}

/// Cardinality rule of an alternative-worker selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    /// At least `n` candidates serve the task.
    #[default]
    AtLeast,
    /// At most `n` candidates serve the task.
    AtMost,
    /// Exactly `n` candidates serve the task.
    Exact,
}

/// A resource registered with a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource name.
    pub name: String,
    /// Work delivered per busy period.
    pub productivity: i64,
    /// Cost per busy period.
    pub cost_per_period: Option<i64>,
    /// Cumulative group this unit worker belongs to.
    pub group: Option<GroupId>,
    /// Busy intervals, in insertion order.
    pub busy: Vec<BusyInterval>,
}

impl Resource {
    pub(crate) fn from_worker(worker: Worker, group: Option<GroupId>) -> Self {
        Self {
            name: worker.name,
            productivity: worker.productivity,
            cost_per_period: worker.cost_per_period,
            group,
            busy: Vec::new(),
        }
    }

    /// Busy interval of `task` on this resource.
    pub fn busy_interval(&self, task: TaskId) -> Option<&BusyInterval> {
        self.busy.iter().find(|b| b.task == task)
    }

    /// Whether `task` is paired with this resource.
    pub fn serves(&self, task: TaskId) -> bool {
        self.busy_interval(task).is_some()
    }
}

/// A cumulative resource: `members.len()` unit workers under one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeGroup {
    /// Reported resource name.
    pub name: String,
    /// Unit workers of the group.
    pub members: Vec<ResourceId>,
}

impl CumulativeGroup {
    /// Parallel capacity.
    pub fn size(&self) -> usize {
        self.members.len()
    }
}
