//! Schedule (solution) model.
//!
//! A [`ScheduleSolution`] is the decoded form of one engine model: the
//! horizon, every task's interval, every resource's assignments and every
//! indicator's value. Ordered maps keep the serialized form deterministic.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete decoded schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSolution {
    /// Problem name.
    pub problem_name: String,
    /// Value of the horizon variable.
    pub horizon: i64,
    /// Task name → task solution.
    pub tasks: BTreeMap<String, TaskSolution>,
    /// Resource name → resource solution; cumulative groups appear once.
    pub resources: BTreeMap<String, ResourceSolution>,
    /// Indicator name → value.
    pub indicators: BTreeMap<String, i64>,
}

/// Decoded interval of one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSolution {
    /// Task name.
    pub name: String,
    /// Task kind label.
    pub kind: String,
    /// Start period.
    pub start: i64,
    /// End period.
    pub end: i64,
    /// Duration in periods.
    pub duration: i64,
    /// Whether the task was optional.
    pub optional: bool,
    /// Whether the task is scheduled.
    pub scheduled: bool,
    /// Names of the resources serving the task.
    pub assigned_resources: Vec<String>,
    /// Wall-clock start (ms), when the problem has a time scale.
    pub start_time_ms: Option<i64>,
    /// Wall-clock end (ms), when the problem has a time scale.
    pub end_time_ms: Option<i64>,
    /// Wall-clock duration (ms), when the problem has a time scale.
    pub duration_time_ms: Option<i64>,
}

/// Assignments of one resource (or merged cumulative group).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSolution {
    /// Resource or group name.
    pub name: String,
    /// Served intervals, in decoding order.
    pub assignments: Vec<ResourceAssignment>,
}

/// One served interval of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceAssignment {
    /// Served task name.
    pub task: String,
    /// Start period.
    pub start: i64,
    /// End period.
    pub end: i64,
}

impl ResourceAssignment {
    /// Creates an assignment.
    pub fn new(task: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            task: task.into(),
            start,
            end,
        }
    }

    /// Busy time of the assignment.
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}

impl ResourceSolution {
    /// Creates an empty resource solution.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assignments: Vec::new(),
        }
    }

    /// Adds an assignment unless an identical one is present.
    pub fn add_assignment(&mut self, assignment: ResourceAssignment) -> bool {
        if self.assignments.contains(&assignment) {
            return false;
        }
        self.assignments.push(assignment);
        true
    }

    /// Total busy time.
    pub fn busy_time(&self) -> i64 {
        self.assignments.iter().map(ResourceAssignment::duration).sum()
    }
}

impl ScheduleSolution {
    /// Creates an empty solution for a problem.
    pub fn new(problem_name: impl Into<String>) -> Self {
        Self {
            problem_name: problem_name.into(),
            ..Self::default()
        }
    }

    /// Adds a task solution.
    pub fn add_task_solution(&mut self, task: TaskSolution) {
        self.tasks.insert(task.name.clone(), task);
    }

    /// Adds a resource solution.
    pub fn add_resource_solution(&mut self, resource: ResourceSolution) {
        self.resources.insert(resource.name.clone(), resource);
    }

    /// Adds an indicator value.
    pub fn add_indicator_solution(&mut self, name: impl Into<String>, value: i64) {
        self.indicators.insert(name.into(), value);
    }

    /// Looks up a task by name.
    pub fn task(&self, name: &str) -> Option<&TaskSolution> {
        self.tasks.get(name)
    }

    /// Looks up a resource (or group) by name.
    pub fn resource(&self, name: &str) -> Option<&ResourceSolution> {
        self.resources.get(name)
    }

    /// Latest end among scheduled tasks.
    pub fn makespan(&self) -> i64 {
        self.tasks
            .values()
            .filter(|t| t.scheduled)
            .map(|t| t.end)
            .max()
            .unwrap_or(0)
    }

    /// Busy time / horizon of a resource; `None` for a zero horizon or an
    /// unknown resource.
    pub fn resource_utilization(&self, name: &str) -> Option<f64> {
        if self.horizon <= 0 {
            return None;
        }
        self.resource(name)
            .map(|r| r.busy_time() as f64 / self.horizon as f64)
    }
}
