//! Scheduling domain models.
//!
//! The problem context the solver compiles ([`SchedulingProblem`]) and the
//! solution containers it produces ([`ScheduleSolution`]).
//!
//! # Domain Mappings
//!
//! | u-schedule-smt | Manufacturing | Healthcare | Logistics |
//! |----------------|--------------|------------|-----------|
//! | Task | Operation | Procedure | Transport Leg |
//! | Breakable task | Preemptible job | Split session | Multi-stop run |
//! | Worker | Machine/Operator | Room/Doctor | Truck/Driver |
//! | Cumulative group | Machine pool | Nurse team | Fleet |
//! | ScheduleSolution | Production Plan | OR Schedule | Route Plan |

mod constraint;
mod objective;
mod problem;
mod resource;
mod schedule;
mod task;

pub use constraint::{Constraint, PrecedenceKind};
pub use objective::{Indicator, Objective};
pub use problem::{SchedulingProblem, DEFAULT_HORIZON_BOUND, HORIZON_NAME};
pub use resource::{
    BusyInterval, CumulativeGroup, GroupId, Resource, ResourceId, SelectionKind, Worker,
};
pub use schedule::{ResourceAssignment, ResourceSolution, ScheduleSolution, TaskSolution};
pub use task::{Task, TaskId, TaskKind, TaskSpec};
