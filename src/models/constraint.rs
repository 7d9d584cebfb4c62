//! Task constraints.
//!
//! Temporal constraints between tasks and absolute time points. Each
//! constraint is lowered to a [`Formula`] when added to a problem; arbitrary
//! formulas over declared variables are accepted as well.
//!
//! # Reference
//! Brucker (2007), "Scheduling Algorithms", Ch. 2 (precedence relations)

use serde::{Deserialize, Serialize};

use super::Task;
use super::TaskId;
use crate::formula::Formula;

/// Tightness of a precedence relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedenceKind {
    /// `before.end + offset <= after.start`
    #[default]
    Lax,
    /// `before.end + offset < after.start`
    Strict,
    /// `before.end + offset == after.start`
    Tight,
}

/// A scheduling constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// Task starts exactly at `value`.
    TaskStartAt { task: TaskId, value: i64 },
    /// Task starts at or after (strictly after) `value`.
    TaskStartAfter {
        task: TaskId,
        value: i64,
        strict: bool,
    },
    /// Task ends exactly at `value`.
    TaskEndAt { task: TaskId, value: i64 },
    /// Task ends at or before (strictly before) `value`.
    TaskEndBefore {
        task: TaskId,
        value: i64,
        strict: bool,
    },
    /// `after` starts once `before` ended, plus `offset`.
    Precedence {
        before: TaskId,
        after: TaskId,
        offset: i64,
        kind: PrecedenceKind,
    },
    /// Both tasks start at the same time.
    StartSynced { a: TaskId, b: TaskId },
    /// Both tasks end at the same time.
    EndSynced { a: TaskId, b: TaskId },
    /// The two tasks do not overlap in time.
    DontOverlap { a: TaskId, b: TaskId },
    /// Any formula over declared variables.
    Custom(Formula),
}

impl Constraint {
    /// `task` starts at `value`.
    pub fn start_at(task: TaskId, value: i64) -> Self {
        Self::TaskStartAt { task, value }
    }

    /// `task` starts at or after `value`.
    pub fn start_after(task: TaskId, value: i64) -> Self {
        Self::TaskStartAfter {
            task,
            value,
            strict: false,
        }
    }

    /// `task` ends at `value`.
    pub fn end_at(task: TaskId, value: i64) -> Self {
        Self::TaskEndAt { task, value }
    }

    /// `task` ends at or before `value`.
    pub fn end_before(task: TaskId, value: i64) -> Self {
        Self::TaskEndBefore {
            task,
            value,
            strict: false,
        }
    }

    /// Lax precedence without offset.
    pub fn precedence(before: TaskId, after: TaskId) -> Self {
        Self::Precedence {
            before,
            after,
            offset: 0,
            kind: PrecedenceKind::Lax,
        }
    }

    /// Precedence with an offset and tightness.
    pub fn precedence_with(before: TaskId, after: TaskId, offset: i64, kind: PrecedenceKind) -> Self {
        Self::Precedence {
            before,
            after,
            offset,
            kind,
        }
    }

    /// Makes a start-after / end-before bound strict; no effect otherwise.
    pub fn strict(mut self) -> Self {
        match &mut self {
            Self::TaskStartAfter { strict, .. } | Self::TaskEndBefore { strict, .. } => {
                *strict = true
            }
            _ => {}
        }
        self
    }

    /// Tasks referenced by the constraint.
    pub fn tasks(&self) -> Vec<TaskId> {
        match self {
            Self::TaskStartAt { task, .. }
            | Self::TaskStartAfter { task, .. }
            | Self::TaskEndAt { task, .. }
            | Self::TaskEndBefore { task, .. } => vec![*task],
            Self::Precedence { before, after, .. } => vec![*before, *after],
            Self::StartSynced { a, b } | Self::EndSynced { a, b } | Self::DontOverlap { a, b } => {
                vec![*a, *b]
            }
            Self::Custom(_) => Vec::new(),
        }
    }

    /// Lowers the constraint given the tasks it refers to, in the order of
    /// [`tasks`](Self::tasks).
    pub(crate) fn lower(&self, tasks: &[&Task]) -> Formula {
        match (self, tasks) {
            (Self::TaskStartAt { value, .. }, [t]) => Formula::equal(t.start, *value),
            (Self::TaskStartAfter { value, strict, .. }, [t]) => {
                if *strict {
                    Formula::gt(t.start, *value)
                } else {
                    Formula::ge(t.start, *value)
                }
            }
            (Self::TaskEndAt { value, .. }, [t]) => Formula::equal(t.end, *value),
            (Self::TaskEndBefore { value, strict, .. }, [t]) => {
                if *strict {
                    Formula::lt(t.end, *value)
                } else {
                    Formula::le(t.end, *value)
                }
            }
            (Self::Precedence { offset, kind, .. }, [before, after]) => {
                let lhs = before.end + *offset;
                match kind {
                    PrecedenceKind::Lax => Formula::le(lhs, after.start),
                    PrecedenceKind::Strict => Formula::lt(lhs, after.start),
                    PrecedenceKind::Tight => Formula::equal(lhs, after.start),
                }
            }
            (Self::StartSynced { .. }, [a, b]) => Formula::equal(a.start, b.start),
            (Self::EndSynced { .. }, [a, b]) => Formula::equal(a.end, b.end),
            (Self::DontOverlap { .. }, [a, b]) => Formula::or([
                Formula::le(a.end, b.start),
                Formula::le(b.end, a.start),
            ]),
            (Self::Custom(f), _) => f.clone(),
            _ => Formula::Const(true),
        }
    }
}
