//! Non-overlap encodings of resource busy intervals.
//!
//! Two encodings, one chosen for the whole problem:
//!
//! - **Pairwise disjunction**: for every pair of busy intervals `(i, k)` on a
//!   resource, `xor(start_k >= end_i, start_i >= end_k)`. Quadratic in the
//!   number of intervals but valid for any duration.
//! - **Distinct starts**: every interval of constant duration `d` contributes
//!   the unit slots `start + 0 .. start + d - 1`; all slots of a resource are
//!   pairwise distinct. Quadratic in the total busy time, and only sound when
//!   every duration is a compile-time constant.
//!
//! # Reference
//! Baptiste, Le Pape & Nuijten (2001), "Constraint-Based Scheduling", §2.1
//! (disjunctive constraint)

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::formula::{Formula, LinExpr, VarId};
use crate::models::{Resource, SchedulingProblem};

/// Non-overlap encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMode {
    /// Pairwise exclusive-or between interval orderings.
    PairwiseXor,
    /// Pairwise distinct unit slots.
    DistinctStarts,
}

impl OverlapMode {
    /// Pairwise mode as soon as one task has a variable duration.
    pub fn select(problem: &SchedulingProblem) -> Self {
        if problem.has_variable_duration() {
            OverlapMode::PairwiseXor
        } else {
            OverlapMode::DistinctStarts
        }
    }
}

/// Non-overlap assertions of every resource.
pub fn encode(problem: &SchedulingProblem, mode: OverlapMode) -> Vec<Formula> {
    let mut out = Vec::new();
    for resource in problem.resources() {
        if resource.busy.len() < 2 {
            continue;
        }
        match mode {
            OverlapMode::PairwiseXor => out.extend(pairwise(&intervals(resource))),
            OverlapMode::DistinctStarts => match distinct_slots(problem, resource) {
                Some(slots) => out.push(Formula::distinct(slots)),
                None => {
                    warn!(
                        resource = %resource.name,
                        "non-constant duration on resource, using pairwise non-overlap"
                    );
                    out.extend(pairwise(&intervals(resource)));
                }
            },
        }
    }
    out
}

fn intervals(resource: &Resource) -> Vec<(VarId, VarId)> {
    resource.busy.iter().map(|b| (b.start, b.end)).collect()
}

fn pairwise(intervals: &[(VarId, VarId)]) -> Vec<Formula> {
    let mut out = Vec::with_capacity(intervals.len() * intervals.len().saturating_sub(1) / 2);
    for (i, &(start_i, end_i)) in intervals.iter().enumerate() {
        for &(start_k, end_k) in &intervals[i + 1..] {
            out.push(Formula::xor(
                Formula::ge(start_k, end_i),
                Formula::ge(start_i, end_k),
            ));
        }
    }
    out
}

/// Unit slots of a resource, or `None` if a duration is not constant.
fn distinct_slots(problem: &SchedulingProblem, resource: &Resource) -> Option<Vec<LinExpr>> {
    let mut slots = Vec::new();
    for b in &resource.busy {
        let duration = problem.task(b.task)?.fixed_duration()?;
        slots.extend((0..duration).map(|offset| b.start + offset));
    }
    Some(slots)
}
