//! Solution decoder.
//!
//! Turns an engine [`Model`] into a [`ScheduleSolution`]. Decoding is a pure
//! function of the model and the problem; the result uses ordered maps, so
//! equal models serialize identically.
//!
//! Busy intervals parked at a negative time (unselected alternatives) are not
//! assignments. Unit workers of a cumulative group are reported under the
//! group name, with identical `(task, start, end)` triples merged.

use crate::engine::Model;
use crate::models::{
    Resource, ResourceAssignment, ResourceSolution, ScheduleSolution, SchedulingProblem,
    TaskSolution,
};

/// Decodes `model` against `problem`.
pub fn decode(model: &Model, problem: &SchedulingProblem) -> ScheduleSolution {
    let mut solution = ScheduleSolution::new(problem.name());
    solution.horizon = model.int(problem.horizon());

    let mut assigned: Vec<Vec<String>> = vec![Vec::new(); problem.tasks().len()];
    for resource in problem.resources() {
        let name = reported_name(problem, resource);
        let entry = solution
            .resources
            .entry(name.to_string())
            .or_insert_with(|| ResourceSolution::new(name));
        for b in &resource.busy {
            let (start, end) = (model.int(b.start), model.int(b.end));
            if start < 0 || end < 0 {
                continue;
            }
            if b.selected.is_some_and(|s| !model.bool(s)) {
                continue;
            }
            let Some(task) = problem.task(b.task) else {
                continue;
            };
            entry.add_assignment(ResourceAssignment::new(task.name.clone(), start, end));
            push_unique(&mut assigned[b.task.index()], name);
            if let Some(parent) = task.parent {
                push_unique(&mut assigned[parent.index()], name);
            }
        }
    }

    for (index, task) in problem.tasks().iter().enumerate() {
        let start = model.int(task.start);
        let end = model.int(task.end);
        let duration = model.eval(&task.duration_expr());
        let mut decoded = TaskSolution {
            name: task.name.clone(),
            kind: task.kind.label().to_string(),
            start,
            end,
            duration,
            optional: task.optional,
            scheduled: task.scheduled.map_or(true, |s| model.bool(s)),
            assigned_resources: std::mem::take(&mut assigned[index]),
            ..TaskSolution::default()
        };
        if let Some(delta) = problem.delta_time_ms() {
            let start_time = problem.start_time_ms().unwrap_or(0) + start * delta;
            let duration_time = duration * delta;
            decoded.start_time_ms = Some(start_time);
            decoded.duration_time_ms = Some(duration_time);
            decoded.end_time_ms = Some(start_time + duration_time);
        }
        solution.add_task_solution(decoded);
    }

    for indicator in problem.indicators() {
        solution.add_indicator_solution(indicator.name.clone(), model.int(indicator.var));
    }
    solution
}

fn reported_name<'p>(problem: &'p SchedulingProblem, resource: &'p Resource) -> &'p str {
    resource
        .group
        .and_then(|g| problem.group(g))
        .map_or(resource.name.as_str(), |g| g.name.as_str())
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}
