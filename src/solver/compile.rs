//! Constraint compiler.
//!
//! Walks a [`SchedulingProblem`] once and emits the complete initial
//! assertion set, in a fixed order:
//!
//! 1. per task: validity assertions and `end <= horizon`
//! 2. user constraints, verbatim
//! 3. per resource: pairing assertions of its busy intervals
//! 4. non-overlap encoding ([`super::overlap`])
//! 5. indicator definitions
//! 6. work amounts
//!
//! Compilation is a pure function and cannot fail; malformed problems are
//! rejected earlier by [`crate::validation`].

use crate::formula::{Formula, LinExpr};
use crate::models::{BusyInterval, SchedulingProblem, Task, TaskKind};

use super::overlap::{self, OverlapMode};

/// Compiles the problem with the given non-overlap encoding.
pub fn compile(problem: &SchedulingProblem, mode: OverlapMode) -> Vec<Formula> {
    let mut out = Vec::new();
    for task in problem.tasks() {
        out.extend(task_assertions(problem, task));
        out.push(Formula::le(task.end, problem.horizon()));
    }
    out.extend(problem.constraints().iter().cloned());
    for resource in problem.resources() {
        for b in &resource.busy {
            out.extend(pairing_assertions(problem, b));
        }
    }
    out.extend(overlap::encode(problem, mode));
    for indicator in problem.indicators() {
        out.push(Formula::equal(indicator.var, indicator.expr.clone()));
    }
    out.extend(work_amount_assertions(problem));
    out
}

/// Validity assertions of one task.
pub fn task_assertions(problem: &SchedulingProblem, task: &Task) -> Vec<Formula> {
    let mut out = vec![Formula::ge(task.start, 0)];
    match &task.kind {
        TaskKind::FixedDuration(d) => {
            out.push(Formula::equal(task.start + *d, task.end));
        }
        TaskKind::VariableDuration { min, max, allowed } => {
            let duration = task.duration_expr();
            out.push(Formula::ge(duration.clone(), 0));
            out.push(Formula::equal(task.start + duration.clone(), task.end));
            if let Some(min) = min {
                out.push(Formula::ge(duration.clone(), *min));
            }
            if let Some(max) = max {
                out.push(Formula::le(duration.clone(), *max));
            }
            if let Some(allowed) = allowed {
                out.push(Formula::or(
                    allowed
                        .iter()
                        .map(|&value| Formula::equal(duration.clone(), value)),
                ));
            }
        }
        TaskKind::Breakable(_) => {
            out.push(Formula::le(task.start, task.end));
            let pieces: Vec<&Task> = task
                .pieces
                .iter()
                .filter_map(|&id| problem.task(id))
                .collect();
            if let (Some(first), Some(last)) = (pieces.first(), pieces.last()) {
                out.push(Formula::equal(task.start, first.start));
                out.push(Formula::equal(task.end, last.end));
            }
            for pair in pieces.windows(2) {
                out.push(Formula::le(pair[0].end, pair[1].start));
            }
        }
    }
    out
}

/// A selected pairing copies the task interval; an unselected one is parked
/// as an empty interval at a negative time.
fn pairing_assertions(problem: &SchedulingProblem, b: &BusyInterval) -> Vec<Formula> {
    let (Some(selected), Some(task)) = (b.selected, problem.task(b.task)) else {
        return Vec::new();
    };
    vec![
        Formula::implies(
            Formula::var(selected),
            Formula::and([
                Formula::equal(b.start, task.start),
                Formula::equal(b.end, task.end),
            ]),
        ),
        Formula::implies(
            !Formula::var(selected),
            Formula::and([Formula::equal(b.end, b.start), Formula::lt(b.start, 0)]),
        ),
    ]
}

/// `Σ productivity × (busy_end − busy_start) >= work_amount` per task.
fn work_amount_assertions(problem: &SchedulingProblem) -> Vec<Formula> {
    let mut out = Vec::new();
    for (index, task) in problem.tasks().iter().enumerate() {
        if task.work_amount <= 0 {
            continue;
        }
        let serving: Vec<usize> = if task.is_breakable() {
            task.pieces.iter().map(|p| p.index()).collect()
        } else {
            vec![index]
        };
        let mut work = LinExpr::default();
        for resource in problem.resources() {
            for b in resource
                .busy
                .iter()
                .filter(|b| serving.contains(&b.task.index()))
            {
                work = work + (b.end - b.start) * resource.productivity;
            }
        }
        let requirement = Formula::ge(work, task.work_amount);
        out.push(match task.scheduled {
            Some(scheduled) => Formula::implies(Formula::var(scheduled), requirement),
            None => requirement,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Constraint, TaskSpec, Worker};

    #[test]
    fn test_fixed_task_assertions() {
        let mut p = SchedulingProblem::new("p");
        let t = p.add_task(TaskSpec::fixed("T", 3));
        let task = p.task(t).unwrap();
        let f = task_assertions(&p, task);
        assert_eq!(f.len(), 2);
        assert_eq!(f[1], Formula::equal(task.start + 3, task.end));
    }

    #[test]
    fn test_variable_task_assertions() {
        let mut p = SchedulingProblem::new("p");
        let t = p.add_task(
            TaskSpec::variable("V")
                .with_min_duration(2)
                .with_max_duration(5)
                .with_allowed_durations(vec![2, 5]),
        );
        let f = task_assertions(&p, p.task(t).unwrap());
        // start, duration >= 0, span, min, max, allowed
        assert_eq!(f.len(), 6);
        assert!(matches!(f[5], Formula::Or(ref alts) if alts.len() == 2));
    }

    #[test]
    fn test_breakable_chain() {
        let mut p = SchedulingProblem::new("p");
        let t = p.add_task(TaskSpec::breakable("B", 3));
        let f = task_assertions(&p, p.task(t).unwrap());
        // start >= 0, start <= end, first, last, 2 chain links
        assert_eq!(f.len(), 6);
    }

    #[test]
    fn test_compile_order() {
        let mut p = SchedulingProblem::new("p");
        let a = p.add_task(TaskSpec::fixed("A", 1));
        let b = p.add_task(TaskSpec::fixed("B", 1));
        let w = p.add_resource(Worker::new("W"));
        p.add_required_resource(a, w).unwrap();
        p.add_required_resource(b, w).unwrap();
        p.add_constraint(Constraint::precedence(a, b)).unwrap();
        let f = compile(&p, OverlapMode::DistinctStarts);
        // 2 tasks x (2 validity + horizon) + 1 constraint + 1 distinct
        assert_eq!(f.len(), 8);
        assert_eq!(f[2], Formula::le(p.task(a).unwrap().end, p.horizon()));
        assert!(matches!(f[6], Formula::Cmp { .. }));
        assert!(matches!(f[7], Formula::Distinct(_)));
    }

    #[test]
    fn test_work_amount() {
        let mut p = SchedulingProblem::new("p");
        let t = p.add_task(TaskSpec::variable("V").with_work_amount(6));
        let w1 = p.add_resource(Worker::new("W1").with_productivity(2));
        p.add_required_resource(t, w1).unwrap();
        let f = work_amount_assertions(&p);
        assert_eq!(f.len(), 1);
        let task = p.task(t).unwrap();
        assert_eq!(f[0], Formula::ge((task.end - task.start) * 2, 6));
    }
}
