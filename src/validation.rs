//! Input validation for scheduling problems.
//!
//! Checks structural integrity of a [`SchedulingProblem`] before it is
//! compiled. Detects:
//! - Duplicate task, resource, group, indicator and variable names
//! - Unusable durations and work amounts
//! - Empty variable domains
//! - References to undeclared variables, tasks or resources
//! - Circular precedence dependencies (DAG validation)
//! - A non-positive time scale
//!
//! The problem builder already rejects most of these at insertion time;
//! validation catches what a hand-assembled or deserialized problem can
//! still contain.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};

use crate::formula::VarId;
use crate::models::{SchedulingProblem, TaskId, TaskKind};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same name.
    DuplicateName,
    /// A duration specification no task can satisfy.
    InvalidDuration,
    /// A negative work amount.
    InvalidWorkAmount,
    /// A variable whose lower bound exceeds its upper bound.
    EmptyDomain,
    /// A reference to an undeclared variable, task, resource or group.
    DanglingReference,
    /// Precedence graph contains a cycle.
    CyclicDependency,
    /// A non-positive period length.
    InvalidTimeScale,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a scheduling problem.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_problem(problem: &SchedulingProblem) -> ValidationResult {
    let mut errors = Vec::new();

    check_unique(
        "task",
        problem.tasks().iter().map(|t| t.name.as_str()),
        &mut errors,
    );
    check_unique(
        "resource",
        problem.resources().iter().map(|r| r.name.as_str()),
        &mut errors,
    );
    check_unique(
        "cumulative group",
        problem.groups().iter().map(|g| g.name.as_str()),
        &mut errors,
    );
    check_unique(
        "indicator",
        problem.indicators().iter().map(|i| i.name.as_str()),
        &mut errors,
    );
    check_unique(
        "variable",
        problem.vars().iter().map(|v| v.name.as_str()),
        &mut errors,
    );

    for decl in problem.vars() {
        if decl.lower > decl.upper {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyDomain,
                format!(
                    "Variable '{}' has empty domain [{}, {}]",
                    decl.name, decl.lower, decl.upper
                ),
            ));
        }
    }

    let declared = problem.vars().len();
    let check_var = |var: VarId, owner: &str, errors: &mut Vec<ValidationError>| {
        if var.index() >= declared {
            errors.push(ValidationError::new(
                ValidationErrorKind::DanglingReference,
                format!("{owner} references undeclared variable {}", var.index()),
            ));
        }
    };

    for task in problem.tasks() {
        check_duration(&task.name, &task.kind, &mut errors);
        if task.work_amount < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWorkAmount,
                format!(
                    "Task '{}' has negative work amount {}",
                    task.name, task.work_amount
                ),
            ));
        }
        let owner = format!("Task '{}'", task.name);
        for var in [Some(task.start), Some(task.end), task.duration, task.scheduled]
            .into_iter()
            .flatten()
        {
            check_var(var, &owner, &mut errors);
        }
        for &id in task.pieces.iter().chain(task.parent.iter()) {
            if problem.task(id).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DanglingReference,
                    format!("Task '{}' references unknown task {}", task.name, id.index()),
                ));
            }
        }
    }

    for resource in problem.resources() {
        let owner = format!("Resource '{}'", resource.name);
        if let Some(group) = resource.group {
            if problem.group(group).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DanglingReference,
                    format!("{owner} references unknown group {}", group.index()),
                ));
            }
        }
        for b in &resource.busy {
            if problem.task(b.task).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DanglingReference,
                    format!("{owner} serves unknown task {}", b.task.index()),
                ));
            }
            for var in [Some(b.start), Some(b.end), b.selected].into_iter().flatten() {
                check_var(var, &owner, &mut errors);
            }
        }
    }

    for group in problem.groups() {
        for &member in &group.members {
            if problem.resource(member).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DanglingReference,
                    format!(
                        "Group '{}' references unknown resource {}",
                        group.name,
                        member.index()
                    ),
                ));
            }
        }
    }

    for (index, formula) in problem.constraints().iter().enumerate() {
        let mut vars = Vec::new();
        formula.collect_vars(&mut vars);
        let owner = format!("Constraint #{index}");
        for var in vars {
            check_var(var, &owner, &mut errors);
        }
    }

    for indicator in problem.indicators() {
        let owner = format!("Indicator '{}'", indicator.name);
        check_var(indicator.var, &owner, &mut errors);
        for var in indicator.expr.vars() {
            check_var(var, &owner, &mut errors);
        }
    }

    for objective in problem.objectives() {
        check_var(
            objective.target,
            &format!("Objective '{}'", objective.name),
            &mut errors,
        );
    }

    for &(before, after) in problem.precedences() {
        for id in [before, after] {
            if problem.task(id).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DanglingReference,
                    format!("Precedence references unknown task {}", id.index()),
                ));
            }
        }
    }
    if let Some(cycle_err) = detect_cycles(problem) {
        errors.push(cycle_err);
    }

    if let Some(delta) = problem.delta_time_ms() {
        if delta <= 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTimeScale,
                format!("Period length must be positive, got {delta} ms"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unique<'a>(
    what: &str,
    names: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateName,
                format!("Duplicate {what} name: {name}"),
            ));
        }
    }
}

fn check_duration(name: &str, kind: &TaskKind, errors: &mut Vec<ValidationError>) {
    let problem = match kind {
        TaskKind::FixedDuration(d) if *d < 0 => Some(format!("negative duration {d}")),
        TaskKind::Breakable(d) if *d < 1 => Some(format!("breakable duration {d} below 1")),
        TaskKind::VariableDuration { min, max, allowed } => match (min, max, allowed) {
            (Some(lo), Some(hi), _) if lo > hi => Some(format!("min duration {lo} above max {hi}")),
            (_, _, Some(values)) if values.is_empty() => {
                Some("empty set of allowed durations".to_string())
            }
            (_, _, Some(values)) if values.iter().any(|v| *v < 0) => {
                Some("negative allowed duration".to_string())
            }
            _ => None,
        },
        _ => None,
    };
    if let Some(problem) = problem {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidDuration,
            format!("Task '{name}' has {problem}"),
        ));
    }
}

/// Detects cycles in the precedence graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(problem: &SchedulingProblem) -> Option<ValidationError> {
    let mut adj: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for &(before, after) in problem.precedences() {
        adj.entry(before).or_default().push(after);
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for &(node, _) in problem.precedences() {
        if !visited.contains(&node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            let name = problem
                .task(node)
                .map_or_else(|| node.index().to_string(), |t| t.name.clone());
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Circular precedence detected involving task '{name}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs(
    node: TaskId,
    adj: &HashMap<TaskId, Vec<TaskId>>,
    visited: &mut HashSet<TaskId>,
    in_stack: &mut HashSet<TaskId>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(&node) {
        for &next in neighbors {
            if in_stack.contains(&next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(&next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(&node);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Constraint, TaskSpec, Worker};

    fn sample_problem() -> SchedulingProblem {
        let mut p = SchedulingProblem::new("sample").with_horizon_bound(50);
        let a = p.add_task(TaskSpec::fixed("A", 3));
        let b = p.add_task(TaskSpec::variable("B").with_max_duration(4));
        let m1 = p.add_resource(Worker::new("M1"));
        p.add_required_resource(a, m1).unwrap();
        p.add_required_resource(b, m1).unwrap();
        p.add_constraint(Constraint::precedence(a, b)).unwrap();
        p.add_objective_makespan();
        p
    }

    #[test]
    fn test_valid_problem() {
        assert!(validate_problem(&sample_problem()).is_ok());
    }

    #[test]
    fn test_duplicate_task_name() {
        let mut p = sample_problem();
        p.add_task(TaskSpec::fixed("A", 1));

        let errors = validate_problem(&p).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateName && e.message.contains("task")));
    }

    #[test]
    fn test_duplicate_resource_name() {
        let mut p = sample_problem();
        p.add_resource(Worker::new("M1"));

        let errors = validate_problem(&p).unwrap_err();
        assert!(errors.iter().any(
            |e| e.kind == ValidationErrorKind::DuplicateName && e.message.contains("resource")
        ));
    }

    #[test]
    fn test_invalid_durations() {
        let mut p = SchedulingProblem::new("d");
        p.add_task(TaskSpec::fixed("Neg", -1));
        p.add_task(
            TaskSpec::variable("Range")
                .with_min_duration(5)
                .with_max_duration(2),
        );
        p.add_task(TaskSpec::variable("Empty").with_allowed_durations(vec![]));

        let errors = validate_problem(&p).unwrap_err();
        let count = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::InvalidDuration)
            .count();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_negative_work_amount() {
        let mut p = SchedulingProblem::new("w");
        p.add_task(TaskSpec::variable("V").with_work_amount(-3));

        let errors = validate_problem(&p).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidWorkAmount));
    }

    #[test]
    fn test_empty_domain() {
        let mut p = SchedulingProblem::new("e");
        p.declare_int("x", 5, 1);

        let errors = validate_problem(&p).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::EmptyDomain));
    }

    #[test]
    fn test_cyclic_precedence() {
        // A → B → C → A (cycle)
        let mut p = SchedulingProblem::new("c");
        let a = p.add_task(TaskSpec::fixed("A", 1));
        let b = p.add_task(TaskSpec::fixed("B", 1));
        let c = p.add_task(TaskSpec::fixed("C", 1));
        p.add_constraint(Constraint::precedence(a, b)).unwrap();
        p.add_constraint(Constraint::precedence(b, c)).unwrap();
        p.add_constraint(Constraint::precedence(c, a)).unwrap();

        let errors = validate_problem(&p).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::CyclicDependency));
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let mut p = SchedulingProblem::new("chain");
        let a = p.add_task(TaskSpec::fixed("A", 1));
        let b = p.add_task(TaskSpec::fixed("B", 1));
        let c = p.add_task(TaskSpec::fixed("C", 1));
        p.add_constraint(Constraint::precedence(a, b)).unwrap();
        p.add_constraint(Constraint::precedence(b, c)).unwrap();
        p.add_constraint(Constraint::precedence(a, c)).unwrap();

        assert!(validate_problem(&p).is_ok());
    }

    #[test]
    fn test_invalid_time_scale() {
        let p = SchedulingProblem::new("t").with_delta_time_ms(0);

        let errors = validate_problem(&p).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidTimeScale));
    }

    #[test]
    fn test_multiple_errors() {
        let mut p = SchedulingProblem::new("many").with_delta_time_ms(-5);
        p.add_task(TaskSpec::fixed("X", -2));
        p.add_task(TaskSpec::fixed("X", 1));

        let errors = validate_problem(&p).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
