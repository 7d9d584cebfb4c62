//! End-to-end scenarios for the solver pipeline.

use proptest::prelude::*;

use super::*;
use crate::engine::{new_context, Direction, EngineMode, Priority};
use crate::formula::VarDecl;
use crate::models::{Constraint, ResourceAssignment, SelectionKind, TaskSpec, Worker};

fn config() -> SolverConfig {
    SolverConfig::default().with_max_time_secs(30.0)
}

fn solve_ok(problem: &SchedulingProblem) -> ScheduleSolution {
    let ctx = new_context();
    let mut solver = SchedulingSolver::new(problem, &ctx, config()).unwrap();
    let report = solver.solve();
    assert!(report.is_solved(), "unexpected outcome {:?}", report.outcome);
    report.into_solution().unwrap()
}

/// Lunch (1 period, starts at 4) and Carry share one worker.
fn picnic(carry: TaskSpec) -> SchedulingProblem {
    let mut p = SchedulingProblem::new("picnic").with_horizon_bound(30);
    let lunch = p.add_task(TaskSpec::fixed("Lunch", 1));
    let carry = p.add_task(carry);
    let bob = p.add_resource(Worker::new("Bob"));
    p.add_required_resource(lunch, bob).unwrap();
    p.add_required_resource(carry, bob).unwrap();
    p.add_constraint(Constraint::start_at(lunch, 4)).unwrap();
    p.add_objective_makespan();
    p
}

/// Z3 engine that can delay every check or override its verdict.
#[derive(Debug)]
struct Throttled<'ctx> {
    inner: Z3Engine<'ctx>,
    delay: Duration,
    verdict: Option<CheckResult>,
}

impl<'ctx> Throttled<'ctx> {
    fn new(ctx: &'ctx Context) -> Self {
        Self {
            inner: Z3Engine::new(ctx),
            delay: Duration::ZERO,
            verdict: None,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_verdict(mut self, verdict: CheckResult) -> Self {
        self.verdict = Some(verdict);
        self
    }
}

impl Engine for Throttled<'_> {
    fn configure(&mut self, params: &EngineParams) {
        self.inner.configure(params);
    }

    fn declare(&mut self, decl: &VarDecl) -> VarId {
        self.inner.declare(decl)
    }

    fn assert(&mut self, formula: Formula) {
        self.inner.assert(formula);
    }

    fn assert_tracked(&mut self, formula: Formula, label: String) {
        self.inner.assert_tracked(formula, label);
    }

    fn push(&mut self) {
        self.inner.push();
    }

    fn pop(&mut self) {
        self.inner.pop();
    }

    fn check(&mut self) -> CheckResult {
        std::thread::sleep(self.delay);
        let result = self.inner.check();
        self.verdict.clone().unwrap_or(result)
    }

    fn model(&self) -> Option<Model> {
        match self.verdict {
            Some(CheckResult::Sat) | None => self.inner.model(),
            Some(_) => None,
        }
    }

    fn unsat_core(&self) -> Vec<String> {
        self.inner.unsat_core()
    }

    fn add_objective(&mut self, direction: Direction, target: VarId) -> Result<()> {
        self.inner.add_objective(direction, target)
    }

    fn objective_values(&self) -> Vec<Option<i64>> {
        self.inner.objective_values()
    }

    fn declarations(&self) -> &[VarDecl] {
        self.inner.declarations()
    }

    fn assertions(&self) -> Vec<String> {
        self.inner.assertions()
    }

    fn statistics(&self) -> Statistics {
        self.inner.statistics()
    }

    fn to_smt2(&self) -> String {
        self.inner.to_smt2()
    }
}

fn assert_no_overlap(solution: &ScheduleSolution) {
    for resource in solution.resources.values() {
        let a = &resource.assignments;
        for i in 0..a.len() {
            for k in i + 1..a.len() {
                assert!(
                    a[i].end <= a[k].start || a[k].end <= a[i].start,
                    "{} overlaps on {}: {:?} / {:?}",
                    a[i].task,
                    resource.name,
                    a[i],
                    a[k]
                );
            }
        }
    }
}

#[test]
fn test_single_task_makespan() {
    let mut p = SchedulingProblem::new("a").with_horizon_bound(20);
    p.add_task(TaskSpec::fixed("T", 3));
    p.add_objective_makespan();
    let s = solve_ok(&p);
    assert_eq!(s.horizon, 3);
    let t = s.task("T").unwrap();
    assert_eq!((t.start, t.end, t.duration), (0, 3, 3));
}

#[test]
fn test_breakable_pieces_pack_from_zero() {
    let mut p = SchedulingProblem::new("b").with_horizon_bound(20);
    p.add_task(TaskSpec::breakable("T", 3));
    p.add_objective_makespan();
    let s = solve_ok(&p);
    let first = s.task("T_part0").unwrap();
    assert_eq!((first.start, first.duration), (0, 1));
    assert_eq!(s.task("T_part2").unwrap().end, 3);
    assert_eq!(s.task("T").unwrap().kind, "BreakableTask");
}

#[test]
fn test_picnic_carry_after_lunch() {
    let p = picnic(TaskSpec::fixed("Carry", 6));
    let s = solve_ok(&p);
    let lunch = s.task("Lunch").unwrap();
    let carry = s.task("Carry").unwrap();
    assert_eq!((lunch.start, lunch.end), (4, 5));
    assert_eq!((carry.start, carry.end), (5, 11));
    assert_eq!(s.horizon, 11);
    assert_eq!(s.resource("Bob").unwrap().assignments.len(), 2);
    assert_no_overlap(&s);
}

#[test]
fn test_picnic_breakable_carry_wraps_lunch() {
    let p = picnic(TaskSpec::breakable("Carry", 6));
    let s = solve_ok(&p);
    assert_eq!(s.task("Carry_part0").unwrap().start, 0);
    assert_eq!(s.task("Carry_part5").unwrap().end, 7);
    let carry = s.task("Carry").unwrap();
    assert_eq!((carry.start, carry.end, carry.duration), (0, 7, 7));
    assert_eq!(carry.assigned_resources, vec!["Bob".to_string()]);
    assert_eq!(s.horizon, 7);
    assert_no_overlap(&s);
}

#[test]
fn test_operations_before_solve_are_rejected() {
    let ctx = new_context();
    let p = picnic(TaskSpec::fixed("Carry", 6));
    let mut solver = SchedulingSolver::new(&p, &ctx, config()).unwrap();
    assert!(matches!(
        solver.to_smt2(),
        Err(SchedError::PreconditionViolation(_))
    ));
    let path = std::env::temp_dir().join("u_schedule_smt_never_written.smt2");
    assert!(matches!(
        solver.export_to_smt2(&path),
        Err(SchedError::PreconditionViolation(_))
    ));
    assert!(!path.exists());
    assert!(matches!(
        solver.model_listing(),
        Err(SchedError::PreconditionViolation(_))
    ));
    let horizon = p.horizon();
    assert!(matches!(
        solver.find_another_solution(horizon),
        Err(SchedError::PreconditionViolation(_))
    ));
    assert!(solver.current_solution().is_none());
    // introspection of the assertion set needs no solve
    assert!(!solver.assertions().is_empty());
}

#[test]
fn test_export_after_solve() {
    let ctx = new_context();
    let p = picnic(TaskSpec::fixed("Carry", 6));
    let mut solver = SchedulingSolver::new(&p, &ctx, config().with_debug(true)).unwrap();
    assert!(solver.solve().is_solved());
    let text = solver.to_smt2().unwrap();
    assert!(text.starts_with("(set-logic QF_IDL)"));
    assert!(text.contains("declare-fun"));
    assert!(text.contains("Carry_start"));

    let path = std::env::temp_dir().join(format!(
        "u_schedule_smt_export_{}.smt2",
        std::process::id()
    ));
    solver.export_to_smt2(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(written, text);

    let listing = solver.model_listing().unwrap();
    assert_eq!(listing.len(), p.vars().len());
    assert_eq!(listing[0], ("horizon".to_string(), 11));
    assert!(solver.statistics().checks >= 2);
}

#[test]
fn test_variable_duration_with_work_amount() {
    let ctx = new_context();
    let mut p = SchedulingProblem::new("work").with_horizon_bound(20);
    let a = p.add_task(TaskSpec::fixed("A", 2));
    let v = p.add_task(TaskSpec::variable("V").with_work_amount(6));
    let w = p.add_resource(Worker::new("W").with_productivity(2));
    p.add_required_resource(a, w).unwrap();
    p.add_required_resource(v, w).unwrap();
    p.add_objective_makespan();

    let mut solver = SchedulingSolver::new(&p, &ctx, config()).unwrap();
    assert_eq!(solver.overlap_mode(), OverlapMode::PairwiseXor);
    let s = solver.solve().into_solution().unwrap();
    assert_eq!(s.task("V").unwrap().duration, 3);
    assert_eq!(s.task("V").unwrap().kind, "VariableDurationTask");
    assert_eq!(s.horizon, 5);
    assert_no_overlap(&s);
}

#[test]
fn test_allowed_durations() {
    let mut p = SchedulingProblem::new("allowed").with_horizon_bound(20);
    p.add_task(
        TaskSpec::variable("V")
            .with_min_duration(3)
            .with_allowed_durations(vec![1, 4, 6]),
    );
    p.add_objective_makespan();
    let s = solve_ok(&p);
    assert_eq!(s.task("V").unwrap().duration, 4);
    assert_eq!(s.horizon, 4);
}

#[test]
fn test_cumulative_resource_runs_in_parallel() {
    let mut p = SchedulingProblem::new("crew").with_horizon_bound(6);
    let crew = p.add_cumulative_resource("Crew", 2);
    for name in ["A", "B", "C"] {
        let t = p.add_task(TaskSpec::fixed(name, 2));
        p.add_required_cumulative(t, crew, 1).unwrap();
    }
    p.add_objective_makespan();
    let s = solve_ok(&p);
    assert_eq!(s.horizon, 4);
    assert_eq!(s.resources.len(), 1);
    let merged = s.resource("Crew").unwrap();
    assert_eq!(merged.assignments.len(), 3);
    assert!(merged.assignments.iter().all(|a| a.start >= 0));
    for name in ["A", "B", "C"] {
        assert_eq!(
            s.task(name).unwrap().assigned_resources,
            vec!["Crew".to_string()]
        );
    }
}

#[test]
fn test_alternative_worker_selection() {
    let mut p = SchedulingProblem::new("alt").with_horizon_bound(6);
    let a = p.add_task(TaskSpec::fixed("A", 3));
    let t = p.add_task(TaskSpec::fixed("T", 3));
    let w1 = p.add_resource(Worker::new("W1"));
    let w2 = p.add_resource(Worker::new("W2"));
    p.add_required_resource(a, w1).unwrap();
    p.select_workers(t, &[w1, w2], 1, SelectionKind::Exact)
        .unwrap();
    p.add_objective_makespan();
    let s = solve_ok(&p);
    assert_eq!(s.horizon, 3);
    assert_eq!(s.task("T").unwrap().assigned_resources, vec!["W2".to_string()]);
    assert_eq!(
        s.resource("W1").unwrap().assignments,
        vec![ResourceAssignment::new("A", 0, 3)]
    );
    assert_eq!(
        s.resource("W2").unwrap().assignments,
        vec![ResourceAssignment::new("T", 0, 3)]
    );
}

#[test]
fn test_optional_task_left_out() {
    let mut p = SchedulingProblem::new("opt").with_fixed_horizon(3);
    let m = p.add_task(TaskSpec::fixed("M", 3));
    let o = p.add_task(TaskSpec::fixed("O", 3).with_optional(true));
    let w = p.add_resource(Worker::new("W"));
    p.add_required_resource(m, w).unwrap();
    p.add_required_resource(o, w).unwrap();
    let s = solve_ok(&p);
    assert!(s.task("M").unwrap().scheduled);
    let opt = s.task("O").unwrap();
    assert!(opt.optional);
    assert!(!opt.scheduled);
    assert!(opt.assigned_resources.is_empty());
    assert_eq!(
        s.resource("W").unwrap().assignments,
        vec![ResourceAssignment::new("M", 0, 3)]
    );
}

#[test]
fn test_find_another_solution_excludes_previous_values() {
    let ctx = new_context();
    let mut p = SchedulingProblem::new("another").with_horizon_bound(10);
    let t = p.add_task(TaskSpec::fixed("T", 2));
    let start = p.task(t).unwrap().start;
    let mut solver = SchedulingSolver::new(&p, &ctx, config()).unwrap();
    let mut seen = vec![solver.solve().solution().unwrap().task("T").unwrap().start];
    for _ in 0..3 {
        let report = solver.find_another_solution(start).unwrap();
        let value = report.solution().unwrap().task("T").unwrap().start;
        assert!(!seen.contains(&value), "{value} returned again");
        seen.push(value);
    }
}

#[test]
fn test_infeasible_reports_core_in_debug_mode() {
    let ctx = new_context();
    let mut p = SchedulingProblem::new("late").with_horizon_bound(20);
    let t = p.add_task(TaskSpec::fixed("T", 4));
    p.add_constraint(Constraint::start_after(t, 5)).unwrap();
    p.add_constraint(Constraint::end_before(t, 6)).unwrap();

    let mut solver = SchedulingSolver::new(&p, &ctx, config().with_debug(true)).unwrap();
    let report = solver.solve();
    match report.outcome {
        Outcome::Infeasible {
            conflict: Some(labels),
        } => {
            assert!(!labels.is_empty());
            assert!(labels.iter().all(|l| l.starts_with("asst_")));
        }
        other => panic!("unexpected {other:?}"),
    }

    let mut quiet = SchedulingSolver::new(&p, &ctx, config()).unwrap();
    assert_eq!(
        quiet.solve().outcome,
        Outcome::Infeasible { conflict: None }
    );
}

#[test]
fn test_multi_objective_infeasible_reports_core() {
    let mut p = SchedulingProblem::new("late").with_horizon_bound(20);
    let t = p.add_task(TaskSpec::fixed("T", 2));
    p.add_constraint(Constraint::start_at(t, 10)).unwrap();
    p.add_constraint(Constraint::end_before(t, 5)).unwrap();
    p.add_objective_makespan();
    let t_end = p.task(t).unwrap().end;
    p.add_objective("t_end", Direction::Minimize, t_end).unwrap();

    let ctx = new_context();
    let mut solver = SchedulingSolver::new(&p, &ctx, config().with_debug(true)).unwrap();
    assert!(matches!(solver.regime(), Regime::Native { .. }));
    let report = solver.solve();
    match report.outcome {
        Outcome::Infeasible {
            conflict: Some(labels),
        } => {
            assert!(!labels.is_empty());
            assert!(labels.iter().all(|l| l.starts_with("asst_")));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        report.objective_values,
        vec![("makespan".to_string(), None), ("t_end".to_string(), None)]
    );
}

#[test]
fn test_infeasible_optimization_is_not_a_budget_stop() {
    let ctx = new_context();
    let mut p = SchedulingProblem::new("late").with_fixed_horizon(2);
    p.add_task(TaskSpec::fixed("T", 4));
    p.add_objective_makespan();
    let mut solver = SchedulingSolver::new(&p, &ctx, config()).unwrap();
    let report = solver.solve();
    assert!(matches!(report.outcome, Outcome::Infeasible { .. }));
    assert!(report.advisories.is_empty());
    assert_eq!(report.objective_value("makespan"), None);
}

#[test]
fn test_unknown_reason_is_surfaced() {
    let p = picnic(TaskSpec::fixed("Carry", 6));
    let ctx = new_context();
    let engine = Throttled::new(&ctx).with_verdict(CheckResult::Unknown("canceled".into()));
    let mut solver = SchedulingSolver::with_engine(&p, config(), engine).unwrap();
    let report = solver.solve();
    assert_eq!(
        report.outcome,
        Outcome::Indeterminate {
            reason: "canceled".into()
        }
    );
    assert!(solver.current_solution().is_none());
}

#[test]
fn test_time_budget_advisory() {
    let p = picnic(TaskSpec::fixed("Carry", 6));
    let ctx = new_context();
    let engine = Throttled::new(&ctx).with_delay(Duration::from_millis(120));
    let budget = SolverConfig::default().with_max_time_secs(0.05);
    let mut solver = SchedulingSolver::with_engine(&p, budget, engine).unwrap();
    let report = solver.solve();
    assert!(report.is_solved());
    assert_eq!(report.iterations, 1);
    assert_eq!(report.advisories, vec![Advisory::TimeBudgetExceeded]);
    assert!(report.objective_value("makespan").is_some());
    assert_no_overlap(report.solution().unwrap());
}

#[test]
fn test_iteration_budget_advisory() {
    let ctx = new_context();
    let p = picnic(TaskSpec::fixed("Carry", 6));
    let mut solver = SchedulingSolver::new(&p, &ctx, config().with_max_iterations(1)).unwrap();
    let report = solver.solve();
    assert!(report.is_solved());
    assert_eq!(report.iterations, 1);
    assert_eq!(report.advisories, vec![Advisory::IterationBudgetExceeded]);
    assert!(report.objective_value("makespan").is_some());
}

fn two_on_one_worker() -> SchedulingProblem {
    let mut p = SchedulingProblem::new("multi").with_horizon_bound(20);
    let a = p.add_task(TaskSpec::fixed("A", 2));
    let b = p.add_task(TaskSpec::fixed("B", 3));
    let w = p.add_resource(Worker::new("W"));
    p.add_required_resource(a, w).unwrap();
    p.add_required_resource(b, w).unwrap();
    p.add_objective_makespan();
    let a_end = p.task(a).unwrap().end;
    p.add_objective("a_end", Direction::Minimize, a_end).unwrap();
    p
}

#[test]
fn test_multi_objective_lexicographic() {
    let p = two_on_one_worker();
    let ctx = new_context();
    let mut solver = SchedulingSolver::new(&p, &ctx, config().with_priority(Priority::Lex)).unwrap();
    assert!(matches!(solver.regime(), Regime::Native { .. }));
    let report = solver.solve();
    assert_eq!(
        report.objective_values,
        vec![
            ("makespan".to_string(), Some(5)),
            ("a_end".to_string(), Some(2))
        ]
    );
    let s = report.solution().unwrap();
    assert_eq!(s.task("A").unwrap().end, 2);
    assert_eq!(s.task("B").unwrap().start, 2);
}

#[test]
fn test_cost_function_selects_mixed_logic() {
    let ctx = new_context();
    let mut p = SchedulingProblem::new("cost").with_horizon_bound(10);
    let t = p.add_task(TaskSpec::fixed("T", 2));
    let w = p.add_resource(Worker::new("W").with_cost_per_period(3));
    p.add_required_resource(t, w).unwrap();
    p.add_indicator_resource_cost("cost", &[w]).unwrap();
    p.add_objective_indicator("cost", Direction::Minimize).unwrap();

    let mut solver = SchedulingSolver::new(&p, &ctx, config()).unwrap();
    assert_eq!(solver.logic(), Logic::QfLira);
    let s = solver.solve().into_solution().unwrap();
    assert_eq!(s.indicators.get("cost"), Some(&6));
}

#[test]
fn test_invalid_configuration_rejected() {
    let ctx = new_context();
    let p = picnic(TaskSpec::fixed("Carry", 6));
    let err = SchedulingSolver::new(&p, &ctx, SolverConfig::default().with_max_time_secs(0.0));
    assert!(matches!(err, Err(SchedError::InvalidConfiguration(_))));
}

#[test]
fn test_engine_mode_and_tracker_labels() {
    let ctx = new_context();
    let p = picnic(TaskSpec::fixed("Carry", 6));
    let solver = SchedulingSolver::new(&p, &ctx, config().with_debug(true)).unwrap();
    assert_eq!(
        solver.regime().engine_mode(solver.logic()),
        EngineMode::Incremental {
            logic: Some(Logic::QfIdl)
        }
    );
    let compiled = compile(&p, solver.overlap_mode()).len();
    assert_eq!(solver.assertions().len(), compiled);
    assert_eq!(solver.tracker.labelled(), compiled);
}

#[test]
fn test_decoding_is_deterministic() {
    let p = picnic(TaskSpec::breakable("Carry", 6));
    let first = serde_json::to_string(&solve_ok(&p)).unwrap();
    let second = serde_json::to_string(&solve_ok(&p)).unwrap();
    assert_eq!(first, second);
}

fn single_machine(durations: &[i64]) -> SchedulingProblem {
    let mut p = SchedulingProblem::new("prop").with_horizon_bound(durations.iter().sum::<i64>() + 2);
    let w = p.add_resource(Worker::new("W"));
    for (i, &d) in durations.iter().enumerate() {
        let t = p.add_task(TaskSpec::fixed(format!("T{i}"), d));
        p.add_required_resource(t, w).unwrap();
    }
    p
}

fn optimal_makespan(problem: &SchedulingProblem, mode: OverlapMode) -> Option<i64> {
    let ctx = new_context();
    let mut engine = Z3Engine::new(&ctx);
    engine.configure(&EngineParams {
        mode: EngineMode::Optimize {
            priority: Priority::Lex,
        },
        ..EngineParams::default()
    });
    for decl in problem.vars() {
        engine.declare(decl);
    }
    for formula in compile(problem, mode) {
        engine.assert(formula);
    }
    engine
        .add_objective(Direction::Minimize, problem.horizon())
        .unwrap();
    match engine.check() {
        CheckResult::Sat => engine.objective_values()[0],
        _ => None,
    }
}

#[test]
fn test_multi_objective_pareto() {
    let p = two_on_one_worker();
    let ctx = new_context();
    let mut solver =
        SchedulingSolver::new(&p, &ctx, config().with_priority(Priority::Pareto)).unwrap();
    let report = solver.solve();
    // (5, 2) dominates every other schedule
    assert_eq!(report.objective_value("makespan"), Some(5));
    assert_eq!(report.objective_value("a_end"), Some(2));
    assert_no_overlap(report.solution().unwrap());
}

#[test]
fn test_multi_objective_box() {
    let p = two_on_one_worker();
    let ctx = new_context();
    let mut solver = SchedulingSolver::new(&p, &ctx, config().with_priority(Priority::Box)).unwrap();
    let report = solver.solve();
    let s = report.solution().unwrap();
    assert_no_overlap(s);
    let makespan = report.objective_value("makespan").unwrap();
    let a_end = report.objective_value("a_end").unwrap();
    assert!(makespan >= 5);
    assert!(a_end >= 2);
    assert_eq!(makespan, s.horizon);
    assert_eq!(a_end, s.task("A").unwrap().end);
}

#[test]
fn test_ten_tasks_on_one_worker() {
    let mut p = single_machine(&[3; 10]);
    p.add_objective_makespan();
    let ctx = new_context();
    let mut solver = SchedulingSolver::new(&p, &ctx, config()).unwrap();
    assert_eq!(solver.overlap_mode(), OverlapMode::DistinctStarts);
    let report = solver.solve();
    assert!(report.advisories.is_empty());
    let s = report.solution().unwrap();
    assert_eq!(s.horizon, 30);
    assert_eq!(s.resource("W").unwrap().assignments.len(), 10);
    assert_no_overlap(s);
}

#[test]
fn test_ten_tasks_pairwise_encoding() {
    let mut p = SchedulingProblem::new("mixed").with_horizon_bound(40);
    let w = p.add_resource(Worker::new("W"));
    for i in 0..10 {
        let t = p.add_task(TaskSpec::fixed(format!("T{i}"), 3));
        p.add_required_resource(t, w).unwrap();
    }
    let v = p.add_task(TaskSpec::variable("V").with_min_duration(2).with_max_duration(4));
    p.add_required_resource(v, w).unwrap();
    p.add_objective_makespan();
    let ctx = new_context();
    let mut solver = SchedulingSolver::new(&p, &ctx, config()).unwrap();
    assert_eq!(solver.overlap_mode(), OverlapMode::PairwiseXor);
    let s = solver.solve().into_solution().unwrap();
    assert_eq!(s.task("V").unwrap().duration, 2);
    assert_eq!(s.horizon, 32);
    assert_no_overlap(&s);
}

#[test]
fn test_flow_shop_six_jobs_three_machines() {
    let mut p = SchedulingProblem::new("flow_shop").with_horizon_bound(60);
    let machines: Vec<_> = (0..3)
        .map(|m| p.add_resource(Worker::new(format!("M{m}"))))
        .collect();
    for job in 0..6 {
        let mut previous = None;
        for (m, &machine) in machines.iter().enumerate() {
            let op = p.add_task(TaskSpec::fixed(format!("J{job}_M{m}"), 2));
            p.add_required_resource(op, machine).unwrap();
            if let Some(before) = previous {
                p.add_constraint(Constraint::precedence(before, op)).unwrap();
            }
            previous = Some(op);
        }
    }
    p.add_objective_makespan();
    let ctx = new_context();
    let mut solver = SchedulingSolver::new(&p, &ctx, config()).unwrap();
    let report = solver.solve();
    assert!(report.advisories.is_empty());
    let s = report.solution().unwrap();
    // (jobs + machines - 1) * duration
    assert_eq!(s.horizon, 16);
    assert_no_overlap(s);
    for job in 0..6 {
        for m in 1..3 {
            let before = s.task(&format!("J{job}_M{}", m - 1)).unwrap();
            let after = s.task(&format!("J{job}_M{m}")).unwrap();
            assert!(before.end <= after.start);
        }
    }
}

#[test]
fn test_debug_convergence_issues_only_optimizer_checks() {
    let mut p = single_machine(&[3; 10]);
    p.add_objective_makespan();
    let ctx = new_context();
    let mut solver = SchedulingSolver::new(&p, &ctx, config().with_debug(true)).unwrap();
    let report = solver.solve();
    assert_eq!(report.solution().unwrap().horizon, 30);
    assert_eq!(solver.statistics().checks, report.iterations as u64);
    assert_eq!(solver.engine().scope_depth(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_single_machine_never_overlaps(durations in prop::collection::vec(1i64..5, 1..9)) {
        let mut p = single_machine(&durations);
        p.add_objective_makespan();
        let s = solve_ok(&p);
        assert_no_overlap(&s);
        prop_assert_eq!(s.horizon, durations.iter().sum::<i64>());
        for t in s.tasks.values() {
            prop_assert!(0 <= t.start && t.start <= t.end && t.end <= s.horizon);
            prop_assert_eq!(t.end - t.start, t.duration);
        }
    }

    #[test]
    fn prop_encodings_agree_on_fixed_durations(durations in prop::collection::vec(1i64..5, 1..9)) {
        let p = single_machine(&durations);
        let pairwise = optimal_makespan(&p, OverlapMode::PairwiseXor);
        let distinct = optimal_makespan(&p, OverlapMode::DistinctStarts);
        prop_assert_eq!(pairwise, distinct);
        prop_assert_eq!(distinct, Some(durations.iter().sum::<i64>()));
    }
}
