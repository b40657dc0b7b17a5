//! End-to-end planning tests: task decomposition through the orchestrator.

use conclave::core::plan::plan;
use conclave::core::task::{Effort, EffortWeights, TaskId};
use conclave::error::Error;

use crate::fixtures::{fan_out_tasks, task, test_orchestrator, ScriptedOracle};

fn ids(raw: &[&str]) -> Vec<TaskId> {
    raw.iter().map(|s| TaskId::from(*s)).collect()
}

#[test]
fn test_fan_out_scenario() {
    // Three tasks {t1 no deps, t2 depends on t1, t3 depends on t1} produce
    // phases [[t1],[t2,t3]], critical path [t1,t2] (tie broken by ascending
    // id), parallel group [t2,t3].
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));

    let plan = orchestrator.plan_project(&fan_out_tasks()).unwrap();

    assert_eq!(plan.phases, vec![ids(&["t1"]), ids(&["t2", "t3"])]);
    assert_eq!(plan.critical_path, ids(&["t1", "t2"]));
    assert_eq!(plan.parallel_groups, vec![ids(&["t2", "t3"])]);
}

#[test]
fn test_replanning_is_idempotent() {
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let tasks = fan_out_tasks();

    let first = orchestrator.plan_project(&tasks).unwrap();
    let second = orchestrator.plan_project(&tasks).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_cycle_is_surfaced_not_resolved() {
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let tasks = vec![
        task("t1", &["t3"]),
        task("t2", &["t1"]),
        task("t3", &["t2"]),
    ];

    let result = orchestrator.plan_project(&tasks);

    // Fatal to planning; no tasks are silently dropped.
    match result {
        Err(Error::Cycle { members }) => {
            assert!(!members.is_empty());
            assert!(members.iter().any(|m| m == "t1"));
        }
        other => panic!("Expected Cycle error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_effort_weights_shift_critical_path() {
    // Default weights: the t1->t2 chain wins the tie by ascending id.
    // Weighted: t3 is high effort, so t1->t3 wins outright.
    let tasks = vec![
        task("t1", &[]),
        task("t2", &["t1"]),
        task("t3", &["t1"]).with_effort(Effort::High),
    ];

    let default_plan = plan(&tasks, &EffortWeights::default()).unwrap();
    assert_eq!(default_plan.critical_path, ids(&["t1", "t3"]));

    let flattened = EffortWeights {
        low: 1,
        medium: 1,
        high: 1,
    };
    let flat_plan = plan(&tasks, &flattened).unwrap();
    assert_eq!(flat_plan.critical_path, ids(&["t1", "t2"]));
}

#[test]
fn test_wide_project_layering() {
    // A realistic project: schema, then two services in parallel, then
    // integration, then a test pass.
    let tasks = vec![
        task("t1-schema", &[]),
        task("t2-catalog", &["t1-schema"]),
        task("t3-checkout", &["t1-schema"]),
        task("t4-integration", &["t2-catalog", "t3-checkout"]),
        task("t5-tests", &["t4-integration"]),
    ];
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));

    let plan = orchestrator.plan_project(&tasks).unwrap();

    assert_eq!(plan.phase_count(), 4);
    assert_eq!(plan.phases[1], ids(&["t2-catalog", "t3-checkout"]));
    assert_eq!(plan.parallel_groups, vec![ids(&["t2-catalog", "t3-checkout"])]);
    assert_eq!(plan.phase_of(&TaskId::from("t5-tests")), Some(3));
}
