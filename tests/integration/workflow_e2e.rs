//! End-to-end workflow tests: actor runs, hand-offs, error and
//! cancellation paths.

use conclave::actor::{ActorId, ActorRole};
use conclave::bus::{DeliverableKind, MessageKind};
use conclave::error::Error;
use conclave::priority::Priority;
use conclave::protocol::TaskInstruction;
use conclave::workflow::{
    ActorState, Stage, StageUpdates, StateDiagnostic, TransitionOutcome,
};

use crate::fixtures::{
    architect_awaiting, fan_out_tasks, test_orchestrator, ScriptedOracle,
};

#[test]
fn test_illegal_jump_scenario() {
    // initialized -> completed directly forces the error stage with the
    // attempted target recorded and the original fields preserved.
    let state = ActorState::new(ActorRole::Planner, "build a web shop");

    let next = state.transition(Stage::Completed, "shortcut", None);

    assert_eq!(next.stage, Stage::Error);
    match &next.diagnostic {
        Some(StateDiagnostic::InvalidTransition { attempted, .. }) => {
            assert_eq!(*attempted, Stage::Completed);
        }
        other => panic!("Expected InvalidTransition, got {:?}", other),
    }
    assert_eq!(next.payload.request.as_deref(), Some("build a web shop"));
    assert_eq!(
        next.history.last().unwrap().outcome,
        TransitionOutcome::Rejected
    );
}

#[test]
fn test_errored_run_remains_inspectable() {
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let mut run = orchestrator.begin_run(
        &ActorId::from("planner-1"),
        ActorRole::Planner,
        "build it",
    );

    orchestrator.advance(&mut run, "start", None).unwrap();
    orchestrator
        .transition(&mut run, Stage::Completed, "premature", None)
        .unwrap();

    // Full history including the rejected attempt, plus the diagnostic.
    assert_eq!(run.stage(), Stage::Error);
    assert_eq!(run.state.history.len(), 2);
    assert!(run.state.diagnostic.is_some());

    let report = orchestrator.status_report(&run);
    assert_eq!(report.current_stage, Stage::Error);
    assert_eq!(report.issues.len(), 1);

    // And the run can be surfaced to the user out of the error stage.
    orchestrator.surface_error(&mut run).unwrap();
    assert_eq!(run.stage(), Stage::PresentToUser);
}

#[test]
fn test_planner_to_developer_coordination() {
    // Planner decomposes, assigns a task, the developer executes it and
    // hands the result back as a deliverable.
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let planner = ActorId::from("planner-1");
    let developer = ActorId::from("developer-1");

    // Planner run: classify new work, decompose.
    let mut planner_run =
        orchestrator.begin_run(&planner, ActorRole::Planner, "build a web shop");
    orchestrator.advance(&mut planner_run, "start", None).unwrap();
    orchestrator
        .advance(
            &mut planner_run,
            "reqs analyzed",
            Some(StageUpdates::new().requirements_analysis("catalog, checkout")),
        )
        .unwrap();
    orchestrator
        .advance(
            &mut planner_run,
            "classified",
            Some(StageUpdates::new().request_type(conclave::workflow::RequestType::NewProject)),
        )
        .unwrap();
    assert_eq!(planner_run.stage(), Stage::DecomposingTasks);

    let plan = orchestrator.plan_project(&fan_out_tasks()).unwrap();
    assert_eq!(
        plan.phases[0],
        vec![conclave::core::task::TaskId::from("t1")]
    );

    // Assign the first task to the developer.
    let tasks = fan_out_tasks();
    let instruction = TaskInstruction::from_task(&tasks[0], Priority::High, planner.clone());
    orchestrator.bus().register(&developer);
    orchestrator
        .assign_task(&developer, &instruction, Priority::High)
        .unwrap();

    // Developer picks the instruction up from its inbox.
    let inbox = orchestrator.bus().receive(&developer).unwrap();
    assert_eq!(inbox.len(), 1);
    let received: TaskInstruction =
        serde_json::from_value(inbox[0].metadata.get("instruction").unwrap().clone()).unwrap();
    assert_eq!(received.task_id, "t1");
    orchestrator
        .bus()
        .acknowledge(&developer, inbox[0].id)
        .unwrap();

    // Developer run executes the task.
    let mut dev_run =
        orchestrator.begin_assigned_run(&developer, ActorRole::Developer, &received);
    orchestrator.advance(&mut dev_run, "start", None).unwrap();
    orchestrator
        .advance(
            &mut dev_run,
            "analyzed",
            Some(StageUpdates::new().requirements_analysis("schema first")),
        )
        .unwrap();
    orchestrator
        .advance(
            &mut dev_run,
            "implemented",
            Some(StageUpdates::new().implementation("migration + models")),
        )
        .unwrap();
    assert_eq!(dev_run.stage(), Stage::PackagingDeliverables);

    // Hand the code back to the planner.
    let deliverable_id = orchestrator
        .handoff(&dev_run, &planner, DeliverableKind::Code, "schema migration")
        .unwrap();

    let planner_inbox = orchestrator.bus().receive(&planner).unwrap();
    assert_eq!(planner_inbox.len(), 1);
    assert_eq!(planner_inbox[0].kind, MessageKind::DeliverableTransfer);

    let deliverable = orchestrator.bus().deliverable(deliverable_id).unwrap();
    assert_eq!(deliverable.task_id, "t1");
    assert_eq!(deliverable.source_actor_id, developer);
}

#[tokio::test]
async fn test_feedback_timeout_is_surfaced() {
    // A run stuck awaiting feedback past the deadline is a caller-visible
    // condition, not a silent retry.
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let mut run = architect_awaiting(&orchestrator);

    let result = orchestrator.await_feedback(&mut run).await;

    match result {
        Err(Error::Timeout(duration)) => {
            assert_eq!(duration.as_secs(), 1);
        }
        other => panic!("Expected Timeout, got {:?}", other.map(|_| ())),
    }
    // The run is still awaiting; the caller decides what to do next.
    assert_eq!(run.stage(), Stage::AwaitingFeedback);
}

#[tokio::test]
async fn test_cancellation_during_await() {
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let mut run = architect_awaiting(&orchestrator);

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        token.cancel();
    });

    let result = orchestrator.await_feedback(&mut run).await;

    assert!(matches!(result, Err(Error::Cancelled(_))));
    assert_eq!(run.stage(), Stage::Completed);
    assert!(run.state.cancelled);
    assert!(run
        .state
        .history
        .last()
        .unwrap()
        .reason
        .contains("cancelled"));
}

#[test]
fn test_degraded_oracle_keeps_run_moving() {
    // Oracle down: the stack advice degrades but the run proceeds.
    let orchestrator = test_orchestrator(ScriptedOracle::offline());
    let architect = ActorId::from("architect-1");
    let mut run = orchestrator.begin_run(&architect, ActorRole::Architect, "build it");

    orchestrator.advance(&mut run, "start", None).unwrap();
    orchestrator
        .advance(
            &mut run,
            "reqs",
            Some(StageUpdates::new().requirements_analysis("catalog")),
        )
        .unwrap();
    orchestrator
        .advance(
            &mut run,
            "design",
            Some(StageUpdates::new().design_document("one service")),
        )
        .unwrap();
    assert_eq!(run.stage(), Stage::SelectingStack);

    let advice = orchestrator.advise_stack(&run);
    assert!(advice.degraded);

    orchestrator
        .advance(
            &mut run,
            "stack selected from fallback",
            Some(StageUpdates::new().selected_stack(advice.content)),
        )
        .unwrap();
    assert_eq!(run.stage(), Stage::GeneratingSpecification);
}

#[test]
fn test_clarification_detour() {
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let mut run = orchestrator.begin_run(
        &ActorId::from("architect-1"),
        ActorRole::Architect,
        "vague request",
    );

    orchestrator.advance(&mut run, "start", None).unwrap();
    orchestrator
        .transition(&mut run, Stage::Clarification, "requirements ambiguous", None)
        .unwrap();

    assert_eq!(run.stage(), Stage::Clarification);
}

#[test]
fn test_status_report_completion_tracks_progress() {
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let run = architect_awaiting(&orchestrator);

    let report = orchestrator.status_report(&run);

    assert_eq!(report.current_stage, Stage::AwaitingFeedback);
    assert!(report.completion_percentage > 50);
    assert!(report
        .achievements
        .contains(&"reached packaging_deliverables".to_string()));
}
