//! End-to-end feedback tests: classification and the revision cycle over
//! the bus.

use conclave::actor::ActorId;
use conclave::bus::{Message, MessageKind};
use conclave::error::Error;
use conclave::feedback::{Classifier, KeywordClassifier};
use conclave::workflow::Stage;

use crate::fixtures::{architect_awaiting, test_orchestrator, ScriptedOracle};

fn areas(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_classification_scenario() {
    // Revision areas ["architecture clarity", "tech stack mismatch"]
    // classify to both the design stage and the stack-selection stage, and
    // shouldRepackage returns false because specific matches exist.
    let classifier = KeywordClassifier::new();
    let labels = areas(&["architecture clarity", "tech stack mismatch"]);

    let stages = classifier.classify("please revise", &labels);

    assert_eq!(
        stages,
        vec![Stage::DesigningArchitecture, Stage::SelectingStack]
    );
    assert!(!classifier.should_repackage(&labels, &stages));
}

#[test]
fn test_revision_never_silently_dropped() {
    let classifier = KeywordClassifier::new();
    let labels = areas(&["vibes are off"]);

    let stages = classifier.classify("please revise", &labels);

    // Nothing matched, so the repackage path picks it up.
    assert!(stages.is_empty());
    assert!(classifier.should_repackage(&labels, &stages));
}

#[tokio::test]
async fn test_notification_does_not_trigger_feedback_application() {
    // An actor awaiting feedback that receives an unrelated NOTIFICATION
    // stays put; only a FEEDBACK-typed, task-matching message moves it.
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let mut run = architect_awaiting(&orchestrator);
    let lead = ActorId::from("lead-1");
    orchestrator.bus().register(&lead);

    orchestrator
        .bus()
        .send(
            Message::new(
                lead.clone(),
                run.actor_id.clone(),
                MessageKind::Notification,
                "daily standup in five",
            )
            .for_task("t1"),
        )
        .unwrap();

    let result = orchestrator.await_feedback(&mut run).await;
    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(run.stage(), Stage::AwaitingFeedback);

    // Now the real feedback lands and the run moves.
    orchestrator
        .bus()
        .send(
            Message::new(
                lead,
                run.actor_id.clone(),
                MessageKind::Feedback,
                "architecture needs another pass",
            )
            .for_task("t1")
            .with_metadata("revision_areas", serde_json::json!(["architecture clarity"])),
        )
        .unwrap();

    orchestrator.await_feedback(&mut run).await.unwrap();
    assert_eq!(run.stage(), Stage::ApplyingFeedback);
}

#[tokio::test]
async fn test_full_revision_cycle() {
    // await -> apply -> rewind -> rework -> repackage -> await again.
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let mut run = architect_awaiting(&orchestrator);
    let lead = ActorId::from("lead-1");
    orchestrator.bus().register(&lead);

    orchestrator
        .bus()
        .send(
            Message::new(
                lead,
                run.actor_id.clone(),
                MessageKind::Feedback,
                "design unclear, wrong tech",
            )
            .for_task("t1")
            .with_metadata(
                "revision_areas",
                serde_json::json!(["architecture clarity", "tech stack mismatch"]),
            ),
        )
        .unwrap();

    orchestrator.await_feedback(&mut run).await.unwrap();
    let implicated = orchestrator.apply_feedback(&mut run).unwrap();

    assert_eq!(
        implicated,
        vec![Stage::DesigningArchitecture, Stage::SelectingStack]
    );
    assert_eq!(run.stage(), Stage::DesigningArchitecture);

    // Rework the design and walk forward again.
    orchestrator
        .advance(
            &mut run,
            "design reworked",
            Some(
                conclave::workflow::StageUpdates::new()
                    .design_document("two services, simpler"),
            ),
        )
        .unwrap();
    assert_eq!(run.stage(), Stage::SelectingStack);

    orchestrator
        .advance(
            &mut run,
            "stack revised",
            Some(conclave::workflow::StageUpdates::new().selected_stack("rust only")),
        )
        .unwrap();
    orchestrator.advance(&mut run, "spec regenerated", None).unwrap();
    orchestrator
        .advance(
            &mut run,
            "repackaged",
            Some(
                conclave::workflow::StageUpdates::new()
                    .deliverables(["d-1".to_string(), "d-2".to_string()]),
            ),
        )
        .unwrap();

    assert_eq!(run.stage(), Stage::AwaitingFeedback);
    // Revisions produced a second deliverable id; the first survives.
    assert_eq!(
        run.state.payload.deliverables.as_ref().unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_approval_without_revision_areas_completes() {
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let mut run = architect_awaiting(&orchestrator);
    let lead = ActorId::from("lead-1");
    orchestrator.bus().register(&lead);

    orchestrator
        .bus()
        .send(
            Message::new(
                lead,
                run.actor_id.clone(),
                MessageKind::Feedback,
                "approved, ship it",
            )
            .for_task("t1"),
        )
        .unwrap();

    orchestrator.await_feedback(&mut run).await.unwrap();
    let implicated = orchestrator.apply_feedback(&mut run).unwrap();

    assert!(implicated.is_empty());
    assert_eq!(run.stage(), Stage::Completed);
}
