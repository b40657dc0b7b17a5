//! End-to-end routing tests: precedence, fallback, and dispatch over the
//! bus.

use conclave::actor::{ActorEntry, ActorId, ActorRole, ActorRoster};
use conclave::bus::MessageKind;
use conclave::error::Error;
use conclave::priority::Priority;
use conclave::route::{route, Capabilities, FeedbackKind, Severity, WorkItem};

use crate::fixtures::{full_roster, test_orchestrator, ScriptedOracle};

fn new_work() -> WorkItem {
    WorkItem::NewWork {
        name: "web shop".to_string(),
        description: "build a web shop".to_string(),
    }
}

#[test]
fn test_planner_fallback_scenario() {
    // New work with availableActors = {lead, tester}: planner unavailable,
    // resolves to lead with a reason naming the fallback.
    let roster = ActorRoster::from_entries([
        ActorEntry::new("lead-1", ActorRole::Lead),
        ActorEntry::new("tester-1", ActorRole::Tester),
    ]);

    let decision = route(&new_work(), &roster, &Capabilities::default()).unwrap();

    assert_eq!(decision.role, ActorRole::Lead);
    assert_eq!(decision.target, ActorId::from("lead-1"));
    assert!(decision.reason.contains("planner unavailable"));
}

#[test]
fn test_dispatch_end_to_end() {
    let orchestrator = test_orchestrator(ScriptedOracle::answering("ok"));
    let planner = ActorId::from("planner-1");
    orchestrator.bus().register(&planner);

    let decision = orchestrator.dispatch(&new_work(), &full_roster()).unwrap();

    assert_eq!(decision.role, ActorRole::Planner);
    assert_eq!(decision.priority, Priority::High);

    let inbox = orchestrator.bus().receive(&planner).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, MessageKind::Notification);
    assert_eq!(
        inbox[0].metadata.get("routing_reason"),
        Some(&serde_json::json!("planner role handles this item kind"))
    );
}

#[test]
fn test_priority_precedence_end_to_end() {
    let roster = full_roster();
    let capabilities = Capabilities::default();

    let emergency = route(
        &WorkItem::Emergency {
            summary: "prod down".to_string(),
        },
        &roster,
        &capabilities,
    )
    .unwrap();
    let critical_bug = route(
        &WorkItem::Feedback {
            feedback: FeedbackKind::BugReport,
            severity: Severity::Critical,
            summary: "data loss".to_string(),
        },
        &roster,
        &capabilities,
    )
    .unwrap();
    let milestone = route(
        &WorkItem::MilestoneDecision {
            milestone_id: "m1".to_string(),
            summary: "ship?".to_string(),
        },
        &roster,
        &capabilities,
    )
    .unwrap();
    let fresh = route(&new_work(), &roster, &capabilities).unwrap();
    let query = route(
        &WorkItem::TechnicalQuery {
            query: "anything".to_string(),
        },
        &roster,
        &capabilities,
    )
    .unwrap();

    assert!(emergency.priority > critical_bug.priority);
    assert!(critical_bug.priority > milestone.priority);
    assert!(milestone.priority > fresh.priority);
    assert!(fresh.priority > query.priority);
    assert_eq!(query.priority, Priority::Medium);
}

#[test]
fn test_feedback_routing_by_kind_and_severity() {
    let roster = full_roster();
    let capabilities = Capabilities::default();

    let critical_bug = WorkItem::Feedback {
        feedback: FeedbackKind::BugReport,
        severity: Severity::Critical,
        summary: "crash".to_string(),
    };
    let minor_bug = WorkItem::Feedback {
        feedback: FeedbackKind::BugReport,
        severity: Severity::Low,
        summary: "typo".to_string(),
    };
    let feature = WorkItem::Feedback {
        feedback: FeedbackKind::FeatureRequest,
        severity: Severity::Medium,
        summary: "dark mode".to_string(),
    };
    let requirement = WorkItem::Feedback {
        feedback: FeedbackKind::RequirementChange,
        severity: Severity::Medium,
        summary: "new region".to_string(),
    };

    assert_eq!(
        route(&critical_bug, &roster, &capabilities).unwrap().role,
        ActorRole::Lead
    );
    assert_eq!(
        route(&minor_bug, &roster, &capabilities).unwrap().role,
        ActorRole::Tester
    );
    assert_eq!(
        route(&feature, &roster, &capabilities).unwrap().role,
        ActorRole::Architect
    );
    assert_eq!(
        route(&requirement, &roster, &capabilities).unwrap().role,
        ActorRole::Planner
    );
}

#[test]
fn test_technical_query_refinement() {
    let roster = full_roster();
    let capabilities = Capabilities::default();

    let cases = [
        ("how do we structure the module architecture?", ActorRole::Architect),
        ("best way to implement the retry logic?", ActorRole::Developer),
        ("do we have regression coverage for this?", ActorRole::Tester),
        ("who approves the budget?", ActorRole::Lead),
    ];

    for (query, expected) in cases {
        let decision = route(
            &WorkItem::TechnicalQuery {
                query: query.to_string(),
            },
            &roster,
            &capabilities,
        )
        .unwrap();
        assert_eq!(decision.role, expected, "query: {}", query);
    }
}

#[test]
fn test_no_route_reaches_caller() {
    // The caller decides whether to retry with a larger actor set or
    // escalate; the router never guesses.
    let roster = ActorRoster::from_entries([ActorEntry::new(
        "developer-1",
        ActorRole::Developer,
    )]);

    let result = route(&new_work(), &roster, &Capabilities::default());

    assert!(matches!(result, Err(Error::NoRoute(_))));

    // Retrying with a larger snapshot succeeds.
    let larger = ActorRoster::from_entries([
        ActorEntry::new("developer-1", ActorRole::Developer),
        ActorEntry::new("lead-1", ActorRole::Lead),
    ]);
    assert!(route(&new_work(), &larger, &Capabilities::default()).is_ok());
}
