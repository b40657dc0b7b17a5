//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Building an orchestrator with scripted collaborators
//! - Roster snapshots
//! - Predefined task sets

use std::sync::Arc;

use conclave::actor::{ActorEntry, ActorId, ActorRole, ActorRoster};
use conclave::bus::MessageBus;
use conclave::config::Config;
use conclave::core::task::{Task, TaskId};
use conclave::error::{Error, Result};
use conclave::feedback::KeywordClassifier;
use conclave::oracle::{OracleResult, PromptContext, ReasoningOracle};
use conclave::orchestrator::{ActorRun, Orchestrator};
use conclave::priority::Priority;
use conclave::workflow::StageUpdates;

/// Oracle with a fixed answer, or scripted to fail.
pub struct ScriptedOracle {
    answer: Option<String>,
}

impl ScriptedOracle {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
        }
    }

    pub fn offline() -> Self {
        Self { answer: None }
    }
}

impl ReasoningOracle for ScriptedOracle {
    fn invoke(&self, _context: &PromptContext) -> Result<OracleResult> {
        match &self.answer {
            Some(answer) => Ok(OracleResult::answer(answer.clone())),
            None => Err(Error::Oracle("scripted outage".to_string())),
        }
    }
}

/// Orchestrator wired with an in-process bus, keyword classifier, and a
/// scripted oracle. Poll/timeout intervals are shortened for tests.
pub fn test_orchestrator(oracle: ScriptedOracle) -> Orchestrator {
    let config = Config {
        feedback_timeout_secs: 1,
        poll_interval_ms: 10,
        ..Default::default()
    };
    Orchestrator::new(
        Arc::new(MessageBus::new()),
        Arc::new(KeywordClassifier::new()),
        Arc::new(oracle),
        config,
    )
}

/// Roster with one actor per role.
pub fn full_roster() -> ActorRoster {
    ActorRoster::from_entries([
        ActorEntry::new("planner-1", ActorRole::Planner),
        ActorEntry::new("architect-1", ActorRole::Architect),
        ActorEntry::new("developer-1", ActorRole::Developer),
        ActorEntry::new("tester-1", ActorRole::Tester),
        ActorEntry::new("lead-1", ActorRole::Lead),
    ])
}

/// A task with explicit id and dependencies on the given ids.
pub fn task(id: &str, deps: &[&str]) -> Task {
    Task::new(id, &format!("{} description", id), "m1")
        .with_id(id)
        .with_dependencies(deps.iter().map(|d| TaskId::from(*d)))
}

/// The three-task set from the fan-out scenario: t2 and t3 both depend
/// on t1.
pub fn fan_out_tasks() -> Vec<Task> {
    vec![task("t1", &[]), task("t2", &["t1"]), task("t3", &["t1"])]
}

/// Drive an architect run from `initialized` all the way into
/// `awaiting_feedback` for task `t1`.
pub fn architect_awaiting(orchestrator: &Orchestrator) -> ActorRun {
    let actor = ActorId::from("architect-1");
    let mut run = orchestrator.begin_run(&actor, ActorRole::Architect, "build a web shop");
    run.state = run
        .state
        .clone()
        .assigned("t1", ActorId::from("lead-1"), Priority::High, None);

    orchestrator.advance(&mut run, "start", None).unwrap();
    orchestrator
        .advance(
            &mut run,
            "reqs done",
            Some(StageUpdates::new().requirements_analysis("catalog, checkout")),
        )
        .unwrap();
    orchestrator
        .advance(
            &mut run,
            "design done",
            Some(StageUpdates::new().design_document("three services")),
        )
        .unwrap();
    orchestrator
        .advance(
            &mut run,
            "stack chosen",
            Some(StageUpdates::new().selected_stack("rust + postgres")),
        )
        .unwrap();
    orchestrator
        .advance(
            &mut run,
            "spec generated",
            Some(StageUpdates::new().specification("openapi draft")),
        )
        .unwrap();
    orchestrator
        .advance(
            &mut run,
            "packaged",
            Some(StageUpdates::new().deliverables(["d-1".to_string()])),
        )
        .unwrap();

    run
}
