//! Coordination orchestrator.
//!
//! Composes the substrate: drives each actor's workflow state machine,
//! consults the router for hand-offs, and runs the await -> apply ->
//! re-plan cycle for feedback. All collaborators (bus, classifier, oracle,
//! persistence) are injected at construction; the orchestrator owns their
//! lifecycle and there are no module-level singletons.
//!
//! Each run is an independent sequential process: transitions on one run
//! are serialized by `&mut` ownership, and runs only communicate through
//! the message bus. The single legitimate suspension point is the
//! feedback-waiting stage, modeled as an explicit async poll with a
//! configurable deadline and cancellation token.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::actor::{ActorId, ActorRole, ActorRoster};
use crate::bus::{DeliverableId, DeliverableKind, Message, MessageBus, MessageKind};
use crate::config::Config;
use crate::core::plan::{plan, ExecutionPlan};
use crate::core::task::Task;
use crate::error::{Error, Result};
use crate::feedback::Classifier;
use crate::oracle::{OracleResult, PromptContext, ReasoningOracle};
use crate::persistence::{MemoryTier, Persistence};
use crate::priority::Priority;
use crate::protocol::{StatusReport, TaskInstruction};
use crate::route::{route, Capabilities, RoutingDecision, WorkItem};
use crate::workflow::{ActorState, Stage, StageUpdates};
use crate::{clog, clog_debug, clog_error, clog_warn};

/// Conservative fallback stack used when the oracle is unavailable.
const FALLBACK_STACK: &str = "rust service, postgres storage, rest api";

/// One actor's unit of work, driven by the orchestrator.
///
/// Owns the run's state; transitions go through the orchestrator, which
/// replaces the state wholesale (the machine itself is copy-on-write).
#[derive(Debug, Clone)]
pub struct ActorRun {
    /// The actor executing this run.
    pub actor_id: ActorId,
    /// Current workflow state.
    pub state: ActorState,
}

impl ActorRun {
    /// The stage the run is currently in.
    pub fn stage(&self) -> Stage {
        self.state.stage
    }
}

/// The coordination orchestrator.
pub struct Orchestrator {
    bus: Arc<MessageBus>,
    classifier: Arc<dyn Classifier>,
    oracle: Arc<dyn ReasoningOracle>,
    persistence: Option<Arc<dyn Persistence>>,
    capabilities: Capabilities,
    config: Config,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Build an orchestrator from its collaborators.
    pub fn new(
        bus: Arc<MessageBus>,
        classifier: Arc<dyn Classifier>,
        oracle: Arc<dyn ReasoningOracle>,
        config: Config,
    ) -> Self {
        Self {
            bus,
            classifier,
            oracle,
            persistence: None,
            capabilities: Capabilities::default(),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a persistence collaborator (write-behind only).
    pub fn with_persistence(mut self, store: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(store);
        self
    }

    /// Override the routing capability tables.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Token cancelling every run driven by this orchestrator. Child
    /// tokens can be derived for per-run cancellation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The injected bus, for callers that need to seed or inspect traffic.
    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Start a new run for an actor, registering it on the bus.
    pub fn begin_run(&self, actor_id: &ActorId, role: ActorRole, request: &str) -> ActorRun {
        self.bus.register(actor_id);
        let state = ActorState::new(role, request);
        clog!(
            "run {} started: actor={} role={}",
            state.run_id.short(),
            actor_id,
            role
        );
        self.write_behind(actor_id, format!("run {} started", state.run_id));
        ActorRun {
            actor_id: actor_id.clone(),
            state,
        }
    }

    /// Start a run for an assigned task.
    pub fn begin_assigned_run(
        &self,
        actor_id: &ActorId,
        role: ActorRole,
        instruction: &TaskInstruction,
    ) -> ActorRun {
        let mut run = self.begin_run(actor_id, role, &instruction.description);
        run.state = run.state.clone().assigned(
            instruction.task_id.clone(),
            instruction.assigned_by.clone(),
            instruction.priority,
            instruction.due_time,
        );
        run
    }

    /// Advance a run to its context-sensitive next stage.
    ///
    /// Structural failures (illegal transition, invalid state) land the run
    /// in the error stage rather than raising; the returned stage tells the
    /// caller where the run ended up.
    pub fn advance(
        &self,
        run: &mut ActorRun,
        reason: &str,
        updates: Option<StageUpdates>,
    ) -> Result<Stage> {
        let target = run
            .state
            .next_stage()
            .ok_or_else(|| Error::Validation(format!("run in terminal stage {}", run.stage())))?;
        self.transition(run, target, reason, updates)
    }

    /// Transition a run to an explicit target stage.
    pub fn transition(
        &self,
        run: &mut ActorRun,
        target: Stage,
        reason: &str,
        updates: Option<StageUpdates>,
    ) -> Result<Stage> {
        run.state = run.state.transition(target, reason, updates);
        if run.stage() == Stage::Error {
            clog_error!(
                "run {}: entered error stage: {:?}",
                run.state.run_id.short(),
                run.state.diagnostic
            );
        }
        self.write_behind(
            &run.actor_id,
            format!("run {} now in {}", run.state.run_id.short(), run.stage()),
        );
        Ok(run.stage())
    }

    /// Surface an errored run to the user.
    pub fn surface_error(&self, run: &mut ActorRun) -> Result<Stage> {
        self.transition(run, Stage::PresentToUser, "surfacing error diagnosis", None)
    }

    /// Externally cancel a run. Serialized with other transitions by the
    /// `&mut` borrow; never races a concurrent transition on the same run.
    pub fn cancel_run(&self, run: &mut ActorRun, reason: &str) {
        run.state = run.state.cancel(reason);
        clog!(
            "run {} cancelled: {}",
            run.state.run_id.short(),
            reason
        );
        self.write_behind(
            &run.actor_id,
            format!("run {} cancelled: {}", run.state.run_id.short(), reason),
        );
    }

    /// Compute the execution plan for a task set using the configured
    /// effort weights.
    pub fn plan_project(&self, tasks: &[Task]) -> Result<ExecutionPlan> {
        let plan = plan(tasks, &self.config.effort_weights)?;
        clog_debug!(
            "planned {} tasks into {} phases",
            plan.task_count(),
            plan.phase_count()
        );
        Ok(plan)
    }

    /// Route a work item against a roster snapshot and notify the target.
    pub fn dispatch(&self, item: &WorkItem, roster: &ActorRoster) -> Result<RoutingDecision> {
        let decision = route(item, roster, &self.capabilities)?;

        let mut message = Message::new(
            ActorId::from("orchestrator"),
            decision.target.clone(),
            MessageKind::Notification,
            decision.context.summary.clone(),
        )
        .with_priority(decision.priority)
        .with_metadata("routing_reason", serde_json::json!(decision.reason));
        for (key, value) in &decision.context.metadata {
            message = message.with_metadata(key.clone(), serde_json::json!(value));
        }
        self.bus.send(message)?;

        Ok(decision)
    }

    /// Send a task instruction to an actor as a notification.
    pub fn assign_task(
        &self,
        target: &ActorId,
        instruction: &TaskInstruction,
        priority: Priority,
    ) -> Result<()> {
        let message = Message::new(
            instruction.assigned_by.clone(),
            target.clone(),
            MessageKind::Notification,
            format!("task assigned: {}", instruction.name),
        )
        .for_task(instruction.task_id.clone())
        .with_priority(priority)
        .with_metadata("instruction", serde_json::to_value(instruction)?);
        self.bus.send(message)?;
        Ok(())
    }

    /// Package a deliverable for the run's task and transfer it.
    pub fn handoff(
        &self,
        run: &ActorRun,
        target: &ActorId,
        kind: DeliverableKind,
        content: &str,
    ) -> Result<DeliverableId> {
        let task_id = run
            .state
            .meta
            .task_id
            .as_deref()
            .ok_or_else(|| Error::Validation("run has no task to deliver for".to_string()))?;
        let id = self
            .bus
            .transfer_deliverable(&run.actor_id, target, task_id, kind, content)?;
        clog!(
            "run {}: deliverable {} handed to {}",
            run.state.run_id.short(),
            id.short(),
            target
        );
        Ok(id)
    }

    /// Block in the feedback-waiting stage until a task-matching FEEDBACK
    /// message arrives, the configured deadline passes, or the run is
    /// cancelled.
    ///
    /// Only a FEEDBACK-typed message whose task id matches the run triggers
    /// the transition to the feedback-application stage; notifications and
    /// unrelated traffic are left untouched in the inbox. Timeouts surface
    /// as `Error::Timeout`; the orchestrator never silently retries.
    pub async fn await_feedback(&self, run: &mut ActorRun) -> Result<Message> {
        if run.stage() != Stage::AwaitingFeedback {
            return Err(Error::Validation(format!(
                "run is in {}, not awaiting feedback",
                run.stage()
            )));
        }

        let deadline = Instant::now() + self.config.feedback_timeout();

        loop {
            if let Some(message) = self.matching_feedback(run)? {
                self.bus.acknowledge(&run.actor_id, message.id)?;

                let areas = revision_areas_from(&message);
                let updates = StageUpdates::new()
                    .feedback(message.content.clone())
                    .revision_areas(areas);
                self.transition(run, Stage::ApplyingFeedback, "feedback received", Some(updates))?;
                return Ok(message);
            }

            if Instant::now() >= deadline {
                clog_warn!(
                    "run {}: no feedback within {:?}",
                    run.state.run_id.short(),
                    self.config.feedback_timeout()
                );
                return Err(Error::Timeout(self.config.feedback_timeout()));
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.cancel_run(run, "cancelled while awaiting feedback");
                    return Err(Error::Cancelled(
                        "cancelled while awaiting feedback".to_string(),
                    ));
                }
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }

    fn matching_feedback(&self, run: &ActorRun) -> Result<Option<Message>> {
        let messages = self.bus.receive(&run.actor_id)?;
        Ok(messages
            .into_iter()
            .find(|m| m.kind == MessageKind::Feedback && m.task_id == run.state.meta.task_id))
    }

    /// Apply received feedback: classify the revision areas and rewind the
    /// run into the earliest implicated stage.
    ///
    /// Returns every stage the revision implicates so the caller can walk
    /// the remaining ones after reworking the first.
    pub fn apply_feedback(&self, run: &mut ActorRun) -> Result<Vec<Stage>> {
        if run.stage() != Stage::ApplyingFeedback {
            return Err(Error::Validation(format!(
                "run is in {}, not applying feedback",
                run.stage()
            )));
        }

        let feedback = run.state.payload.feedback.clone().unwrap_or_default();
        let areas = run.state.payload.revision_areas.clone();

        let mut stages = self.classifier.classify(&feedback, &areas);
        if self.classifier.should_repackage(&areas, &stages) {
            stages.push(Stage::PackagingDeliverables);
        }

        clog!(
            "run {}: feedback implicates {} stage(s)",
            run.state.run_id.short(),
            stages.len()
        );

        // The machine picks the earliest implicated stage as the rewind
        // point; the rest stay on the caller's worklist.
        self.advance(run, "applying revision", None)?;
        Ok(stages)
    }

    /// Consult the oracle for a technology-stack recommendation.
    ///
    /// Advisory output: when the oracle fails the error is logged and a
    /// conservative default is returned, explicitly marked degraded, so
    /// the run can still make forward progress.
    pub fn advise_stack(&self, run: &ActorRun) -> OracleResult {
        let context = PromptContext::new(
            run.actor_id.clone(),
            run.state.role,
            run.stage(),
            "recommend a technology stack",
        )
        .with_context(
            "requirements",
            run.state
                .payload
                .requirements_analysis
                .clone()
                .unwrap_or_default(),
        );

        match self.oracle.invoke(&context) {
            Ok(result) => result,
            Err(err) => {
                clog_warn!("oracle unavailable, using fallback stack: {}", err);
                OracleResult::degraded(FALLBACK_STACK)
            }
        }
    }

    /// Consult the oracle for a non-advisory output; failures propagate.
    pub fn consult_oracle(&self, context: &PromptContext) -> Result<OracleResult> {
        self.oracle.invoke(context).inspect_err(|err| {
            clog_error!("oracle error: {}", err);
        })
    }

    /// Produce the status-report wire shape for a run.
    pub fn status_report(&self, run: &ActorRun) -> StatusReport {
        let issues = match &run.state.diagnostic {
            Some(diagnostic) => vec![format!("{:?}", diagnostic)],
            None => Vec::new(),
        };
        let achievements = run
            .state
            .history
            .iter()
            .filter(|r| r.outcome == crate::workflow::TransitionOutcome::Applied)
            .map(|r| format!("reached {}", r.to))
            .collect();
        let pending_work = match run.state.next_stage() {
            Some(next) if !run.state.is_finished() => vec![format!("advance to {}", next)],
            _ => Vec::new(),
        };

        StatusReport {
            status_summary: format!("{} ({})", run.stage(), run.state.role),
            current_stage: run.stage(),
            completion_percentage: run.state.completion_percentage(),
            achievements,
            pending_work,
            issues,
        }
    }

    /// Write-behind log; never blocks or fails a transition.
    fn write_behind(&self, actor_id: &ActorId, content: String) {
        if let Some(store) = &self.persistence {
            if let Err(err) = store.store(actor_id, MemoryTier::Working, &content, None) {
                clog_warn!("persistence write-behind failed: {}", err);
            }
        }
    }
}

/// Parse revision areas from a feedback message's metadata.
fn revision_areas_from(message: &Message) -> Vec<String> {
    message
        .metadata
        .get("revision_areas")
        .and_then(|value| value.as_array())
        .map(|areas| {
            areas
                .iter()
                .filter_map(|a| a.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
