//! Actor workflow state with stage transition validation.
//!
//! `ActorState` is the per-run state of one actor's workflow. It is only
//! ever changed through [`ActorState::transition`], which is copy-on-write:
//! the input state is untouched and a new state is returned with exactly one
//! appended history entry, including for rejected transitions, so the audit
//! trail captures what was attempted. Illegal transitions and validation
//! failures never panic or raise; they force the new state into the `error`
//! stage with a diagnostic that stays inspectable alongside the original
//! field set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::actor::{ActorId, ActorRole};
use crate::clog_debug;
use crate::error::{Error, Result};
use crate::priority::Priority;

use super::stage::{
    revision_stages_for_area, role_sequence, Field, RequestType, Stage, GLOBAL_REQUIRED,
};

/// Unique identifier for a unit-of-work run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new unique run identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome recorded for one transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The transition was legal and the new stage validated.
    Applied,
    /// The transition was illegal; the state was forced to `error`.
    Rejected,
    /// The transition was legal but the resulting state failed validation.
    Invalid,
}

/// One entry in a run's transition history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Stage the attempt started from.
    pub from: Stage,
    /// Stage the attempt targeted.
    pub to: Stage,
    /// When the attempt happened.
    pub at: DateTime<Utc>,
    /// Caller-supplied reason for the transition.
    pub reason: String,
    /// What became of the attempt.
    pub outcome: TransitionOutcome,
}

/// Diagnostic carried by a state forced into the `error` stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StateDiagnostic {
    /// An attempted transition was not permitted.
    InvalidTransition {
        /// Stage the run was in.
        from: Stage,
        /// Stage the caller tried to reach.
        attempted: Stage,
        /// The caller's stated reason for the attempt.
        reason: String,
    },
    /// The state was missing a field its stage requires.
    MissingField {
        /// Stage whose table was violated.
        stage: Stage,
        /// Name of the absent field.
        field: String,
    },
    /// A declared metadata key held a value of the wrong type.
    WrongFieldType {
        /// Stage the state was in when checked.
        stage: Stage,
        /// Offending key.
        field: String,
        /// Expected JSON type.
        expected: String,
    },
}

/// Stage-specific payload fields.
///
/// Fields are typed and optional; the per-stage required-field table says
/// which must be populated before a stage can be acted upon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagePayload {
    /// The original request / project description.
    pub request: Option<String>,
    /// Output of the requirements-analysis stage.
    pub requirements_analysis: Option<String>,
    /// Classified request kind.
    pub request_type: Option<RequestType>,
    /// Architecture design document.
    pub design_document: Option<String>,
    /// Selected technology stack.
    pub selected_stack: Option<String>,
    /// Generated technical specification.
    pub specification: Option<String>,
    /// Implementation notes / artifact reference.
    pub implementation: Option<String>,
    /// Test report.
    pub test_report: Option<String>,
    /// Ids of packaged deliverables.
    pub deliverables: Option<Vec<String>>,
    /// Feedback text received for the deliverables.
    pub feedback: Option<String>,
    /// Free-text revision-area labels attached to the feedback.
    pub revision_areas: Vec<String>,
}

impl StagePayload {
    /// Whether the given declared field is populated.
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Request => self.request.is_some(),
            Field::RequirementsAnalysis => self.requirements_analysis.is_some(),
            Field::RequestType => self.request_type.is_some(),
            Field::DesignDocument => self.design_document.is_some(),
            Field::SelectedStack => self.selected_stack.is_some(),
            Field::Specification => self.specification.is_some(),
            Field::Implementation => self.implementation.is_some(),
            Field::TestReport => self.test_report.is_some(),
            Field::Deliverables => self.deliverables.as_ref().is_some_and(|d| !d.is_empty()),
            Field::Feedback => self.feedback.is_some(),
        }
    }
}

/// Coordination metadata attached to a run.
///
/// Protected: not reachable through [`StageUpdates`]; the orchestrator sets
/// it at run creation and the machine maintains the waiting flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinationMeta {
    /// Task this run is working on.
    pub task_id: Option<String>,
    /// Actor that assigned the work.
    pub assigned_by: Option<ActorId>,
    /// Priority of the assignment.
    pub priority: Priority,
    /// Due time, if any.
    pub due: Option<DateTime<Utc>>,
    /// True while the run sits in the feedback-waiting stage.
    pub awaiting_feedback: bool,
    /// Advisory keys with declared JSON types, checked by validation.
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Declared advisory metadata keys and their expected JSON types.
const DECLARED_META_KEYS: &[(&str, MetaKind)] = &[
    ("task_id", MetaKind::String),
    ("completion", MetaKind::Number),
    ("notes", MetaKind::String),
    ("degraded", MetaKind::Bool),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaKind {
    String,
    Number,
    Bool,
}

impl MetaKind {
    fn name(&self) -> &'static str {
        match self {
            MetaKind::String => "string",
            MetaKind::Number => "number",
            MetaKind::Bool => "boolean",
        }
    }

    fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            MetaKind::String => value.is_string(),
            MetaKind::Number => value.is_number(),
            MetaKind::Bool => value.is_boolean(),
        }
    }
}

/// Field updates applied during a transition.
///
/// Only payload fields are reachable here; stage, history, and coordination
/// metadata cannot be overwritten through updates.
#[derive(Debug, Clone, Default)]
pub struct StageUpdates {
    request: Option<String>,
    requirements_analysis: Option<String>,
    request_type: Option<RequestType>,
    design_document: Option<String>,
    selected_stack: Option<String>,
    specification: Option<String>,
    implementation: Option<String>,
    test_report: Option<String>,
    deliverables: Option<Vec<String>>,
    feedback: Option<String>,
    revision_areas: Option<Vec<String>>,
}

impl StageUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(mut self, value: impl Into<String>) -> Self {
        self.request = Some(value.into());
        self
    }

    pub fn requirements_analysis(mut self, value: impl Into<String>) -> Self {
        self.requirements_analysis = Some(value.into());
        self
    }

    pub fn request_type(mut self, value: RequestType) -> Self {
        self.request_type = Some(value);
        self
    }

    pub fn design_document(mut self, value: impl Into<String>) -> Self {
        self.design_document = Some(value.into());
        self
    }

    pub fn selected_stack(mut self, value: impl Into<String>) -> Self {
        self.selected_stack = Some(value.into());
        self
    }

    pub fn specification(mut self, value: impl Into<String>) -> Self {
        self.specification = Some(value.into());
        self
    }

    pub fn implementation(mut self, value: impl Into<String>) -> Self {
        self.implementation = Some(value.into());
        self
    }

    pub fn test_report(mut self, value: impl Into<String>) -> Self {
        self.test_report = Some(value.into());
        self
    }

    pub fn deliverables(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.deliverables = Some(ids.into_iter().collect());
        self
    }

    pub fn feedback(mut self, value: impl Into<String>) -> Self {
        self.feedback = Some(value.into());
        self
    }

    pub fn revision_areas(mut self, areas: impl IntoIterator<Item = String>) -> Self {
        self.revision_areas = Some(areas.into_iter().collect());
        self
    }

    fn apply(&self, payload: &mut StagePayload) {
        if let Some(v) = &self.request {
            payload.request = Some(v.clone());
        }
        if let Some(v) = &self.requirements_analysis {
            payload.requirements_analysis = Some(v.clone());
        }
        if let Some(v) = self.request_type {
            payload.request_type = Some(v);
        }
        if let Some(v) = &self.design_document {
            payload.design_document = Some(v.clone());
        }
        if let Some(v) = &self.selected_stack {
            payload.selected_stack = Some(v.clone());
        }
        if let Some(v) = &self.specification {
            payload.specification = Some(v.clone());
        }
        if let Some(v) = &self.implementation {
            payload.implementation = Some(v.clone());
        }
        if let Some(v) = &self.test_report {
            payload.test_report = Some(v.clone());
        }
        if let Some(v) = &self.deliverables {
            payload.deliverables = Some(v.clone());
        }
        if let Some(v) = &self.feedback {
            payload.feedback = Some(v.clone());
        }
        if let Some(v) = &self.revision_areas {
            payload.revision_areas = v.clone();
        }
    }
}

/// Per-run workflow state of one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    /// Identifier of this run.
    pub run_id: RunId,
    /// Role whose stage vocabulary this run follows.
    pub role: ActorRole,
    /// Current stage.
    pub stage: Stage,
    /// Stage-specific payload fields.
    pub payload: StagePayload,
    /// Coordination metadata.
    pub meta: CoordinationMeta,
    /// Full transition history, including rejected attempts.
    pub history: Vec<TransitionRecord>,
    /// Diagnostic set when the run was forced into the error stage.
    pub diagnostic: Option<StateDiagnostic>,
    /// Set when the run was externally cancelled.
    pub cancelled: bool,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
}

impl ActorState {
    /// Create a new run in the `initialized` stage.
    pub fn new(role: ActorRole, request: &str) -> Self {
        Self {
            run_id: RunId::new(),
            role,
            stage: Stage::Initialized,
            payload: StagePayload {
                request: Some(request.to_string()),
                ..Default::default()
            },
            meta: CoordinationMeta::default(),
            history: Vec::new(),
            diagnostic: None,
            cancelled: false,
            created_at: Utc::now(),
        }
    }

    /// Attach assignment metadata at creation time.
    pub fn assigned(
        mut self,
        task_id: impl Into<String>,
        assigned_by: ActorId,
        priority: Priority,
        due: Option<DateTime<Utc>>,
    ) -> Self {
        self.meta.task_id = Some(task_id.into());
        self.meta.assigned_by = Some(assigned_by);
        self.meta.priority = priority;
        self.meta.due = due;
        self
    }

    /// Validate the state against the global and per-stage field tables.
    ///
    /// Checks that every globally required field and every field the
    /// current stage requires is present, and that declared advisory
    /// metadata keys hold values of their declared JSON type.
    pub fn validate(&self) -> Result<()> {
        for field in GLOBAL_REQUIRED.iter().chain(self.stage.required_fields()) {
            if !self.payload.has(*field) {
                return Err(Error::MissingField {
                    stage: self.stage.to_string(),
                    field: field.name().to_string(),
                });
            }
        }

        for (key, kind) in DECLARED_META_KEYS {
            if let Some(value) = self.meta.extra.get(*key) {
                if !kind.matches(value) {
                    return Err(Error::WrongFieldType {
                        stage: self.stage.to_string(),
                        field: (*key).to_string(),
                        expected: kind.name().to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Context-sensitive next stage for this state.
    ///
    /// Classification and feedback-application branch on payload content;
    /// every other stage uses the static successor table for the role.
    pub fn next_stage(&self) -> Option<Stage> {
        match self.stage {
            Stage::ClassifyingRequest => Some(self.classification_successor()),
            Stage::ApplyingFeedback => Some(self.revision_successor()),
            _ => Stage::successor(self.role, self.stage),
        }
    }

    /// Where classification leads, given the classified request type.
    fn classification_successor(&self) -> Stage {
        match self.payload.request_type {
            Some(RequestType::NewProject) => {
                if role_sequence(self.role).contains(&Stage::DecomposingTasks) {
                    Stage::DecomposingTasks
                } else {
                    Stage::PackagingDeliverables
                }
            }
            Some(RequestType::Feedback) => Stage::ApplyingFeedback,
            Some(RequestType::TechnicalQuery) | Some(RequestType::MilestoneDecision) => {
                Stage::PackagingDeliverables
            }
            // Not classified yet: fall back to the static table.
            None => {
                Stage::successor(self.role, self.stage).unwrap_or(Stage::PackagingDeliverables)
            }
        }
    }

    /// Where feedback application leads, given the revision areas.
    ///
    /// The earliest implicated stage of this role's sequence wins; areas
    /// matching no specific stage table mean repackaging. No areas at all
    /// means the feedback needed no rework and the run can finish.
    fn revision_successor(&self) -> Stage {
        if self.payload.revision_areas.is_empty() {
            return Stage::successor(self.role, Stage::ApplyingFeedback)
                .unwrap_or(Stage::Completed);
        }

        let sequence = role_sequence(self.role);
        let mut matched: Vec<Stage> = self
            .payload
            .revision_areas
            .iter()
            .flat_map(|area| revision_stages_for_area(area))
            .filter(|stage| sequence.contains(stage))
            .collect();
        matched.sort();
        matched.dedup();

        matched
            .into_iter()
            .next()
            .unwrap_or(Stage::PackagingDeliverables)
    }

    /// Check whether a transition to the target stage is permitted.
    ///
    /// Legal targets are the context-sensitive next stage, the universal
    /// `error` escape, and a small set of overrides: `clarification` from
    /// any non-initial non-waiting stage, `present_to_user` from any
    /// non-waiting stage, and `analyzing`/`present_to_user` out of `error`.
    /// A transition to the current stage is never implicitly legal.
    pub fn can_transition(&self, target: Stage) -> bool {
        let current = self.stage;
        if target == current {
            return false;
        }
        if self.cancelled {
            // Cancellation forces a terminal stage and nothing else.
            return matches!(target, Stage::Completed | Stage::Error);
        }
        if target == Stage::Error {
            return true;
        }

        match current {
            Stage::Error => matches!(target, Stage::PresentToUser | Stage::Analyzing),
            Stage::Completed => false,
            _ => {
                if target == Stage::Clarification
                    && current != Stage::Initialized
                    && !current.is_waiting()
                {
                    return true;
                }
                if target == Stage::PresentToUser && !current.is_waiting() {
                    return true;
                }
                self.next_stage() == Some(target)
            }
        }
    }

    /// Attempt a transition, returning the resulting state.
    ///
    /// Never mutates `self`. An illegal target produces a state forced into
    /// the `error` stage carrying an invalid-transition diagnostic; a legal
    /// target applies the updates, re-validates, and either lands in the
    /// target stage or, on validation failure, in `error` with the
    /// original field set preserved. Exactly one history entry is appended
    /// in every case.
    pub fn transition(
        &self,
        target: Stage,
        reason: &str,
        updates: Option<StageUpdates>,
    ) -> ActorState {
        let mut next = self.clone();
        let at = Utc::now();

        if !self.can_transition(target) {
            clog_debug!(
                "run {}: rejected transition {} -> {} ({})",
                self.run_id.short(),
                self.stage,
                target,
                reason
            );
            next.history.push(TransitionRecord {
                from: self.stage,
                to: target,
                at,
                reason: reason.to_string(),
                outcome: TransitionOutcome::Rejected,
            });
            next.stage = Stage::Error;
            next.meta.awaiting_feedback = false;
            next.diagnostic = Some(StateDiagnostic::InvalidTransition {
                from: self.stage,
                attempted: target,
                reason: reason.to_string(),
            });
            return next;
        }

        if let Some(updates) = &updates {
            updates.apply(&mut next.payload);
        }
        next.stage = target;
        next.meta.awaiting_feedback = target.is_waiting();

        let outcome = match next.validate() {
            Ok(()) => {
                // Retrying out of the error stage clears the diagnostic;
                // surfacing it (present_to_user) keeps it visible.
                if self.stage == Stage::Error && target == Stage::Analyzing {
                    next.diagnostic = None;
                }
                TransitionOutcome::Applied
            }
            Err(err) => {
                clog_debug!(
                    "run {}: state invalid after {} -> {}: {}",
                    self.run_id.short(),
                    self.stage,
                    target,
                    err
                );
                next.stage = Stage::Error;
                next.meta.awaiting_feedback = false;
                next.diagnostic = Some(match err {
                    Error::MissingField { stage: _, field } => {
                        StateDiagnostic::MissingField {
                            stage: target,
                            field,
                        }
                    }
                    Error::WrongFieldType {
                        stage: _,
                        field,
                        expected,
                    } => StateDiagnostic::WrongFieldType {
                        stage: target,
                        field,
                        expected,
                    },
                    other => StateDiagnostic::InvalidTransition {
                        from: self.stage,
                        attempted: target,
                        reason: other.to_string(),
                    },
                });
                TransitionOutcome::Invalid
            }
        };

        next.history.push(TransitionRecord {
            from: self.stage,
            to: target,
            at,
            reason: reason.to_string(),
            outcome,
        });
        next
    }

    /// Externally cancel the run, forcing it into the terminal stage with
    /// the given reason recorded in history.
    pub fn cancel(&self, reason: &str) -> ActorState {
        if self.stage.is_terminal() {
            return self.clone();
        }
        let mut marked = self.clone();
        marked.cancelled = true;
        marked.transition(Stage::Completed, reason, None)
    }

    /// Whether the run has ended (completed, including by cancellation).
    pub fn is_finished(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Fraction of the role's stage sequence already passed, in percent.
    pub fn completion_percentage(&self) -> u8 {
        let sequence = role_sequence(self.role);
        match sequence.iter().position(|s| *s == self.stage) {
            Some(position) if sequence.len() > 1 => {
                ((position * 100) / (sequence.len() - 1)) as u8
            }
            // Off-sequence stages (error, clarification, present_to_user)
            // report no sequence progress.
            _ => 0,
        }
    }
}
