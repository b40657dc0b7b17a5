//! Stage vocabulary for actor workflows.
//!
//! Every actor role walks a fixed sequence of stages built on the shared
//! skeleton `initialized -> analyzing -> <role body> ->
//! packaging_deliverables -> awaiting_feedback -> applying_feedback ->
//! completed`. The tables in this module declare, per stage, which payload
//! fields must be present before the stage may be acted upon, and which
//! earlier stage a free-text revision area maps back to.

use crate::actor::ActorRole;
use serde::{Deserialize, Serialize};

/// A named point in an actor's workflow.
///
/// The derive order follows the pipeline, so `Ord` sorts stages by their
/// position in the shared skeleton.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Run created, nothing analyzed yet.
    Initialized,
    /// Requirements analysis of the incoming request.
    Analyzing,
    /// Classify the request kind to pick the right body path.
    ClassifyingRequest,
    /// Decompose the plan into atomic tasks.
    DecomposingTasks,
    /// Produce the architecture design document.
    DesigningArchitecture,
    /// Select the technology stack.
    SelectingStack,
    /// Generate the technical specification.
    GeneratingSpecification,
    /// Implement against the specification.
    Implementing,
    /// Exercise the implementation.
    Testing,
    /// Bundle artifacts into deliverables.
    PackagingDeliverables,
    /// Block until feedback for the packaged deliverables arrives.
    AwaitingFeedback,
    /// Fold received feedback back into earlier stages.
    ApplyingFeedback,
    /// Ask the requester a clarification question.
    Clarification,
    /// Surface results (or an error diagnosis) to the user.
    PresentToUser,
    /// Terminal: the run is finished.
    Completed,
    /// Universal escape stage; carries a diagnostic.
    Error,
}

impl Stage {
    /// Whether the run may legitimately stall in this stage.
    pub fn is_waiting(&self) -> bool {
        matches!(self, Stage::AwaitingFeedback)
    }

    /// Whether the stage ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed)
    }

    /// Payload fields that must be present to act in this stage, beyond
    /// the globally required ones.
    pub fn required_fields(&self) -> &'static [Field] {
        match self {
            Stage::Initialized => &[],
            Stage::Analyzing => &[],
            Stage::ClassifyingRequest => &[Field::RequirementsAnalysis],
            Stage::DecomposingTasks => &[Field::RequirementsAnalysis, Field::RequestType],
            Stage::DesigningArchitecture => &[Field::RequirementsAnalysis],
            Stage::SelectingStack => &[Field::RequirementsAnalysis, Field::DesignDocument],
            Stage::GeneratingSpecification => &[Field::DesignDocument, Field::SelectedStack],
            Stage::Implementing => &[Field::RequirementsAnalysis],
            Stage::Testing => &[Field::Implementation],
            Stage::PackagingDeliverables => &[],
            Stage::AwaitingFeedback => &[Field::Deliverables],
            Stage::ApplyingFeedback => &[Field::Feedback],
            Stage::Clarification => &[],
            Stage::PresentToUser => &[],
            Stage::Completed => &[],
            // Error states stay inspectable no matter how malformed.
            Stage::Error => &[],
        }
    }

    /// Statically declared successor for a role, ignoring context.
    ///
    /// Returns `None` for stages outside the role's sequence and for the
    /// terminal stage.
    pub fn successor(role: ActorRole, stage: Stage) -> Option<Stage> {
        let sequence = role_sequence(role);
        let position = sequence.iter().position(|s| *s == stage)?;
        sequence.get(position + 1).copied()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Initialized => "initialized",
            Stage::Analyzing => "analyzing",
            Stage::ClassifyingRequest => "classifying_request",
            Stage::DecomposingTasks => "decomposing_tasks",
            Stage::DesigningArchitecture => "designing_architecture",
            Stage::SelectingStack => "selecting_stack",
            Stage::GeneratingSpecification => "generating_specification",
            Stage::Implementing => "implementing",
            Stage::Testing => "testing",
            Stage::PackagingDeliverables => "packaging_deliverables",
            Stage::AwaitingFeedback => "awaiting_feedback",
            Stage::ApplyingFeedback => "applying_feedback",
            Stage::Clarification => "clarification",
            Stage::PresentToUser => "present_to_user",
            Stage::Completed => "completed",
            Stage::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Fixed stage sequence for a role.
pub fn role_sequence(role: ActorRole) -> &'static [Stage] {
    match role {
        ActorRole::Planner | ActorRole::Coordinator => &[
            Stage::Initialized,
            Stage::Analyzing,
            Stage::ClassifyingRequest,
            Stage::DecomposingTasks,
            Stage::PackagingDeliverables,
            Stage::AwaitingFeedback,
            Stage::ApplyingFeedback,
            Stage::Completed,
        ],
        ActorRole::Architect => &[
            Stage::Initialized,
            Stage::Analyzing,
            Stage::DesigningArchitecture,
            Stage::SelectingStack,
            Stage::GeneratingSpecification,
            Stage::PackagingDeliverables,
            Stage::AwaitingFeedback,
            Stage::ApplyingFeedback,
            Stage::Completed,
        ],
        ActorRole::Developer => &[
            Stage::Initialized,
            Stage::Analyzing,
            Stage::Implementing,
            Stage::PackagingDeliverables,
            Stage::AwaitingFeedback,
            Stage::ApplyingFeedback,
            Stage::Completed,
        ],
        ActorRole::Tester => &[
            Stage::Initialized,
            Stage::Analyzing,
            Stage::Testing,
            Stage::PackagingDeliverables,
            Stage::AwaitingFeedback,
            Stage::ApplyingFeedback,
            Stage::Completed,
        ],
        ActorRole::Lead => &[
            Stage::Initialized,
            Stage::Analyzing,
            Stage::ClassifyingRequest,
            Stage::PackagingDeliverables,
            Stage::AwaitingFeedback,
            Stage::ApplyingFeedback,
            Stage::Completed,
        ],
    }
}

/// Typed payload fields a stage can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Request,
    RequirementsAnalysis,
    RequestType,
    DesignDocument,
    SelectedStack,
    Specification,
    Implementation,
    TestReport,
    Deliverables,
    Feedback,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Request => "request",
            Field::RequirementsAnalysis => "requirements_analysis",
            Field::RequestType => "request_type",
            Field::DesignDocument => "design_document",
            Field::SelectedStack => "selected_stack",
            Field::Specification => "specification",
            Field::Implementation => "implementation",
            Field::TestReport => "test_report",
            Field::Deliverables => "deliverables",
            Field::Feedback => "feedback",
        }
    }
}

/// Fields required on every state regardless of stage.
pub const GLOBAL_REQUIRED: &[Field] = &[Field::Request];

/// Classified kind of an incoming request.
///
/// The classification stage branches on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    NewProject,
    TechnicalQuery,
    MilestoneDecision,
    Feedback,
}

/// Stages a free-text revision area maps back to.
///
/// Keyword containment against a fixed vocabulary; an area mentioning
/// several vocabularies implicates several stages, and the caller applies
/// all of them.
pub fn revision_stages_for_area(area: &str) -> Vec<Stage> {
    let lower = area.to_lowercase();
    let mut stages = Vec::new();

    if contains_any(&lower, &["architecture", "design"]) {
        stages.push(Stage::DesigningArchitecture);
    }
    if contains_any(&lower, &["tech", "technology", "stack"]) {
        stages.push(Stage::SelectingStack);
    }
    if contains_any(&lower, &["requirement", "scope"]) {
        stages.push(Stage::Analyzing);
    }
    if contains_any(&lower, &["spec"]) {
        stages.push(Stage::GeneratingSpecification);
    }

    stages
}

/// Whether an area asks for repackaging rather than content rework.
pub fn is_packaging_area(area: &str) -> bool {
    let lower = area.to_lowercase();
    contains_any(&lower, &["format", "package"])
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
