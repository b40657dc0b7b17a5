//! Task data model for the execution planner.
//!
//! Tasks are the atomic units of work produced by decomposing a project
//! plan. Each task carries its milestone, ordered dependencies, an effort
//! estimate, and a hint about which actor role should execute it.

use crate::actor::ActorRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task within a project.
///
/// Stored as a string: generated ids are UUID v4 strings, but callers may
/// supply stable ids ("t1") so that plans stay reproducible across runs.
/// The `Ord` impl is what breaks ties deterministically during planning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new random task identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Return first 8 characters for display.
    pub fn short(&self) -> String {
        self.0.chars().take(8).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Estimated effort for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    #[default]
    Medium,
    High,
}

impl Effort {
    /// Weight of this effort level under the given weight table.
    pub fn weight(&self, weights: &EffortWeights) -> u32 {
        match self {
            Effort::Low => weights.low,
            Effort::Medium => weights.medium,
            Effort::High => weights.high,
        }
    }
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effort::Low => write!(f, "low"),
            Effort::Medium => write!(f, "medium"),
            Effort::High => write!(f, "high"),
        }
    }
}

/// Overridable weights for critical-path computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortWeights {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl Default for EffortWeights {
    fn default() -> Self {
        Self {
            low: 1,
            medium: 2,
            high: 3,
        }
    }
}

/// A single task in a project plan.
///
/// Tasks are immutable once created; execution status is held externally
/// by whoever runs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task.
    pub id: TaskId,
    /// Human-readable name for the task.
    pub name: String,
    /// Detailed description of what the task should accomplish.
    pub description: String,
    /// Identifier of the milestone this task belongs to.
    pub milestone_id: String,
    /// Ordered list of task ids this task depends on.
    pub dependencies: Vec<TaskId>,
    /// Estimated effort.
    pub effort: Effort,
    /// Role hint for which actor should pick the task up.
    pub role_hint: Option<ActorRole>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with a generated id and no dependencies.
    pub fn new(name: &str, description: &str, milestone_id: &str) -> Self {
        Self {
            id: TaskId::generate(),
            name: name.to_string(),
            description: description.to_string(),
            milestone_id: milestone_id.to_string(),
            dependencies: Vec::new(),
            effort: Effort::default(),
            role_hint: None,
            created_at: Utc::now(),
        }
    }

    /// Replace the generated id with a caller-supplied one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = TaskId(id.into());
        self
    }

    /// Add dependencies on the given task ids.
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    /// Set the effort estimate.
    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self
    }

    /// Set the suitable-role hint.
    pub fn with_role_hint(mut self, role: ActorRole) -> Self {
        self.role_hint = Some(role);
        self
    }
}
