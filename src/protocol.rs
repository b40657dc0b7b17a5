//! Stable wire shapes for interop.
//!
//! These structs define the JSON surface other systems depend on; field
//! names are camelCase on the wire and must not drift. The message and
//! deliverable wire shapes live with their types in the bus module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::core::task::{Effort, Task};
use crate::priority::Priority;
use crate::workflow::Stage;

/// Instruction handed to an actor to execute a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInstruction {
    /// Task identifier.
    pub task_id: String,
    /// Task name.
    pub name: String,
    /// What the task should accomplish.
    pub description: String,
    /// Milestone the task belongs to.
    pub milestone_id: String,
    /// Ids of tasks that must complete first.
    pub dependencies: Vec<String>,
    /// Effort estimate.
    pub estimated_effort: Effort,
    /// Assignment priority.
    pub priority: Priority,
    /// Due time, if any (RFC 3339 on the wire).
    pub due_time: Option<DateTime<Utc>>,
    /// Actor that made the assignment.
    pub assigned_by: ActorId,
}

impl TaskInstruction {
    /// Build an instruction from a planned task.
    pub fn from_task(task: &Task, priority: Priority, assigned_by: ActorId) -> Self {
        Self {
            task_id: task.id.0.clone(),
            name: task.name.clone(),
            description: task.description.clone(),
            milestone_id: task.milestone_id.clone(),
            dependencies: task.dependencies.iter().map(|d| d.0.clone()).collect(),
            estimated_effort: task.effort,
            priority,
            due_time: None,
            assigned_by,
        }
    }

    /// Set the due time.
    pub fn due(mut self, due_time: DateTime<Utc>) -> Self {
        self.due_time = Some(due_time);
        self
    }
}

/// Progress report for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// One-line summary of where the run stands.
    pub status_summary: String,
    /// Current workflow stage.
    pub current_stage: Stage,
    /// Percentage of the role's stage sequence passed.
    pub completion_percentage: u8,
    /// What has been achieved so far.
    pub achievements: Vec<String>,
    /// What is still pending.
    pub pending_work: Vec<String>,
    /// Problems worth surfacing.
    pub issues: Vec<String>,
}
