//! Priority levels shared by messages, coordination metadata, and routing.

use serde::{Deserialize, Serialize};

/// Priority of a message, task assignment, or routed work item.
///
/// The derive order gives the total order used for precedence decisions:
/// `Low < Medium < High < Urgent < Critical < Emergency`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
    Critical,
    Emergency,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
            Priority::Critical => write!(f, "critical"),
            Priority::Emergency => write!(f, "emergency"),
        }
    }
}
