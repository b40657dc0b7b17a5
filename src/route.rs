//! Work-item routing.
//!
//! `route` decides which actor should handle a unit of work. It is a pure
//! function of the work item, a roster snapshot, and the capability tables:
//! no hidden state, so identical inputs always produce identical decisions.
//! Fallbacks are driven by one declarative substitution table rather than
//! per-kind conditionals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::actor::{ActorId, ActorRole, ActorRoster};
use crate::clog_debug;
use crate::error::{Error, Result};
use crate::priority::Priority;

/// Severity attached to feedback items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Kind of a feedback work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    BugReport,
    FeatureRequest,
    RequirementChange,
}

/// A unit of work to be routed to an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WorkItem {
    /// Fresh work that needs decomposition and planning.
    NewWork {
        name: String,
        description: String,
    },
    /// Feedback on produced work.
    Feedback {
        feedback: FeedbackKind,
        severity: Severity,
        summary: String,
    },
    /// A technical question looking for the right specialist.
    TechnicalQuery { query: String },
    /// A decision about a milestone.
    MilestoneDecision {
        milestone_id: String,
        summary: String,
    },
    /// Something is on fire.
    Emergency { summary: String },
}

impl WorkItem {
    /// Priority precedence, highest first: emergency, critical-severity
    /// feedback, milestone decisions, new work, everything else.
    pub fn priority(&self) -> Priority {
        match self {
            WorkItem::Emergency { .. } => Priority::Emergency,
            WorkItem::Feedback {
                severity: Severity::Critical,
                ..
            } => Priority::Critical,
            WorkItem::MilestoneDecision { .. } => Priority::Urgent,
            WorkItem::NewWork { .. } => Priority::High,
            _ => Priority::Medium,
        }
    }

    /// One-line summary for the context bundle.
    fn summary(&self) -> String {
        match self {
            WorkItem::NewWork { name, .. } => format!("new work: {}", name),
            WorkItem::Feedback { summary, .. } => format!("feedback: {}", summary),
            WorkItem::TechnicalQuery { query } => format!("technical query: {}", query),
            WorkItem::MilestoneDecision { summary, .. } => {
                format!("milestone decision: {}", summary)
            }
            WorkItem::Emergency { summary } => format!("emergency: {}", summary),
        }
    }
}

/// Request/task metadata the routed actor needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    /// One-line description of the work.
    pub summary: String,
    /// Kind-specific details.
    pub metadata: BTreeMap<String, String>,
}

/// The outcome of one routing call. Ephemeral: produced per call, not
/// persisted anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Actor selected to handle the work.
    pub target: ActorId,
    /// The role that actor holds.
    pub role: ActorRole,
    /// Human-readable routing reason.
    pub reason: String,
    /// Priority assigned to the work.
    pub priority: Priority,
    /// Metadata bundle for the target.
    pub context: ContextBundle,
}

/// Keyword tables used to refine technical-query routing.
///
/// Kept as data so the classification can be tuned (or replaced) without
/// touching the resolution algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Per-role keyword lists, checked in order.
    pub keywords: Vec<(ActorRole, Vec<String>)>,
}

impl Default for Capabilities {
    fn default() -> Self {
        let list = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            keywords: vec![
                (
                    ActorRole::Architect,
                    list(&["architecture", "design", "pattern", "structure", "scalability"]),
                ),
                (
                    ActorRole::Developer,
                    list(&["implement", "code", "function", "api", "refactor", "library"]),
                ),
                (
                    ActorRole::Tester,
                    list(&["test", "coverage", "regression", "verify", "qa"]),
                ),
            ],
        }
    }
}

impl Capabilities {
    /// Classify a technical query to a specialist role, if any keyword
    /// table matches. Tables are checked in declaration order.
    pub fn classify_query(&self, query: &str) -> Option<ActorRole> {
        let lower = query.to_lowercase();
        self.keywords
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w.as_str())))
            .map(|(role, _)| *role)
    }
}

/// Declarative substitution table: role -> ordered fallback roles.
fn substitutes(role: ActorRole) -> &'static [ActorRole] {
    match role {
        ActorRole::Planner => &[ActorRole::Lead],
        _ => &[],
    }
}

/// Preferred role for a work item, before availability is considered.
fn preferred_role(item: &WorkItem, capabilities: &Capabilities) -> Option<ActorRole> {
    match item {
        WorkItem::NewWork { .. } => Some(ActorRole::Planner),
        WorkItem::Emergency { .. } => Some(ActorRole::Lead),
        WorkItem::MilestoneDecision { .. } => Some(ActorRole::Lead),
        WorkItem::Feedback {
            feedback, severity, ..
        } => Some(match feedback {
            FeedbackKind::BugReport if *severity == Severity::Critical => ActorRole::Lead,
            FeedbackKind::BugReport => ActorRole::Tester,
            FeedbackKind::FeatureRequest => ActorRole::Architect,
            FeedbackKind::RequirementChange => ActorRole::Planner,
        }),
        WorkItem::TechnicalQuery { query } => capabilities.classify_query(query),
    }
}

/// Select a target actor for a work item.
///
/// Resolution order: the kind's preferred role, then that role's declared
/// substitutes, then the lead role as the universal default. If even the
/// lead is unavailable the call fails with `NoRoute` rather than guessing.
pub fn route(
    item: &WorkItem,
    roster: &ActorRoster,
    capabilities: &Capabilities,
) -> Result<RoutingDecision> {
    let priority = item.priority();
    let preferred = preferred_role(item, capabilities);

    let (entry, reason) = resolve(preferred, roster).ok_or_else(|| {
        Error::NoRoute(format!(
            "{} (lead unavailable, no substitute resolves)",
            item.summary()
        ))
    })?;

    clog_debug!(
        "route: {} -> {} ({}) [{}]",
        item.summary(),
        entry.id,
        entry.role,
        reason
    );

    Ok(RoutingDecision {
        target: entry.id.clone(),
        role: entry.role,
        reason,
        priority,
        context: context_bundle(item),
    })
}

fn resolve(
    preferred: Option<ActorRole>,
    roster: &ActorRoster,
) -> Option<(&crate::actor::ActorEntry, String)> {
    if let Some(role) = preferred {
        if let Some(entry) = roster.actor_for_role(role) {
            return Some((entry, format!("{} role handles this item kind", role)));
        }
        for fallback in substitutes(role) {
            if let Some(entry) = roster.actor_for_role(*fallback) {
                return Some((
                    entry,
                    format!("{} unavailable, fell back to {}", role, fallback),
                ));
            }
        }
    }

    let reason = match preferred {
        Some(role) => format!("{} unavailable, defaulted to lead", role),
        None => "no specialist matched, defaulted to lead".to_string(),
    };
    roster
        .actor_for_role(ActorRole::Lead)
        .map(|entry| (entry, reason))
}

fn context_bundle(item: &WorkItem) -> ContextBundle {
    let mut metadata = BTreeMap::new();
    match item {
        WorkItem::NewWork { name, description } => {
            metadata.insert("name".to_string(), name.clone());
            metadata.insert("description".to_string(), description.clone());
        }
        WorkItem::Feedback {
            feedback, severity, ..
        } => {
            metadata.insert("feedback_kind".to_string(), format!("{:?}", feedback));
            metadata.insert("severity".to_string(), format!("{:?}", severity));
        }
        WorkItem::TechnicalQuery { query } => {
            metadata.insert("query".to_string(), query.clone());
        }
        WorkItem::MilestoneDecision { milestone_id, .. } => {
            metadata.insert("milestone_id".to_string(), milestone_id.clone());
        }
        WorkItem::Emergency { .. } => {}
    }
    ContextBundle {
        summary: item.summary(),
        metadata,
    }
}
