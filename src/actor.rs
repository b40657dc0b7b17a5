//! Actor identity and role model.
//!
//! An actor is an independent role-holder (planner, architect, developer,
//! tester, lead, coordinator) running its own workflow state machine. The
//! roster is a point-in-time snapshot of which actors are available; routing
//! always receives it as an argument so that route selection never races
//! with availability changes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an actor instance.
///
/// Stored as a string so that deployments can use stable, human-readable
/// names ("planner-1") while generated ids fall back to UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    /// Create a new random actor identifier.
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

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Roles an actor can hold.
///
/// The role determines the actor's workflow stage vocabulary and how the
/// router selects it for incoming work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Planner,
    Architect,
    Developer,
    Tester,
    Lead,
    Coordinator,
}

impl ActorRole {
    /// All roles, in a fixed order.
    pub const ALL: [ActorRole; 6] = [
        ActorRole::Planner,
        ActorRole::Architect,
        ActorRole::Developer,
        ActorRole::Tester,
        ActorRole::Lead,
        ActorRole::Coordinator,
    ];
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorRole::Planner => write!(f, "planner"),
            ActorRole::Architect => write!(f, "architect"),
            ActorRole::Developer => write!(f, "developer"),
            ActorRole::Tester => write!(f, "tester"),
            ActorRole::Lead => write!(f, "lead"),
            ActorRole::Coordinator => write!(f, "coordinator"),
        }
    }
}

impl std::str::FromStr for ActorRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "planner" => Ok(ActorRole::Planner),
            "architect" => Ok(ActorRole::Architect),
            "developer" => Ok(ActorRole::Developer),
            "tester" => Ok(ActorRole::Tester),
            "lead" => Ok(ActorRole::Lead),
            "coordinator" => Ok(ActorRole::Coordinator),
            other => Err(crate::Error::Validation(format!(
                "unknown actor role: {}",
                other
            ))),
        }
    }
}

/// One available actor in a roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorEntry {
    /// The actor's identifier.
    pub id: ActorId,
    /// The role this actor holds.
    pub role: ActorRole,
}

impl ActorEntry {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: ActorId(id.into()),
            role,
        }
    }
}

/// Point-in-time snapshot of the available actors.
///
/// The roster is passed by value into routing calls. It is never shared
/// mutable state: availability changes produce a fresh snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRoster {
    entries: Vec<ActorEntry>,
}

impl ActorRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from (id, role) pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = ActorEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Add an actor to the snapshot.
    pub fn add(&mut self, entry: ActorEntry) {
        self.entries.push(entry);
    }

    /// First available actor holding the given role.
    ///
    /// Selection is deterministic: entries keep insertion order, and the
    /// first match wins.
    pub fn actor_for_role(&self, role: ActorRole) -> Option<&ActorEntry> {
        self.entries.iter().find(|e| e.role == role)
    }

    /// Whether any actor with the given role is available.
    pub fn has_role(&self, role: ActorRole) -> bool {
        self.actor_for_role(role).is_some()
    }

    pub fn entries(&self) -> &[ActorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
