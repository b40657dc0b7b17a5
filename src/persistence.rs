//! Persistence interface for actor memory.
//!
//! The store is an external collaborator the substrate treats purely as a
//! write-behind log: store failures are logged by the caller and never
//! block a transition. Entries live in one of three tiers mirroring how
//! long they should be retained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::actor::ActorId;
use crate::error::{Error, Result};

/// Retention tier of a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    ShortTerm,
    Working,
    LongTerm,
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryTier::ShortTerm => write!(f, "short_term"),
            MemoryTier::Working => write!(f, "working"),
            MemoryTier::LongTerm => write!(f, "long_term"),
        }
    }
}

/// One stored memory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Actor the entry belongs to.
    pub actor_id: ActorId,
    /// Retention tier.
    pub tier: MemoryTier,
    /// Stored content.
    pub content: String,
    /// Optional metadata.
    pub metadata: BTreeMap<String, String>,
    /// When the entry was stored.
    pub stored_at: DateTime<Utc>,
}

/// The external persistence collaborator.
pub trait Persistence: Send + Sync {
    /// Store content for an actor in a tier.
    fn store(
        &self,
        actor_id: &ActorId,
        tier: MemoryTier,
        content: &str,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Result<()>;

    /// Retrieve entries for an actor and tier, optionally filtered by a
    /// substring query over the content.
    fn retrieve(
        &self,
        actor_id: &ActorId,
        tier: MemoryTier,
        query: Option<&str>,
    ) -> Result<Vec<MemoryEntry>>;
}

/// In-memory store, used as the default collaborator and in tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<Vec<MemoryEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored entries across all actors and tiers.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Persistence for InMemoryStore {
    fn store(
        &self,
        actor_id: &ActorId,
        tier: MemoryTier,
        content: &str,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Result<()> {
        self.entries.lock().unwrap().push(MemoryEntry {
            actor_id: actor_id.clone(),
            tier,
            content: content.to_string(),
            metadata: metadata.unwrap_or_default(),
            stored_at: Utc::now(),
        });
        Ok(())
    }

    fn retrieve(
        &self,
        actor_id: &ActorId,
        tier: MemoryTier,
        query: Option<&str>,
    ) -> Result<Vec<MemoryEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.actor_id == *actor_id && e.tier == tier)
            .filter(|e| query.map_or(true, |q| e.content.contains(q)))
            .cloned()
            .collect())
    }
}

/// File-backed store: one JSON-lines file per actor and tier under a base
/// directory. Appends only; suits the write-behind role.
#[derive(Debug)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Store under `~/.conclave/memory`.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().ok_or(Error::NoHomeDir)?;
        Ok(Self::new(home.join(".conclave").join("memory")))
    }

    fn file_path(&self, actor_id: &ActorId, tier: MemoryTier) -> PathBuf {
        self.base_dir
            .join(actor_id.as_str())
            .join(format!("{}.jsonl", tier))
    }
}

impl Persistence for FileStore {
    fn store(
        &self,
        actor_id: &ActorId,
        tier: MemoryTier,
        content: &str,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Result<()> {
        let entry = MemoryEntry {
            actor_id: actor_id.clone(),
            tier,
            content: content.to_string(),
            metadata: metadata.unwrap_or_default(),
            stored_at: Utc::now(),
        };

        let path = self.file_path(actor_id, tier);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        Ok(())
    }

    fn retrieve(
        &self,
        actor_id: &ActorId,
        tier: MemoryTier,
        query: Option<&str>,
    ) -> Result<Vec<MemoryEntry>> {
        let path = self.file_path(actor_id, tier);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for line in fs::read_to_string(&path)?.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: MemoryEntry = serde_json::from_str(line)?;
            if query.map_or(true, |q| entry.content.contains(q)) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
