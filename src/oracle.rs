//! Reasoning-oracle interface.
//!
//! The oracle is the external collaborator that turns a prompt/context into
//! structured content. The substrate only requires it to be an
//! idempotent-per-call, side-effect-free function of its input; retries are
//! the caller's responsibility. Oracle failures are never masked with
//! fabricated results, but callers may substitute conservative fallback
//! values explicitly marked `degraded`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::actor::{ActorId, ActorRole};
use crate::error::Result;
use crate::workflow::Stage;

/// Prompt plus the run context it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    /// Actor on whose behalf the oracle is consulted.
    pub actor_id: ActorId,
    /// Role of that actor.
    pub role: ActorRole,
    /// Stage the run is in.
    pub stage: Stage,
    /// The prompt itself.
    pub prompt: String,
    /// Additional context entries.
    pub context: BTreeMap<String, String>,
}

impl PromptContext {
    pub fn new(actor_id: ActorId, role: ActorRole, stage: Stage, prompt: &str) -> Self {
        Self {
            actor_id,
            role,
            stage,
            prompt: prompt.to_string(),
            context: BTreeMap::new(),
        }
    }

    /// Attach a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Structured result of an oracle invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResult {
    /// The produced content.
    pub content: String,
    /// True when this is a conservative fallback rather than real oracle
    /// output.
    pub degraded: bool,
}

impl OracleResult {
    /// A genuine oracle answer.
    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            degraded: false,
        }
    }

    /// A conservative fallback value, explicitly marked degraded.
    pub fn degraded(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            degraded: true,
        }
    }
}

/// The external reasoning collaborator.
pub trait ReasoningOracle: Send + Sync {
    /// Turn a prompt context into structured content.
    fn invoke(&self, context: &PromptContext) -> Result<OracleResult>;
}
