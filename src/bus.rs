//! Inter-actor message bus.
//!
//! Actors never read each other's in-memory state; everything they exchange
//! goes through this bus. Each registered actor owns an inbox guarded by its
//! own mutex, so deliveries to one actor serialize while independent inboxes
//! proceed in parallel. Messages are never deleted: acknowledgment only
//! flags them, which keeps the full traffic available for audit and replay.
//! Deliverables are stored append-only next to the inboxes; a revision is a
//! new deliverable, not a mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::actor::ActorId;
use crate::clog_debug;
use crate::error::{Error, Result};
use crate::priority::Priority;

/// Unique identifier for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliverableId(pub Uuid);

impl DeliverableId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for DeliverableId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeliverableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Notification,
    Feedback,
    DeliverableTransfer,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Notification => write!(f, "NOTIFICATION"),
            MessageKind::Feedback => write!(f, "FEEDBACK"),
            MessageKind::DeliverableTransfer => write!(f, "DELIVERABLE_TRANSFER"),
        }
    }
}

/// A message between two actors.
///
/// Immutable after creation except for the acknowledged flag, which moves
/// false -> true exactly once. The serde shape is the stable wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message id.
    pub id: MessageId,
    /// Sending actor.
    pub source_actor_id: ActorId,
    /// Receiving actor.
    pub target_actor_id: ActorId,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Task this message concerns, if any.
    pub task_id: Option<String>,
    /// Priority of the message.
    pub priority: Priority,
    /// Content payload.
    pub content: String,
    /// Structured metadata attached to the message.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// When the message was created (RFC 3339 on the wire).
    pub timestamp: DateTime<Utc>,
    /// Whether the target has acknowledged the message.
    pub acknowledged: bool,
}

impl Message {
    /// Create a new unacknowledged message.
    pub fn new(
        source: ActorId,
        target: ActorId,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            source_actor_id: source,
            target_actor_id: target,
            kind,
            task_id: None,
            priority: Priority::default(),
            content: content.into(),
            metadata: BTreeMap::new(),
            timestamp: Utc::now(),
            acknowledged: false,
        }
    }

    /// Set the task id this message concerns.
    pub fn for_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Set the message priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Kind of a deliverable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliverableKind {
    Design,
    Documentation,
    Code,
    Other,
}

impl std::fmt::Display for DeliverableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliverableKind::Design => write!(f, "DESIGN"),
            DeliverableKind::Documentation => write!(f, "DOCUMENTATION"),
            DeliverableKind::Code => write!(f, "CODE"),
            DeliverableKind::Other => write!(f, "OTHER"),
        }
    }
}

/// An immutable artifact handed from one actor to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    /// Unique deliverable id.
    pub id: DeliverableId,
    /// Deliverable kind.
    #[serde(rename = "type")]
    pub kind: DeliverableKind,
    /// Producing actor.
    pub source_actor_id: ActorId,
    /// Receiving actor.
    pub target_actor_id: ActorId,
    /// Task the deliverable belongs to.
    pub task_id: String,
    /// Content payload.
    pub content: String,
    /// When the deliverable was created.
    pub created_at: DateTime<Utc>,
}

/// One actor's inbox. Guarded by its own mutex so deliveries to different
/// actors never contend.
#[derive(Debug, Default)]
struct Inbox {
    messages: Vec<Message>,
}

/// The shared message bus.
///
/// Constructed explicitly and injected into every component that needs it;
/// there is no global instance.
#[derive(Debug, Default)]
pub struct MessageBus {
    inboxes: RwLock<HashMap<ActorId, Arc<Mutex<Inbox>>>>,
    deliverables: Mutex<Vec<Deliverable>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor, creating its inbox.
    ///
    /// Registering twice is a no-op; the existing inbox is kept.
    pub fn register(&self, actor_id: &ActorId) {
        let mut inboxes = self.inboxes.write().unwrap();
        inboxes
            .entry(actor_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Inbox::default())));
        clog_debug!("bus: registered actor {}", actor_id);
    }

    /// Whether an actor has an inbox.
    pub fn is_registered(&self, actor_id: &ActorId) -> bool {
        self.inboxes.read().unwrap().contains_key(actor_id)
    }

    fn inbox(&self, actor_id: &ActorId) -> Result<Arc<Mutex<Inbox>>> {
        self.inboxes
            .read()
            .unwrap()
            .get(actor_id)
            .cloned()
            .ok_or_else(|| Error::ActorNotRegistered(actor_id.0.clone()))
    }

    /// Deliver a message to its target's inbox.
    ///
    /// Messages to a given target are observed in send order; there is no
    /// ordering guarantee across targets.
    pub fn send(&self, message: Message) -> Result<MessageId> {
        let inbox = self.inbox(&message.target_actor_id)?;
        let id = message.id;
        clog_debug!(
            "bus: {} -> {} [{}] msg {}",
            message.source_actor_id,
            message.target_actor_id,
            message.kind,
            id.short()
        );
        inbox.lock().unwrap().messages.push(message);
        Ok(id)
    }

    /// Non-destructive read of an actor's unacknowledged messages, in send
    /// order.
    pub fn receive(&self, actor_id: &ActorId) -> Result<Vec<Message>> {
        let inbox = self.inbox(actor_id)?;
        let inbox = inbox.lock().unwrap();
        Ok(inbox
            .messages
            .iter()
            .filter(|m| !m.acknowledged)
            .cloned()
            .collect())
    }

    /// Acknowledge a message.
    ///
    /// Idempotent: acknowledging an already-acknowledged message is a
    /// no-op, not an error. Acknowledging a message that was never
    /// delivered to this actor is an error.
    pub fn acknowledge(&self, actor_id: &ActorId, message_id: MessageId) -> Result<()> {
        let inbox = self.inbox(actor_id)?;
        let mut inbox = inbox.lock().unwrap();
        let message = inbox
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "message {} not found in inbox of {}",
                    message_id, actor_id
                ))
            })?;
        message.acknowledged = true;
        Ok(())
    }

    /// Create a deliverable and hand it to the target actor wrapped in a
    /// DELIVERABLE_TRANSFER message.
    pub fn transfer_deliverable(
        &self,
        source: &ActorId,
        target: &ActorId,
        task_id: &str,
        kind: DeliverableKind,
        content: &str,
    ) -> Result<DeliverableId> {
        // Fail before appending if the target has no inbox.
        let _ = self.inbox(target)?;

        let deliverable = Deliverable {
            id: DeliverableId::new(),
            kind,
            source_actor_id: source.clone(),
            target_actor_id: target.clone(),
            task_id: task_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let id = deliverable.id;

        self.deliverables.lock().unwrap().push(deliverable);

        let message = Message::new(
            source.clone(),
            target.clone(),
            MessageKind::DeliverableTransfer,
            format!("deliverable {} ({})", id.short(), kind),
        )
        .for_task(task_id)
        .with_metadata("deliverable_id", serde_json::json!(id.0.to_string()))
        .with_metadata("deliverable_kind", serde_json::json!(kind.to_string()));
        self.send(message)?;

        Ok(id)
    }

    /// Fetch a deliverable by id.
    pub fn deliverable(&self, id: DeliverableId) -> Option<Deliverable> {
        self.deliverables
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    /// All deliverables recorded for a task, in creation order.
    pub fn deliverables_for_task(&self, task_id: &str) -> Vec<Deliverable> {
        self.deliverables
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.task_id == task_id)
            .cloned()
            .collect()
    }

    /// Total messages ever delivered to an actor, acknowledged or not.
    /// Supports audit: nothing is deleted.
    pub fn message_count(&self, actor_id: &ActorId) -> Result<usize> {
        let inbox = self.inbox(actor_id)?;
        let inbox = inbox.lock().unwrap();
        Ok(inbox.messages.len())
    }
}
