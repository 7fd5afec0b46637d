//! Conversation and group store.
//!
//! Owns every direct conversation (keyed by the deterministic pair id),
//! every group (keyed by a generated id), and their message histories.
//! Message ids and timestamps are assigned here so that ordering is a
//! property of the store, not of the callers.

pub mod conversation;
pub mod group;

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{SecondsFormat, Utc};

use intrachat_protocol::{Message, ParticipantRef};

pub use crate::{
    conversation::{DirectConversation, direct_id},
    group::Group,
};

/// Store lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomsError {
    #[error("no conversation or group with id `{0}`")]
    NotFound(String),
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// RFC 3339 timestamp with millisecond precision (same shape as JS
/// `toISOString`).
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ── Store ────────────────────────────────────────────────────────────────────

/// In-memory conversation/group store.
///
/// Message ids come from a process-wide counter seeded with the epoch
/// millis at construction: unique and strictly increasing for the lifetime
/// of the process.
#[derive(Debug)]
pub struct Rooms {
    directs: HashMap<String, DirectConversation>,
    groups: HashMap<String, Group>,
    next_message_id: AtomicU64,
}

impl Default for Rooms {
    fn default() -> Self {
        Self::new()
    }
}

impl Rooms {
    pub fn new() -> Self {
        Self {
            directs: HashMap::new(),
            groups: HashMap::new(),
            next_message_id: AtomicU64::new(now_ms()),
        }
    }

    /// Build a message with a server-assigned id and timestamp.
    pub fn compose_message(&self, sender: ParticipantRef, content: String) -> Message {
        Message {
            id: self.next_message_id.fetch_add(1, Ordering::Relaxed).to_string(),
            sender,
            content,
            timestamp: now_iso(),
        }
    }

    // ── Direct conversations ─────────────────────────────────────────────

    /// Fetch the conversation for an unordered cpf pair, creating it on
    /// first use. Idempotent: (a, b) and (b, a) resolve to the same entity.
    pub fn get_or_create_direct(&mut self, a: &str, b: &str) -> &DirectConversation {
        let id = direct_id(a, b);
        self.directs
            .entry(id.clone())
            .or_insert_with(|| DirectConversation::new(id, a, b))
    }

    pub fn direct(&self, id: &str) -> Option<&DirectConversation> {
        self.directs.get(id)
    }

    pub fn append_direct(&mut self, id: &str, message: Message) -> Result<(), RoomsError> {
        let conversation = self
            .directs
            .get_mut(id)
            .ok_or_else(|| RoomsError::NotFound(id.to_string()))?;
        conversation.messages.push(message);
        Ok(())
    }

    // ── Groups ───────────────────────────────────────────────────────────

    /// Create a group. The participant list is `[creator] + participants`
    /// verbatim: no dedup, no account validation (caller's responsibility).
    pub fn create_group(
        &mut self,
        creator: &str,
        name: &str,
        participants: Vec<String>,
    ) -> &Group {
        let group = Group::new(creator, name, participants);
        tracing::debug!(group_id = %group.id, name = %group.name, "group created");
        self.groups.entry(group.id.clone()).or_insert(group)
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn append_group(&mut self, id: &str, message: Message) -> Result<(), RoomsError> {
        let group = self
            .groups
            .get_mut(id)
            .ok_or_else(|| RoomsError::NotFound(id.to_string()))?;
        group.messages.push(message);
        Ok(())
    }
}
