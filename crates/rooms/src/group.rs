//! Group chats.

use intrachat_protocol::Message;

use crate::{now_iso, now_ms};

/// A group chat. Membership is fixed at creation: the creator followed by
/// the invited keys exactly as given (duplicates kept, existence not
/// checked).
#[derive(Debug, Clone)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub creator: String,
    pub participants: Vec<String>,
    pub created_at: String,
    pub messages: Vec<Message>,
}

impl Group {
    pub(crate) fn new(creator: &str, name: &str, invited: Vec<String>) -> Self {
        let mut participants = Vec::with_capacity(invited.len() + 1);
        participants.push(creator.to_string());
        participants.extend(invited);
        Self {
            id: generate_id(),
            name: name.to_string(),
            creator: creator.to_string(),
            participants,
            created_at: now_iso(),
            messages: Vec::new(),
        }
    }
}

/// `group-<epoch millis>-<random suffix>`; the suffix keeps ids unique
/// when two groups are created within the same millisecond.
fn generate_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("group-{}-{}", now_ms(), &suffix[..8])
}
