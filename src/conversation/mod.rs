//! Transcript types and state management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Which backend pipeline produced an assistant reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Concierge,
    Rag,
    System,
    #[serde(untagged)]
    Other(String),
}

impl Source {
    /// Parse the `source` field of a chat reply; empty means no source
    pub fn from_wire(source: Option<&str>) -> Option<Self> {
        match source? {
            "" => None,
            "concierge" => Some(Source::Concierge),
            "rag" => Some(Source::Rag),
            "system" => Some(Source::System),
            other => Some(Source::Other(other.to_string())),
        }
    }

    /// Badge shown above an assistant reply
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Source::Rag => Some("RAG 知识库"),
            Source::System => None,
            Source::Concierge | Source::Other(_) => Some("点餐顾问"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    Message {
        role: Role,
        #[serde(default)]
        source: Option<Source>,
        content: String,
    },
    /// Structured order returned on confirmation; displayed as-is
    OrderCard { order: Value },
    /// Points at a card in the cart model
    RecommendCard { card_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    pub created_at: DateTime<Utc>,
}

impl TranscriptEntry {
    fn new(kind: EntryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            created_at: Utc::now(),
        }
    }
}

/// Everything shown in the chat area, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    /// Replies being waited on (typing indicator)
    pending: u32,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_user(&mut self, content: &str) {
        self.push(EntryKind::Message {
            role: Role::User,
            source: None,
            content: content.to_string(),
        });
    }

    pub fn add_assistant(&mut self, content: &str, source: Option<Source>) {
        self.push(EntryKind::Message {
            role: Role::Assistant,
            source,
            content: content.to_string(),
        });
    }

    pub fn add_system(&mut self, content: &str) {
        self.push(EntryKind::Message {
            role: Role::System,
            source: None,
            content: content.to_string(),
        });
    }

    pub fn add_order_card(&mut self, order: Value) {
        self.push(EntryKind::OrderCard { order });
    }

    pub fn add_recommend_card(&mut self, card_id: Uuid) {
        self.push(EntryKind::RecommendCard { card_id });
    }

    pub fn show_typing(&mut self) {
        self.pending += 1;
    }

    pub fn remove_typing(&mut self) {
        self.pending = self.pending.saturating_sub(1);
    }

    pub fn is_typing(&self) -> bool {
        self.pending > 0
    }

    fn push(&mut self, kind: EntryKind) {
        self.entries.push(TranscriptEntry::new(kind));
    }
}
