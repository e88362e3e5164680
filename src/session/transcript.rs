//! Session transcript
//!
//! Ordered, append-only log of the conversation for one session. Lives only in
//! memory and is never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Greeting every fresh or cleared transcript starts with
pub const GREETING: &str = "Hello 👋 Ask me any business question related to your database.";

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the user
    User,
    /// Message from the assistant
    Assistant,
}

impl Role {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    /// Who said it
    pub role: Role,
    /// What was said
    pub content: String,
    /// When it was appended
    pub created_at: DateTime<Utc>,
}

/// Conversation log of one session
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// Fresh transcript holding only the greeting
    pub fn new() -> Self {
        let mut transcript = Self {
            entries: Vec::with_capacity(8),
        };
        transcript.reset();
        transcript
    }

    /// Append an entry
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role,
            content: content.into(),
            created_at: Utc::now(),
        });
    }

    /// Every entry in conversation order
    pub fn replay(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Discard everything and start over with the greeting
    pub fn reset(&mut self) {
        self.entries.clear();
        self.append(Role::Assistant, GREETING);
    }

    /// Number of entries (never zero)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the transcript has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }
}
