//! UI-agnostic transcript types
//!
//! A [`Message`] is created once and never edited. The session appends them
//! to its transcript in the order they were produced.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a transcript entry.
///
/// User messages get a fresh uuid; follow-ups reuse it with a suffix so the
/// reply always names the message it answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Id for the bot reply that answers `self`.
    pub fn reply(&self) -> Self {
        Self(format!("{}_bot", self.0))
    }

    /// Id for the synthesized error entry that answers `self`.
    pub fn error_reply(&self) -> Self {
        Self(format!("{}_error", self.0))
    }

    pub fn is_error_reply(&self) -> bool {
        self.0.ends_with("_error")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

/// A single entry in the conversation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    text: String,
    sender: ChatRole,
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, text, ChatRole::User)
    }

    pub fn bot(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, text, ChatRole::Bot)
    }

    fn new(id: MessageId, text: impl Into<String>, sender: ChatRole) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            timestamp: Local::now(),
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> ChatRole {
        self.sender
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}
