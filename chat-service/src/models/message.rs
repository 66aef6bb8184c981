//! Chat message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Sender::User),
            "bot" => Some(Sender::Bot),
            _ => None,
        }
    }
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub session_id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    pub fn new(input: NewMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: input.session_id,
            content: input.content,
            sender: input.sender,
            timestamp: Utc::now(),
            is_read: false,
        }
    }
}

/// Input for persisting a message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: String,
    pub content: String,
    pub sender: Sender,
}

impl NewMessage {
    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            content: content.into(),
            sender: Sender::User,
        }
    }

    pub fn bot(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            content: content.into(),
            sender: Sender::Bot,
        }
    }
}

/// Row shape of the `messages` table; `sender` is stored as text.
#[derive(Debug, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub session_id: String,
    pub content: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let sender = Sender::from_string(&row.sender)
            .ok_or_else(|| anyhow::anyhow!("Unknown sender '{}' on message {}", row.sender, row.id))?;

        Ok(Self {
            id: row.id,
            session_id: row.session_id,
            content: row.content,
            sender,
            timestamp: row.timestamp,
            is_read: row.is_read,
        })
    }
}
