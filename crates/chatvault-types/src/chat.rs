//! Chat and message types for both storage tiers.
//!
//! Hot-tier rows (`Chat`, `Message`) are mutable while active; cold-tier
//! rows (`ColdChat`, `ColdMessage`) are immutable archival copies with
//! message payloads held only in compressed form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Author of a message.
///
/// Maps to the CHECK constraint in the hot schema:
/// `CHECK (role IN ('user', 'assistant', 'system'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
            ChatRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            "system" => Ok(ChatRole::System),
            other => Err(format!("invalid chat role: '{other}'")),
        }
    }
}

/// Migration state of a hot-tier row.
///
/// Rows flip to `Migrating` for the duration of the hot-to-cold workflow
/// and are invisible to normal reads and writes while in that state. The
/// recovery sweep resolves rows left `Migrating` by a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveState {
    Active,
    Migrating,
}

impl fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveState::Active => write!(f, "active"),
            ArchiveState::Migrating => write!(f, "migrating"),
        }
    }
}

impl FromStr for ArchiveState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ArchiveState::Active),
            "migrating" => Ok(ArchiveState::Migrating),
            other => Err(format!("invalid archive state: '{other}'")),
        }
    }
}

/// An active conversation in the hot tier.
///
/// Owned by exactly one user. A chat lives in exactly one tier at any
/// observable instant; this snapshot carries every column needed to
/// reconstruct the row in the cold tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub chat_id: Uuid,
    pub user_id: i64,
    pub title: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// A `(chat_id, title)` listing entry, as returned by `get_all_chats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: Uuid,
    pub title: String,
}

/// A single message within a hot-tier chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: Uuid,
    pub chat_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// An archived chat in the cold tier.
///
/// Structurally identical to [`Chat`] but self-contained: the archive keeps
/// no foreign key to any user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColdChat {
    pub chat_id: Uuid,
    pub user_id: i64,
    pub title: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// An archived message in the cold tier.
///
/// `role` and `content` are each held only as an independently compressed
/// byte string; the archive never stores plaintext message bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColdMessage {
    pub message_id: Uuid,
    pub chat_id: Uuid,
    pub role_compressed: Vec<u8>,
    pub content_compressed: Vec<u8>,
    pub created_at: DateTime<Utc>,
}
