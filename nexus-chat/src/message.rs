// Chat message model shared by the client, the relay, and the message store.
//
// The relay and the table carry the same entity in different wire shapes.
// Both are normalised into `ChatMessage` before they reach the feed.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifier of a message in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Client-generated id carried by relay `chat_message` events.
    Relay(String),
    /// Autoincrement row id assigned by the message store.
    Row(i64),
    /// Optimistic local echo that the backend has not confirmed yet.
    Local(u64),
}

impl MessageId {
    /// True for ids that came from (or were confirmed by) the backend.
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, MessageId::Local(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Relay(id) => write!(f, "{id}"),
            MessageId::Row(id) => write!(f, "#{id}"),
            MessageId::Local(n) => write!(f, "local-{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// A chat message as the widget sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub sender_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_pending(&self) -> bool {
        !self.id.is_confirmed()
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Relay shape: the payload of a `chat_message` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMessage {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl RelayMessage {
    /// Build an outgoing relay message with a fresh id and the current time.
    pub fn compose(text: &str, sender_id: &str) -> Self {
        RelayMessage {
            id: short_id(),
            text: text.to_string(),
            sender_id: sender_id.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

impl From<RelayMessage> for ChatMessage {
    fn from(msg: RelayMessage) -> Self {
        // Out-of-range timestamps from a misbehaving peer collapse to the epoch
        // rather than dropping the message.
        let timestamp = DateTime::<Utc>::from_timestamp_millis(msg.timestamp).unwrap_or_default();
        ChatMessage {
            id: MessageId::Relay(msg.id),
            text: msg.text,
            sender_id: msg.sender_id,
            timestamp,
        }
    }
}

/// Table shape: one row of the `messages` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: i64,
    pub text: String,
    pub sender_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: MessageId::Row(row.id),
            text: row.text,
            sender_id: row.sender_id,
            timestamp: row.created_at,
        }
    }
}

/// Payload of an `insert_message` request. The store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub text: String,
    pub sender_id: String,
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// Label shown above another user's message group, e.g. `User_a1b2`.
pub fn sender_label(sender_id: &str) -> String {
    let prefix: String = sender_id.chars().take(4).collect();
    format!("User_{prefix}")
}

/// Local wall-clock time of a message as `HH:MM`.
pub fn time_label(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Short random base-36 identifier (7 characters).
pub fn short_id() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(7);
    for _ in 0..7 {
        out.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
