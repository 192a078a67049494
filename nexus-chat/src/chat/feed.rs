// Ordered message feed with optimistic local echo.
//
// Messages are kept in arrival order. A pending echo occupies the slot where
// the user sent it and is replaced in place once the backend confirms it.

use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use crate::message::{sender_label, time_label, ChatMessage, MessageId};

/// One renderable row of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryView {
    pub key: MessageId,
    pub text: String,
    pub is_mine: bool,
    /// `Some("User_xxxx")` on the first message of a run from another sender.
    pub sender_label: Option<String>,
    pub time_label: String,
    pub pending: bool,
}

#[derive(Debug, Default)]
pub struct MessageFeed {
    messages: Vec<ChatMessage>,
    next_local: u64,
    /// Backend id an echo will come back with, when known up front (relay ids
    /// are generated by the sender).
    expected: HashMap<MessageId, u64>,
}

impl MessageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_pending()).count()
    }

    fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }

    fn position_of_local(&self, local: u64) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| m.id == MessageId::Local(local))
    }

    /// Append a message pushed by the backend.
    ///
    /// Returns `false` when nothing changed (the id is already in the feed).
    /// If the id is one we are waiting for, the matching echo is confirmed
    /// instead of appending a second copy.
    pub fn append(&mut self, msg: ChatMessage) -> bool {
        if let Some(local) = self.expected.remove(&msg.id) {
            return self.confirm(local, msg);
        }
        if self.contains(&msg.id) {
            debug!("Ignoring duplicate message {}", msg.id);
            return false;
        }
        self.messages.push(msg);
        true
    }

    /// Replace the feed with backend history (already ordered oldest first).
    /// Echoes still in flight are kept after the history.
    pub fn replace_all(&mut self, history: Vec<ChatMessage>) {
        let pending: Vec<ChatMessage> = self
            .messages
            .drain(..)
            .filter(|m| m.is_pending())
            .collect();
        for msg in history {
            self.append(msg);
        }
        self.messages.extend(pending);
    }

    /// Show `text` immediately as a pending message from `sender_id`.
    ///
    /// `expected` is the id the backend will echo back, if the client chose it.
    pub fn push_pending(
        &mut self,
        text: &str,
        sender_id: &str,
        expected: Option<MessageId>,
    ) -> u64 {
        self.next_local += 1;
        let local = self.next_local;
        self.messages.push(ChatMessage {
            id: MessageId::Local(local),
            text: text.to_string(),
            sender_id: sender_id.to_string(),
            timestamp: Utc::now(),
        });
        if let Some(id) = expected {
            self.expected.insert(id, local);
        }
        local
    }

    /// Swap the echo `local` for the authoritative `msg`.
    ///
    /// If `msg` already reached the feed through another path the echo is
    /// dropped. If the echo is gone, `msg` is appended like any other push.
    pub fn confirm(&mut self, local: u64, msg: ChatMessage) -> bool {
        self.expected.retain(|_, l| *l != local);
        let slot = self.position_of_local(local);
        match slot {
            Some(idx) if self.contains(&msg.id) => {
                self.messages.remove(idx);
                true
            }
            Some(idx) => {
                self.messages[idx] = msg;
                true
            }
            None => self.append(msg),
        }
    }

    /// Remove the echo of a send that failed.
    pub fn discard_pending(&mut self, local: u64) -> bool {
        self.expected.retain(|_, l| *l != local);
        match self.position_of_local(local) {
            Some(idx) => {
                self.messages.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Build the render model as seen by `current_sender`.
    pub fn views(&self, current_sender: Option<&str>) -> Vec<EntryView> {
        self.messages
            .iter()
            .enumerate()
            .map(|(index, msg)| {
                let is_mine = current_sender.is_some_and(|me| me == msg.sender_id);
                let starts_run =
                    index == 0 || self.messages[index - 1].sender_id != msg.sender_id;
                EntryView {
                    key: msg.id.clone(),
                    text: msg.text.clone(),
                    is_mine,
                    sender_label: (!is_mine && starts_run).then(|| sender_label(&msg.sender_id)),
                    time_label: time_label(&msg.timestamp),
                    pending: msg.is_pending(),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
