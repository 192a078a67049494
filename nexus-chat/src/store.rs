// SQLite-backed `messages` table with a realtime INSERT feed.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::message::{MessageRow, NewMessage};
use crate::protocol::ErrorPayload;

/// Capacity of the INSERT feed. Subscribers that fall further behind than
/// this miss rows (they see `RecvError::Lagged`).
const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{message}: {details}")]
    Rejected { message: String, details: String },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid timestamp in messages table: {value}")]
    Timestamp { value: String },
}

impl StoreError {
    fn rejected(details: &str) -> Self {
        StoreError::Rejected {
            message: "insert rejected".to_string(),
            details: details.to_string(),
        }
    }

    /// Error frame payload for the client that made request `reference`.
    pub fn to_payload(&self, reference: Option<u64>) -> ErrorPayload {
        match self {
            StoreError::Rejected { message, details } => ErrorPayload {
                reference,
                message: message.clone(),
                details: details.clone(),
            },
            other => ErrorPayload {
                reference,
                message: "database error".to_string(),
                details: other.to_string(),
            },
        }
    }
}

/// Persistent chat history plus a broadcast of every successful insert.
pub struct MessageStore {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<MessageRow>,
}

impl MessageStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS messages (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                text       TEXT NOT NULL,
                sender_id  TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);
            ",
        )?;

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            changes,
        })
    }

    /// Panics if the mutex is poisoned (a thread panicked while holding it).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("message store mutex poisoned")
    }

    /// Receive every row inserted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MessageRow> {
        self.changes.subscribe()
    }

    /// Insert a message and notify subscribers. `id` and `created_at` are
    /// assigned by the database.
    pub fn insert(&self, msg: &NewMessage) -> Result<MessageRow, StoreError> {
        if msg.text.trim().is_empty() {
            return Err(StoreError::rejected("text must not be empty"));
        }
        if msg.sender_id.trim().is_empty() {
            return Err(StoreError::rejected("sender_id must not be empty"));
        }

        // The push happens under the connection lock so subscribers see rows
        // in id order.
        let conn = self.conn();
        let row = conn
            .query_row(
                "INSERT INTO messages (text, sender_id) VALUES (?1, ?2)
                 RETURNING id, text, sender_id, created_at",
                params![msg.text, msg.sender_id],
                raw_row,
            )?
            .into_message_row()?;
        debug!("Inserted message {} from {}", row.id, row.sender_id);

        // No subscribers is fine: nobody is listening for realtime pushes.
        let _ = self.changes.send(row.clone());
        drop(conn);
        Ok(row)
    }

    /// The most recent `limit` rows (all rows when `None`), oldest first.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<MessageRow>, StoreError> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, text, sender_id, created_at FROM (
                 SELECT id, text, sender_id, created_at FROM messages
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1
             )
             ORDER BY created_at ASC, id ASC",
        )?;

        let raw = stmt
            .query_map(params![limit], raw_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawRow::into_message_row).collect()
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

/// A row as SQLite returns it, before the timestamp is parsed.
struct RawRow {
    id: i64,
    text: String,
    sender_id: String,
    created_at: String,
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        text: row.get(1)?,
        sender_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl RawRow {
    fn into_message_row(self) -> Result<MessageRow, StoreError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|_| StoreError::Timestamp {
                value: self.created_at.clone(),
            })?
            .with_timezone(&Utc);
        Ok(MessageRow {
            id: self.id,
            text: self.text,
            sender_id: self.sender_id,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn new_msg(text: &str, sender: &str) -> NewMessage {
        NewMessage {
            text: text.into(),
            sender_id: sender.into(),
        }
    }

    #[test]
    fn open_in_memory_starts_empty() {
        let store = MessageStore::open(":memory:").unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.list(None).unwrap().is_empty());
    }

    #[test]
    fn insert_assigns_id_and_timestamp() {
        let store = MessageStore::open(":memory:").unwrap();
        let before = Utc::now() - chrono::Duration::seconds(5);
        let row = store.insert(&new_msg("hello", "user-1")).unwrap();
        assert_eq!(row.id, 1);
        assert_eq!(row.text, "hello");
        assert_eq!(row.sender_id, "user-1");
        assert!(row.created_at > before);
    }

    #[test]
    fn list_is_oldest_first() {
        let store = MessageStore::open(":memory:").unwrap();
        for text in ["one", "two", "three"] {
            store.insert(&new_msg(text, "u")).unwrap();
        }
        let texts: Vec<String> = store.list(None).unwrap().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn list_limit_keeps_most_recent_in_order() {
        let store = MessageStore::open(":memory:").unwrap();
        for i in 1..=5 {
            store.insert(&new_msg(&format!("m{i}"), "u")).unwrap();
        }
        let texts: Vec<String> = store
            .list(Some(2))
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["m4", "m5"]);
    }

    #[test]
    fn blank_text_is_rejected() {
        let store = MessageStore::open(":memory:").unwrap();
        let err = store.insert(&new_msg("   ", "u")).unwrap_err();
        let payload = err.to_payload(Some(7));
        assert_eq!(payload.reference, Some(7));
        assert_eq!(payload.message, "insert rejected");
        assert_eq!(payload.details, "text must not be empty");
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn blank_sender_is_rejected() {
        let store = MessageStore::open(":memory:").unwrap();
        assert!(matches!(
            store.insert(&new_msg("hi", "")),
            Err(StoreError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn subscribers_receive_inserts() {
        let store = MessageStore::open(":memory:").unwrap();
        let mut rx = store.subscribe();
        let row = store.insert(&new_msg("pushed", "u")).unwrap();
        assert_eq!(rx.recv().await.unwrap(), row);
    }

    #[test]
    fn concurrent_inserts_push_in_id_order() {
        let store = MessageStore::open(":memory:").unwrap();
        let mut rx = store.subscribe();

        std::thread::scope(|scope| {
            for t in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..40 {
                        store.insert(&new_msg(&format!("t{t} m{i}"), "u")).unwrap();
                    }
                });
            }
        });

        let mut ids = Vec::new();
        while let Ok(row) = rx.try_recv() {
            ids.push(row.id);
        }
        assert_eq!(ids.len(), 160);
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "pushes out of order: {ids:?}");
    }

    #[test]
    fn insert_without_subscribers_succeeds() {
        let store = MessageStore::open(":memory:").unwrap();
        assert!(store.insert(&new_msg("quiet", "u")).is_ok());
    }

    #[test]
    fn reopening_file_keeps_rows() {
        let path = std::env::temp_dir().join("nexus_store_reopen_test.db");
        let _ = std::fs::remove_file(&path);
        let path_str = path.to_str().unwrap();
        {
            let store = MessageStore::open(path_str).unwrap();
            store.insert(&new_msg("persisted", "u")).unwrap();
        }
        let store = MessageStore::open(path_str).unwrap();
        assert_eq!(store.list(None).unwrap()[0].text, "persisted");
        let _ = std::fs::remove_file(&path);
    }
}
