// Wire frames exchanged with the relay, plus the in-process messages passed
// between the backend adapters, the app loop and the TUI.
//
// Every frame is a JSON text message of the form
// `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::widget::WidgetView;
use crate::message::{ChatMessage, MessageRow, NewMessage, RelayMessage};

/// Topic a table client subscribes to for INSERT pushes.
pub const MESSAGES_TOPIC: &str = "public:messages";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {source}")]
    Malformed {
        #[from]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Relay channel: broadcast this message to every connected client.
    ChatMessage(RelayMessage),
    /// Table channel: fetch all rows, oldest first.
    SelectMessages,
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    /// Table channel: insert a row. `ref` comes back on the ack or error.
    InsertMessage(InsertRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertRequest {
    #[serde(rename = "ref")]
    pub reference: u64,
    #[serde(flatten)]
    pub message: NewMessage,
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent once after the handshake with the socket id assigned to the client.
    Connect { sid: String },
    ChatMessage(RelayMessage),
    /// Reply to `select_messages`.
    Messages(Vec<MessageRow>),
    PostgresChanges(ChangePayload),
    InsertAck {
        #[serde(rename = "ref")]
        reference: u64,
        row: MessageRow,
    },
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
}

/// Realtime change notification for a subscribed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePayload {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    pub new: MessageRow,
}

impl ChangePayload {
    pub fn insert(row: MessageRow) -> Self {
        ChangePayload {
            kind: ChangeKind::Insert,
            schema: "public".to_string(),
            table: "messages".to_string(),
            new: row,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<u64>,
    pub message: String,
    #[serde(default)]
    pub details: String,
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

pub fn parse_client_frame(text: &str) -> Result<ClientFrame, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn parse_server_frame(text: &str) -> Result<ServerFrame, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode<T: Serialize>(frame: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(frame)?)
}

// ---------------------------------------------------------------------------
// In-process messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Which remote source of truth the widget is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Relay,
    Table,
}

/// An error reported by the backend for a single request.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    pub details: String,
}

impl BackendError {
    /// Text of the user-facing alert.
    pub fn alert_text(&self) -> String {
        format!("Failed: {}\n[Details: {}]", self.message, self.details)
    }
}

impl From<ErrorPayload> for BackendError {
    fn from(payload: ErrorPayload) -> Self {
        BackendError {
            message: payload.message,
            details: payload.details,
        }
    }
}

/// Events emitted by a backend adapter to the app loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// The channel is open. `sid` is the socket id announced by the relay.
    Connected { sid: Option<String> },
    Disconnected,
    /// Initial history, oldest first.
    History(Vec<ChatMessage>),
    /// A message pushed by the backend (relay broadcast or table INSERT).
    Message(ChatMessage),
    /// The backend accepted the optimistic echo `local`; `message` is the
    /// authoritative copy.
    Confirmed { local: u64, message: ChatMessage },
    SendFailed { local: u64, error: BackendError },
    /// A backend error not tied to a particular send.
    Error(BackendError),
}

/// A request from the widget to its backend. `local` identifies the
/// optimistic echo shown while the request is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Relay { local: u64, message: RelayMessage },
    Insert { local: u64, message: NewMessage },
}

impl Outgoing {
    pub fn local(&self) -> u64 {
        match self {
            Outgoing::Relay { local, .. } | Outgoing::Insert { local, .. } => *local,
        }
    }
}

/// Updates pushed from the app loop to the TUI.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    Widget(Box<WidgetView>),
}

/// Commands sent from the TUI to the app loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    InputChar(char),
    Backspace,
    ClearInput,
    Submit,
    ToggleChat,
    CloseChat,
    DismissAlert,
    Quit,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(id: i64) -> MessageRow {
        MessageRow {
            id,
            text: "hi".into(),
            sender_id: "u-1".into(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn chat_message_frame_shape() {
        let frame = ClientFrame::ChatMessage(RelayMessage {
            id: "abc".into(),
            text: "hello".into(),
            sender_id: "s1".into(),
            timestamp: 5,
        });
        let json: serde_json::Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
        assert_eq!(json["event"], "chat_message");
        assert_eq!(json["data"]["senderId"], "s1");
    }

    #[test]
    fn select_messages_has_no_data() {
        let text = encode(&ClientFrame::SelectMessages).unwrap();
        assert_eq!(text, r#"{"event":"select_messages"}"#);
        assert_eq!(parse_client_frame(&text).unwrap(), ClientFrame::SelectMessages);
    }

    #[test]
    fn insert_request_flattens_message_and_ref() {
        let text = r#"{"event":"insert_message","data":{"ref":3,"text":"yo","sender_id":"u-9"}}"#;
        match parse_client_frame(text).unwrap() {
            ClientFrame::InsertMessage(req) => {
                assert_eq!(req.reference, 3);
                assert_eq!(req.message.text, "yo");
                assert_eq!(req.message.sender_id, "u-9");
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn postgres_changes_frame_shape() {
        let frame = ServerFrame::PostgresChanges(ChangePayload::insert(row(4)));
        let json: serde_json::Value = serde_json::from_str(&encode(&frame).unwrap()).unwrap();
        assert_eq!(json["event"], "postgres_changes");
        assert_eq!(json["data"]["type"], "INSERT");
        assert_eq!(json["data"]["table"], "messages");
        assert_eq!(json["data"]["new"]["id"], 4);
    }

    #[test]
    fn error_frame_without_ref_or_details() {
        let frame = parse_server_frame(r#"{"event":"error","data":{"message":"nope"}}"#).unwrap();
        assert_eq!(
            frame,
            ServerFrame::Error(ErrorPayload {
                reference: None,
                message: "nope".into(),
                details: String::new(),
            })
        );
    }

    #[test]
    fn unknown_event_is_malformed() {
        let err = parse_server_frame(r#"{"event":"bogus","data":1}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { .. }));
    }

    #[test]
    fn alert_text_includes_details() {
        let err = BackendError {
            message: "insert rejected".into(),
            details: "text must not be empty".into(),
        };
        assert_eq!(
            err.alert_text(),
            "Failed: insert rejected\n[Details: text must not be empty]"
        );
    }

    #[test]
    fn outgoing_local_id() {
        let out = Outgoing::Insert {
            local: 9,
            message: NewMessage {
                text: "a".into(),
                sender_id: "b".into(),
            },
        };
        assert_eq!(out.local(), 9);
    }
}
