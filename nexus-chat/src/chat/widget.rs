// Chat widget state: open/closed panel, input line, connection, alerts.
//
// The widget is pure state. It consumes `BackendEvent`s, turns a submitted
// input line into an `Outgoing` request, and exposes a `WidgetView` snapshot
// for rendering.

use tracing::{debug, info, warn};

use super::feed::{EntryView, MessageFeed};
use crate::message::{MessageId, NewMessage, RelayMessage};
use crate::protocol::{BackendEvent, BackendKind, ConnectionStatus, Outgoing};

/// Sender id used on the relay when connected without an announced socket id.
pub const UNKNOWN_SENDER: &str = "unknown";

pub struct ChatWidget {
    backend: BackendKind,
    pub is_open: bool,
    pub feed: MessageFeed,
    pub input: String,
    /// Relay: socket id of this client. Table: signed-in user id.
    pub current_sender: Option<String>,
    pub connection: ConnectionStatus,
    /// A message arrived while the panel was closed.
    pub unread: bool,
    scroll_pending: bool,
    pub alert: Option<String>,
}

/// Rendering snapshot of the widget.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetView {
    pub backend: BackendKind,
    pub is_open: bool,
    pub connection: ConnectionStatus,
    pub entries: Vec<EntryView>,
    pub input: String,
    pub can_submit: bool,
    pub unread: bool,
    pub scroll_to_bottom: bool,
    pub alert: Option<String>,
}

impl WidgetView {
    /// Header subtitle under the widget title.
    pub fn subtitle(&self) -> &'static str {
        match self.backend {
            BackendKind::Relay => "Encrypted Channel",
            BackendKind::Table => "Backend Connected",
        }
    }

    /// Two-line placeholder shown while the feed is empty.
    pub fn empty_copy(&self) -> (&'static str, &'static str) {
        match self.backend {
            BackendKind::Relay => ("Initiating connection...", "Secure channel opened"),
            BackendKind::Table => ("No messages yet...", "Say hello!"),
        }
    }
}

impl ChatWidget {
    /// A closed widget. `user_id` is the signed-in user; it is the sender
    /// identity on the table backend and ignored on the relay, where the
    /// socket id announced on connect is used instead.
    pub fn new(backend: BackendKind, user_id: Option<String>) -> Self {
        let current_sender = match backend {
            BackendKind::Table => user_id,
            BackendKind::Relay => None,
        };
        ChatWidget {
            backend,
            is_open: false,
            feed: MessageFeed::new(),
            input: String::new(),
            current_sender,
            connection: ConnectionStatus::Connecting,
            unread: false,
            scroll_pending: false,
            alert: None,
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    // -- panel ------------------------------------------------------------

    pub fn open(&mut self) {
        self.is_open = true;
        self.unread = false;
        self.scroll_pending = true;
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn toggle(&mut self) {
        if self.is_open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Consume the pending scroll-to-bottom request.
    pub fn take_scroll(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }

    fn feed_changed(&mut self) {
        self.scroll_pending = true;
        if !self.is_open {
            self.unread = true;
        }
    }

    // -- backend events ---------------------------------------------------

    pub fn apply(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Connected { sid } => {
                self.connection = ConnectionStatus::Connected;
                if self.backend == BackendKind::Relay {
                    self.current_sender = Some(sid.unwrap_or_else(|| UNKNOWN_SENDER.to_string()));
                }
            }
            BackendEvent::Disconnected => {
                self.connection = ConnectionStatus::Disconnected;
            }
            BackendEvent::History(history) => {
                debug!("Loaded {} messages of history", history.len());
                self.feed.replace_all(history);
                self.scroll_pending = true;
            }
            BackendEvent::Message(msg) => {
                if self.feed.append(msg) {
                    self.feed_changed();
                }
            }
            BackendEvent::Confirmed { local, message } => {
                if self.feed.confirm(local, message) {
                    self.scroll_pending = true;
                }
            }
            BackendEvent::SendFailed { local, error } => {
                warn!("Send failed: {} ({})", error.message, error.details);
                self.feed.discard_pending(local);
                self.alert = Some(error.alert_text());
            }
            BackendEvent::Error(error) => {
                warn!("Backend error: {} ({})", error.message, error.details);
                self.alert = Some(error.alert_text());
            }
        }
    }

    // -- input ------------------------------------------------------------

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Sender identity a submit would use right now, if any.
    fn sending_identity(&self) -> Option<&str> {
        match self.backend {
            BackendKind::Relay if self.connection != ConnectionStatus::Connected => None,
            _ => self.current_sender.as_deref(),
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.input.trim().is_empty() && self.sending_identity().is_some()
    }

    /// Turn the input line into an outgoing request.
    ///
    /// Blank input or a missing sender identity leaves everything untouched
    /// and returns `None`. Otherwise the input is cleared and an optimistic
    /// echo is added to the feed. The text is sent as typed, untrimmed.
    pub fn submit(&mut self) -> Option<Outgoing> {
        if self.input.trim().is_empty() {
            return None;
        }
        let Some(sender) = self.sending_identity().map(str::to_string) else {
            info!("Submit ignored: no sender identity ({:?})", self.backend);
            return None;
        };
        let text = std::mem::take(&mut self.input);

        let outgoing = match self.backend {
            BackendKind::Relay => {
                let message = RelayMessage::compose(&text, &sender);
                let expected = MessageId::Relay(message.id.clone());
                let local = self.feed.push_pending(&text, &sender, Some(expected));
                Outgoing::Relay { local, message }
            }
            BackendKind::Table => {
                let local = self.feed.push_pending(&text, &sender, None);
                Outgoing::Insert {
                    local,
                    message: NewMessage {
                        text,
                        sender_id: sender,
                    },
                }
            }
        };
        self.scroll_pending = true;
        Some(outgoing)
    }

    // -- rendering --------------------------------------------------------

    /// Snapshot for the renderer. Consumes the scroll request.
    pub fn view(&mut self) -> WidgetView {
        let scroll_to_bottom = self.take_scroll();
        WidgetView {
            backend: self.backend,
            is_open: self.is_open,
            connection: self.connection,
            entries: self.feed.views(self.current_sender.as_deref()),
            input: self.input.clone(),
            can_submit: self.can_submit(),
            unread: self.unread,
            scroll_to_bottom,
            alert: self.alert.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
