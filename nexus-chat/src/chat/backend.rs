// Channel adapters: the relay broadcast socket and the realtime message table.
//
// `open` connects and spawns a driver task that forwards server frames as
// `BackendEvent`s and writes `Outgoing` requests to the socket. The channel
// lives as long as its `ChannelHandle`: closing or dropping the handle ends
// the driver, which unsubscribes (table) and sends a close frame.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use crate::protocol::{
    encode, parse_server_frame, BackendError, BackendEvent, BackendKind, ClientFrame,
    InsertRequest, Outgoing, ServerFrame, MESSAGES_TOPIC,
};

/// How long `ChannelHandle::close` waits for the driver to say goodbye.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        source: tungstenite::Error,
    },

    #[error("channel is closed")]
    Closed,
}

impl From<&ChannelError> for BackendError {
    fn from(err: &ChannelError) -> Self {
        match err {
            ChannelError::Connect { url, source } => BackendError {
                message: format!("could not reach {url}"),
                details: source.to_string(),
            },
            ChannelError::Closed => BackendError {
                message: "channel is closed".to_string(),
                details: "the connection to the chat backend was lost".to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ChatBackend
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Connect and start delivering events to `events`.
    async fn open(&self, events: mpsc::Sender<BackendEvent>)
        -> Result<ChannelHandle, ChannelError>;
}

/// The open side of a channel. Dropping it disconnects.
pub struct ChannelHandle {
    out_tx: mpsc::Sender<Outgoing>,
    driver: JoinHandle<()>,
}

impl ChannelHandle {
    pub async fn send(&self, outgoing: Outgoing) -> Result<(), ChannelError> {
        self.out_tx
            .send(outgoing)
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Disconnect and wait (briefly) for the driver to finish.
    pub async fn close(self) {
        let ChannelHandle { out_tx, driver } = self;
        drop(out_tx);
        if tokio::time::timeout(CLOSE_TIMEOUT, driver).await.is_err() {
            warn!("Chat channel did not close within {:?}", CLOSE_TIMEOUT);
        }
    }
}

/// Broadcast relay: every `chat_message` goes to every connected client.
pub struct RelayBackend {
    url: String,
}

impl RelayBackend {
    pub fn new(url: impl Into<String>) -> Self {
        RelayBackend { url: url.into() }
    }
}

/// Persisted `messages` table with realtime INSERT pushes.
pub struct TableBackend {
    url: String,
}

impl TableBackend {
    pub fn new(url: impl Into<String>) -> Self {
        TableBackend { url: url.into() }
    }
}

/// Build the adapter for `kind` talking to `url`.
pub fn backend_for(kind: BackendKind, url: &str) -> Box<dyn ChatBackend> {
    match kind {
        BackendKind::Relay => Box::new(RelayBackend::new(url)),
        BackendKind::Table => Box::new(TableBackend::new(url)),
    }
}

#[async_trait]
impl ChatBackend for RelayBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Relay
    }

    async fn open(
        &self,
        events: mpsc::Sender<BackendEvent>,
    ) -> Result<ChannelHandle, ChannelError> {
        open_channel(&self.url, BackendKind::Relay, events).await
    }
}

#[async_trait]
impl ChatBackend for TableBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Table
    }

    async fn open(
        &self,
        events: mpsc::Sender<BackendEvent>,
    ) -> Result<ChannelHandle, ChannelError> {
        open_channel(&self.url, BackendKind::Table, events).await
    }
}

async fn open_channel(
    url: &str,
    kind: BackendKind,
    events: mpsc::Sender<BackendEvent>,
) -> Result<ChannelHandle, ChannelError> {
    let (ws, _response) =
        tokio_tungstenite::connect_async(url)
            .await
            .map_err(|source| ChannelError::Connect {
                url: url.to_string(),
                source,
            })?;
    info!("Connected to {url} ({kind:?})");

    let (out_tx, out_rx) = mpsc::channel(64);
    let (write, read) = ws.split();
    let driver = tokio::spawn(async move {
        drive(kind, write, read, out_rx, events).await;
    });

    Ok(ChannelHandle { out_tx, driver })
}

// ---------------------------------------------------------------------------
// Frame translation
// ---------------------------------------------------------------------------

/// Frames a backend sends right after connecting.
///
/// The table subscribes before selecting history, so a row inserted in
/// between is at least pushed; one pushed before the history reply is also
/// in that history and `replace_all` keeps a single copy.
pub fn opening_frames(kind: BackendKind) -> Vec<ClientFrame> {
    match kind {
        BackendKind::Relay => Vec::new(),
        BackendKind::Table => vec![
            ClientFrame::Subscribe {
                topic: MESSAGES_TOPIC.to_string(),
            },
            ClientFrame::SelectMessages,
        ],
    }
}

/// Frames a backend sends before closing.
pub fn closing_frames(kind: BackendKind) -> Vec<ClientFrame> {
    match kind {
        BackendKind::Relay => Vec::new(),
        BackendKind::Table => vec![ClientFrame::Unsubscribe {
            topic: MESSAGES_TOPIC.to_string(),
        }],
    }
}

pub fn outgoing_frame(outgoing: Outgoing) -> ClientFrame {
    match outgoing {
        Outgoing::Relay { message, .. } => ClientFrame::ChatMessage(message),
        Outgoing::Insert { local, message } => ClientFrame::InsertMessage(InsertRequest {
            reference: local,
            message,
        }),
    }
}

/// Map a server frame to the event the widget cares about, if any.
pub fn translate(kind: BackendKind, frame: ServerFrame) -> Option<BackendEvent> {
    match (kind, frame) {
        (_, ServerFrame::Connect { sid }) => Some(BackendEvent::Connected { sid: Some(sid) }),
        (BackendKind::Relay, ServerFrame::ChatMessage(msg)) => {
            Some(BackendEvent::Message(msg.into()))
        }
        (BackendKind::Table, ServerFrame::Messages(rows)) => Some(BackendEvent::History(
            rows.into_iter().map(Into::into).collect(),
        )),
        (BackendKind::Table, ServerFrame::PostgresChanges(change)) if change.table == "messages" => {
            Some(BackendEvent::Message(change.new.into()))
        }
        (BackendKind::Table, ServerFrame::InsertAck { reference, row }) => {
            Some(BackendEvent::Confirmed {
                local: reference,
                message: row.into(),
            })
        }
        (_, ServerFrame::Error(payload)) => Some(match payload.reference {
            Some(local) => BackendEvent::SendFailed {
                local,
                error: payload.into(),
            },
            None => BackendEvent::Error(payload.into()),
        }),
        (kind, frame) => {
            debug!("Ignoring {frame:?} on {kind:?} channel");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

async fn write_frame<W>(write: &mut W, frame: &ClientFrame) -> Result<(), String>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = encode(frame).map_err(|e| e.to_string())?;
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| e.to_string())
}

/// Pump frames between the socket and the app until either side goes away.
///
/// Generic over the sink and stream so it can run against in-memory
/// channels in tests.
pub async fn drive<W, R>(
    kind: BackendKind,
    mut write: W,
    mut read: R,
    mut out_rx: mpsc::Receiver<Outgoing>,
    events: mpsc::Sender<BackendEvent>,
) where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    for frame in opening_frames(kind) {
        if let Err(e) = write_frame(&mut write, &frame).await {
            warn!("Failed to send opening frame: {e}");
            let _ = events.send(BackendEvent::Disconnected).await;
            return;
        }
    }

    loop {
        tokio::select! {
            outgoing = out_rx.recv() => {
                let Some(outgoing) = outgoing else {
                    // Handle dropped: the widget unmounted.
                    for frame in closing_frames(kind) {
                        let _ = write_frame(&mut write, &frame).await;
                    }
                    let _ = write.send(Message::Close(None)).await;
                    debug!("Chat channel closed by client");
                    break;
                };
                let local = outgoing.local();
                if let Err(e) = write_frame(&mut write, &outgoing_frame(outgoing)).await {
                    let failed = BackendEvent::SendFailed {
                        local,
                        error: BackendError {
                            message: "send failed".to_string(),
                            details: e,
                        },
                    };
                    if events.send(failed).await.is_err() {
                        break;
                    }
                }
            }

            incoming = read.next() => {
                let event = match incoming {
                    Some(Ok(Message::Text(text))) => match parse_server_frame(&text) {
                        Ok(frame) => translate(kind, frame),
                        Err(e) => {
                            warn!("Dropping frame from server: {e}");
                            None
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the chat channel");
                        let _ = events.send(BackendEvent::Disconnected).await;
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("Chat channel error: {e}");
                        let _ = events.send(BackendEvent::Disconnected).await;
                        break;
                    }
                    Some(Ok(_)) => None,
                };
                if let Some(event) = event {
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
