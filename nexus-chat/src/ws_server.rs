// WebSocket relay: broadcast chat channel plus the realtime `messages` table.
//
// Every client gets a socket id on connect. `chat_message` frames are
// re-broadcast to every connected client, sender included. Table requests
// are served from the `MessageStore`; inserts are pushed to clients that
// subscribed to `public:messages`.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::message::{MessageRow, RelayMessage};
use crate::protocol::{
    encode, parse_client_frame, ChangePayload, ClientFrame, ErrorPayload, ServerFrame,
    MESSAGES_TOPIC,
};
use crate::store::MessageStore;

const RELAY_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// State shared by all connections.
pub struct Hub {
    relay: broadcast::Sender<RelayMessage>,
    store: Arc<MessageStore>,
    history_limit: Option<usize>,
}

impl Hub {
    pub fn new(store: Arc<MessageStore>, history_limit: Option<usize>) -> Self {
        let (relay, _) = broadcast::channel(RELAY_CAPACITY);
        Hub {
            relay,
            store,
            history_limit,
        }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn relay_subscribe(&self) -> broadcast::Receiver<RelayMessage> {
        self.relay.subscribe()
    }

    /// Handle one client frame. Returns the frames to send back to that
    /// client only; broadcasts happen through the hub's channels.
    pub fn handle(
        &self,
        frame: ClientFrame,
        subscription: &mut Option<broadcast::Receiver<MessageRow>>,
    ) -> Vec<ServerFrame> {
        match frame {
            ClientFrame::ChatMessage(msg) => {
                debug!("Relaying message {} from {}", msg.id, msg.sender_id);
                let _ = self.relay.send(msg);
                Vec::new()
            }
            ClientFrame::SelectMessages => match self.store.list(self.history_limit) {
                Ok(rows) => vec![ServerFrame::Messages(rows)],
                Err(e) => {
                    warn!("select_messages failed: {e}");
                    vec![ServerFrame::Error(e.to_payload(None))]
                }
            },
            ClientFrame::Subscribe { topic } if topic == MESSAGES_TOPIC => {
                if subscription.is_none() {
                    *subscription = Some(self.store.subscribe());
                }
                Vec::new()
            }
            ClientFrame::Unsubscribe { topic } if topic == MESSAGES_TOPIC => {
                *subscription = None;
                Vec::new()
            }
            ClientFrame::Subscribe { topic } | ClientFrame::Unsubscribe { topic } => {
                vec![ServerFrame::Error(ErrorPayload {
                    reference: None,
                    message: "unknown topic".to_string(),
                    details: topic,
                })]
            }
            ClientFrame::InsertMessage(req) => match self.store.insert(&req.message) {
                Ok(row) => vec![ServerFrame::InsertAck {
                    reference: req.reference,
                    row,
                }],
                Err(e) => {
                    info!("Insert {} rejected: {e}", req.reference);
                    vec![ServerFrame::Error(e.to_payload(Some(req.reference)))]
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Listener / accept loop
// ---------------------------------------------------------------------------

pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind on `addr` (e.g. `127.0.0.1:3001`; port 0 picks a free port).
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let inner = TcpListener::bind(addr).await?;
        Ok(Listener { inner })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

/// Accept connections forever, one task per client.
pub async fn run(listener: Listener, hub: Arc<Hub>) -> anyhow::Result<()> {
    info!("Relay listening on {}", listener.local_addr()?);

    loop {
        let (stream, addr) = listener.inner.accept().await?;
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            let ws = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr}: {e}");
                    return;
                }
            };
            serve_connection(ws, &addr.to_string(), hub).await;
        });
    }
}

/// Socket ids look like `3f2a9c...` (32 hex chars).
fn new_sid() -> String {
    Uuid::new_v4().simple().to_string()
}

async fn recv_change(
    subscription: &mut Option<broadcast::Receiver<MessageRow>>,
) -> Result<MessageRow, broadcast::error::RecvError> {
    match subscription {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Serve one upgraded connection until the client leaves.
pub async fn serve_connection<S>(ws: WebSocketStream<S>, addr: &str, hub: Arc<Hub>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let sid = new_sid();
    info!("User connected: {sid} ({addr})");

    let (mut write, mut read) = ws.split();
    // Subscribe before announcing so the client's first message echoes back.
    let mut relay_rx = hub.relay_subscribe();
    let mut subscription: Option<broadcast::Receiver<MessageRow>> = None;

    let mut outbox = vec![ServerFrame::Connect { sid: sid.clone() }];

    'conn: loop {
        for frame in outbox.drain(..) {
            let text = match encode(&frame) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode frame for {sid}: {e}");
                    continue;
                }
            };
            if write.send(Message::Text(text.into())).await.is_err() {
                break 'conn;
            }
        }

        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => match parse_client_frame(&text) {
                    Ok(frame) => outbox.extend(hub.handle(frame, &mut subscription)),
                    Err(e) => {
                        warn!("Bad frame from {sid}: {e}");
                        outbox.push(ServerFrame::Error(ErrorPayload {
                            reference: None,
                            message: "malformed frame".to_string(),
                            details: e.to_string(),
                        }));
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!("WebSocket error from {sid}: {e}");
                    break;
                }
                Some(Ok(_)) => {
                    // Binary, Ping, Pong: tungstenite answers pings itself.
                }
            },

            relayed = relay_rx.recv() => match relayed {
                Ok(msg) => outbox.push(ServerFrame::ChatMessage(msg)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("{sid} lagged behind the relay, {n} messages skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            change = recv_change(&mut subscription) => match change {
                Ok(row) => outbox.push(ServerFrame::PostgresChanges(ChangePayload::insert(row))),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("{sid} lagged behind the messages feed, {n} rows skipped");
                }
                Err(broadcast::error::RecvError::Closed) => subscription = None,
            },
        }
    }

    info!("User disconnected: {sid}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::backend::opening_frames;
    use crate::message::NewMessage;
    use crate::protocol::{BackendKind, InsertRequest};

    fn hub() -> Hub {
        Hub::new(Arc::new(MessageStore::open(":memory:").unwrap()), None)
    }

    fn insert(reference: u64, text: &str) -> ClientFrame {
        ClientFrame::InsertMessage(InsertRequest {
            reference,
            message: NewMessage {
                text: text.into(),
                sender_id: "user-1".into(),
            },
        })
    }

    #[tokio::test]
    async fn chat_message_is_broadcast_to_all_subscribers() {
        let hub = hub();
        let mut a = hub.relay_subscribe();
        let mut b = hub.relay_subscribe();
        let mut sub = None;
        let msg = RelayMessage::compose("hello", "sock-a");

        let replies = hub.handle(ClientFrame::ChatMessage(msg.clone()), &mut sub);

        assert!(replies.is_empty());
        assert_eq!(a.recv().await.unwrap(), msg);
        assert_eq!(b.recv().await.unwrap(), msg);
    }

    #[test]
    fn insert_acks_with_ref() {
        let hub = hub();
        let mut sub = None;
        let replies = hub.handle(insert(4, "hi"), &mut sub);
        match replies.as_slice() {
            [ServerFrame::InsertAck { reference, row }] => {
                assert_eq!(*reference, 4);
                assert_eq!(row.text, "hi");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejected_insert_returns_error_with_ref() {
        let hub = hub();
        let mut sub = None;
        let replies = hub.handle(insert(9, ""), &mut sub);
        match replies.as_slice() {
            [ServerFrame::Error(payload)] => {
                assert_eq!(payload.reference, Some(9));
                assert_eq!(payload.message, "insert rejected");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn select_returns_rows_oldest_first() {
        let hub = hub();
        let mut sub = None;
        hub.handle(insert(1, "first"), &mut sub);
        hub.handle(insert(2, "second"), &mut sub);
        match hub.handle(ClientFrame::SelectMessages, &mut sub).as_slice() {
            [ServerFrame::Messages(rows)] => {
                let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
                assert_eq!(texts, vec!["first", "second"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscribe_then_insert_delivers_change() {
        let hub = hub();
        let mut sub = None;
        hub.handle(
            ClientFrame::Subscribe {
                topic: MESSAGES_TOPIC.into(),
            },
            &mut sub,
        );
        assert!(sub.is_some());
        hub.handle(insert(1, "pushed"), &mut sub);
        let row = recv_change(&mut sub).await.unwrap();
        assert_eq!(row.text, "pushed");

        hub.handle(
            ClientFrame::Unsubscribe {
                topic: MESSAGES_TOPIC.into(),
            },
            &mut sub,
        );
        assert!(sub.is_none());
    }

    #[test]
    fn insert_between_opening_frames_is_not_lost() {
        let hub = hub();
        let mut joining = None;
        let mut other = None;

        let mut frames = opening_frames(BackendKind::Table).into_iter();
        let first = frames.next().unwrap();
        hub.handle(first, &mut joining);

        // Another client inserts while the joining client is half open.
        hub.handle(insert(1, "in between"), &mut other);

        let mut history_len = 0;
        for frame in frames {
            for reply in hub.handle(frame, &mut joining) {
                if let ServerFrame::Messages(rows) = reply {
                    history_len += rows.len();
                }
            }
        }
        let pushed = joining
            .as_mut()
            .map(|rx| rx.try_recv().is_ok())
            .unwrap_or(false);
        // Both: the widget keeps one copy when history replaces the feed.
        assert_eq!(history_len, 1);
        assert!(pushed);
    }

    #[test]
    fn unknown_topic_is_an_error() {
        let hub = hub();
        let mut sub = None;
        let replies = hub.handle(
            ClientFrame::Subscribe {
                topic: "public:other".into(),
            },
            &mut sub,
        );
        assert!(matches!(replies.as_slice(), [ServerFrame::Error(_)]));
        assert!(sub.is_none());
    }

    #[test]
    fn sids_are_unique() {
        assert_ne!(new_sid(), new_sid());
        assert_eq!(new_sid().len(), 32);
    }
}
