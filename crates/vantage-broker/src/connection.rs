//! Per-connection handler: register, dispatch inbound frames, clean up.
//!
//! Each connection gets one task and one bounded outbound channel. The
//! select loop interleaves draining that channel with reading the socket,
//! so per-connection ordering is preserved by the channel rather than by
//! callback scheduling.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use vantage_common::{BrokerError, ClientMessage, ConnectionId, ServerMessage};

use crate::lifecycle::Lifecycle;
use crate::registry::ConnectionRegistry;
use crate::router;
use crate::session::SessionTable;

/// Outbound frames buffered per connection before the relay starts
/// dropping (at-most-once, a slow peer never stalls the sender).
const OUTBOUND_QUEUE: usize = 256;

/// Shared broker state handed to every connection task.
#[derive(Clone)]
pub struct Broker {
    pub registry: Arc<ConnectionRegistry>,
    pub table: Arc<SessionTable>,
    pub lifecycle: Arc<Lifecycle>,
}

impl Broker {
    pub fn new() -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let table = Arc::new(SessionTable::new());
        let lifecycle = Arc::new(Lifecycle::new(registry.clone(), table.clone()));
        Self {
            registry,
            table,
            lifecycle,
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive a single WebSocket connection until it closes, then run
/// lifecycle teardown exactly once.
pub async fn handle_connection(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    addr: SocketAddr,
    broker: Broker,
) {
    let (mut sink, mut stream) = ws.split();

    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    let conn_id = broker.registry.register(tx).await;

    tracing::info!(peer = %addr, connection = %conn_id, "Client connected");

    loop {
        tokio::select! {
            // Frames queued for this client → its WebSocket.
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this client → dispatch.
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&broker, conn_id, &text).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, connection = %conn_id, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::info!(peer = %addr, connection = %conn_id, "Client disconnected");
    broker.lifecycle.connection_closed(conn_id).await;
}

/// Act on one inbound text frame. Malformed or unrecognized frames are
/// logged and dropped; operation errors go back to the sender alone as an
/// `error` frame. Relayed frames are forwarded verbatim.
pub(crate) async fn dispatch(broker: &Broker, sender: ConnectionId, raw: &str) {
    let msg = match serde_json::from_str::<ClientMessage>(raw) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(connection = %sender, error = %e, "dropping malformed frame");
            return;
        }
    };

    match &msg {
        ClientMessage::CreateSession => match broker.table.create_session(sender).await {
            Ok(token) => {
                tracing::info!(connection = %sender, session = %token, "session created");
                let reply = ServerMessage::SessionCreated { session_id: token };
                let _ = broker.registry.send_message(sender, &reply).await;
            }
            Err(e) => report(broker, sender, e).await,
        },

        ClientMessage::JoinSession { session_id } => {
            match broker.table.join_session(session_id, sender).await {
                Ok(host) => {
                    tracing::info!(connection = %sender, session = %session_id, "viewer joined");
                    let notice = ServerMessage::PeerJoined {
                        session_id: session_id.clone(),
                    };
                    if broker.registry.send_message(host, &notice).await.is_err() {
                        tracing::debug!(session = %session_id, "host unreachable for peer-joined");
                    }
                    let reply = ServerMessage::SessionJoined {
                        session_id: session_id.clone(),
                    };
                    let _ = broker.registry.send_message(sender, &reply).await;
                }
                Err(e) => report(broker, sender, e).await,
            }
        }

        relayed => {
            let Some((kind, token)) = router::classify(relayed) else {
                return;
            };
            match router::route(kind, token, sender, &broker.table).await {
                Ok(Some(target)) => {
                    if broker.registry.send(target, raw.to_string()).await.is_err() {
                        tracing::debug!(session = %token, "relay target unreachable");
                    }
                }
                Ok(None) => {
                    tracing::debug!(session = %token, "no peer to relay to yet");
                }
                Err(e) => report(broker, sender, e).await,
            }
        }
    }
}

async fn report(broker: &Broker, sender: ConnectionId, err: BrokerError) {
    tracing::warn!(connection = %sender, error = %err, "rejecting frame");
    let reply = ServerMessage::Error {
        message: err.to_string(),
    };
    if broker.registry.send_message(sender, &reply).await.is_err() {
        tracing::debug!(connection = %sender, "sender gone before error delivery");
    }
}
