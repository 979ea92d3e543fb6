//! Lifecycle manager: the single teardown path for closed connections.

use std::sync::Arc;

use vantage_common::{ConnectionId, ServerMessage};

use crate::registry::ConnectionRegistry;
use crate::session::SessionTable;

pub struct Lifecycle {
    registry: Arc<ConnectionRegistry>,
    table: Arc<SessionTable>,
}

impl Lifecycle {
    pub fn new(registry: Arc<ConnectionRegistry>, table: Arc<SessionTable>) -> Self {
        Self { registry, table }
    }

    /// Tear down everything a closed connection touched: drop its
    /// transport handle, evict the sessions it participated in, and tell
    /// each surviving peer `peer-disconnected`. Safe to call more than
    /// once; only the first call does work.
    pub async fn connection_closed(&self, id: ConnectionId) {
        if !self.registry.unregister(id).await {
            return;
        }

        for (token, session) in self.table.remove_by_connection(id).await {
            let survivor = if session.host == id {
                session.viewer
            } else {
                Some(session.host)
            };

            if let Some(peer) = survivor {
                let notice = ServerMessage::PeerDisconnected {
                    session_id: token.clone(),
                };
                if self.registry.send_message(peer, &notice).await.is_err() {
                    tracing::debug!(session = %token, peer = %peer, "survivor already gone");
                }
            }
            tracing::info!(session = %token, connection = %id, "session terminated");
        }

        let connections = self.registry.count().await;
        let sessions = self.table.count().await;
        tracing::debug!(connections, sessions, "cleanup complete");
    }
}
