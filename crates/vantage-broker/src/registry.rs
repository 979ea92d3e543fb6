//! Connection registry: the only owner of live transport handles.
//!
//! Each connection registers its outbound channel and receives an opaque
//! [`ConnectionId`]. Everything above this layer (session table, router,
//! lifecycle) speaks in connection ids and never touches a socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::RwLock;

use vantage_common::{BrokerError, ConnectionId, Result, ServerMessage};

pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<String>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Record a new connection's outbound channel and mint its id.
    pub async fn register(&self, tx: mpsc::Sender<String>) -> ConnectionId {
        let id = ConnectionId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.connections.write().await.insert(id, tx);
        id
    }

    /// Drop a connection. Returns false if it was already removed, which
    /// lets the lifecycle manager treat repeated cleanup as a no-op.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        self.connections.write().await.remove(&id).is_some()
    }

    /// Queue a raw text frame for delivery to a connection.
    ///
    /// Never waits for the recipient: a closed or unknown connection is
    /// `ConnectionLost`, and a full outbound queue drops the frame.
    pub async fn send(&self, id: ConnectionId, text: String) -> Result<()> {
        let tx = {
            let connections = self.connections.read().await;
            connections.get(&id).cloned()
        };
        let tx = tx.ok_or(BrokerError::ConnectionLost)?;

        match tx.try_send(text) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(connection = %id, "outbound queue full, dropping frame");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(BrokerError::ConnectionLost),
        }
    }

    /// Serialize and queue a broker-originated message.
    pub async fn send_message(&self, id: ConnectionId, msg: &ServerMessage) -> Result<()> {
        let json =
            serde_json::to_string(msg).map_err(|e| BrokerError::InternalError(e.to_string()))?;
        self.send(id, json).await
    }

    /// Number of live connections.
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_send() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(8);
        let id = registry.register(tx).await;

        registry.send(id, "hello".into()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let registry = ConnectionRegistry::new();
        let (tx_a, _rx_a) = mpsc::channel(8);
        let (tx_b, _rx_b) = mpsc::channel(8);
        let a = registry.register(tx_a).await;
        let b = registry.register(tx_b).await;
        assert_ne!(a, b);
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn send_to_unknown_connection_fails() {
        let registry = ConnectionRegistry::new();
        let err = registry
            .send(ConnectionId::from_raw(99), "x".into())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::ConnectionLost));
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_fails() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::channel(8);
        let id = registry.register(tx).await;
        drop(rx);

        let err = registry.send(id, "x".into()).await.unwrap_err();
        assert!(matches!(err, BrokerError::ConnectionLost));
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(8);
        let id = registry.register(tx).await;

        assert!(registry.unregister(id).await);
        assert!(!registry.unregister(id).await);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn full_queue_drops_frame_without_error() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(1);
        let id = registry.register(tx).await;

        registry.send(id, "first".into()).await.unwrap();
        registry.send(id, "second".into()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "first");
        assert!(rx.try_recv().is_err());
    }
}
