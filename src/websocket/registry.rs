//! Connection Registry
//!
//! Tracks every live client connection, its subscription filter, and its
//! liveness. Owned by the composition root and shared behind an `Arc`;
//! the broadcaster only reads snapshots and writes to each connection's
//! own outbound queue.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::messages::ServerMessage;

/// Unique identifier for a client connection
pub type ConnectionId = String;

/// Configuration for the connection registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Connections idle longer than this are proactively unregistered
    pub liveness_window: Duration,
    /// How often the idle sweep runs
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            liveness_window: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

/// Per-connection bookkeeping
struct ConnectionHandle {
    /// Outbound queue for this connection. Single writer per consumer:
    /// only the broadcaster and this connection's own request handling
    /// push into it.
    sender: mpsc::UnboundedSender<ServerMessage>,
    /// Optional location filter; `None` means the global feed
    filter: Option<String>,
    /// Last completed socket write or inbound frame. Queueing a message
    /// does not count; only the transport proves the client is reading.
    last_activity: Instant,
}

/// Copied view of one connection, handed out by [`ConnectionRegistry::snapshot`]
#[derive(Clone)]
pub struct ConnectionSnapshot {
    pub id: ConnectionId,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    pub filter: Option<String>,
}

impl ConnectionSnapshot {
    /// Whether an update for `location` should be delivered here
    pub fn matches(&self, location: &str) -> bool {
        match &self.filter {
            None => true,
            Some(wanted) => wanted == location,
        }
    }
}

/// Tracks all live connections and their subscription state
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    config: RegistryConfig,
}

impl ConnectionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a new connection and assign it a fresh id.
    ///
    /// Fails only when the connection limit has been reached.
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, RegistryError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(RegistryError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                filter: None,
                last_activity: Instant::now(),
            },
        );
        drop(connections);

        tracing::info!(connection_id = %id, "Client connected");
        Ok(id)
    }

    /// Remove a connection. Idempotent: an absent id is treated as
    /// already removed.
    pub async fn unregister(&self, id: &str) {
        if self.connections.write().await.remove(id).is_some() {
            tracing::info!(connection_id = %id, "Client disconnected");
        }
    }

    /// Set or clear a connection's location filter
    pub async fn set_filter(
        &self,
        id: &str,
        filter: Option<String>,
    ) -> Result<(), RegistryError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(RegistryError::ConnectionNotFound)?;
        tracing::debug!(connection_id = %id, filter = ?filter, "Subscription filter updated");
        handle.filter = filter;
        Ok(())
    }

    /// Record activity on a connection, deferring the idle sweep
    pub async fn touch(&self, id: &str) {
        if let Some(handle) = self.connections.write().await.get_mut(id) {
            handle.last_activity = Instant::now();
        }
    }

    /// Consistent copy of the currently-registered connections.
    ///
    /// Copy-on-iterate: callers never observe registrations or removals
    /// that happen while they walk the snapshot.
    pub async fn snapshot(&self) -> Vec<ConnectionSnapshot> {
        self.connections
            .read()
            .await
            .iter()
            .map(|(id, handle)| ConnectionSnapshot {
                id: id.clone(),
                sender: handle.sender.clone(),
                filter: handle.filter.clone(),
            })
            .collect()
    }

    /// Send a message directly to one connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), RegistryError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(RegistryError::ConnectionNotFound)?;
        handle
            .sender
            .send(message)
            .map_err(|_| RegistryError::SendFailed)
    }

    /// Unregister every connection idle past the liveness window.
    ///
    /// Returns the removed ids. Prevents unbounded queue growth behind
    /// clients that stopped reading without closing the transport.
    pub async fn sweep_idle(&self, window: Duration) -> Vec<ConnectionId> {
        let mut connections = self.connections.write().await;
        let idle: Vec<ConnectionId> = connections
            .iter()
            .filter(|(_, handle)| handle.last_activity.elapsed() > window)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &idle {
            connections.remove(id);
            tracing::warn!(connection_id = %id, "Unregistered idle connection");
        }
        idle
    }

    /// Run the idle sweep on a timer until the registry is dropped
    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        let window = self.config.liveness_window;
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await; // skip the immediate first tick
            loop {
                tick.tick().await;
                let removed = self.sweep_idle(window).await;
                if !removed.is_empty() {
                    tracing::debug!(count = removed.len(), "Idle sweep removed connections");
                }
            }
        })
    }

    /// Current number of registered connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Errors raised by the connection registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(RegistryConfig::default())
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let registry = registry();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = registry.register(tx).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(registry.connection_count().await, 1);

        registry.unregister(&id).await;
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = registry();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = registry.register(tx).await.unwrap();
        registry.unregister(&id).await;
        registry.unregister(&id).await;
        registry.unregister("never-registered").await;

        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let registry = ConnectionRegistry::new(RegistryConfig {
            max_connections: 2,
            ..Default::default()
        });

        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let (tx3, _rx3) = mpsc::unbounded_channel();

        registry.register(tx1).await.unwrap();
        registry.register(tx2).await.unwrap();
        let result = registry.register(tx3).await;

        assert!(matches!(
            result.unwrap_err(),
            RegistryError::TooManyConnections(2)
        ));
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let registry = registry();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = registry.register(tx).await.unwrap();
        let snapshot = registry.snapshot().await;
        registry.unregister(&id).await;

        // The copied snapshot still holds the connection removed afterwards
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_filter_matching() {
        let registry = registry();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = registry.register(tx).await.unwrap();

        // No filter: matches everything
        let snapshot = registry.snapshot().await;
        assert!(snapshot[0].matches("westlands"));
        assert!(snapshot[0].matches("karen"));

        registry
            .set_filter(&id, Some("nairobi-cbd".to_string()))
            .await
            .unwrap();
        let snapshot = registry.snapshot().await;
        assert!(snapshot[0].matches("nairobi-cbd"));
        assert!(!snapshot[0].matches("westlands"));
    }

    #[tokio::test]
    async fn test_set_filter_unknown_connection() {
        let registry = registry();
        let result = registry.set_filter("missing", None).await;
        assert!(matches!(result, Err(RegistryError::ConnectionNotFound)));
    }

    #[tokio::test]
    async fn test_sweep_idle_removes_stale_connections() {
        let registry = registry();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let stale = registry.register(tx1).await.unwrap();
        let fresh = registry.register(tx2).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        registry.touch(&fresh).await;

        let removed = registry.sweep_idle(Duration::from_millis(10)).await;
        assert_eq!(removed, vec![stale]);
        assert_eq!(registry.connection_count().await, 1);
    }
}
