//! Application State
//!
//! Shared state accessible by all API handlers. Owned by the
//! composition root and wrapped in Arc for sharing across tasks; no
//! component reaches for a global.

use std::sync::Arc;
use std::time::Instant;

use crate::assistant::AssistantClient;
use crate::config::Config;
use crate::websocket::{Broadcaster, ConnectionRegistry};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Live connection tracking and subscription state
    pub registry: Arc<ConnectionRegistry>,
    /// Feed fan-out, latest values, and buffered history
    pub broadcaster: Arc<Broadcaster>,
    /// Chat collaborator (degrades to canned replies when unconfigured)
    pub assistant: Arc<AssistantClient>,
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        broadcaster: Arc<Broadcaster>,
        assistant: Arc<AssistantClient>,
        config: Config,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            assistant,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Current WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.registry.connection_count().await
    }
}
