//! Fan-Out Broadcaster
//!
//! Consumes generator events and delivers them to every registered
//! connection whose filter matches. Delivery is best-effort per
//! connection: a dead consumer is unregistered and never blocks the
//! others, and a failed send is not retried for the same event.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::telemetry::{FeedEvent, HistoryStore, Location, Reading};

use super::messages::ServerMessage;
use super::registry::{ConnectionId, ConnectionRegistry};

/// Latest known feed values, seeded at startup from the generator's
/// eager snapshot so initial-data requests always have an answer.
pub struct FeedState {
    latest: RwLock<Reading>,
    locations: RwLock<Vec<Location>>,
}

impl FeedState {
    pub fn new(latest: Reading, locations: Vec<Location>) -> Self {
        Self {
            latest: RwLock::new(latest),
            locations: RwLock::new(locations),
        }
    }

    pub async fn latest_reading(&self) -> Reading {
        self.latest.read().await.clone()
    }

    pub async fn locations(&self) -> Vec<Location> {
        self.locations.read().await.clone()
    }
}

/// Pushes feed events to all registered connections
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    state: Arc<FeedState>,
    history: RwLock<HistoryStore>,
}

impl Broadcaster {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        state: Arc<FeedState>,
        history_capacity: usize,
    ) -> Self {
        Self {
            registry,
            state,
            history: RwLock::new(HistoryStore::new(history_capacity)),
        }
    }

    /// Consume generator events until the channel closes
    pub fn run(self: Arc<Self>, mut rx: mpsc::Receiver<FeedEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.handle_event(event).await;
            }
            tracing::debug!("Broadcaster stopped");
        })
    }

    /// Record one event into shared state and fan it out
    pub async fn handle_event(&self, event: FeedEvent) {
        match event {
            FeedEvent::PollutionUpdate(reading) => {
                *self.state.latest.write().await = reading.clone();
                self.history.write().await.record(&reading);
                self.deliver_reading(&reading).await;
            }
            FeedEvent::LocationUpdate(locations) => {
                *self.state.locations.write().await = locations.clone();
                self.deliver(ServerMessage::LocationUpdate(locations)).await;
            }
        }
    }

    /// Deliver a reading to every connection whose filter matches
    async fn deliver_reading(&self, reading: &Reading) {
        let connections = self.registry.snapshot().await;
        let mut delivered: Vec<ConnectionId> = Vec::new();
        let mut failed: Vec<ConnectionId> = Vec::new();

        for conn in connections {
            if !conn.matches(&reading.location) {
                continue;
            }
            match conn.sender.send(ServerMessage::PollutionUpdate(reading.clone())) {
                Ok(()) => delivered.push(conn.id),
                Err(_) => failed.push(conn.id),
            }
        }

        self.finish_round(delivered, failed, "pollution_update").await;
    }

    /// Deliver an unfiltered message to every connection
    async fn deliver(&self, message: ServerMessage) {
        let connections = self.registry.snapshot().await;
        let mut delivered: Vec<ConnectionId> = Vec::new();
        let mut failed: Vec<ConnectionId> = Vec::new();

        for conn in connections {
            match conn.sender.send(message.clone()) {
                Ok(()) => delivered.push(conn.id),
                Err(_) => failed.push(conn.id),
            }
        }

        self.finish_round(delivered, failed, "location_update").await;
    }

    /// Enqueueing is not delivery: liveness is refreshed only when the
    /// socket write completes, so a reader that stops draining its
    /// queue still ages out of the registry.
    async fn finish_round(
        &self,
        delivered: Vec<ConnectionId>,
        failed: Vec<ConnectionId>,
        kind: &str,
    ) {
        if !delivered.is_empty() {
            tracing::trace!(kind, subscribers = delivered.len(), "Broadcast event");
        }
        // A failed send means the consumer is gone; report it to the
        // registry instead of retrying.
        for id in failed {
            tracing::debug!(connection_id = %id, "Send failed, unregistering");
            self.registry.unregister(&id).await;
        }
    }

    /// The synchronous initial-data reply: one `pollution_update` with
    /// the latest reading and one `location_update` with the full
    /// current location set, independent of the periodic cadence.
    pub async fn initial_data(&self) -> (ServerMessage, ServerMessage) {
        (
            ServerMessage::PollutionUpdate(self.state.latest_reading().await),
            ServerMessage::LocationUpdate(self.state.locations().await),
        )
    }

    /// Location set narrowed to one id; empty when the id is unknown
    pub async fn location_data(&self, location_id: &str) -> ServerMessage {
        let locations = self
            .state
            .locations()
            .await
            .into_iter()
            .filter(|l| l.id == location_id)
            .collect();
        ServerMessage::LocationUpdate(locations)
    }

    /// Buffered readings within [start, end]
    pub async fn historical(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> ServerMessage {
        ServerMessage::HistoricalData(self.history.read().await.range(start, end))
    }

    /// Latest reading (REST back-fill)
    pub async fn latest_reading(&self) -> Reading {
        self.state.latest_reading().await
    }

    /// Current location set (REST back-fill)
    pub async fn locations(&self) -> Vec<Location> {
        self.state.locations().await
    }

    /// Snapshot of the buffered global stream (REST back-fill)
    pub async fn history_snapshot(&self, location: Option<&str>) -> Vec<Reading> {
        let history = self.history.read().await;
        match location {
            Some(id) => history.location_snapshot(id),
            None => history.global_snapshot(),
        }
    }
}
