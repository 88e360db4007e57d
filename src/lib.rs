//! # Airpulse
//!
//! Real-time air-quality telemetry fan-out - a server that ingests
//! pollution sensor readings and streams them to many concurrently
//! connected dashboard clients, with per-client subscription state,
//! liveness tracking, and bounded history buffering.
//!
//! ## Features
//!
//! - **Fan-out delivery**: best-effort per connection; a slow or dead
//!   client never blocks the others
//! - **Bounded history**: last 100 readings per stream for late
//!   subscribers and chart back-fill
//! - **Initial snapshots**: `request_initial_data` is answered
//!   synchronously, even before the first generator tick
//! - **Session adapter**: native feed client with capped exponential
//!   reconnect backoff
//!
//! ## Modules
//!
//! - [`telemetry`]: data model, synthetic reading generator, history
//! - [`websocket`]: connection registry, broadcaster, wire protocol
//! - [`client`]: the per-connection feed session adapter
//! - [`api`]: HTTP surface built with Axum
//! - [`assistant`]: external chat collaborator
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use airpulse::api::{serve, AppState};
//! use airpulse::assistant::AssistantClient;
//! use airpulse::config::Config;
//! use airpulse::telemetry::ReadingGenerator;
//! use airpulse::websocket::{Broadcaster, ConnectionRegistry, FeedState};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!
//!     let registry = Arc::new(ConnectionRegistry::new(config.hub.registry_config()));
//!     let generator = ReadingGenerator::new(config.feed.generator_config());
//!     let (reading, locations) = generator.initial_snapshot();
//!     let feed_state = Arc::new(FeedState::new(reading, locations));
//!     let broadcaster = Arc::new(Broadcaster::new(
//!         Arc::clone(&registry),
//!         feed_state,
//!         config.feed.history_capacity,
//!     ));
//!
//!     let (tx, rx) = mpsc::channel(64);
//!     generator.spawn(tx);
//!     Arc::clone(&broadcaster).run(rx);
//!
//!     let assistant = Arc::new(AssistantClient::new(config.assistant.client_config()));
//!     let addr = config.server.addr();
//!     let state = AppState::new(registry, broadcaster, assistant, config);
//!     serve(state, &addr).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod assistant;
pub mod client;
pub mod config;
pub mod telemetry;
pub mod websocket;

// Re-export top-level types for convenience
pub use telemetry::{
    AqiStatus, FeedEvent, GeneratorConfig, HistoryBuffer, HistoryStore, Location, LocationSite,
    Reading, ReadingGenerator, SubReading, Trend,
};

pub use websocket::{
    websocket_handler, Broadcaster, ClientMessage, ConnectionId, ConnectionRegistry, FeedState,
    RegistryConfig, RegistryError, ServerMessage,
};

pub use client::{FeedSession, FeedUpdate, SessionConfig, SessionError, SessionState};

pub use api::{build_router, serve, ApiError, AppState};

pub use assistant::{AssistantClient, AssistantConfig, AssistantError};

pub use config::{Config, ConfigError, FeedConfig, HubConfig, LoggingConfig, ServerConfig};
