//! Airpulse Feed Server
//!
//! Run with: cargo run --bin airpulse
//!
//! # Configuration
//!
//! Loaded from `config.toml` (or `~/.config/airpulse/config.toml`,
//! `/etc/airpulse/config.toml`) with environment overrides:
//! - `AIRPULSE_HOST`: Host to bind to (default: 0.0.0.0)
//! - `AIRPULSE_PORT`: Port to listen on (default: 8090)
//! - `AIRPULSE_ASSISTANT_URL`: Assistant API URL (optional, enables chat upstream)
//! - `AIRPULSE_LOG_LEVEL` / `AIRPULSE_LOG_FORMAT`: Logging overrides
//! - `RUST_LOG`: Tracing filter (default: airpulse=info,tower_http=debug)

use airpulse::api::{serve, AppState};
use airpulse::assistant::AssistantClient;
use airpulse::config::Config;
use airpulse::telemetry::ReadingGenerator;
use airpulse::websocket::{Broadcaster, ConnectionRegistry, FeedState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();
    init_tracing(&config);

    tracing::info!("Starting Airpulse feed server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Feed: {} sites, readings every {}s, snapshots every {}s",
        config.feed.sites.len(),
        config.feed.reading_interval_secs,
        config.feed.location_interval_secs
    );

    // Connection registry, owned here and injected everywhere it is used
    let registry = Arc::new(ConnectionRegistry::new(config.hub.registry_config()));
    let sweeper = Arc::clone(&registry).spawn_sweeper();

    // Generator seeds the feed state eagerly so initial-data requests
    // can be answered before the first tick
    let generator = ReadingGenerator::new(config.feed.generator_config());
    let (reading, locations) = generator.initial_snapshot();
    let feed_state = Arc::new(FeedState::new(reading, locations));

    let broadcaster = Arc::new(Broadcaster::new(
        Arc::clone(&registry),
        feed_state,
        config.feed.history_capacity,
    ));

    let (event_tx, event_rx) = mpsc::channel(64);
    let generator_task = generator.spawn(event_tx);
    let broadcaster_task = Arc::clone(&broadcaster).run(event_rx);

    let assistant = Arc::new(AssistantClient::new(config.assistant.client_config()));
    if assistant.is_enabled() {
        tracing::info!("Assistant upstream enabled");
    } else {
        tracing::info!("Assistant upstream disabled (set AIRPULSE_ASSISTANT_URL to enable)");
    }

    let addr = config.server.addr();
    let state = AppState::new(Arc::clone(&registry), broadcaster, assistant, config);

    tracing::info!("Starting server on {}", addr);
    serve(state, &addr).await?;

    // Shutdown cancels the timers and closes all connections
    generator_task.abort();
    broadcaster_task.abort();
    sweeper.abort();
    tracing::info!("Airpulse feed server stopped");

    Ok(())
}

/// Initialize tracing per the logging config
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "airpulse={},tower_http=debug",
            config.logging.level
        ))
    });

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
