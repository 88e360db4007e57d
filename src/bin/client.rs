//! Airpulse Terminal Client
//!
//! Run with: cargo run --bin airpulse-client -- ws://localhost:8090/ws
//!
//! Connects to a running feed server through the session adapter and
//! prints decoded updates until interrupted. Useful for smoke-testing
//! fan-out, filters, and reconnection behavior.

use airpulse::client::{FeedSession, FeedUpdate, SessionConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("airpulse=info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:8090/ws".to_string());
    let location = std::env::args().nth(2);

    tracing::info!("Connecting to {}", url);
    let (session, mut updates) = FeedSession::connect(SessionConfig::new(url));

    if let Some(location_id) = location {
        tracing::info!("Filtering feed to location {}", location_id);
        session.subscribe(Some(location_id))?;
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(FeedUpdate::Pollution(reading)) => {
                    println!(
                        "[{}] {} pm2.5={:.0} no2={:.0} co={:.0} aqi={:.0} ({:?})",
                        reading.timestamp.format("%H:%M:%S"),
                        reading.location,
                        reading.pm25,
                        reading.no2,
                        reading.co,
                        reading.aqi,
                        reading.status,
                    );
                }
                Some(FeedUpdate::Locations(locations)) => {
                    println!("-- location snapshot ({} sites) --", locations.len());
                    for location in locations {
                        println!(
                            "   {:<12} aqi={:.0} trend={:?}",
                            location.name, location.current_reading.aqi, location.trend
                        );
                    }
                }
                Some(FeedUpdate::Historical(readings)) => {
                    println!("-- historical replay: {} readings --", readings.len());
                }
                Some(FeedUpdate::Chat(message)) => {
                    println!("assistant: {}", message);
                }
                None => {
                    tracing::info!("Session ended");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Closing session");
                session.close();
                break;
            }
        }
    }

    Ok(())
}
