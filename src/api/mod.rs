//! Airpulse HTTP API
//!
//! HTTP surface for the feed server, built with Axum.
//!
//! # Endpoints
//!
//! ## Readings
//! - `GET /api/v1/readings/current` - Latest reading
//! - `GET /api/v1/readings/history` - Buffered readings (query: location, limit)
//! - `GET /api/v1/locations` - Current location set
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws` - Real-time feed connection

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/readings/current", get(routes::readings::current_reading))
        .route("/readings/history", get(routes::readings::reading_history))
        .route("/locations", get(routes::readings::list_locations));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()) // Configure properly in production
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, addr: &str) -> Result<(), ApiError> {
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Airpulse feed listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Airpulse feed shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{AssistantClient, AssistantConfig};
    use crate::config::Config;
    use crate::telemetry::{GeneratorConfig, ReadingGenerator};
    use crate::websocket::{Broadcaster, ConnectionRegistry, FeedState, RegistryConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let registry = Arc::new(ConnectionRegistry::new(RegistryConfig::default()));
        let generator = ReadingGenerator::new(GeneratorConfig::default());
        let (reading, locations) = generator.initial_snapshot();
        let feed_state = Arc::new(FeedState::new(reading, locations));
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry), feed_state, 100));
        let assistant = Arc::new(AssistantClient::new(AssistantConfig::default()));

        let state = AppState::new(registry, broadcaster, assistant, Config::default());
        build_router(state)
    }

    async fn get_response(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let response = get_response(create_test_app(), "/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let response = get_response(create_test_app(), "/health/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let response = get_response(create_test_app(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn test_current_reading_available_at_startup() {
        let response = get_response(create_test_app(), "/api/v1/readings/current").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["location"].is_string());
        assert!(body["aqi"].is_number());
    }

    #[tokio::test]
    async fn test_list_locations() {
        let response = get_response(create_test_app(), "/api/v1/locations").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let locations = body.as_array().unwrap();
        assert_eq!(locations.len(), 4);
        assert!(locations[0]["currentReading"].is_object());
    }

    #[tokio::test]
    async fn test_history_unknown_location_is_not_found() {
        let response =
            get_response(create_test_app(), "/api/v1/readings/history?location=atlantis").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_history_rejects_zero_limit() {
        let response = get_response(create_test_app(), "/api/v1/readings/history?limit=0").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_history_empty_before_any_event() {
        let response = get_response(create_test_app(), "/api/v1/readings/history?limit=10").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.as_array().unwrap().is_empty());
    }
}
