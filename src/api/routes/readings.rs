//! Reading Routes
//!
//! REST back-fill for dashboards that want the current state without
//! holding a WebSocket open.
//!
//! - GET /api/v1/readings/current - latest reading
//! - GET /api/v1/readings/history - buffered readings, optionally per location
//! - GET /api/v1/locations - current location set

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::HistoryQuery;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::telemetry::{Location, Reading};

/// GET /api/v1/readings/current
pub async fn current_reading(State(state): State<Arc<AppState>>) -> Json<Reading> {
    Json(state.broadcaster.latest_reading().await)
}

/// GET /api/v1/readings/history?location=..&limit=..
pub async fn reading_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<Reading>>> {
    if query.limit == Some(0) {
        return Err(ApiError::Validation(
            "limit must be at least 1".to_string(),
        ));
    }

    // A location that is not in the monitored set is a caller mistake;
    // a known location with no buffered readings is an empty array.
    if let Some(id) = query.location.as_deref() {
        let known = state
            .broadcaster
            .locations()
            .await
            .iter()
            .any(|l| l.id == id);
        if !known {
            return Err(ApiError::NotFound(format!("unknown location: {}", id)));
        }
    }

    let mut readings = state
        .broadcaster
        .history_snapshot(query.location.as_deref())
        .await;

    // Keep the most recent `limit` readings, still in arrival order
    if let Some(limit) = query.limit {
        if readings.len() > limit {
            let excess = readings.len() - limit;
            readings.drain(..excess);
        }
    }

    Ok(Json(readings))
}

/// GET /api/v1/locations
pub async fn list_locations(State(state): State<Arc<AppState>>) -> Json<Vec<Location>> {
    Json(state.broadcaster.locations().await)
}
