//! Data Transfer Objects
//!
//! Request and response types for the REST endpoints.

use serde::{Deserialize, Serialize};

/// Full health status response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy"
    pub status: String,
    /// Number of live WebSocket connections
    pub connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Crate version
    pub version: String,
}

/// Query parameters for GET /api/v1/readings/history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one location's stream
    #[serde(default)]
    pub location: Option<String>,
    /// Cap the number of returned readings (most recent kept)
    #[serde(default)]
    pub limit: Option<usize>,
}
