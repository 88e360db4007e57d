//! WebSocket Message Types
//!
//! Wire protocol between feed clients (dashboards) and the server.
//! Every message is an envelope `{ "type": ..., "payload": ... }`;
//! messages with no payload carry only the type tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::telemetry::{Location, Reading};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request an immediate snapshot of the latest reading and location set
    RequestInitialData,
    /// Request the current reading for one location; also narrows this
    /// connection's feed to that location
    #[serde(rename_all = "camelCase")]
    RequestLocationData { location_id: String },
    /// Request buffered readings within a date range
    #[serde(rename_all = "camelCase")]
    RequestHistoricalData {
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    },
    /// Set or clear this connection's location filter
    #[serde(rename_all = "camelCase")]
    Subscribe { location_id: Option<String> },
    /// Question for the assistant collaborator; answered with `chat_response`
    ChatMessage { message: String },
    /// Keepalive
    Ping,
    /// Any message type this server does not know. Ignored silently so
    /// newer clients keep working against older servers.
    #[serde(other)]
    Unknown,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established, carries the assigned connection id
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: String },
    /// A single new reading
    PollutionUpdate(Reading),
    /// Wholesale replacement of the location set
    LocationUpdate(Vec<Location>),
    /// Buffered readings for a historical replay
    HistoricalData(Vec<Reading>),
    /// Assistant reply to a `chat_message`
    ChatResponse { message: String },
    /// Keepalive reply
    Pong,
    /// Malformed-request report; the connection stays open
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_initial_data_parses_without_payload() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "request_initial_data"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::RequestInitialData));
    }

    #[test]
    fn test_request_location_data_parses_camel_case_payload() {
        let json = r#"{"type": "request_location_data", "payload": {"locationId": "westlands"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::RequestLocationData { location_id } => {
                assert_eq!(location_id, "westlands");
            }
            _ => panic!("Expected RequestLocationData"),
        }
    }

    #[test]
    fn test_request_historical_data_parses_dates() {
        let json = r#"{"type": "request_historical_data", "payload": {"startDate": "2026-08-01T00:00:00Z", "endDate": "2026-08-02T00:00:00Z"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::RequestHistoricalData {
                start_date,
                end_date,
            } => {
                assert!(start_date < end_date);
            }
            _ => panic!("Expected RequestHistoricalData"),
        }
    }

    #[test]
    fn test_unknown_type_is_forward_compatible() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "request_favourite_color"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Unknown));
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let json = r#"{"type": "chat_message", "payload": {"wrong": true}}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_pollution_update_envelope_shape() {
        let reading = Reading::new("westlands", 80.0, 40.0, 30.0, 120.0);
        let json = serde_json::to_string(&ServerMessage::PollutionUpdate(reading)).unwrap();
        assert!(json.contains("\"type\":\"pollution_update\""));
        assert!(json.contains("\"payload\":{"));
        assert!(json.contains("\"location\":\"westlands\""));
    }

    #[test]
    fn test_pong_serializes_without_payload() {
        let json = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    #[test]
    fn test_connected_envelope_is_camel_case() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connectionId\":\"abc-123\""));
    }

    #[test]
    fn test_server_message_round_trips_for_clients() {
        let reading = Reading::new("karen", 60.0, 30.0, 25.0, 90.0);
        let json = serde_json::to_string(&ServerMessage::PollutionUpdate(reading.clone())).unwrap();
        let parsed: ServerMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            ServerMessage::PollutionUpdate(r) => assert_eq!(r, reading),
            _ => panic!("Expected PollutionUpdate"),
        }
    }
}
