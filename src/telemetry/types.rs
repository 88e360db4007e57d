//! Telemetry Data Model
//!
//! Core value types for the pollution feed: readings, monitored locations,
//! and the AQI severity scale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity bands derived from the AQI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiStatus {
    Good,
    Moderate,
    Unhealthy,
    Hazardous,
}

impl AqiStatus {
    /// Derive the status band from an AQI value.
    ///
    /// Thresholds: <=50 Good, <=100 Moderate, <=200 Unhealthy, above Hazardous.
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= 50.0 {
            AqiStatus::Good
        } else if aqi <= 100.0 {
            AqiStatus::Moderate
        } else if aqi <= 200.0 {
            AqiStatus::Unhealthy
        } else {
            AqiStatus::Hazardous
        }
    }
}

/// Indoor/outdoor sub-measurement attached to a reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubReading {
    pub pm25: f64,
    pub no2: f64,
}

/// One timestamped sensor measurement tuple for a location.
///
/// Immutable once created; retained only inside the history buffer
/// until evicted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// When the measurement was taken
    pub timestamp: DateTime<Utc>,
    /// Location identifier (e.g. "westlands")
    pub location: String,
    pub pm25: f64,
    pub no2: f64,
    pub co: f64,
    pub aqi: f64,
    /// Severity band, derived from `aqi`
    pub status: AqiStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indoor: Option<SubReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdoor: Option<SubReading>,
}

impl Reading {
    /// Create a reading with the status derived from the AQI value
    pub fn new(location: impl Into<String>, pm25: f64, no2: f64, co: f64, aqi: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            location: location.into(),
            pm25,
            no2,
            co,
            aqi,
            status: AqiStatus::from_aqi(aqi),
            indoor: None,
            outdoor: None,
        }
    }

    /// Attach indoor sub-readings
    pub fn indoor(mut self, pm25: f64, no2: f64) -> Self {
        self.indoor = Some(SubReading { pm25, no2 });
        self
    }

    /// Attach outdoor sub-readings
    pub fn outdoor(mut self, pm25: f64, no2: f64) -> Self {
        self.outdoor = Some(SubReading { pm25, no2 });
        self
    }
}

/// Direction of change between the last two readings at a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// AQI movement smaller than this is reported as stable
const TREND_THRESHOLD: f64 = 5.0;

impl Trend {
    /// Compare two consecutive readings for the same location
    pub fn between(previous: &Reading, current: &Reading) -> Self {
        let delta = current.aqi - previous.aqi;
        if delta > TREND_THRESHOLD {
            Trend::Up
        } else if delta < -TREND_THRESHOLD {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

/// A monitored site with a fixed coordinate and its latest reading.
///
/// The location set is statically configured at startup; the
/// `current_reading` slot is overwritten on each update tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    /// [latitude, longitude]
    pub coordinates: [f64; 2],
    pub current_reading: Reading,
    pub trend: Trend,
}

/// Static site definition used to configure the location set
#[derive(Debug, Clone, Deserialize)]
pub struct LocationSite {
    pub id: String,
    pub name: String,
    pub coordinates: [f64; 2],
}

impl LocationSite {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinates: [f64; 2]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinates,
        }
    }
}

/// The default monitored sites (Nairobi)
pub fn default_sites() -> Vec<LocationSite> {
    vec![
        LocationSite::new("nairobi-cbd", "Nairobi CBD", [-1.2921, 36.8219]),
        LocationSite::new("westlands", "Westlands", [-1.2683, 36.8111]),
        LocationSite::new("karen", "Karen", [-1.3194, 36.7096]),
        LocationSite::new("eastlands", "Eastlands", [-1.2833, 36.8500]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_aqi_thresholds() {
        assert_eq!(AqiStatus::from_aqi(0.0), AqiStatus::Good);
        assert_eq!(AqiStatus::from_aqi(50.0), AqiStatus::Good);
        assert_eq!(AqiStatus::from_aqi(50.1), AqiStatus::Moderate);
        assert_eq!(AqiStatus::from_aqi(100.0), AqiStatus::Moderate);
        assert_eq!(AqiStatus::from_aqi(150.0), AqiStatus::Unhealthy);
        assert_eq!(AqiStatus::from_aqi(200.0), AqiStatus::Unhealthy);
        assert_eq!(AqiStatus::from_aqi(200.1), AqiStatus::Hazardous);
    }

    #[test]
    fn test_reading_derives_status() {
        let reading = Reading::new("westlands", 80.0, 40.0, 30.0, 120.0);
        assert_eq!(reading.status, AqiStatus::Unhealthy);
        assert!(reading.indoor.is_none());
        assert!(reading.outdoor.is_none());
    }

    #[test]
    fn test_trend_between_readings() {
        let older = Reading::new("karen", 80.0, 40.0, 30.0, 100.0);
        let rising = Reading::new("karen", 90.0, 45.0, 32.0, 140.0);
        let falling = Reading::new("karen", 60.0, 30.0, 25.0, 60.0);
        let flat = Reading::new("karen", 81.0, 41.0, 30.0, 102.0);

        assert_eq!(Trend::between(&older, &rising), Trend::Up);
        assert_eq!(Trend::between(&older, &falling), Trend::Down);
        assert_eq!(Trend::between(&older, &flat), Trend::Stable);
    }

    #[test]
    fn test_reading_serializes_wire_shape() {
        let reading = Reading::new("westlands", 80.0, 40.0, 30.0, 120.0).indoor(60.0, 25.0);
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"location\":\"westlands\""));
        assert!(json.contains("\"status\":\"Unhealthy\""));
        assert!(json.contains("\"indoor\""));
        assert!(!json.contains("\"outdoor\""));
    }

    #[test]
    fn test_location_serializes_camel_case() {
        let reading = Reading::new("karen", 50.0, 20.0, 25.0, 40.0);
        let location = Location {
            id: "karen".to_string(),
            name: "Karen".to_string(),
            coordinates: [-1.3194, 36.7096],
            current_reading: reading,
            trend: Trend::Stable,
        };
        let json = serde_json::to_string(&location).unwrap();
        assert!(json.contains("\"currentReading\""));
        assert!(json.contains("\"trend\":\"stable\""));
    }
}
