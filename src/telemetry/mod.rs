//! Telemetry Core
//!
//! The data model, synthetic reading generator, and bounded history
//! buffering for the pollution feed.
//!
//! - [`types`]: readings, locations, AQI severity, trends
//! - [`generator`]: timer-driven synthetic reading source
//! - [`history`]: bounded per-stream history buffers

pub mod generator;
pub mod history;
pub mod types;

pub use generator::{FeedEvent, GeneratorConfig, ReadingGenerator};
pub use history::{HistoryBuffer, HistoryStore, DEFAULT_HISTORY_CAPACITY};
pub use types::{default_sites, AqiStatus, Location, LocationSite, Reading, SubReading, Trend};
