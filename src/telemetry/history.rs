//! History Buffer
//!
//! Bounded ring of recent readings per stream, serving late subscribers
//! and chart back-fill. One global stream plus one stream per location.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

use super::types::Reading;

/// Default number of readings retained per stream
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Bounded FIFO buffer of readings in arrival order
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    buf: VecDeque<Reading>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reading, evicting the oldest when full. O(1) amortized.
    /// A zero-capacity buffer retains nothing.
    pub fn append(&mut self, reading: Reading) {
        if self.capacity == 0 {
            return;
        }
        while self.buf.len() >= self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(reading);
    }

    /// Ordered copy of the buffered readings, oldest first
    pub fn snapshot(&self) -> Vec<Reading> {
        self.buf.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Per-stream history: one global buffer plus lazily-created
/// per-location buffers, all with the same capacity.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    global: HistoryBuffer,
    by_location: HashMap<String, HistoryBuffer>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            global: HistoryBuffer::new(capacity),
            by_location: HashMap::new(),
        }
    }

    /// Record a reading into the global stream and its location stream
    pub fn record(&mut self, reading: &Reading) {
        self.global.append(reading.clone());
        self.by_location
            .entry(reading.location.clone())
            .or_insert_with(|| HistoryBuffer::new(self.capacity))
            .append(reading.clone());
    }

    /// Snapshot of the global stream
    pub fn global_snapshot(&self) -> Vec<Reading> {
        self.global.snapshot()
    }

    /// Snapshot of one location's stream; empty if never seen
    pub fn location_snapshot(&self, location: &str) -> Vec<Reading> {
        self.by_location
            .get(location)
            .map(|b| b.snapshot())
            .unwrap_or_default()
    }

    /// Global readings with timestamps inside [start, end]
    pub fn range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Reading> {
        self.global
            .snapshot()
            .into_iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reading(location: &str, aqi: f64) -> Reading {
        Reading::new(location, 80.0, 40.0, 30.0, aqi)
    }

    #[test]
    fn test_append_and_snapshot_order() {
        let mut buf = HistoryBuffer::new(10);
        buf.append(reading("karen", 1.0));
        buf.append(reading("karen", 2.0));
        buf.append(reading("karen", 3.0));

        let snapshot = buf.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].aqi, 1.0);
        assert_eq!(snapshot[2].aqi, 3.0);
    }

    #[test]
    fn test_bounded_history_evicts_oldest() {
        let mut buf = HistoryBuffer::new(100);
        for i in 0..250 {
            buf.append(reading("karen", i as f64));
        }

        let snapshot = buf.snapshot();
        assert_eq!(snapshot.len(), 100);
        // The most recent 100 entries, in arrival order
        assert_eq!(snapshot[0].aqi, 150.0);
        assert_eq!(snapshot[99].aqi, 249.0);
    }

    #[test]
    fn test_zero_capacity_buffer_retains_nothing() {
        let mut buf = HistoryBuffer::new(0);
        for i in 0..1000 {
            buf.append(reading("karen", i as f64));
        }
        assert!(buf.is_empty());
        assert!(buf.snapshot().is_empty());
    }

    #[test]
    fn test_capacity_one_keeps_only_latest() {
        let mut buf = HistoryBuffer::new(1);
        buf.append(reading("karen", 1.0));
        buf.append(reading("karen", 2.0));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.snapshot()[0].aqi, 2.0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut buf = HistoryBuffer::new(10);
        buf.append(reading("karen", 1.0));
        let snapshot = buf.snapshot();
        buf.append(reading("karen", 2.0));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_store_records_global_and_per_location() {
        let mut store = HistoryStore::new(100);
        store.record(&reading("westlands", 120.0));
        store.record(&reading("karen", 60.0));
        store.record(&reading("westlands", 130.0));

        assert_eq!(store.global_snapshot().len(), 3);
        assert_eq!(store.location_snapshot("westlands").len(), 2);
        assert_eq!(store.location_snapshot("karen").len(), 1);
        assert!(store.location_snapshot("eastlands").is_empty());
    }

    #[test]
    fn test_range_filters_by_timestamp() {
        let mut store = HistoryStore::new(100);
        let now = Utc::now();

        let mut old = reading("karen", 50.0);
        old.timestamp = now - Duration::hours(2);
        let mut recent = reading("karen", 60.0);
        recent.timestamp = now - Duration::minutes(5);

        store.record(&old);
        store.record(&recent);

        let results = store.range(now - Duration::hours(1), now);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].aqi, 60.0);
    }
}
