//! Reading Generator
//!
//! Self-driven source of synthetic pollution readings. Emits a point
//! reading for a pseudo-randomly chosen site on one interval and a full
//! location-set snapshot on a second, longer interval.
//!
//! The generator seeds an initial reading and location set eagerly at
//! construction, so an initial-data request can be answered before the
//! first timer tick fires.

use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::types::{default_sites, Location, LocationSite, Reading, Trend};

/// Tagged event produced by the generator
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A single new reading for one location
    PollutionUpdate(Reading),
    /// A refreshed snapshot of the full location set
    LocationUpdate(Vec<Location>),
}

/// Configuration for the reading generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Interval between point readings
    pub reading_interval: Duration,
    /// Interval between full location-set snapshots
    pub location_interval: Duration,
    /// Monitored sites
    pub sites: Vec<LocationSite>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            reading_interval: Duration::from_secs(5),
            location_interval: Duration::from_secs(10),
            sites: default_sites(),
        }
    }
}

/// Produces synthetic readings and location snapshots on fixed intervals.
///
/// This component cannot error; it stops when the event channel closes.
pub struct ReadingGenerator {
    config: GeneratorConfig,
    /// Previous reading per site, for trend computation
    last_by_site: HashMap<String, Reading>,
    /// Current location set, current-reading slot overwritten on each tick
    locations: Vec<Location>,
    /// Most recent point reading
    latest: Reading,
}

impl ReadingGenerator {
    /// Create a generator with an eagerly-seeded initial state
    pub fn new(config: GeneratorConfig) -> Self {
        assert!(!config.sites.is_empty(), "generator requires at least one site");

        let mut last_by_site = HashMap::new();
        let locations: Vec<Location> = config
            .sites
            .iter()
            .map(|site| {
                let reading = synth_reading(site);
                last_by_site.insert(site.id.clone(), reading.clone());
                Location {
                    id: site.id.clone(),
                    name: site.name.clone(),
                    coordinates: site.coordinates,
                    current_reading: reading,
                    trend: Trend::Stable,
                }
            })
            .collect();

        let latest = locations[0].current_reading.clone();

        Self {
            config,
            last_by_site,
            locations,
            latest,
        }
    }

    /// The seeded initial state: one reading plus the full location set
    pub fn initial_snapshot(&self) -> (Reading, Vec<Location>) {
        (self.latest.clone(), self.locations.clone())
    }

    /// Generate the next point reading for a randomly chosen site
    pub fn next_reading(&mut self) -> Reading {
        let index = rand::thread_rng().gen_range(0..self.config.sites.len());
        let site = self.config.sites[index].clone();
        let reading = synth_reading(&site);

        self.apply_reading(&site.id, reading.clone());
        self.latest = reading.clone();
        reading
    }

    /// Refresh every site's current reading and return the location set
    pub fn location_snapshot(&mut self) -> Vec<Location> {
        for site in self.config.sites.clone() {
            let reading = synth_reading(&site);
            self.apply_reading(&site.id, reading);
        }
        self.locations.clone()
    }

    /// Overwrite a location's current-reading slot and recompute its trend
    fn apply_reading(&mut self, site_id: &str, reading: Reading) {
        let trend = self
            .last_by_site
            .get(site_id)
            .map(|previous| Trend::between(previous, &reading))
            .unwrap_or(Trend::Stable);

        if let Some(location) = self.locations.iter_mut().find(|l| l.id == site_id) {
            location.current_reading = reading.clone();
            location.trend = trend;
        }
        self.last_by_site.insert(site_id.to_string(), reading);
    }

    /// Drive the generator on its timers, sending events into `tx`.
    ///
    /// The first tick of each interval fires immediately, so subscribers
    /// connected at startup receive data without waiting a full period.
    /// The task ends when the receiving side of the channel is dropped.
    pub fn spawn(mut self, tx: mpsc::Sender<FeedEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut reading_tick = tokio::time::interval(self.config.reading_interval);
            let mut location_tick = tokio::time::interval(self.config.location_interval);

            loop {
                tokio::select! {
                    _ = reading_tick.tick() => {
                        let reading = self.next_reading();
                        tracing::trace!(location = %reading.location, aqi = reading.aqi, "Generated reading");
                        if tx.send(FeedEvent::PollutionUpdate(reading)).await.is_err() {
                            break;
                        }
                    }
                    _ = location_tick.tick() => {
                        let locations = self.location_snapshot();
                        if tx.send(FeedEvent::LocationUpdate(locations)).await.is_err() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Reading generator stopped");
        })
    }
}

/// Synthesize a reading for a site with the feed's numeric ranges
fn synth_reading(site: &LocationSite) -> Reading {
    let mut rng = rand::thread_rng();
    Reading::new(
        site.id.clone(),
        rng.gen_range(20.0..220.0),
        rng.gen_range(10.0..110.0),
        rng.gen_range(20.0..70.0),
        rng.gen_range(50.0..250.0),
    )
    .indoor(rng.gen_range(50.0..200.0), rng.gen_range(20.0..100.0))
    .outdoor(rng.gen_range(100.0..400.0), rng.gen_range(30.0..150.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::types::AqiStatus;

    #[test]
    fn test_initial_snapshot_is_seeded_eagerly() {
        let generator = ReadingGenerator::new(GeneratorConfig::default());
        let (reading, locations) = generator.initial_snapshot();

        assert!(!reading.location.is_empty());
        assert_eq!(locations.len(), default_sites().len());
        for location in &locations {
            assert_eq!(location.trend, Trend::Stable);
            assert_eq!(location.current_reading.location, location.id);
        }
    }

    #[test]
    fn test_reading_within_ranges() {
        let mut generator = ReadingGenerator::new(GeneratorConfig::default());

        for _ in 0..50 {
            let reading = generator.next_reading();
            assert!((20.0..220.0).contains(&reading.pm25));
            assert!((10.0..110.0).contains(&reading.no2));
            assert!((20.0..70.0).contains(&reading.co));
            assert!((50.0..250.0).contains(&reading.aqi));
            assert_eq!(reading.status, AqiStatus::from_aqi(reading.aqi));

            let indoor = reading.indoor.expect("indoor sub-reading");
            assert!((50.0..200.0).contains(&indoor.pm25));
            let outdoor = reading.outdoor.expect("outdoor sub-reading");
            assert!((100.0..400.0).contains(&outdoor.pm25));
        }
    }

    #[test]
    fn test_reading_updates_location_slot() {
        let mut generator = ReadingGenerator::new(GeneratorConfig::default());
        let reading = generator.next_reading();

        let (_, locations) = generator.initial_snapshot();
        let location = locations
            .iter()
            .find(|l| l.id == reading.location)
            .expect("site for generated reading");
        assert_eq!(location.current_reading, reading);
    }

    #[test]
    fn test_location_snapshot_refreshes_every_site() {
        let mut generator = ReadingGenerator::new(GeneratorConfig::default());
        let (_, before) = generator.initial_snapshot();
        let after = generator.location_snapshot();

        assert_eq!(before.len(), after.len());
        for (old, new) in before.iter().zip(after.iter()) {
            assert_eq!(old.id, new.id);
            assert_ne!(old.current_reading.timestamp, new.current_reading.timestamp);
        }
    }

    #[tokio::test]
    async fn test_spawn_emits_both_event_kinds() {
        let config = GeneratorConfig {
            reading_interval: Duration::from_millis(10),
            location_interval: Duration::from_millis(25),
            sites: default_sites(),
        };
        let (tx, mut rx) = mpsc::channel(16);
        let handle = ReadingGenerator::new(config).spawn(tx);

        let mut saw_reading = false;
        let mut saw_locations = false;
        for _ in 0..10 {
            match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
                Ok(Some(FeedEvent::PollutionUpdate(_))) => saw_reading = true,
                Ok(Some(FeedEvent::LocationUpdate(locations))) => {
                    assert_eq!(locations.len(), default_sites().len());
                    saw_locations = true;
                }
                _ => break,
            }
            if saw_reading && saw_locations {
                break;
            }
        }

        assert!(saw_reading);
        assert!(saw_locations);

        drop(rx);
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}
