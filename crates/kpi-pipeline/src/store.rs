//! KPI Sample Store
//!
//! The read contract the pipeline consumes, and an in-memory store that
//! implements it. Samples are kept in UTC day buckets addressed by second
//! offset; an offset may hold an explicit missing marker.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use kpi_common::time::utc_day_floor;
use kpi_common::{EntityCoordinate, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Store Contract
// =============================================================================

/// One stored UTC day of samples for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBucket {
    /// Midnight UTC of the day.
    pub day: i64,
    /// Second offset within the day to value, `None` when missing.
    pub samples: BTreeMap<u32, Option<f64>>,
}

/// Raw sample source used by the `Find` stage.
///
/// Failures must be reported as errors; the pipeline propagates them as is.
pub trait SampleStore {
    /// Day buckets for `entity` with `day_start <= day <= day_end`.
    fn query(&self, entity: &EntityCoordinate, day_start: i64, day_end: i64) -> Result<Vec<DayBucket>>;
}

// =============================================================================
// Anomaly Contract
// =============================================================================

/// A detected anomaly persisted by an external scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub entity: EntityCoordinate,
    pub timestamp: i64,
    pub detector: String,
    pub score: f64,
}

/// How anomaly listings are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyGrouping {
    Entity,
    Detector,
    EntityAndDetector,
}

/// One row of a grouped anomaly listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyCount {
    pub entity: Option<EntityCoordinate>,
    pub detector: Option<String>,
    pub count: usize,
    pub first_seen: i64,
    pub last_seen: i64,
}

/// Store side grouped aggregation over recorded anomalies.
pub trait AnomalySource {
    fn grouped_anomalies(
        &self,
        entities: &[EntityCoordinate],
        start: i64,
        end: i64,
        grouping: AnomalyGrouping,
    ) -> Result<Vec<AnomalyCount>>;
}

// =============================================================================
// Memory Store
// =============================================================================

type DayMap = BTreeMap<i64, BTreeMap<u32, Option<f64>>>;

/// In-process store for embedding and tests.
#[derive(Default)]
pub struct MemoryStore {
    samples: RwLock<HashMap<EntityCoordinate, DayMap>>,
    anomalies: RwLock<Vec<AnomalyRecord>>,
    stats: RwLock<StoreStats>,
}

/// Counters for the memory store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    pub samples_written: u64,
    pub queries_executed: u64,
    pub buckets_returned: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a single sample.
    pub fn write(&self, entity: &EntityCoordinate, timestamp: i64, value: f64) {
        self.put(entity, timestamp, Some(value));
    }

    /// Mark a timestamp as explicitly missing.
    pub fn write_missing(&self, entity: &EntityCoordinate, timestamp: i64) {
        self.put(entity, timestamp, None);
    }

    /// Write a batch of samples for one entity.
    pub fn write_batch(&self, entity: &EntityCoordinate, points: impl IntoIterator<Item = (i64, f64)>) {
        let mut samples = self.samples.write();
        let days = samples.entry(entity.clone()).or_default();
        let mut written = 0;
        for (timestamp, value) in points {
            let (day, offset) = split(timestamp);
            days.entry(day).or_default().insert(offset, Some(value));
            written += 1;
        }
        self.stats.write().samples_written += written;
    }

    fn put(&self, entity: &EntityCoordinate, timestamp: i64, value: Option<f64>) {
        let (day, offset) = split(timestamp);
        self.samples
            .write()
            .entry(entity.clone())
            .or_default()
            .entry(day)
            .or_default()
            .insert(offset, value);
        self.stats.write().samples_written += 1;
    }

    /// Record an anomaly reported by a scanner.
    pub fn record_anomaly(&self, record: AnomalyRecord) {
        self.anomalies.write().push(record);
    }

    /// Number of entities with at least one stored day.
    pub fn entity_count(&self) -> usize {
        self.samples.read().len()
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }
}

fn split(timestamp: i64) -> (i64, u32) {
    let day = utc_day_floor(timestamp);
    (day, (timestamp - day) as u32)
}

impl SampleStore for MemoryStore {
    fn query(&self, entity: &EntityCoordinate, day_start: i64, day_end: i64) -> Result<Vec<DayBucket>> {
        let buckets: Vec<DayBucket> = {
            let samples = self.samples.read();
            match samples.get(entity) {
                Some(days) if day_start <= day_end => days
                    .range(day_start..=day_end)
                    .map(|(day, samples)| DayBucket {
                        day: *day,
                        samples: samples.clone(),
                    })
                    .collect(),
                _ => Vec::new(),
            }
        };

        let mut stats = self.stats.write();
        stats.queries_executed += 1;
        stats.buckets_returned += buckets.len() as u64;

        Ok(buckets)
    }
}

impl AnomalySource for MemoryStore {
    fn grouped_anomalies(
        &self,
        entities: &[EntityCoordinate],
        start: i64,
        end: i64,
        grouping: AnomalyGrouping,
    ) -> Result<Vec<AnomalyCount>> {
        let anomalies = self.anomalies.read();
        let mut groups: BTreeMap<(Option<EntityCoordinate>, Option<String>), AnomalyCount> =
            BTreeMap::new();

        for record in anomalies.iter().filter(|r| {
            r.timestamp >= start
                && r.timestamp < end
                && (entities.is_empty() || entities.contains(&r.entity))
        }) {
            let entity = match grouping {
                AnomalyGrouping::Detector => None,
                _ => Some(record.entity.clone()),
            };
            let detector = match grouping {
                AnomalyGrouping::Entity => None,
                _ => Some(record.detector.clone()),
            };

            groups
                .entry((entity.clone(), detector.clone()))
                .and_modify(|g| {
                    g.count += 1;
                    g.first_seen = g.first_seen.min(record.timestamp);
                    g.last_seen = g.last_seen.max(record.timestamp);
                })
                .or_insert(AnomalyCount {
                    entity,
                    detector,
                    count: 1,
                    first_seen: record.timestamp,
                    last_seen: record.timestamp,
                });
        }

        Ok(groups.into_values().collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_common::time::SECONDS_PER_DAY;

    const DAY: i64 = SECONDS_PER_DAY;

    #[test]
    fn test_write_and_query() {
        let store = MemoryStore::new();
        let entity = EntityCoordinate::new(1, 1);

        store.write(&entity, 10, 1.0);
        store.write(&entity, DAY + 20, 2.0);
        store.write_missing(&entity, DAY + 30);
        store.write(&entity, 3 * DAY, 3.0);

        let buckets = store.query(&entity, 0, DAY).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].day, 0);
        assert_eq!(buckets[0].samples.get(&10), Some(&Some(1.0)));
        assert_eq!(buckets[1].samples.get(&30), Some(&None));

        let stats = store.stats();
        assert_eq!(stats.samples_written, 4);
        assert_eq!(stats.queries_executed, 1);
        assert_eq!(stats.buckets_returned, 2);
    }

    #[test]
    fn test_unknown_entity_is_empty() {
        let store = MemoryStore::new();
        store.write_batch(&EntityCoordinate::new(1, 1), vec![(0, 1.0), (60, 2.0)]);
        assert!(store.query(&EntityCoordinate::new(2, 1), 0, DAY).unwrap().is_empty());
        assert_eq!(store.entity_count(), 1);
    }

    #[test]
    fn test_grouped_anomalies() {
        let store = MemoryStore::new();
        let a = EntityCoordinate::new(1, 1);
        let b = EntityCoordinate::new(2, 1);
        for (entity, ts, detector) in [
            (&a, 100, "three_sigma"),
            (&a, 200, "three_sigma"),
            (&a, 300, "holt_winters"),
            (&b, 150, "three_sigma"),
            (&b, 5000, "three_sigma"),
        ] {
            store.record_anomaly(AnomalyRecord {
                entity: entity.clone(),
                timestamp: ts,
                detector: detector.to_string(),
                score: 1.0,
            });
        }

        let by_entity = store
            .grouped_anomalies(&[], 0, 1000, AnomalyGrouping::Entity)
            .unwrap();
        assert_eq!(by_entity.len(), 2);
        assert_eq!(by_entity[0].entity.as_ref(), Some(&a));
        assert_eq!(by_entity[0].count, 3);
        assert_eq!((by_entity[0].first_seen, by_entity[0].last_seen), (100, 300));
        assert_eq!(by_entity[1].count, 1);

        let by_detector = store
            .grouped_anomalies(&[a.clone()], 0, 1000, AnomalyGrouping::Detector)
            .unwrap();
        assert_eq!(by_detector.len(), 2);
        assert!(by_detector.iter().all(|g| g.entity.is_none()));

        let both = store
            .grouped_anomalies(&[], 0, 10_000, AnomalyGrouping::EntityAndDetector)
            .unwrap();
        assert_eq!(both.len(), 3);
    }
}
