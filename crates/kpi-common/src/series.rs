//! KPI Series - Timestamp to Value Mapping
//!
//! The container every pipeline stage consumes and produces. Keys are unix
//! timestamps in UTC seconds, each present at most once. Iteration is in
//! ascending key order.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::types::Padding;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

// =============================================================================
// Series
// =============================================================================

/// A sparse time series keyed by UTC seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series(BTreeMap<i64, f64>);

impl Series {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a value, replacing any previous value at the same timestamp.
    pub fn insert(&mut self, timestamp: i64, value: f64) -> Option<f64> {
        self.0.insert(timestamp, value)
    }

    pub fn get(&self, timestamp: i64) -> Option<f64> {
        self.0.get(&timestamp).copied()
    }

    pub fn contains_key(&self, timestamp: i64) -> bool {
        self.0.contains_key(&timestamp)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }

    /// Values that are not the padding sentinel.
    pub fn present_values(&self, padding: Padding) -> impl Iterator<Item = f64> + '_ {
        self.values().filter(move |v| !padding.matches(*v))
    }

    /// Build a series with the same keys and every value set to `value`.
    pub fn broadcast(&self, value: f64) -> Series {
        self.keys().map(|k| (k, value)).collect()
    }

    /// Earliest and latest timestamps.
    pub fn time_range(&self) -> Option<(i64, i64)> {
        let first = self.0.keys().next()?;
        let last = self.0.keys().next_back()?;
        Some((*first, *last))
    }
}

impl From<BTreeMap<i64, f64>> for Series {
    fn from(map: BTreeMap<i64, f64>) -> Self {
        Self(map)
    }
}

impl FromIterator<(i64, f64)> for Series {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Series {
    type Item = (i64, f64);
    type IntoIter = btree_map::IntoIter<i64, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Extend<(i64, f64)> for Series {
    fn extend<I: IntoIterator<Item = (i64, f64)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

// =============================================================================
// Tests
// =============================================================================
