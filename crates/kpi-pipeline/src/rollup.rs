//! KPI Rollups
//!
//! Time rollups re-bucket a series to a coarser resolution in a given
//! timezone. Space rollups combine one series per entity, already on a
//! shared key grid, into a single series. Padding values never contribute
//! to an aggregate.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::aggregation::Aggregator;
use crate::frame::Frame;
use crate::pipeline::Stage;
use chrono_tz::Tz;
use kpi_common::time::bucket_key;
use kpi_common::{Aggregation, KpiError, Padding, Resolution, Result, Series};
use std::collections::BTreeMap;

fn finish(buckets: BTreeMap<i64, Aggregator>) -> Series {
    buckets
        .into_iter()
        .filter_map(|(key, agg)| agg.value().map(|v| (key, v)))
        .collect()
}

// =============================================================================
// Rollup Time
// =============================================================================

/// Re-buckets a series (or each series of a list) to `resolution`.
#[derive(Debug, Clone)]
pub struct RollupTime {
    resolution: Resolution,
    aggregation: Aggregation,
    padding: Padding,
    tz: Tz,
}

impl RollupTime {
    pub fn new(resolution: Resolution, aggregation: Aggregation, padding: impl Into<Padding>) -> Self {
        Self {
            resolution,
            aggregation,
            padding: padding.into(),
            tz: Tz::UTC,
        }
    }

    /// Construct from a resolution in seconds, rejecting unsupported sizes.
    pub fn from_seconds(seconds: u32, aggregation: Aggregation, padding: impl Into<Padding>) -> Result<Self> {
        Ok(Self::new(Resolution::from_seconds(seconds)?, aggregation, padding))
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn rollup(&self, series: &Series) -> Series {
        let mut buckets: BTreeMap<i64, Aggregator> = BTreeMap::new();
        for (timestamp, value) in series.iter() {
            if self.padding.matches(value) {
                continue;
            }
            buckets
                .entry(bucket_key(&self.tz, timestamp, self.resolution))
                .or_insert_with(|| Aggregator::new(self.aggregation))
                .add(value);
        }
        finish(buckets)
    }
}

impl Stage for RollupTime {
    fn name(&self) -> &'static str {
        "rollup_time"
    }

    fn run(&self, input: Frame) -> Result<Frame> {
        input.map_series(self.name(), |series| Ok(self.rollup(&series)))
    }
}

// =============================================================================
// Rollup Space
// =============================================================================

/// Combines a list of same-grid series into one, key by key.
///
/// Keys where every series holds padding are left out of the result. A
/// single series passes through unchanged.
#[derive(Debug, Clone)]
pub struct RollupSpace {
    aggregation: Aggregation,
    padding: Padding,
}

impl RollupSpace {
    pub fn new(aggregation: Aggregation, padding: impl Into<Padding>) -> Self {
        Self {
            aggregation,
            padding: padding.into(),
        }
    }

    pub fn combine(&self, list: &[Series]) -> Series {
        if list.windows(2).any(|w| !w[0].keys().eq(w[1].keys())) {
            tracing::warn!(series = list.len(), "combining series with different key sets");
        }

        let mut buckets: BTreeMap<i64, Aggregator> = BTreeMap::new();
        for series in list {
            for (timestamp, value) in series.iter() {
                if self.padding.matches(value) {
                    continue;
                }
                buckets
                    .entry(timestamp)
                    .or_insert_with(|| Aggregator::new(self.aggregation))
                    .add(value);
            }
        }
        finish(buckets)
    }
}

impl Stage for RollupSpace {
    fn name(&self) -> &'static str {
        "rollup_space"
    }

    fn run(&self, input: Frame) -> Result<Frame> {
        match input {
            Frame::List(list) => Ok(Frame::Series(self.combine(&list))),
            Frame::Series(series) => Ok(Frame::Series(series)),
            Frame::Empty => Err(KpiError::Execution(
                "rollup_space requires a series or list input".to_string(),
            )),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
