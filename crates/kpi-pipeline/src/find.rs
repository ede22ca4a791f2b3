//! KPI Find Stage
//!
//! Fetches one entity's raw samples for a time range. This is the only
//! stage that talks to the store; store errors pass through unchanged.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::frame::Frame;
use crate::pipeline::Stage;
use crate::store::SampleStore;
use kpi_common::time::utc_day_floor;
use kpi_common::{EntityCoordinate, Result, Series};
use std::sync::Arc;

/// Loads every stored, non-missing sample of an entity in `[start, end]`.
pub struct Find {
    store: Arc<dyn SampleStore>,
    entity: EntityCoordinate,
    start: i64,
    end: i64,
}

impl Find {
    pub fn new(store: Arc<dyn SampleStore>, entity: EntityCoordinate, start: i64, end: i64) -> Self {
        Self {
            store,
            entity,
            start,
            end,
        }
    }

    pub fn fetch(&self) -> Result<Series> {
        let buckets = self
            .store
            .query(&self.entity, utc_day_floor(self.start), utc_day_floor(self.end))?;

        let mut series = Series::new();
        for bucket in buckets {
            for (offset, value) in bucket.samples {
                let Some(value) = value else { continue };
                let timestamp = bucket.day + offset as i64;
                if timestamp >= self.start && timestamp <= self.end {
                    series.insert(timestamp, value);
                }
            }
        }

        tracing::debug!(entity = %self.entity, points = series.len(), "find");
        Ok(series)
    }
}

impl Stage for Find {
    fn name(&self) -> &'static str {
        "find"
    }

    fn run(&self, _input: Frame) -> Result<Frame> {
        Ok(Frame::Series(self.fetch()?))
    }
}
