//! KPI Filter Window Stage
//!
//! Keeps the samples that fall into a recurring window, such as the same
//! five minutes of every day. Used by the anomaly scanners to compare a
//! time slot against its history.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::frame::Frame;
use crate::pipeline::Stage;
use kpi_common::{KpiError, Result, Series};

fn check_window(length: i64, distance: i64) -> Result<()> {
    if length <= 0 || distance <= 0 {
        return Err(KpiError::Configuration(format!(
            "window length and distance must be positive, got {} and {}",
            length, distance
        )));
    }
    Ok(())
}

/// Retain entries in `[first_start + n*distance, first_start + n*distance + length)`
/// for any `n >= 0`.
///
/// The sweep walks the series in ascending key order, moving the window
/// forward whenever an entry lies at or past its end.
pub fn filter_window(series: &Series, first_start: i64, length: i64, distance: i64) -> Result<Series> {
    check_window(length, distance)?;

    let mut start = first_start;
    let mut end = first_start + length;
    let mut out = Series::new();

    for (timestamp, value) in series.iter() {
        if timestamp < start {
            continue;
        }
        if timestamp >= end {
            let steps = (timestamp - end) / distance + 1;
            start += steps * distance;
            end += steps * distance;
        }
        if timestamp >= start && timestamp < end {
            out.insert(timestamp, value);
        }
    }

    Ok(out)
}

/// Stage form of [`filter_window`].
#[derive(Debug, Clone)]
pub struct FilterWindow {
    first_start: i64,
    length: i64,
    distance: i64,
}

impl FilterWindow {
    pub fn new(first_start: i64, length: i64, distance: i64) -> Result<Self> {
        check_window(length, distance)?;
        Ok(Self {
            first_start,
            length,
            distance,
        })
    }

    /// A window of `length` seconds at the same time every day.
    pub fn daily(first_start: i64, length: i64) -> Result<Self> {
        Self::new(first_start, length, kpi_common::time::SECONDS_PER_DAY)
    }
}

impl Stage for FilterWindow {
    fn name(&self) -> &'static str {
        "filter_window"
    }

    fn run(&self, input: Frame) -> Result<Frame> {
        input.map_series(self.name(), |series| {
            filter_window(&series, self.first_start, self.length, self.distance)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_recurring_slot() {
        let input: Series = (0..40).map(|i| (i * 10, i as f64)).collect();
        let out = filter_window(&input, 20, 20, 100).unwrap();
        let keys: Vec<i64> = out.keys().collect();
        assert_eq!(keys, vec![20, 30, 120, 130, 220, 230, 320, 330]);
    }

    #[test]
    fn test_window_skips_empty_periods() {
        let input: Series = vec![(5, 1.0), (1005, 2.0), (1050, 3.0)].into_iter().collect();
        let out = filter_window(&input, 0, 10, 100).unwrap();
        assert_eq!(out, vec![(5, 1.0), (1005, 2.0)].into_iter().collect());
    }

    #[test]
    fn test_entries_before_first_window_dropped() {
        let input: Series = vec![(-50, 1.0), (0, 2.0)].into_iter().collect();
        let out = filter_window(&input, 0, 10, 100).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(0), Some(2.0));
    }

    #[test]
    fn test_invalid_window() {
        assert!(matches!(FilterWindow::new(0, 0, 10), Err(KpiError::Configuration(_))));
        assert!(matches!(FilterWindow::new(0, 10, -1), Err(KpiError::Configuration(_))));
        assert!(FilterWindow::daily(0, 300).is_ok());
    }

    #[test]
    fn test_zero_distance_is_rejected() {
        let input: Series = vec![(0, 1.0), (10, 2.0), (20, 3.0)].into_iter().collect();
        assert!(matches!(filter_window(&input, 0, 10, 0), Err(KpiError::Configuration(_))));
        assert!(matches!(filter_window(&input, 0, 0, 10), Err(KpiError::Configuration(_))));
    }
}
