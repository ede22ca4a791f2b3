//! KPI Pad Stage
//!
//! Densifies a series onto the bucket grid of a time range. Every grid key
//! is present in the output, holding the input value at that key or the
//! padding sentinel.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::frame::Frame;
use crate::pipeline::Stage;
use chrono_tz::Tz;
use kpi_common::time::bucket_keys;
use kpi_common::{Padding, Resolution, Result, Series};

/// Fills `[start, end)` at `resolution` with padding where the input has no
/// value. Input keys off the grid are dropped.
#[derive(Debug, Clone)]
pub struct Pad {
    resolution: Resolution,
    start: i64,
    end: i64,
    padding: Padding,
    tz: Tz,
}

impl Pad {
    pub fn new(resolution: Resolution, start: i64, end: i64, padding: impl Into<Padding>) -> Self {
        Self {
            resolution,
            start,
            end,
            padding: padding.into(),
            tz: Tz::UTC,
        }
    }

    pub fn from_seconds(
        seconds: u32,
        start: i64,
        end: i64,
        padding: impl Into<Padding>,
    ) -> Result<Self> {
        Ok(Self::new(Resolution::from_seconds(seconds)?, start, end, padding))
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    /// Bucket keys covered by this pad.
    pub fn grid(&self) -> Vec<i64> {
        bucket_keys(&self.tz, self.start, self.end, self.resolution)
    }

    pub fn pad(&self, series: &Series) -> Series {
        let fill = self.padding.value();
        self.grid()
            .into_iter()
            .map(|key| (key, series.get(key).unwrap_or(fill)))
            .collect()
    }
}

impl Stage for Pad {
    fn name(&self) -> &'static str {
        "pad"
    }

    fn run(&self, input: Frame) -> Result<Frame> {
        input.map_series(self.name(), |series| Ok(self.pad(&series)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_common::time::parse_timezone;
    use kpi_common::KpiError;

    const PAD: f64 = -1.0;

    #[test]
    fn test_pad_fills_gaps() {
        let input: Series = vec![(300, 2.0), (900, 4.0)].into_iter().collect();
        let pad = Pad::new(Resolution::FiveMinutes, 0, 1200, PAD);
        let expected: Series = vec![(0, PAD), (300, 2.0), (600, PAD), (900, 4.0)]
            .into_iter()
            .collect();
        assert_eq!(pad.pad(&input), expected);
    }

    #[test]
    fn test_pad_range_is_half_open() {
        let pad = Pad::new(Resolution::Hour, 0, 7200, PAD);
        assert_eq!(pad.grid(), vec![0, 3600]);
        assert!(Pad::new(Resolution::Hour, 3600, 3600, PAD).grid().is_empty());
    }

    #[test]
    fn test_pad_is_idempotent() {
        let input: Series = vec![(60, 1.0), (180, 3.0), (5000, 9.0)].into_iter().collect();
        let pad = Pad::new(Resolution::Minute, 0, 600, PAD);
        let once = pad.pad(&input);
        assert_eq!(pad.pad(&once), once);
        assert_eq!(once.len(), 10);
    }

    #[test]
    fn test_pad_local_days_across_dst() {
        let oslo = parse_timezone("Europe/Oslo").unwrap();
        // 2015-10-24 00:00 CEST .. 2015-10-27 00:00 CET
        let pad = Pad::new(Resolution::Day, 1_445_637_600, 1_445_900_400, PAD).with_timezone(oslo);
        assert_eq!(pad.grid(), vec![1_445_637_600, 1_445_724_000, 1_445_814_000]);
    }

    #[test]
    fn test_pad_grid_keeps_day_starting_in_gap() {
        let sao_paulo = parse_timezone("America/Sao_Paulo").unwrap();
        // 2015-10-17 00:00 -03 .. 2015-10-19 00:00 -02; the 18th starts at 01:00.
        let pad = Pad::new(Resolution::Day, 1_445_050_800, 1_445_220_000, PAD).with_timezone(sao_paulo);
        assert_eq!(pad.grid(), vec![1_445_050_800, 1_445_137_200]);
    }

    #[test]
    fn test_pad_requires_input() {
        let pad = Pad::new(Resolution::Hour, 0, 3600, PAD);
        assert!(matches!(pad.run(Frame::Empty), Err(KpiError::Execution(_))));
        assert!(matches!(
            Pad::from_seconds(120, 0, 3600, PAD),
            Err(KpiError::UnsupportedResolution(120))
        ));
    }
}
