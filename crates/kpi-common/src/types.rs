//! KPI Types - Core Data Types
//!
//! Fundamental value types shared by the formula language and the retrieval
//! pipeline: bucket resolutions, aggregation functions, entity coordinates
//! and the padding sentinel that marks missing data.
//!
//! Key Features:
//! - Closed set of resolutions validated on construction
//! - Aggregations parsed from the lowercase names used in formulas
//! - Entity coordinates with numeric ids coerced to strings
//! - Sentinel comparison that also works for a NaN sentinel
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::error::{KpiError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Resolution
// =============================================================================

/// Valid bucket sizes for time rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Resolution {
    Minute,
    FiveMinutes,
    FifteenMinutes,
    Hour,
    Day,
}

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Resolution::Minute,
        Resolution::FiveMinutes,
        Resolution::FifteenMinutes,
        Resolution::Hour,
        Resolution::Day,
    ];

    /// Bucket size in seconds.
    pub fn seconds(&self) -> u32 {
        match self {
            Self::Minute => 60,
            Self::FiveMinutes => 300,
            Self::FifteenMinutes => 900,
            Self::Hour => 3600,
            Self::Day => 86400,
        }
    }

    /// Look up a resolution by its size in seconds.
    pub fn from_seconds(seconds: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.seconds() == seconds)
            .ok_or(KpiError::UnsupportedResolution(seconds))
    }
}

impl TryFrom<u32> for Resolution {
    type Error = KpiError;

    fn try_from(seconds: u32) -> Result<Self> {
        Self::from_seconds(seconds)
    }
}

impl From<Resolution> for u32 {
    fn from(resolution: Resolution) -> u32 {
        resolution.seconds()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.seconds())
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Reduction used when folding several samples into one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    Avg,
    Max,
    Min,
}

impl Aggregation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

impl FromStr for Aggregation {
    type Err = KpiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "avg" => Ok(Self::Avg),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            _ => Err(KpiError::UnsupportedAggregation(s.to_string())),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Entity Coordinate
// =============================================================================

/// Identifies one logical time series by sensor and node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityCoordinate {
    pub sensor_id: String,
    pub node_id: String,
}

impl EntityCoordinate {
    /// Accepts anything displayable so numeric ids coerce to strings.
    pub fn new(sensor_id: impl ToString, node_id: impl ToString) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            node_id: node_id.to_string(),
        }
    }
}

impl fmt::Display for EntityCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sid={},nid={}", self.sensor_id, self.node_id)
    }
}

// =============================================================================
// Padding
// =============================================================================

/// Sentinel value marking a timestamp with no data.
///
/// Serializes as a plain number. JSON has no NaN, so a NaN sentinel is
/// written as `null` and `null` reads back as NaN.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct Padding(pub f64);

impl<'de> Deserialize<'de> for Padding {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Option::<f64>::deserialize(deserializer)?;
        Ok(Self(value.unwrap_or(f64::NAN)))
    }
}

impl Padding {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// True when `value` is the sentinel. NaN sentinels match NaN values.
    #[inline]
    pub fn matches(&self, value: f64) -> bool {
        value == self.0 || (value.is_nan() && self.0.is_nan())
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self(f64::NAN)
    }
}

impl PartialEq for Padding {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other.0)
    }
}

impl From<f64> for Padding {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_seconds() {
        assert_eq!(Resolution::from_seconds(300).unwrap(), Resolution::FiveMinutes);
        assert_eq!(Resolution::Day.seconds(), 86400);
        assert!(matches!(
            Resolution::from_seconds(120),
            Err(KpiError::UnsupportedResolution(120))
        ));
    }

    #[test]
    fn test_nan_padding_json() {
        let json = serde_json::to_string(&Padding::default()).unwrap();
        assert_eq!(json, "null");
        let back: Padding = serde_json::from_str(&json).unwrap();
        assert!(back.value().is_nan());

        let finite: Padding = serde_json::from_str("-1.0").unwrap();
        assert_eq!(finite, Padding::new(-1.0));
    }

    #[test]
    fn test_resolution_serde() {
        let r: Resolution = serde_json::from_str("3600").unwrap();
        assert_eq!(r, Resolution::Hour);
        assert_eq!(serde_json::to_string(&Resolution::Minute).unwrap(), "60");
        assert!(serde_json::from_str::<Resolution>("61").is_err());
    }

    #[test]
    fn test_aggregation_parse() {
        assert_eq!("sum".parse::<Aggregation>().unwrap(), Aggregation::Sum);
        assert_eq!("AVG".parse::<Aggregation>().unwrap(), Aggregation::Avg);
        assert!("median".parse::<Aggregation>().is_err());
    }

    #[test]
    fn test_entity_coercion() {
        let entity = EntityCoordinate::new(2, 5);
        assert_eq!(entity.sensor_id, "2");
        assert_eq!(entity.node_id, "5");
        assert_eq!(entity.to_string(), "sid=2,nid=5");
    }

    #[test]
    fn test_padding_matches() {
        let pad = Padding::new(-1.0);
        assert!(pad.matches(-1.0));
        assert!(!pad.matches(0.0));

        let nan = Padding::default();
        assert!(nan.matches(f64::NAN));
        assert!(!nan.matches(0.0));
    }
}
