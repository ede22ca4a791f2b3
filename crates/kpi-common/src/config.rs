//! KPI Config - Pipeline Configuration
//!
//! Defaults used when assembling retrieval pipelines: the timezone buckets
//! are aligned to, the padding sentinel, and the resolutions and
//! aggregations applied at node and result level. Supports loading from TOML
//! files and programmatic construction.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::error::{KpiError, Result};
use crate::time::parse_timezone;
use crate::types::{Aggregation, Padding, Resolution};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Configuration for pipeline assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// IANA timezone name used for bucket alignment.
    pub timezone: String,
    pub padding: Padding,
    pub node_resolution: Resolution,
    pub node_aggregation: Aggregation,
    pub combine_aggregation: Aggregation,
    pub result_resolution: Resolution,
    pub result_aggregation: Aggregation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            padding: Padding::default(),
            node_resolution: Resolution::FiveMinutes,
            node_aggregation: Aggregation::Avg,
            combine_aggregation: Aggregation::Sum,
            result_resolution: Resolution::Hour,
            result_aggregation: Aggregation::Sum,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| KpiError::Configuration(e.to_string()))?;
        config.tz()?;
        Ok(config)
    }

    /// Resolved timezone.
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_padding(mut self, padding: impl Into<Padding>) -> Self {
        self.padding = padding.into();
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.tz().unwrap(), Tz::UTC);
        assert!(config.padding.matches(f64::NAN));
    }

    #[test]
    fn test_from_toml() {
        let config = PipelineConfig::from_toml_str(
            r#"
            timezone = "Europe/Oslo"
            padding = -1.0
            node_resolution = 900
            node_aggregation = "max"
            "#,
        )
        .unwrap();

        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::Oslo);
        assert_eq!(config.padding, Padding::new(-1.0));
        assert_eq!(config.node_resolution, Resolution::FifteenMinutes);
        assert_eq!(config.node_aggregation, Aggregation::Max);
        assert_eq!(config.result_resolution, Resolution::Hour);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("node_resolution = 120"),
            Err(KpiError::Configuration(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("timezone = \"Nowhere/Land\""),
            Err(KpiError::Configuration(_))
        ));
    }
}
