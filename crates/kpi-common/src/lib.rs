//! KPI Common - Shared Types and Utilities
//!
//! Foundational types, error handling, and time arithmetic used by the
//! formula language and the retrieval pipeline.
//!
//! Key Features:
//! - Unified error type with user error classification
//! - Series, Resolution, Aggregation, Padding and EntityCoordinate types
//! - Timezone and DST aware bucket key derivation
//! - TOML loadable pipeline configuration
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

pub mod config;
pub mod error;
pub mod series;
pub mod time;
pub mod types;

pub use config::PipelineConfig;
pub use error::{KpiError, Result};
pub use series::Series;
pub use types::*;
