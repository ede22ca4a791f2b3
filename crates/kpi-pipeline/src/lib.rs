//! KPI Pipeline - Time Series Retrieval Engine
//!
//! Turns raw stored samples into answers for "what is this metric, at this
//! resolution, over this range". Stages are composed into sequences that
//! run strictly in order on the calling thread.
//!
//! Key Features:
//! - Composable stages with nested sequences and branching
//! - Timezone and DST aware time rollups
//! - Cross-entity space rollups with partial coverage
//! - Gap padding onto a uniform bucket grid
//! - Recurring window filtering for anomaly scanners
//! - Formula stage backed by the KPI formula language
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

pub mod aggregation;
pub mod factory;
pub mod find;
pub mod formula;
pub mod frame;
pub mod pad;
pub mod pipeline;
pub mod rollup;
pub mod store;
pub mod window;

pub use aggregation::Aggregator;
pub use factory::{AnomalyQuery, PipelineFactory, RetrievalRequest, Source};
pub use find::Find;
pub use formula::{FormulaStage, PipelineResolver};
pub use frame::Frame;
pub use pad::Pad;
pub use pipeline::{run, Branches, Pipeline, Stage, Step};
pub use rollup::{RollupSpace, RollupTime};
pub use store::{
    AnomalyCount, AnomalyGrouping, AnomalyRecord, AnomalySource, DayBucket, MemoryStore,
    SampleStore, StoreStats,
};
pub use window::{filter_window, FilterWindow};
