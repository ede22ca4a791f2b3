//! KPI Pipeline Factory
//!
//! Assembles the canonical stage sequences for common retrieval shapes:
//!
//! - numeric retrieval:
//!   `[Find|Formula] -> RollupTime(node) -> Pad(node) -> [RollupSpace] -> RollupTime(result) -> Pad(result)`
//! - anomaly listing: a grouped query answered by the store itself
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::find::Find;
use crate::formula::{FormulaStage, PipelineResolver};
use crate::pad::Pad;
use crate::pipeline::{Branches, Pipeline};
use crate::rollup::{RollupSpace, RollupTime};
use crate::store::{AnomalyCount, AnomalyGrouping, AnomalySource, SampleStore};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use kpi_common::{
    Aggregation, EntityCoordinate, KpiError, Padding, PipelineConfig, Resolution, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Requests
// =============================================================================

/// Where a numeric retrieval gets its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Raw samples of one or more entities; several are combined per bucket.
    Entities(Vec<EntityCoordinate>),
    /// A derived metric formula.
    Formula(String),
}

/// Parameters of one numeric retrieval over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub source: Source,
    pub start: i64,
    pub end: i64,
    pub node_resolution: Resolution,
    pub node_aggregation: Aggregation,
    pub combine_aggregation: Aggregation,
    pub result_resolution: Resolution,
    pub result_aggregation: Aggregation,
    pub padding: Padding,
}

impl RetrievalRequest {
    /// Request using the resolutions, aggregations and padding of `config`.
    pub fn from_config(config: &PipelineConfig, source: Source, start: i64, end: i64) -> Self {
        Self {
            source,
            start,
            end,
            node_resolution: config.node_resolution,
            node_aggregation: config.node_aggregation,
            combine_aggregation: config.combine_aggregation,
            result_resolution: config.result_resolution,
            result_aggregation: config.result_aggregation,
            padding: config.padding,
        }
    }

    pub fn between(
        config: &PipelineConfig,
        source: Source,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self::from_config(config, source, start.timestamp(), end.timestamp())
    }
}

/// Grouped anomaly listing over `[start, end)`. No entities means all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyQuery {
    #[serde(default)]
    pub entities: Vec<EntityCoordinate>,
    pub start: i64,
    pub end: i64,
    pub grouping: AnomalyGrouping,
}

// =============================================================================
// Factory
// =============================================================================

/// Builds retrieval pipelines bound to a store and a timezone.
pub struct PipelineFactory {
    store: Arc<dyn SampleStore>,
    tz: Tz,
}

impl PipelineFactory {
    pub fn new(store: Arc<dyn SampleStore>) -> Self {
        Self { store, tz: Tz::UTC }
    }

    pub fn from_config(store: Arc<dyn SampleStore>, config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            store,
            tz: config.tz()?,
        })
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Build the numeric retrieval sequence for `request`.
    pub fn numeric(&self, request: &RetrievalRequest) -> Result<Pipeline> {
        if request.start >= request.end {
            return Err(KpiError::Configuration(format!(
                "empty retrieval range [{}, {})",
                request.start, request.end
            )));
        }

        let mut pipeline = match &request.source {
            Source::Entities(entities) => match entities.as_slice() {
                [] => {
                    return Err(KpiError::Configuration(
                        "retrieval needs at least one entity".to_string(),
                    ))
                }
                [entity] => Pipeline::new().nested(self.entity_head(request, entity)),
                _ => Pipeline::new()
                    .stage(Branches::new(
                        entities.iter().map(|e| self.entity_head(request, e)).collect(),
                    ))
                    .stage(RollupSpace::new(request.combine_aggregation, request.padding)),
            },
            Source::Formula(formula) => Pipeline::new().nested(self.formula_head(request, formula)?),
        };

        pipeline = pipeline
            .stage(
                RollupTime::new(request.result_resolution, request.result_aggregation, request.padding)
                    .with_timezone(self.tz),
            )
            .stage(self.pad(request, request.result_resolution));

        tracing::debug!(steps = ?pipeline.describe(), "assembled numeric pipeline");
        Ok(pipeline)
    }

    /// Answer an anomaly listing from the store's grouped aggregation.
    pub fn anomaly_listing(
        &self,
        source: &dyn AnomalySource,
        query: &AnomalyQuery,
    ) -> Result<Vec<AnomalyCount>> {
        let rows = source.grouped_anomalies(&query.entities, query.start, query.end, query.grouping)?;
        tracing::debug!(rows = rows.len(), grouping = ?query.grouping, "anomaly listing");
        Ok(rows)
    }

    fn pad(&self, request: &RetrievalRequest, resolution: Resolution) -> Pad {
        Pad::new(resolution, request.start, request.end, request.padding).with_timezone(self.tz)
    }

    fn node_rollup(&self, request: &RetrievalRequest) -> RollupTime {
        RollupTime::new(request.node_resolution, request.node_aggregation, request.padding)
            .with_timezone(self.tz)
    }

    fn entity_head(&self, request: &RetrievalRequest, entity: &EntityCoordinate) -> Pipeline {
        Pipeline::new()
            .stage(Find::new(self.store.clone(), entity.clone(), request.start, request.end))
            .stage(self.node_rollup(request))
            .stage(self.pad(request, request.node_resolution))
    }

    fn formula_head(&self, request: &RetrievalRequest, formula: &str) -> Result<Pipeline> {
        let resolver = PipelineResolver::new(
            self.store.clone(),
            request.start,
            request.end,
            request.node_resolution,
            request.node_aggregation,
            request.padding,
        )
        .with_timezone(self.tz);

        let node_pad = self.pad(request, request.node_resolution);
        let stage = FormulaStage::new(formula, resolver, request.padding)?.with_grid(node_pad.grid());

        Ok(Pipeline::new()
            .stage(stage)
            .stage(self.node_rollup(request))
            .stage(node_pad))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::store::MemoryStore;

    fn config() -> PipelineConfig {
        PipelineConfig {
            padding: Padding::new(-1.0),
            node_resolution: Resolution::Minute,
            node_aggregation: Aggregation::Avg,
            result_resolution: Resolution::Hour,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_pipeline_shapes() {
        let factory = PipelineFactory::new(Arc::new(MemoryStore::new()));

        let single = RetrievalRequest::from_config(
            &config(),
            Source::Entities(vec![EntityCoordinate::new(1, 1)]),
            0,
            3600,
        );
        assert_eq!(
            factory.numeric(&single).unwrap().describe(),
            vec!["[..]", "rollup_time", "pad"]
        );

        let multi = RetrievalRequest {
            source: Source::Entities(vec![EntityCoordinate::new(1, 1), EntityCoordinate::new(2, 1)]),
            ..single.clone()
        };
        assert_eq!(
            factory.numeric(&multi).unwrap().describe(),
            vec!["branches", "rollup_space", "rollup_time", "pad"]
        );
    }

    #[test]
    fn test_rejects_bad_requests() {
        let factory = PipelineFactory::new(Arc::new(MemoryStore::new()));
        let empty = RetrievalRequest::from_config(&config(), Source::Entities(vec![]), 0, 3600);
        assert!(matches!(factory.numeric(&empty), Err(KpiError::Configuration(_))));

        let backwards = RetrievalRequest::from_config(
            &config(),
            Source::Entities(vec![EntityCoordinate::new(1, 1)]),
            3600,
            0,
        );
        assert!(matches!(factory.numeric(&backwards), Err(KpiError::Configuration(_))));

        let syntax = RetrievalRequest::from_config(&config(), Source::Formula("1 +".into()), 0, 3600);
        assert!(matches!(factory.numeric(&syntax), Err(KpiError::Syntax { .. })));
    }

    #[test]
    fn test_single_entity_retrieval() {
        let store = Arc::new(MemoryStore::new());
        let entity = EntityCoordinate::new(1, 1);
        store.write_batch(&entity, vec![(0, 2.0), (30, 4.0), (120, 5.0), (3700, 8.0)]);

        let factory = PipelineFactory::new(store);
        let request = RetrievalRequest::from_config(&config(), Source::Entities(vec![entity]), 0, 7200);
        let result = factory
            .numeric(&request)
            .unwrap()
            .run(Frame::Empty)
            .unwrap()
            .into_series()
            .unwrap();

        // minute averages 3 and 5 summed into the first hour
        assert_eq!(result, vec![(0, 8.0), (3600, 8.0)].into_iter().collect());
    }

    #[test]
    fn test_request_from_json() {
        let request: RetrievalRequest = serde_json::from_str(
            r#"{
                "source": {"formula": "[sid=1,nid=2] * 2"},
                "start": 0,
                "end": 86400,
                "node_resolution": 300,
                "node_aggregation": "avg",
                "combine_aggregation": "sum",
                "result_resolution": 86400,
                "result_aggregation": "max",
                "padding": -1.0
            }"#,
        )
        .unwrap();
        assert_eq!(request.source, Source::Formula("[sid=1,nid=2] * 2".to_string()));
        assert_eq!(request.result_resolution, Resolution::Day);
        assert_eq!(request.result_aggregation, Aggregation::Max);
    }

    #[test]
    fn test_request_with_nan_padding_survives_json() {
        let request = RetrievalRequest::from_config(
            &PipelineConfig::default(),
            Source::Entities(vec![EntityCoordinate::new(1, 1)]),
            0,
            3600,
        );
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"padding\":null"));

        let back: RetrievalRequest = serde_json::from_str(&json).unwrap();
        assert!(back.padding.value().is_nan());
        assert_eq!(back, request);
    }

    #[test]
    fn test_anomaly_listing() {
        use crate::store::AnomalyRecord;

        let store = MemoryStore::new();
        for ts in [10, 20, 30] {
            store.record_anomaly(AnomalyRecord {
                entity: EntityCoordinate::new(1, 1),
                timestamp: ts,
                detector: "ks".to_string(),
                score: 0.9,
            });
        }

        let factory = PipelineFactory::new(Arc::new(MemoryStore::new()));
        let rows = factory
            .anomaly_listing(
                &store,
                &AnomalyQuery {
                    entities: vec![],
                    start: 0,
                    end: 30,
                    grouping: AnomalyGrouping::Detector,
                },
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].detector.as_deref(), Some("ks"));
    }
}
