//! KPI Formula Stage
//!
//! Evaluates a derived metric formula as the head of a pipeline. The
//! formula is parsed once at assembly; its variables are resolved on each
//! run, usually by [`PipelineResolver`] which runs a nested
//! `Find -> RollupTime -> Pad` for the referenced entity.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::find::Find;
use crate::frame::Frame;
use crate::pad::Pad;
use crate::pipeline::{Pipeline, Stage};
use crate::rollup::RollupTime;
use crate::store::SampleStore;
use chrono_tz::Tz;
use kpi_common::{Aggregation, EntityCoordinate, KpiError, Padding, Resolution, Result};
use kpi_formula::{parse, AstEvaluator, Node, Value, VariableOptions, VariableResolver};
use std::sync::Arc;

// =============================================================================
// Formula Stage
// =============================================================================

/// Self-sourcing stage producing the value of a formula.
pub struct FormulaStage {
    ast: Node,
    resolver: Box<dyn VariableResolver>,
    padding: Padding,
    grid: Option<Vec<i64>>,
}

impl FormulaStage {
    /// Parse `formula`; syntax errors surface here, before any store access.
    pub fn new(
        formula: &str,
        resolver: impl VariableResolver + 'static,
        padding: impl Into<Padding>,
    ) -> Result<Self> {
        Ok(Self {
            ast: parse(formula)?,
            resolver: Box::new(resolver),
            padding: padding.into(),
            grid: None,
        })
    }

    /// Keys a scalar result is broadcast onto.
    pub fn with_grid(mut self, grid: Vec<i64>) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn ast(&self) -> &Node {
        &self.ast
    }

    pub fn evaluate(&self) -> Result<Value> {
        AstEvaluator::new(self.resolver.as_ref(), self.padding).evaluate(&self.ast)
    }
}

impl Stage for FormulaStage {
    fn name(&self) -> &'static str {
        "formula"
    }

    fn run(&self, _input: Frame) -> Result<Frame> {
        match self.evaluate()? {
            Value::Series(series) => Ok(Frame::Series(series)),
            Value::Scalar(value) => match &self.grid {
                Some(grid) => Ok(Frame::Series(grid.iter().map(|k| (*k, value)).collect())),
                None => Err(KpiError::Execution(format!(
                    "formula '{}' evaluated to a scalar with no time grid",
                    self.ast
                ))),
            },
        }
    }
}

// =============================================================================
// Pipeline Resolver
// =============================================================================

/// Resolves `[sid=..,nid=..,agg=..]` variables against a sample store.
///
/// `sid` and `nid` are required. `agg` picks the aggregation used when the
/// entity is rolled up to `resolution` and defaults to the configured one.
pub struct PipelineResolver {
    store: Arc<dyn SampleStore>,
    start: i64,
    end: i64,
    resolution: Resolution,
    aggregation: Aggregation,
    padding: Padding,
    tz: Tz,
}

impl PipelineResolver {
    pub fn new(
        store: Arc<dyn SampleStore>,
        start: i64,
        end: i64,
        resolution: Resolution,
        aggregation: Aggregation,
        padding: impl Into<Padding>,
    ) -> Self {
        Self {
            store,
            start,
            end,
            resolution,
            aggregation,
            padding: padding.into(),
            tz: Tz::UTC,
        }
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    fn coordinate(options: &VariableOptions) -> Result<EntityCoordinate> {
        let field = |key: &str| {
            options.get(key).ok_or_else(|| {
                KpiError::InvalidVariable(format!("variable is missing '{}': {:?}", key, options))
            })
        };
        Ok(EntityCoordinate::new(field("sid")?, field("nid")?))
    }

    /// The nested sequence evaluated for one variable.
    pub fn pipeline_for(&self, options: &VariableOptions) -> Result<Pipeline> {
        let entity = Self::coordinate(options)?;
        let aggregation = match options.get("agg") {
            Some(name) => name
                .parse::<Aggregation>()
                .map_err(|_| KpiError::InvalidVariable(format!("unknown aggregation '{}'", name)))?,
            None => self.aggregation,
        };

        Ok(Pipeline::new()
            .stage(Find::new(self.store.clone(), entity, self.start, self.end))
            .stage(RollupTime::new(self.resolution, aggregation, self.padding).with_timezone(self.tz))
            .stage(
                Pad::new(self.resolution, self.start, self.end, self.padding)
                    .with_timezone(self.tz),
            ))
    }
}

impl VariableResolver for PipelineResolver {
    fn resolve(&self, options: &VariableOptions) -> Result<Value> {
        let series = self.pipeline_for(options)?.run(Frame::Empty)?.into_series()?;
        Ok(Value::Series(series))
    }
}

// =============================================================================
// Tests
// =============================================================================
