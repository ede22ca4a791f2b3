//! KPI Pipeline Compositor
//!
//! Runs stages strictly in order, threading each stage's output into the
//! next. A step may itself be a nested pipeline, which runs against the
//! current output and contributes one result to the outer sequence.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::frame::Frame;
use kpi_common::{KpiError, Result};

// =============================================================================
// Stage
// =============================================================================

/// One step of a retrieval computation.
///
/// Stages hold no state between runs and never mutate their input in
/// place; each run returns a fresh frame.
pub trait Stage {
    fn name(&self) -> &'static str;
    fn run(&self, input: Frame) -> Result<Frame>;
}

/// Entry of a pipeline: a stage or a nested pipeline.
pub enum Step {
    Stage(Box<dyn Stage>),
    Nested(Pipeline),
}

// =============================================================================
// Pipeline
// =============================================================================

/// An ordered list of steps, built per request and run once.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a stage.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.steps.push(Step::Stage(Box::new(stage)));
        self
    }

    /// Append a nested pipeline.
    pub fn nested(mut self, pipeline: Pipeline) -> Self {
        self.steps.push(Step::Nested(pipeline));
        self
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Names of the top level steps, `[..]` for nested pipelines.
    pub fn describe(&self) -> Vec<&'static str> {
        self.steps
            .iter()
            .map(|step| match step {
                Step::Stage(stage) => stage.name(),
                Step::Nested(_) => "[..]",
            })
            .collect()
    }

    pub fn run(&self, input: Frame) -> Result<Frame> {
        run(self, input)
    }
}

/// Run `pipeline` starting from `input`.
pub fn run(pipeline: &Pipeline, input: Frame) -> Result<Frame> {
    let mut current = input;
    for step in &pipeline.steps {
        current = match step {
            Step::Stage(stage) => {
                let input_points = current.point_count();
                let output = stage.run(current)?;
                tracing::debug!(
                    stage = stage.name(),
                    input_points,
                    output_points = output.point_count(),
                    "stage complete"
                );
                output
            }
            Step::Nested(inner) => run(inner, current)?,
        };
    }
    Ok(current)
}

// =============================================================================
// Branches
// =============================================================================

/// Runs several pipelines against the same input and collects their series
/// into a list, one element per branch in order.
pub struct Branches {
    branches: Vec<Pipeline>,
}

impl Branches {
    pub fn new(branches: Vec<Pipeline>) -> Self {
        Self { branches }
    }
}

impl Stage for Branches {
    fn name(&self) -> &'static str {
        "branches"
    }

    fn run(&self, input: Frame) -> Result<Frame> {
        let mut list = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            match branch.run(input.clone())? {
                Frame::Series(series) => list.push(series),
                Frame::List(series) => list.extend(series),
                Frame::Empty => {
                    return Err(KpiError::Execution(
                        "branch produced no series".to_string(),
                    ))
                }
            }
        }
        Ok(Frame::List(list))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_common::Series;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Constant(f64);

    impl Stage for Constant {
        fn name(&self) -> &'static str {
            "constant"
        }

        fn run(&self, _input: Frame) -> Result<Frame> {
            Ok(Frame::Series(vec![(0, self.0)].into_iter().collect()))
        }
    }

    struct AddOne {
        log: Rc<RefCell<Vec<&'static str>>>,
        label: &'static str,
    }

    impl Stage for AddOne {
        fn name(&self) -> &'static str {
            "add_one"
        }

        fn run(&self, input: Frame) -> Result<Frame> {
            self.log.borrow_mut().push(self.label);
            input.map_series("add_one", |s| Ok(s.iter().map(|(k, v)| (k, v + 1.0)).collect()))
        }
    }

    struct Fail;

    impl Stage for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn run(&self, _input: Frame) -> Result<Frame> {
            Err(KpiError::Store("boom".into()))
        }
    }

    #[test]
    fn test_sequential_run() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pipeline = Pipeline::new()
            .stage(Constant(1.0))
            .stage(AddOne { log: log.clone(), label: "a" })
            .nested(
                Pipeline::new()
                    .stage(AddOne { log: log.clone(), label: "b" })
                    .stage(AddOne { log: log.clone(), label: "c" }),
            )
            .stage(AddOne { log: log.clone(), label: "d" });

        let result = pipeline.run(Frame::Empty).unwrap().into_series().unwrap();
        assert_eq!(result.get(0), Some(5.0));
        assert_eq!(*log.borrow(), vec!["a", "b", "c", "d"]);
        assert_eq!(pipeline.describe(), vec!["constant", "add_one", "[..]", "add_one"]);
    }

    #[test]
    fn test_error_stops_pipeline() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pipeline = Pipeline::new()
            .stage(Constant(1.0))
            .stage(Fail)
            .stage(AddOne { log: log.clone(), label: "never" });

        let err = pipeline.run(Frame::Empty).unwrap_err();
        assert!(matches!(err, KpiError::Store(ref msg) if msg == "boom"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_branches_collect_list() {
        let branches = Branches::new(vec![
            Pipeline::new().stage(Constant(1.0)),
            Pipeline::new().stage(Constant(2.0)),
        ]);
        let result = Pipeline::new().stage(branches).run(Frame::Empty).unwrap();
        let expected: Vec<Series> = vec![
            vec![(0, 1.0)].into_iter().collect(),
            vec![(0, 2.0)].into_iter().collect(),
        ];
        assert_eq!(result, Frame::List(expected));
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let series: Series = vec![(60, 3.0)].into_iter().collect();
        let result = Pipeline::new().run(Frame::Series(series.clone())).unwrap();
        assert_eq!(result, Frame::Series(series));
    }
}
