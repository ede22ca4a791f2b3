//! KPI Pipeline Frame
//!
//! The value passed from one stage to the next.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use kpi_common::{KpiError, Result, Series};

/// Stage input and output.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Frame {
    /// Input of a sequence whose first stage sources its own data.
    #[default]
    Empty,
    Series(Series),
    /// One series per entity.
    List(Vec<Series>),
}

impl Frame {
    /// Apply `f` to a single series or to every element of a list.
    pub fn map_series<F>(self, stage: &str, mut f: F) -> Result<Frame>
    where
        F: FnMut(Series) -> Result<Series>,
    {
        match self {
            Frame::Series(series) => Ok(Frame::Series(f(series)?)),
            Frame::List(list) => Ok(Frame::List(
                list.into_iter().map(f).collect::<Result<Vec<_>>>()?,
            )),
            Frame::Empty => Err(KpiError::Execution(format!(
                "{} requires a series or list input",
                stage
            ))),
        }
    }

    /// The single series carried by this frame.
    pub fn into_series(self) -> Result<Series> {
        match self {
            Frame::Series(series) => Ok(series),
            Frame::List(_) => Err(KpiError::Execution(
                "expected a single series, got a list".to_string(),
            )),
            Frame::Empty => Err(KpiError::Execution(
                "expected a single series, got no data".to_string(),
            )),
        }
    }

    /// Total number of points, for logging.
    pub fn point_count(&self) -> usize {
        match self {
            Frame::Empty => 0,
            Frame::Series(series) => series.len(),
            Frame::List(list) => list.iter().map(Series::len).sum(),
        }
    }
}

impl From<Series> for Frame {
    fn from(series: Series) -> Self {
        Frame::Series(series)
    }
}

impl From<Vec<Series>> for Frame {
    fn from(list: Vec<Series>) -> Self {
        Frame::List(list)
    }
}
