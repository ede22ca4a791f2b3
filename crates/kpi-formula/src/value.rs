//! KPI Formula Values
//!
//! Result of evaluating a formula node: a plain number or a whole series.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use kpi_common::Series;

/// A scalar or a time series.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Series(Series),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Value::Scalar(_) => None,
            Value::Series(s) => Some(s),
        }
    }

    pub fn into_series(self) -> Option<Series> {
        match self {
            Value::Scalar(_) => None,
            Value::Series(s) => Some(s),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Series(_) => "series",
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<Series> for Value {
    fn from(series: Series) -> Self {
        Value::Series(series)
    }
}
