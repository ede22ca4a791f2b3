//! KPI Aggregation
//!
//! Streaming reduction of the values that fall into one bucket.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use kpi_common::Aggregation;

// =============================================================================
// Aggregator
// =============================================================================

/// Streaming aggregator for one bucket.
///
/// MAX and MIN start from the first value added rather than from a fixed
/// seed, and AVG divides by the number of values added when read.
#[derive(Debug, Clone)]
pub struct Aggregator {
    function: Aggregation,
    count: usize,
    acc: Option<f64>,
}

impl Aggregator {
    pub fn new(function: Aggregation) -> Self {
        Self {
            function,
            count: 0,
            acc: None,
        }
    }

    /// Add a value to the aggregator.
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.acc = Some(match self.acc {
            None => value,
            Some(acc) => match self.function {
                Aggregation::Sum | Aggregation::Avg => acc + value,
                Aggregation::Max => {
                    if value > acc {
                        value
                    } else {
                        acc
                    }
                }
                Aggregation::Min => {
                    if value < acc {
                        value
                    } else {
                        acc
                    }
                }
            },
        });
    }

    /// Get the current aggregate value, `None` if nothing was added.
    pub fn value(&self) -> Option<f64> {
        let acc = self.acc?;
        Some(match self.function {
            Aggregation::Avg => acc / self.count as f64,
            _ => acc,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(function: Aggregation, values: &[f64]) -> Option<f64> {
        let mut agg = Aggregator::new(function);
        for v in values {
            agg.add(*v);
        }
        agg.value()
    }

    #[test]
    fn test_aggregations() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(fold(Aggregation::Sum, &values), Some(15.0));
        assert_eq!(fold(Aggregation::Avg, &values), Some(3.0));
        assert_eq!(fold(Aggregation::Max, &values), Some(5.0));
        assert_eq!(fold(Aggregation::Min, &values), Some(1.0));
    }

    #[test]
    fn test_extremes_seed_from_first_value() {
        assert_eq!(fold(Aggregation::Max, &[-5.0, -3.0]), Some(-3.0));
        assert_eq!(fold(Aggregation::Min, &[5.0, 3.0]), Some(3.0));
    }

    #[test]
    fn test_empty_aggregator() {
        let agg = Aggregator::new(Aggregation::Avg);
        assert_eq!(agg.value(), None);
        assert_eq!(agg.count(), 0);
    }
}
