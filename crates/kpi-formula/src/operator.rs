//! KPI Formula Operator Evaluation
//!
//! Applies the four arithmetic operators to scalars and series. Every
//! operator follows one elementwise rule: a padding operand yields padding,
//! and dividing by zero yields padding instead of an error or infinity.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::ast::BinaryOperator;
use crate::value::Value;
use kpi_common::{Padding, Series};
use std::collections::BTreeSet;

// =============================================================================
// Operator Evaluator
// =============================================================================

/// Arithmetic over [`Value`]s with padding propagation.
#[derive(Debug, Clone, Copy)]
pub struct OperatorEvaluator {
    padding: Padding,
}

impl OperatorEvaluator {
    pub fn new(padding: impl Into<Padding>) -> Self {
        Self {
            padding: padding.into(),
        }
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Apply `op` to two values. Scalars are broadcast against series.
    pub fn apply(&self, op: BinaryOperator, left: Value, right: Value) -> Value {
        match (left, right) {
            (Value::Scalar(l), Value::Scalar(r)) => Value::Scalar(self.elementwise(op, l, r)),
            (Value::Series(l), Value::Scalar(r)) => {
                let r = l.broadcast(r);
                Value::Series(self.pairwise(op, &l, &r))
            }
            (Value::Scalar(l), Value::Series(r)) => {
                let l = r.broadcast(l);
                Value::Series(self.pairwise(op, &l, &r))
            }
            (Value::Series(l), Value::Series(r)) => Value::Series(self.pairwise(op, &l, &r)),
        }
    }

    /// Multiply by -1 under the elementwise rule. Only the operand is
    /// checked against padding, never the factor.
    pub fn negate(&self, value: Value) -> Value {
        let pad = self.padding;
        let flip = |v: f64| if pad.matches(v) { pad.value() } else { -v };
        match value {
            Value::Scalar(v) => Value::Scalar(flip(v)),
            Value::Series(s) => Value::Series(s.iter().map(|(k, v)| (k, flip(v))).collect()),
        }
    }

    /// Combine two series key by key. A key present on only one side is
    /// treated as padding on the other.
    fn pairwise(&self, op: BinaryOperator, left: &Series, right: &Series) -> Series {
        let keys: BTreeSet<i64> = left.keys().chain(right.keys()).collect();
        let pad = self.padding.value();

        keys.into_iter()
            .map(|k| {
                let l = left.get(k).unwrap_or(pad);
                let r = right.get(k).unwrap_or(pad);
                (k, self.elementwise(op, l, r))
            })
            .collect()
    }

    /// The elementwise rule shared by every operator shape.
    pub fn elementwise(&self, op: BinaryOperator, left: f64, right: f64) -> f64 {
        let pad = self.padding;
        if pad.matches(left) || pad.matches(right) {
            return pad.value();
        }

        match op {
            BinaryOperator::Add => left + right,
            BinaryOperator::Subtract => left - right,
            BinaryOperator::Multiply => left * right,
            BinaryOperator::Divide => {
                if right == 0.0 {
                    pad.value()
                } else {
                    left / right
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
