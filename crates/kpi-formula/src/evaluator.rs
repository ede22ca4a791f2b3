//! KPI Formula Evaluator
//!
//! Walks a parsed formula and produces a [`Value`]. Variables are handed to
//! a caller supplied [`VariableResolver`]; the evaluator does not know or
//! care how their data is fetched.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::ast::{Node, UnaryOperator, VariableOptions};
use crate::operator::OperatorEvaluator;
use crate::value::Value;
use kpi_common::{Padding, Result};

// =============================================================================
// Variable Resolver
// =============================================================================

/// Supplies the value of a bracketed variable reference.
///
/// Implementations must be deterministic for a given option map within one
/// evaluation and use the same padding sentinel as the evaluator.
pub trait VariableResolver {
    fn resolve(&self, options: &VariableOptions) -> Result<Value>;
}

impl<F> VariableResolver for F
where
    F: Fn(&VariableOptions) -> Result<Value>,
{
    fn resolve(&self, options: &VariableOptions) -> Result<Value> {
        self(options)
    }
}

// =============================================================================
// AST Evaluator
// =============================================================================

/// Evaluates formula trees against a resolver.
pub struct AstEvaluator<'a> {
    resolver: &'a dyn VariableResolver,
    operators: OperatorEvaluator,
}

impl<'a> AstEvaluator<'a> {
    pub fn new(resolver: &'a dyn VariableResolver, padding: impl Into<Padding>) -> Self {
        Self {
            resolver,
            operators: OperatorEvaluator::new(padding),
        }
    }

    pub fn evaluate(&self, node: &Node) -> Result<Value> {
        match node {
            Node::Number(value) => Ok(Value::Scalar(*value)),
            Node::Variable(options) => {
                tracing::trace!(?options, "resolving formula variable");
                self.resolver.resolve(options)
            }
            Node::BinaryOp { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(self.operators.apply(*op, left, right))
            }
            Node::UnaryOp { op, operand } => {
                let value = self.evaluate(operand)?;
                match op {
                    UnaryOperator::Positive => Ok(value),
                    UnaryOperator::Negative => Ok(self.operators.negate(value)),
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
