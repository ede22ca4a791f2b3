//! KPI Formula AST - Abstract Syntax Tree
//!
//! Immutable tree produced by the parser. Four node kinds cover the whole
//! language: numeric literals, bracketed variable references, binary and
//! unary arithmetic.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Options of a variable reference such as `[sid=2,nid=5,agg=sum]`.
pub type VariableOptions = BTreeMap<String, String>;

// =============================================================================
// Nodes
// =============================================================================

/// A formula expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Number(f64),
    Variable(VariableOptions),
    BinaryOp {
        left: Box<Node>,
        op: BinaryOperator,
        right: Box<Node>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Node>,
    },
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }
}

/// Unary sign operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOperator {
    Positive,
    Negative,
}

// =============================================================================
// Utility Implementations
// =============================================================================

impl Node {
    pub fn number(value: f64) -> Self {
        Node::Number(value)
    }

    pub fn variable<K, V>(options: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Node::Variable(
            options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn binary(left: Node, op: BinaryOperator, right: Node) -> Self {
        Node::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, operand: Node) -> Self {
        Node::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Every variable referenced by the expression, left to right.
    pub fn variables(&self) -> Vec<&VariableOptions> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a VariableOptions>) {
        match self {
            Node::Number(_) => {}
            Node::Variable(options) => out.push(options),
            Node::BinaryOp { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Node::UnaryOp { operand, .. } => operand.collect_variables(out),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(value) => write!(f, "{}", value),
            Node::Variable(options) => {
                let pairs: Vec<String> = options.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "[{}]", pairs.join(","))
            }
            Node::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Node::UnaryOp { op, operand } => match op {
                UnaryOperator::Positive => write!(f, "+{}", operand),
                UnaryOperator::Negative => write!(f, "-{}", operand),
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let node = Node::binary(
            Node::number(5.0),
            BinaryOperator::Add,
            Node::unary(UnaryOperator::Negative, Node::variable([("sid", "2")])),
        );
        assert_eq!(node.to_string(), "(5 + -[sid=2])");
    }

    #[test]
    fn test_variables() {
        let node = Node::binary(
            Node::variable([("sid", "1")]),
            BinaryOperator::Divide,
            Node::variable([("sid", "2")]),
        );
        let vars = node.variables();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].get("sid").map(String::as_str), Some("1"));
        assert_eq!(vars[1].get("sid").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_serialized_shape() {
        let node = Node::binary(Node::number(2.0), BinaryOperator::Multiply, Node::variable([("nid", "5")]));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["binary_op"]["op"], "multiply");
        assert_eq!(json["binary_op"]["right"]["variable"]["nid"], "5");
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }
}
