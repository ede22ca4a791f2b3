//! KPI Formula - Derived Metric Expression Language
//!
//! A small interpreted arithmetic language for KPI definitions. Formulas
//! combine numbers and bracketed variable references such as
//! `[sid=2,nid=5,agg=sum]` with `+ - * /`, parentheses and unary signs.
//! Variables resolve to scalars or whole series through a caller supplied
//! resolver.
//!
//! Key Features:
//! - Hand written lexer with single token pushback
//! - Right recursive descent parser with positioned syntax errors
//! - Scalar and series arithmetic with padding propagation
//! - Division by zero yields padding, never an error
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

pub mod ast;
pub mod evaluator;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod value;

pub use ast::{BinaryOperator, Node, UnaryOperator, VariableOptions};
pub use evaluator::{AstEvaluator, VariableResolver};
pub use lexer::{Lexer, Token, TokenKind};
pub use operator::OperatorEvaluator;
pub use parser::{parse, Parser};
pub use value::Value;
