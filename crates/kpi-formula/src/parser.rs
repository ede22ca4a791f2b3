//! KPI Formula Parser
//!
//! Recursive descent parser producing the formula AST. The grammar is right
//! recursive:
//!
//! ```text
//! expr    := factor (('+'|'-') expr)?
//! factor  := number (('*'|'/') factor)?
//! number  := '(' expr ')' | '[' varlist ']' | NUM | ('-'|'+') number
//! varlist := assign (',' varlist)?
//! assign  := ID '=' (ID|NUM)
//! ```
//!
//! Any grammar violation is a fatal syntax error naming the offending token.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::ast::{BinaryOperator, Node, UnaryOperator, VariableOptions};
use crate::lexer::{Lexer, Token, TokenKind};
use kpi_common::{KpiError, Result};

/// Parse a complete formula.
pub fn parse(formula: &str) -> Result<Node> {
    Parser::new(formula).parse()
}

// =============================================================================
// Parser
// =============================================================================

/// Formula parser over a single input string.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(formula: &'a str) -> Self {
        Self {
            lexer: Lexer::new(formula),
        }
    }

    /// Parse the whole input as one expression.
    pub fn parse(mut self) -> Result<Node> {
        let node = self.expr()?;
        let token = self.lexer.next_token()?;
        if token.kind != TokenKind::End {
            return Err(unexpected(&token, "expected operator or end of formula"));
        }
        Ok(node)
    }

    fn expr(&mut self) -> Result<Node> {
        let left = self.factor()?;
        let token = self.lexer.next_token()?;
        if token.is_operator('+') || token.is_operator('-') {
            let right = self.expr()?;
            return Ok(Node::binary(left, binary_op(&token)?, right));
        }
        self.lexer.revert();
        Ok(left)
    }

    fn factor(&mut self) -> Result<Node> {
        let left = self.number()?;
        let token = self.lexer.next_token()?;
        if token.is_operator('*') || token.is_operator('/') {
            let right = self.factor()?;
            return Ok(Node::binary(left, binary_op(&token)?, right));
        }
        self.lexer.revert();
        Ok(left)
    }

    fn number(&mut self) -> Result<Node> {
        let token = self.lexer.next_token()?;
        match token.kind {
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "unbalanced parenthesis, expected ')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let options = self.varlist()?;
                self.expect(TokenKind::RBracket, "unbalanced bracket, expected ']'")?;
                Ok(Node::Variable(options))
            }
            TokenKind::Number => {
                let value = token
                    .text
                    .parse::<f64>()
                    .map_err(|e| unexpected(&token, &format!("invalid number: {}", e)))?;
                Ok(Node::Number(value))
            }
            TokenKind::Operator if token.is_operator('-') => {
                Ok(Node::unary(UnaryOperator::Negative, self.number()?))
            }
            TokenKind::Operator if token.is_operator('+') => {
                Ok(Node::unary(UnaryOperator::Positive, self.number()?))
            }
            TokenKind::End => Err(unexpected(&token, "unterminated expression")),
            _ => Err(unexpected(&token, "expected number, variable or '('")),
        }
    }

    fn varlist(&mut self) -> Result<VariableOptions> {
        let mut options = VariableOptions::new();
        loop {
            let (key, value) = self.assign()?;
            options.insert(key, value);

            let token = self.lexer.next_token()?;
            if token.kind != TokenKind::Comma {
                self.lexer.revert();
                return Ok(options);
            }
        }
    }

    fn assign(&mut self) -> Result<(String, String)> {
        let key = self.lexer.next_token()?;
        if key.kind != TokenKind::Id {
            return Err(unexpected(&key, "expected variable option name"));
        }

        self.expect(TokenKind::Equals, "expected '=' after option name")?;

        let value = self.lexer.next_token()?;
        match value.kind {
            TokenKind::Id | TokenKind::Number => Ok((key.text, value.text)),
            _ => Err(unexpected(&value, "expected option value")),
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        let token = self.lexer.next_token()?;
        if token.kind != kind {
            return Err(unexpected(&token, message));
        }
        Ok(token)
    }
}

fn binary_op(token: &Token) -> Result<BinaryOperator> {
    token
        .text
        .chars()
        .next()
        .and_then(BinaryOperator::from_char)
        .ok_or_else(|| unexpected(token, "unknown operator"))
}

fn unexpected(token: &Token, message: &str) -> KpiError {
    KpiError::syntax(token.position, token.display_text(), message)
}

// =============================================================================
// Tests
// =============================================================================
