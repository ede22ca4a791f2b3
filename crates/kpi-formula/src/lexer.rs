//! KPI Formula Lexer
//!
//! Splits formula text into tokens. Whitespace before a token is skipped.
//! One token of pushback is supported through [`Lexer::revert`], which is
//! all the recursive descent parser needs to look ahead.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use kpi_common::{KpiError, Result};
use std::fmt;

// =============================================================================
// Tokens
// =============================================================================

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Id,
    Operator,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Equals,
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Number => "number",
            Self::Id => "identifier",
            Self::Operator => "operator",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::Comma => "','",
            Self::Equals => "'='",
            Self::End => "end of input",
        };
        f.write_str(name)
    }
}

/// A token and the source text it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the token in the formula.
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn is_operator(&self, op: char) -> bool {
        self.kind == TokenKind::Operator && self.text.len() == 1 && self.text.starts_with(op)
    }

    /// The token text, or a readable stand-in for end of input.
    pub fn display_text(&self) -> &str {
        match self.kind {
            TokenKind::End => "<end>",
            _ => &self.text,
        }
    }
}

// =============================================================================
// Lexer
// =============================================================================

/// Tokenizer with single token pushback.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    last: Option<Token>,
    reverted: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            last: None,
            reverted: false,
        }
    }

    /// Return the next token, or the pushed back one after [`Lexer::revert`].
    pub fn next_token(&mut self) -> Result<Token> {
        if self.reverted {
            if let Some(token) = self.last.clone() {
                self.reverted = false;
                return Ok(token);
            }
        }

        let token = self.scan()?;
        tracing::trace!(kind = %token.kind, text = %token.text, position = token.position, "token");
        self.last = Some(token.clone());
        Ok(token)
    }

    /// Push the last token back so the next call returns it again.
    pub fn revert(&mut self) {
        if self.last.is_some() {
            self.reverted = true;
        }
    }

    /// Collect every token up to and including [`TokenKind::End`].
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::End;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn scan(&mut self) -> Result<Token> {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
        let start = self.pos;

        let Some(c) = trimmed.chars().next() else {
            return Ok(Token::new(TokenKind::End, "", start));
        };

        let kind = match c {
            '+' | '-' | '*' | '/' => Some(TokenKind::Operator),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ',' => Some(TokenKind::Comma),
            '=' => Some(TokenKind::Equals),
            _ => None,
        };
        if let Some(kind) = kind {
            self.pos += c.len_utf8();
            return Ok(Token::new(kind, c.to_string(), start));
        }

        if c.is_ascii_digit() {
            let len = number_len(trimmed);
            self.pos += len;
            return Ok(Token::new(TokenKind::Number, &trimmed[..len], start));
        }

        if is_word_char(c) {
            let len = trimmed
                .char_indices()
                .find(|(_, ch)| !is_word_char(*ch))
                .map(|(i, _)| i)
                .unwrap_or(trimmed.len());
            self.pos += len;
            return Ok(Token::new(TokenKind::Id, &trimmed[..len], start));
        }

        Err(KpiError::syntax(start, c.to_string(), "unrecognized character"))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Length of a leading `\d+(\.\d+)?` match.
fn number_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if bytes.get(len) == Some(&b'.') {
        let fraction = bytes[len + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if fraction > 0 {
            len += 1 + fraction;
        }
    }
    len
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_arithmetic() {
        use TokenKind::*;
        assert_eq!(
            kinds("5*(5+ 5)"),
            vec![Number, Operator, LParen, Number, Operator, Number, RParen, End]
        );
    }

    #[test]
    fn test_tokenize_variable() {
        let tokens = Lexer::new("[nid=5, sid=2,agg=sum]").tokenize().unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["[", "nid", "=", "5", ",", "sid", "=", "2", ",", "agg", "=", "sum", "]", ""]
        );
        assert_eq!(tokens[5].position, 8);
    }

    #[test]
    fn test_decimal_numbers() {
        let tokens = Lexer::new("12.75 3.").tokenize();
        // "3." leaves a dangling '.' which is not a token.
        assert!(matches!(tokens, Err(KpiError::Syntax { position: 7, .. })));

        let tokens = Lexer::new("12.75").tokenize().unwrap();
        assert_eq!(tokens[0].text, "12.75");
    }

    #[test]
    fn test_revert() {
        let mut lexer = Lexer::new("a + b");
        let first = lexer.next_token().unwrap();
        lexer.revert();
        assert_eq!(lexer.next_token().unwrap(), first);
        assert!(lexer.next_token().unwrap().is_operator('+'));
        assert_eq!(lexer.next_token().unwrap().text, "b");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn test_unrecognized_character() {
        let err = Lexer::new("5 % 2").tokenize().unwrap_err();
        match err {
            KpiError::Syntax { position, token, .. } => {
                assert_eq!(position, 2);
                assert_eq!(token, "%");
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
