//! Tokenizer for threshold expressions.
//!
//! Scans left to right with longest match. Whitespace between tokens is
//! optional, so `T>50` and `T > 50` produce the same tokens.

use std::fmt;

use crate::error::CompileError;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl Comparator {
    /// Compare a variable's value against a literal.
    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::Gt => lhs > rhs,
            Comparator::Lt => lhs < rhs,
            Comparator::Ge => lhs >= rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Eq => lhs == rhs,
            Comparator::Ne => lhs != rhs,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Comparator(Comparator),
    Ident(String),
    Number(f64),
    OpenParen,
    CloseParen,
    And,
    Or,
}

/// Streaming tokenizer over an expression string.
///
/// Yields tokens in order and stops at the first invalid character, so a
/// caller validating as it goes reports the first violation in the text.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            failed: false,
        }
    }

    fn rest(&self) -> &'a str {
        let input = self.input;
        &input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, pred: F) -> &'a str {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        &rest[..len]
    }

    fn comparator(&mut self) -> Option<Comparator> {
        let two = match (self.peek(), self.peek_at(1)) {
            (Some('>'), Some('=')) => Some(Comparator::Ge),
            (Some('<'), Some('=')) => Some(Comparator::Le),
            (Some('='), Some('=')) => Some(Comparator::Eq),
            (Some('!'), Some('=')) => Some(Comparator::Ne),
            _ => None,
        };
        if let Some(op) = two {
            self.pos += 2;
            return Some(op);
        }

        let one = match self.peek() {
            Some('>') => Some(Comparator::Gt),
            Some('<') => Some(Comparator::Lt),
            _ => None,
        };
        if one.is_some() {
            self.pos += 1;
        }
        one
    }

    fn number(&mut self) -> Result<Token, CompileError> {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit());
        // A fraction needs at least one digit after the point.
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            self.take_while(|c| c.is_ascii_digit());
        }
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| CompileError::InvalidToken(text.to_string()))
    }

    fn next_token(&mut self) -> Option<Result<Token, CompileError>> {
        self.take_while(char::is_whitespace);
        let ch = self.peek()?;

        if let Some(op) = self.comparator() {
            return Some(Ok(Token::Comparator(op)));
        }

        let token = match ch {
            '(' => {
                self.pos += 1;
                Ok(Token::OpenParen)
            }
            ')' => {
                self.pos += 1;
                Ok(Token::CloseParen)
            }
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() => {
                let word = self.take_while(|c| c.is_ascii_alphabetic());
                Ok(match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    _ => Token::Ident(word.to_string()),
                })
            }
            other => Err(CompileError::InvalidToken(other.to_string())),
        };
        Some(token)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_token();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

/// Tokenize a whole expression, failing on the first invalid token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, CompileError> {
    Lexer::new(input).collect()
}
