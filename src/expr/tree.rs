//! Expression tree and the recursive-descent parser that builds it.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr       := and_expr ("or" and_expr)*
//! and_expr   := primary ("and" primary)*
//! primary    := "(" expr ")" | IDENT COMPARATOR NUMBER
//! ```

use std::fmt;

use sensorwatch_types::Reading;

use super::token::{Comparator, Token};
use crate::error::EvalError;

/// Parentheses nested deeper than this are rejected.
const MAX_DEPTH: usize = 64;

/// A parsed threshold expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Comparison {
        variable: String,
        op: Comparator,
        literal: f64,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate against a reading. `and`/`or` short-circuit.
    pub fn eval(&self, reading: &Reading) -> Result<bool, EvalError> {
        match self {
            Expr::Comparison {
                variable,
                op,
                literal,
            } => {
                let value = reading
                    .get(variable)
                    .ok_or_else(|| EvalError::MissingVariable(variable.clone()))?;
                Ok(op.apply(value, *literal))
            }
            Expr::And(lhs, rhs) => Ok(lhs.eval(reading)? && rhs.eval(reading)?),
            Expr::Or(lhs, rhs) => Ok(lhs.eval(reading)? || rhs.eval(reading)?),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Comparison {
                variable,
                op,
                literal,
            } => write!(f, "{} {} {}", variable, op, literal),
            Expr::And(lhs, rhs) => write!(f, "({} and {})", lhs, rhs),
            Expr::Or(lhs, rhs) => write!(f, "({} or {})", lhs, rhs),
        }
    }
}

/// Build a tree from a token sequence.
///
/// Returns `None` when the tokens do not form a single expression.
pub fn parse(tokens: &[Token]) -> Option<Expr> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if parser.pos == tokens.len() {
        Some(expr)
    } else {
        None
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Some(lhs)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_primary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_primary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Some(lhs)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        match self.next()? {
            Token::OpenParen => {
                if self.depth >= MAX_DEPTH {
                    return None;
                }
                self.depth += 1;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.next()? {
                    Token::CloseParen => Some(inner),
                    _ => None,
                }
            }
            Token::Ident(variable) => {
                let op = match self.next()? {
                    Token::Comparator(op) => *op,
                    _ => return None,
                };
                let literal = match self.next()? {
                    Token::Number(n) => *n,
                    _ => return None,
                };
                Some(Expr::Comparison {
                    variable: variable.clone(),
                    op,
                    literal,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::token::tokenize;

    fn tree(text: &str) -> Option<Expr> {
        parse(&tokenize(text).unwrap())
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = tree("X>1 or Y>2 and Z>3").unwrap();
        assert_eq!(expr.to_string(), "(X > 1 or (Y > 2 and Z > 3))");
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = tree("(X>1 or Y>2) and Z>3").unwrap();
        assert_eq!(expr.to_string(), "((X > 1 or Y > 2) and Z > 3)");
    }

    #[test]
    fn test_malformed_sequences() {
        for text in [
            "X",
            "X >",
            "X > > 1",
            "1 < X",
            "X > Y",
            "(X > 1",
            "X > 1)",
            "X > 1 and",
            "or X > 1",
            "X > 1 Y > 2",
            "X > 1 > 2",
            "()",
        ] {
            assert!(tree(text).is_none(), "{} should not parse", text);
        }
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = format!("{}X>1{}", "(".repeat(10), ")".repeat(10));
        assert!(tree(&shallow).is_some());

        let deep = format!("{}X>1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(tree(&deep).is_none());
    }

    #[test]
    fn test_eval_short_circuits() {
        // Y is absent but never looked at.
        let expr = tree("X>1 or Y>2").unwrap();
        let reading = Reading::new().with("X", 5.0);
        assert_eq!(expr.eval(&reading), Ok(true));
    }
}
