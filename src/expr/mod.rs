//! Threshold expression compiler.
//!
//! A threshold is a string such as `X>1.0 or Y>1.5`: comparisons of a
//! variable against a numeric literal, joined with `and`/`or` and grouped
//! with parentheses.
//!
//! [`compile`] checks tokens only. Every token must be well-formed and every
//! identifier must be whitelisted for the channel, but the order of tokens
//! is not checked. A sequence such as `X > > 1` compiles and then fails at
//! [`Predicate::evaluate`] with [`EvalError::MalformedExpression`].
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use sensorwatch::expr::compile;
//! use sensorwatch_types::Reading;
//!
//! let allowed: BTreeSet<String> = ["X", "Y", "Z"].iter().map(|s| s.to_string()).collect();
//! let predicate = compile("X>1.0 or Y>1.5", &allowed).unwrap();
//!
//! let reading = Reading::new().with("X", 2.0).with("Y", 0.0).with("Z", 0.0);
//! assert_eq!(predicate.evaluate(&reading), Ok(true));
//! ```

mod token;
mod tree;

use std::collections::BTreeSet;

use sensorwatch_types::Reading;
use tracing::debug;

use crate::error::{CompileError, EvalError};

pub use token::{tokenize, Comparator, Lexer, Token};
pub use tree::Expr;

/// A compiled threshold expression bound to the variables it references.
///
/// Immutable once built. Channels swap in a new predicate rather than
/// editing an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    source: String,
    variables: Vec<String>,
    tree: Option<Expr>,
}

impl Predicate {
    /// The expression text this predicate was compiled from, trimmed.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Referenced variables in order of first appearance.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Whether the tokens form a single expression.
    pub fn is_well_formed(&self) -> bool {
        self.tree.is_some()
    }

    /// Evaluate against a reading.
    ///
    /// Fails with [`EvalError::MissingVariable`] for the first referenced
    /// variable the reading lacks, then with
    /// [`EvalError::MalformedExpression`] if the tokens never formed a tree.
    pub fn evaluate(&self, reading: &Reading) -> Result<bool, EvalError> {
        if let Some(missing) = self.variables.iter().find(|v| !reading.contains(v)) {
            return Err(EvalError::MissingVariable(missing.clone()));
        }
        self.tree
            .as_ref()
            .ok_or(EvalError::MalformedExpression)?
            .eval(reading)
    }
}

/// Compile a threshold string against a channel's variable whitelist.
///
/// Fails fast on the first violation in reading order.
pub fn compile(text: &str, allowed: &BTreeSet<String>) -> Result<Predicate, CompileError> {
    let source = text.trim();
    if source.is_empty() {
        return Err(CompileError::EmptyExpression);
    }

    let mut tokens = Vec::new();
    let mut variables: Vec<String> = Vec::new();
    for token in Lexer::new(source) {
        let token = token?;
        if let Token::Ident(name) = &token {
            if !allowed.contains(name) {
                return Err(CompileError::UnknownVariable(name.clone()));
            }
            if !variables.contains(name) {
                variables.push(name.clone());
            }
        }
        tokens.push(token);
    }

    let tree = tree::parse(&tokens);
    if tree.is_none() {
        debug!("Expression '{}' is not well-formed, evaluation will fail", source);
    }

    Ok(Predicate {
        source: source.to_string(),
        variables,
        tree,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn gyro() -> BTreeSet<String> {
        allowed(&["X", "Y", "Z"])
    }

    #[test]
    fn test_compile_valid_expressions() {
        let vars = allowed(&["T", "H"]);
        for text in ["T>50", "T > 50", "T>50 and H>80", "(T >= 1.5) or H != 0", "T==0"] {
            assert!(compile(text, &vars).is_ok(), "{} should compile", text);
        }
    }

    #[test]
    fn test_compile_empty() {
        assert_eq!(compile("", &gyro()), Err(CompileError::EmptyExpression));
        assert_eq!(compile("   \t", &gyro()), Err(CompileError::EmptyExpression));
    }

    #[test]
    fn test_compile_unknown_variable() {
        let light = allowed(&["L"]);
        assert!(compile("L<50", &light).is_ok());
        assert_eq!(
            compile("Q<50", &light),
            Err(CompileError::UnknownVariable("Q".to_string()))
        );
        // Case matters.
        assert_eq!(
            compile("l<50", &light),
            Err(CompileError::UnknownVariable("l".to_string()))
        );
    }

    #[test]
    fn test_compile_reports_first_violation() {
        assert_eq!(
            compile("Q<50 & L<1", &allowed(&["L"])),
            Err(CompileError::UnknownVariable("Q".to_string()))
        );
        assert_eq!(
            compile("L<50 & Q<1", &allowed(&["L"])),
            Err(CompileError::InvalidToken("&".to_string()))
        );
    }

    #[test]
    fn test_punctuation_outside_grammar_is_rejected() {
        let vars = gyro();
        let rejected = (b'!'..=b'~')
            .map(char::from)
            .filter(|c| c.is_ascii_punctuation() && !"<>()".contains(*c));
        for c in rejected {
            assert_eq!(
                compile(&format!("X > 1 {} Y < 2", c), &vars),
                Err(CompileError::InvalidToken(c.to_string())),
                "{:?} should be rejected",
                c
            );
        }
    }

    #[test]
    fn test_every_name_outside_whitelist_is_rejected() {
        let vars = gyro();
        let names = ('A'..='Z')
            .chain('a'..='z')
            .map(String::from)
            .filter(|name| !vars.contains(name))
            .chain(["XY", "Xx", "gyro", "Temperature"].map(String::from));
        for name in names {
            assert_eq!(
                compile(&format!("X > 1 or {} < 2", name), &vars),
                Err(CompileError::UnknownVariable(name.clone()))
            );
        }
    }

    #[test]
    fn test_malformed_sequence_compiles() {
        let predicate = compile("X > > 1", &gyro()).unwrap();
        assert!(!predicate.is_well_formed());

        let reading = Reading::new().with("X", 2.0);
        assert_eq!(
            predicate.evaluate(&reading),
            Err(EvalError::MalformedExpression)
        );
    }

    #[test]
    fn test_unbalanced_parens_compile() {
        let predicate = compile("(X > 1", &gyro()).unwrap();
        let reading = Reading::new().with("X", 2.0);
        assert_eq!(
            predicate.evaluate(&reading),
            Err(EvalError::MalformedExpression)
        );
    }

    #[test]
    fn test_missing_variable_checked_first() {
        // Malformed and missing Y: the missing variable wins.
        let predicate = compile("X > Y", &gyro()).unwrap();
        let reading = Reading::new().with("X", 1.0);
        assert_eq!(
            predicate.evaluate(&reading),
            Err(EvalError::MissingVariable("Y".to_string()))
        );
    }

    #[test]
    fn test_evaluate_gyroscope() {
        let predicate = compile("X>1.0 or Y>1.5", &gyro()).unwrap();
        assert_eq!(predicate.variables(), &["X".to_string(), "Y".to_string()]);

        let breach = Reading::new().with("X", 2.0).with("Y", 0.0).with("Z", 0.0);
        let calm = Reading::new().with("X", 0.0).with("Y", 0.0).with("Z", 0.0);
        assert_eq!(predicate.evaluate(&breach), Ok(true));
        assert_eq!(predicate.evaluate(&calm), Ok(false));
    }

    #[test]
    fn test_evaluate_missing_variable() {
        let predicate = compile("T>50 and H>80", &allowed(&["T", "H"])).unwrap();
        let reading = Reading::new().with("T", 60.0);
        assert_eq!(
            predicate.evaluate(&reading),
            Err(EvalError::MissingVariable("H".to_string()))
        );
    }

    #[test]
    fn test_source_is_trimmed() {
        let predicate = compile("  L < 5  ", &allowed(&["L"])).unwrap();
        assert_eq!(predicate.source(), "L < 5");
    }
}
