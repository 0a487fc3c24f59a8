//! Error types for the alerting core.
//!
//! None of these are fatal. Compile and config errors go back to whoever
//! asked for the change; evaluation and decode errors are logged and the
//! message is treated as "no breach".

use thiserror::Error;

pub use sensorwatch_types::TransportError;

/// Errors raised while compiling a threshold expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The expression is blank after trimming.
    #[error("Threshold expression cannot be empty")]
    EmptyExpression,

    /// A character sequence matches none of the token shapes.
    #[error("Token '{0}' is invalid")]
    InvalidToken(String),

    /// An identifier is not in the channel's variable whitelist.
    #[error("Variable '{0}' is not allowed in this channel")]
    UnknownVariable(String),
}

/// Errors raised while evaluating a compiled predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The reading lacks a variable the predicate references.
    #[error("Reading has no value for variable '{0}'")]
    MissingVariable(String),

    /// The token sequence does not reduce to a single boolean.
    #[error("Expression is not a well-formed comparison")]
    MalformedExpression,
}

/// Errors raised while decoding an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON.
    #[error("Invalid JSON payload: {0}")]
    Json(String),

    /// The payload is JSON but not an object of named fields.
    #[error("Payload is not a JSON object")]
    NotAnObject,
}

/// Errors raised when applying channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No channel with this name exists.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// The threshold expression failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),
}
