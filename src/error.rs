// ABOUTME: Error types for parse and evaluation failures

use crate::token::Token;
use thiserror::Error;

/// A parse-time error: the offending token plus a human-readable message.
/// Internal to the parser — caught at each `declaration()` boundary and
/// turned into a reporter diagnostic plus a `synchronize()` call, so it
/// never unwinds the whole parse.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        ParseError {
            token,
            message: message.into(),
        }
    }
}

/// A runtime error, one variant per spec-mandated message family. Each
/// variant carries the `line` of the token responsible, so the reporter can
/// print `"MSG\n[line L]"` without threading the token itself through the
/// evaluator's `Result` chain.
#[allow(dead_code)]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Operand must be a number.")]
    OperandMustBeNumber { line: usize },

    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers { line: usize },

    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings { line: usize },

    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: usize },

    #[error("Can only call functions and classes.")]
    NotCallable { line: usize },

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize, line: usize },
}

impl EvalError {
    /// The source line the reporter should attribute this error to.
    pub fn line(&self) -> usize {
        match self {
            EvalError::OperandMustBeNumber { line }
            | EvalError::OperandsMustBeNumbers { line }
            | EvalError::OperandsMustBeNumbersOrStrings { line }
            | EvalError::UndefinedVariable { line, .. }
            | EvalError::NotCallable { line }
            | EvalError::ArityMismatch { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_spec_wording() {
        assert_eq!(
            EvalError::OperandMustBeNumber { line: 1 }.to_string(),
            "Operand must be a number."
        );
        assert_eq!(
            EvalError::OperandsMustBeNumbersOrStrings { line: 1 }.to_string(),
            "Operands must be two numbers or two strings."
        );
        assert_eq!(
            EvalError::UndefinedVariable { name: "x".into(), line: 1 }.to_string(),
            "Undefined variable 'x'."
        );
        assert_eq!(
            EvalError::ArityMismatch { expected: 2, got: 1, line: 1 }.to_string(),
            "Expected 2 arguments but got 1."
        );
    }

    #[test]
    fn line_accessor_matches_constructed_line() {
        let err = EvalError::NotCallable { line: 42 };
        assert_eq!(err.line(), 42);
    }
}
