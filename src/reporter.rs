// ABOUTME: Diagnostic sink shared by the lexer, parser, and interpreter

use crate::token::{Token, TokenKind};
use std::cell::Cell;

/// Receives `(line, where, message)` diagnostics from every pipeline stage
/// and tracks whether a compile-time or runtime error has occurred, which
/// the CLI maps to exit codes 65 and 70 respectively.
///
/// Modeled as an injected collaborator (not process-global state) so a
/// REPL can construct a fresh one per line while reusing the same
/// `Environment` across turns.
#[derive(Debug, Default)]
pub struct Reporter {
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    pub fn reset(&self) {
        self.had_error.set(false);
        self.had_runtime_error.set(false);
    }

    /// Used by the lexer and for standalone parser messages not tied to a token.
    pub fn error(&self, line: usize, message: &str) {
        self.report(line, "", message);
    }

    /// Used by the parser to report an error at a specific token.
    pub fn error_at(&self, token: &Token, message: &str) {
        if token.kind == TokenKind::Eof {
            self.report(token.line, " at end", message);
        } else {
            self.report(token.line, &format!(" at '{}'", token.lexeme), message);
        }
    }

    /// Used by the interpreter when a runtime error aborts an `interpret` call.
    pub fn runtime_error(&self, line: usize, message: &str) {
        tracing::error!(line, message, "runtime error");
        eprintln!("{message}\n[line {line}]");
        self.had_runtime_error.set(true);
    }

    fn report(&self, line: usize, location: &str, message: &str) {
        tracing::error!(line, location, message, "compile error");
        eprintln!("[line {line}] Error{location}: {message}");
        self.had_error.set(true);
    }
}
