// ABOUTME: Configuration and constants for the Lox interpreter
// This module contains version info and REPL welcome messages

#[allow(dead_code)]
pub const VERSION: &str = "1.0.0";
pub const WELCOME_MESSAGE: &str = "Lox Interpreter v1.0";
pub const WELCOME_SUBTITLE: &str = "A tree-walking interpreter for Lox, in Rust";

#[allow(dead_code)]
pub const HELP_TEXT: &str = r#"
Available commands:
  exit() or Ctrl-D    - Exit the REPL
  clear()             - Clear the screen

Type any Lox statement to execute it. Statements must end with ';'.
"#;
