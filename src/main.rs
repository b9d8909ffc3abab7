// ABOUTME: CLI entry point: runs a Lox script file or starts the REPL

use clap::Parser as ClapParser;
use loxrs::config::{WELCOME_MESSAGE, WELCOME_SUBTITLE};
use loxrs::env::Environment;
use loxrs::highlighter::LoxHelper;
use loxrs::interpreter::Interpreter;
use loxrs::lexer::Lexer;
use loxrs::parser::Parser;
use loxrs::reporter::Reporter;
use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// A tree-walking interpreter for Lox, with a REPL and script runner.
#[derive(ClapParser, Debug)]
#[command(name = "lox")]
#[command(version = loxrs::config::VERSION)]
#[command(about = "A tree-walking interpreter for Lox")]
struct CliArgs {
    /// Script file to execute (optional - if not provided, starts the REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Enable verbose tracing of lexer/parser/interpreter internals
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.trace {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "loxrs=debug".parse().expect("static directive always parses"),
            ))
            .init();
    }

    match args.script {
        Some(path) => run_file(&path),
        None => {
            run_repl();
            ExitCode::SUCCESS
        }
    }
}

/// Runs a script file to completion. Exit code 65 signals a compile-time
/// (lex/parse) error, 70 a runtime error, matching the rest of the `sysexits`
/// family the teacher's CLI conventions follow.
fn run_file(path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Cannot read script file {}: {err}", path.display());
            return ExitCode::from(74);
        }
    };

    let reporter = Reporter::new();
    let tokens = Lexer::new(&source).scan(&reporter);
    let statements = Parser::new(&tokens, &reporter).parse();

    if reporter.had_error() {
        return ExitCode::from(65);
    }

    let mut stdout = io::stdout();
    let mut interpreter = Interpreter::new(&mut stdout);
    interpreter.interpret(&statements, &reporter);

    if reporter.had_runtime_error() {
        return ExitCode::from(70);
    }

    ExitCode::SUCCESS
}

/// Interactive REPL: each line is lexed, parsed, and executed against a
/// single `Environment` and `Interpreter` that persist across turns, so
/// `var`/`fun` declarations from one line are visible on the next.
fn run_repl() {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<LoxHelper, rustyline::history::DefaultHistory> =
        match Editor::with_config(config) {
            Ok(rl) => rl,
            Err(err) => {
                eprintln!("Failed to initialize REPL: {err}");
                return;
            }
        };
    rl.set_helper(Some(LoxHelper::new()));

    let history_file = ".lox_history";
    let _ = rl.load_history(history_file);

    println!("{WELCOME_MESSAGE}");
    println!("{WELCOME_SUBTITLE}");

    let globals = Environment::new();
    let mut stdout = io::stdout();

    loop {
        let readline = rl.readline("lox> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "exit()" {
                    println!("Goodbye!");
                    break;
                }
                if trimmed == "clear()" {
                    print!("\x1B[2J\x1B[H");
                    let _ = stdout.flush();
                    continue;
                }

                let reporter = Reporter::new();
                let tokens = Lexer::new(&line).scan(&reporter);
                let statements = Parser::new(&tokens, &reporter).parse();

                if reporter.had_error() {
                    continue;
                }

                let mut interpreter = Interpreter::with_environment(&mut stdout, globals.clone());
                interpreter.interpret(&statements, &reporter);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
}
