// ABOUTME: Tree-walking interpreter that executes a parsed statement list

use crate::ast::{Expr, LiteralValue, Stmt};
use crate::env::Environment;
use crate::error::EvalError;
use crate::reporter::Reporter;
use crate::token::{Token, TokenKind};
use crate::value::{Callable, Value};
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Non-local control flow threaded through the `?` operator alongside
/// ordinary evaluation failures. A `return` statement is modeled as an
/// `Unwind::Return` that propagates up through nested blocks and loops to
/// the call site, which unwraps it back into a plain `Value`.
enum Unwind {
    Error(EvalError),
    Return(Value),
}

impl From<EvalError> for Unwind {
    fn from(err: EvalError) -> Self {
        Unwind::Error(err)
    }
}

type ExecResult = Result<(), Unwind>;
type EvalResult = Result<Value, Unwind>;

/// Owns the global environment and the currently active scope. Print
/// output goes through an injected `Write` sink so tests can capture it
/// without touching stdout.
pub struct Interpreter<'out> {
    #[allow(dead_code)]
    globals: Rc<Environment>,
    environment: Rc<Environment>,
    out: &'out mut dyn Write,
}

impl<'out> Interpreter<'out> {
    pub fn new(out: &'out mut dyn Write) -> Self {
        let globals = Environment::new();
        globals.define(
            "clock".to_string(),
            Value::Callable(Rc::new(Callable::Native {
                name: "clock".to_string(),
                arity: 0,
                func: native_clock,
            })),
        );
        Interpreter { environment: globals.clone(), globals, out }
    }

    /// Builds an interpreter around an existing global environment, so a
    /// REPL can keep bindings alive across separately-parsed lines. Redefining
    /// `clock` here is harmless: `Environment::define` always overwrites.
    pub fn with_environment(out: &'out mut dyn Write, globals: Rc<Environment>) -> Self {
        globals.define(
            "clock".to_string(),
            Value::Callable(Rc::new(Callable::Native {
                name: "clock".to_string(),
                arity: 0,
                func: native_clock,
            })),
        );
        Interpreter { environment: globals.clone(), globals, out }
    }

    /// Executes a full program, reporting the first runtime error (if any)
    /// through `reporter` and returning whether execution completed cleanly.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &Reporter) -> bool {
        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Unwind::Error(err)) => {
                    reporter.runtime_error(err.line(), &err.to_string());
                    return false;
                }
                Err(Unwind::Return(_)) => {
                    // A bare top-level `return` has nowhere to return to;
                    // treat it as falling off the end of the program.
                    return true;
                }
            }
        }
        true
    }

    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{value}").expect("writing to print sink should not fail");
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::Block(statements) => {
                let enclosing = Environment::with_enclosing(self.environment.clone());
                self.execute_block(statements, enclosing)
            }
            Stmt::If { condition, then_branch, else_branch } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }
            Stmt::Function(decl) => {
                let callable = Callable::User {
                    declaration: decl.clone(),
                    closure: self.environment.clone(),
                };
                self.environment
                    .define(decl.name.lexeme.clone(), Value::Callable(Rc::new(callable)));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
        }
    }

    /// Runs `statements` with `environment` as the active scope, restoring
    /// the caller's environment on every exit path — a normal fall-through,
    /// a runtime error, or a `return` unwind.
    fn execute_block(&mut self, statements: &[Stmt], environment: Rc<Environment>) -> ExecResult {
        let previous = std::mem::replace(&mut self.environment, environment);
        let mut result = Ok(());
        for stmt in statements {
            if let Err(err) = self.execute(stmt) {
                result = Err(err);
                break;
            }
        }
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(value) => Ok(literal_value(value)),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Variable(name) => Ok(self.environment.get(name)?),
            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Unary { op, operand } => self.evaluate_unary(op, operand),
            Expr::Logical { left, op, right } => self.evaluate_logical(left, op, right),
            Expr::Binary { left, op, right } => self.evaluate_binary(left, op, right),
            Expr::Call { callee, paren, arguments } => self.evaluate_call(callee, paren, arguments),
        }
    }

    fn evaluate_unary(&mut self, op: &Token, operand: &Expr) -> EvalResult {
        let value = self.evaluate(operand)?;
        match op.kind {
            TokenKind::Minus => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(Unwind::Error(EvalError::OperandMustBeNumber { line: op.line })),
            },
            TokenKind::Bang => Ok(Value::Bool(!value.is_truthy())),
            _ => unreachable!("parser only emits ! and - as unary operators"),
        }
    }

    /// `and`/`or` both short-circuit on the deciding value rather than
    /// always evaluating both operands.
    fn evaluate_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> EvalResult {
        let left_value = self.evaluate(left)?;

        match op.kind {
            TokenKind::Or => {
                if left_value.is_truthy() {
                    return Ok(left_value);
                }
            }
            TokenKind::And => {
                if !left_value.is_truthy() {
                    return Ok(left_value);
                }
            }
            _ => unreachable!("parser only emits and/or as logical operators"),
        }

        self.evaluate(right)
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> EvalResult {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        let line = op.line;

        match op.kind {
            TokenKind::Minus => numeric(left, right, line, |a, b| a - b),
            TokenKind::Slash => numeric(left, right, line, |a, b| a / b),
            TokenKind::Star => numeric(left, right, line, |a, b| a * b),
            TokenKind::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(Unwind::Error(EvalError::OperandsMustBeNumbersOrStrings { line })),
            },
            TokenKind::Greater => comparison(left, right, line, |a, b| a > b),
            TokenKind::GreaterEqual => comparison(left, right, line, |a, b| a >= b),
            TokenKind::Less => comparison(left, right, line, |a, b| a < b),
            TokenKind::LessEqual => comparison(left, right, line, |a, b| a <= b),
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::BangEqual => Ok(Value::Bool(left != right)),
            _ => unreachable!("parser only emits arithmetic/comparison tokens as binary operators"),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> EvalResult {
        let callee_value = self.evaluate(callee)?;

        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate(arg)?);
        }

        let callable = match &callee_value {
            Value::Callable(callable) => callable.clone(),
            _ => return Err(Unwind::Error(EvalError::NotCallable { line: paren.line })),
        };

        if args.len() != callable.arity() {
            return Err(Unwind::Error(EvalError::ArityMismatch {
                expected: callable.arity(),
                got: args.len(),
                line: paren.line,
            }));
        }

        self.call(&callable, args)
    }

    fn call(&mut self, callable: &Rc<Callable>, args: Vec<Value>) -> EvalResult {
        match callable.as_ref() {
            Callable::Native { func, .. } => Ok((func)(&args)?),
            Callable::User { declaration, closure } => {
                let call_env = Environment::with_enclosing(closure.clone());
                for (param, arg) in declaration.params.iter().zip(args) {
                    call_env.define(param.lexeme.clone(), arg);
                }

                match self.execute_block(&declaration.body, call_env) {
                    Ok(()) => Ok(Value::Nil),
                    Err(Unwind::Return(value)) => Ok(value),
                    Err(err @ Unwind::Error(_)) => Err(err),
                }
            }
        }
    }
}

fn literal_value(value: &LiteralValue) -> Value {
    match value {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::String(s) => Value::String(s.clone()),
        LiteralValue::Bool(b) => Value::Bool(*b),
        LiteralValue::Nil => Value::Nil,
    }
}

fn numeric(left: Value, right: Value, line: usize, f: impl Fn(f64, f64) -> f64) -> EvalResult {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(a, b))),
        _ => Err(Unwind::Error(EvalError::OperandsMustBeNumbers { line })),
    }
}

fn comparison(left: Value, right: Value, line: usize, f: impl Fn(f64, f64) -> bool) -> EvalResult {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(f(a, b))),
        _ => Err(Unwind::Error(EvalError::OperandsMustBeNumbers { line })),
    }
}

/// The single builtin named in the spec: seconds since the Unix epoch, as
/// an `f64` for sub-second precision.
fn native_clock(_args: &[Value]) -> Result<Value, EvalError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock should not be before the Unix epoch");
    Ok(Value::Number(now.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn run(source: &str) -> (String, bool) {
        let reporter = Reporter::new();
        let tokens = Lexer::new(source).scan(&reporter);
        let statements = Parser::new(&tokens, &reporter).parse();
        assert!(!reporter.had_error(), "unexpected parse error for {source:?}");

        let mut buf = Vec::new();
        let mut interpreter = Interpreter::new(&mut buf);
        let ok = interpreter.interpret(&statements, &reporter);
        (String::from_utf8(buf).unwrap(), ok)
    }

    #[test]
    fn prints_arithmetic_result() {
        let (out, ok) = run("print 1 + 2 * 3;");
        assert!(ok);
        assert_eq!(out, "7\n");
    }

    #[test]
    fn string_concatenation_with_plus() {
        let (out, _) = run(r#"print "foo" + "bar";"#);
        assert_eq!(out, "foobar\n");
    }

    #[test]
    fn division_by_zero_is_not_a_runtime_error() {
        let (out, ok) = run("print 1 / 0;");
        assert!(ok);
        assert_eq!(out, "inf\n");
    }

    #[test]
    fn mixed_plus_operands_is_a_runtime_error() {
        let reporter = Reporter::new();
        let tokens = Lexer::new(r#"print 1 + "a";"#).scan(&reporter);
        let statements = Parser::new(&tokens, &reporter).parse();
        let mut buf = Vec::new();
        let mut interpreter = Interpreter::new(&mut buf);
        let ok = interpreter.interpret(&statements, &reporter);
        assert!(!ok);
        assert!(reporter.had_runtime_error());
    }

    #[test]
    fn variable_assignment_and_read() {
        let (out, _) = run("var a = 1; a = a + 1; print a;");
        assert_eq!(out, "2\n");
    }

    #[test]
    fn block_scoping_does_not_leak_shadowed_binding() {
        let (out, _) = run("var a = 1; { var a = 2; print a; } print a;");
        assert_eq!(out, "2\n1\n");
    }

    #[test]
    fn if_else_selects_branch() {
        let (out, _) = run("if (1 < 2) print \"yes\"; else print \"no\";");
        assert_eq!(out, "yes\n");
    }

    #[test]
    fn while_loop_accumulates() {
        let (out, _) = run("var i = 0; var sum = 0; while (i < 5) { sum = sum + i; i = i + 1; } print sum;");
        assert_eq!(out, "10\n");
    }

    #[test]
    fn for_loop_prints_range() {
        let (out, _) = run("for (var i = 0; i < 3; i = i + 1) print i;");
        assert_eq!(out, "0\n1\n2\n");
    }

    #[test]
    fn and_or_short_circuit_and_return_operand_value() {
        let (out, _) = run(r#"print "hi" or 2; print nil and "unreached"; print false or "fallback";"#);
        assert_eq!(out, "hi\nnil\nfallback\n");
    }

    #[test]
    fn function_call_returns_value() {
        let (out, _) = run("fun add(a, b) { return a + b; } print add(1, 2);");
        assert_eq!(out, "3\n");
    }

    #[test]
    fn function_without_return_yields_nil() {
        let (out, _) = run("fun noop() {} print noop();");
        assert_eq!(out, "nil\n");
    }

    #[test]
    fn recursive_function_computes_factorial() {
        let (out, _) = run(
            "fun fact(n) { if (n <= 1) return 1; return n * fact(n - 1); } print fact(5);",
        );
        assert_eq!(out, "120\n");
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let (out, _) = run(
            "fun makeCounter() { var i = 0; fun count() { i = i + 1; return i; } return count; } \
             var counter = makeCounter(); print counter(); print counter();",
        );
        assert_eq!(out, "1\n2\n");
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let reporter = Reporter::new();
        let tokens = Lexer::new("var x = 1; x();").scan(&reporter);
        let statements = Parser::new(&tokens, &reporter).parse();
        let mut buf = Vec::new();
        let mut interpreter = Interpreter::new(&mut buf);
        assert!(!interpreter.interpret(&statements, &reporter));
        assert!(reporter.had_runtime_error());
    }

    #[test]
    fn arity_mismatch_is_a_runtime_error() {
        let reporter = Reporter::new();
        let tokens = Lexer::new("fun f(a) { return a; } f(1, 2);").scan(&reporter);
        let statements = Parser::new(&tokens, &reporter).parse();
        let mut buf = Vec::new();
        let mut interpreter = Interpreter::new(&mut buf);
        assert!(!interpreter.interpret(&statements, &reporter));
        assert!(reporter.had_runtime_error());
    }

    #[test]
    fn nan_is_never_equal_to_itself_through_division() {
        let (out, _) = run("print (0 / 0) == (0 / 0);");
        assert_eq!(out, "false\n");
    }

    #[test]
    fn clock_builtin_returns_a_number() {
        let (out, ok) = run("print clock() >= 0;");
        assert!(ok);
        assert_eq!(out, "true\n");
    }
}
