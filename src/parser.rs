// ABOUTME: Recursive-descent parser turning a token stream into a statement AST

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::error::ParseError;
use crate::reporter::Reporter;
use crate::token::{Literal, Token, TokenKind};
use std::rc::Rc;

const MAX_ARGS: usize = 255;

/// One recursive-descent function per grammar rule. Parse errors are
/// returned as `Result::Err(ParseError)` and caught at `declaration()`,
/// which reports them and calls `synchronize()` — the panic-mode recovery
/// that lets the parser keep going after a malformed statement.
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    reporter: &'a Reporter,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], reporter: &'a Reporter) -> Self {
        Parser { tokens, current: 0, reporter }
    }

    /// `program → declaration* EOF`. Never stops early: a malformed
    /// top-level declaration is dropped and parsing resumes at the next
    /// synchronization point.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.reporter.error_at(&err.token, &err.message);
                    self.synchronize();
                }
            }
        }
        tracing::debug!(count = statements.len(), "parsed statements");
        statements
    }

    // declaration → funDecl | varDecl | statement
    fn declaration(&mut self) -> Result<Stmt, ParseError> {
        if self.matches(&[TokenKind::Fun]) {
            return self.function("function");
        }
        if self.matches(&[TokenKind::Var]) {
            return self.var_declaration();
        }
        self.statement()
    }

    // funDecl → "fun" function ; function → IDENT "(" params? ")" block
    fn function(&mut self, kind: &str) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name."))?;

        self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name."))?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    self.soft_error_here("Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;

        self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block()?;

        Ok(Stmt::Function(Rc::new(FunctionDecl { name, params, body })))
    }

    // varDecl → "var" IDENT ("=" expression)? ";"
    fn var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;

        let initializer = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    // statement → exprStmt | forStmt | ifStmt | printStmt | returnStmt | whileStmt | block
    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.matches(&[TokenKind::For]) {
            return self.for_statement();
        }
        if self.matches(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.matches(&[TokenKind::Print]) {
            return self.print_statement();
        }
        if self.matches(&[TokenKind::Return]) {
            return self.return_statement();
        }
        if self.matches(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.matches(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    // forStmt → "for" "(" (varDecl | exprStmt | ";") expression? ";" expression? ")" statement
    //
    // Desugars into `Block([init?, While(cond ?? true, Block([body, incr?]))])`.
    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else if self.matches(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal(LiteralValue::Bool(true)));
        body = Stmt::While { condition, body: Box::new(body) };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    // ifStmt → "if" "(" expression ")" statement ("else" statement)?
    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    // printStmt → "print" expression ";"
    fn print_statement(&mut self) -> Result<Stmt, ParseError> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    // returnStmt → "return" expression? ";"
    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    // whileStmt → "while" "(" expression ")" statement
    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    // block → "{" declaration* "}"
    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    // exprStmt → expression ";"
    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // expression → assignment
    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    // assignment → IDENT "=" assignment | logic_or      (right-associative)
    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.logic_or()?;

        if self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            if let Expr::Variable(name) = expr {
                return Ok(Expr::Assign { name, value: Box::new(value) });
            }

            // Invalid assignment target is a diagnostic, not a throw: the
            // LHS is returned unchanged so parsing can keep going.
            self.soft_error_at(&equals, "Invalid assignment target.");
            return Ok(expr);
        }

        Ok(expr)
    }

    // logic_or → logic_and ("or" logic_and)*
    fn logic_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.logic_and()?;

        while self.matches(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = self.logic_and()?;
            expr = Expr::Logical { left: Box::new(expr), op, right: Box::new(right) };
        }

        Ok(expr)
    }

    // logic_and → equality ("and" equality)*
    fn logic_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;

        while self.matches(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical { left: Box::new(expr), op, right: Box::new(right) };
        }

        Ok(expr)
    }

    // equality → comparison (("==" | "!=") comparison)*
    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;

        while self.matches(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }

        Ok(expr)
    }

    // comparison → term ((">" | ">=" | "<" | "<=") term)*
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.term()?;

        while self.matches(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }

        Ok(expr)
    }

    // term → factor (("+" | "-") factor)*
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.factor()?;

        while self.matches(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }

        Ok(expr)
    }

    // factor → unary (("*" | "/") unary)*
    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary()?;

        while self.matches(&[TokenKind::Star, TokenKind::Slash]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }

        Ok(expr)
    }

    // unary → ("!" | "-") unary | call
    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let operand = self.unary()?;
            return Ok(Expr::Unary { op, operand: Box::new(operand) });
        }
        self.call()
    }

    // call → primary ("(" arguments? ")")*
    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    // arguments → expression ("," expression)*      (max 255)
    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut arguments = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    self.soft_error_here("Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call { callee: Box::new(callee), paren, arguments })
    }

    // primary → "true" | "false" | "nil" | NUMBER | STRING | IDENT | "(" expression ")"
    fn primary(&mut self) -> Result<Expr, ParseError> {
        if self.matches(&[TokenKind::False]) {
            return Ok(Expr::Literal(LiteralValue::Bool(false)));
        }
        if self.matches(&[TokenKind::True]) {
            return Ok(Expr::Literal(LiteralValue::Bool(true)));
        }
        if self.matches(&[TokenKind::Nil]) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }
        if self.matches(&[TokenKind::Number]) {
            return match self.previous().literal.clone() {
                Some(Literal::Number(n)) => Ok(Expr::Literal(LiteralValue::Number(n))),
                _ => unreachable!("NUMBER token without a numeric literal"),
            };
        }
        if self.matches(&[TokenKind::String]) {
            return match self.previous().literal.clone() {
                Some(Literal::Str(s)) => Ok(Expr::Literal(LiteralValue::String(s))),
                _ => unreachable!("STRING token without a string literal"),
            };
        }
        if self.matches(&[TokenKind::Identifier]) {
            return Ok(Expr::Variable(self.previous().clone()));
        }
        if self.matches(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(self.error_here("Expect expression."))
    }

    /// Panic-mode recovery: discard tokens until the previous token is `;`
    /// or the next token begins a statement keyword.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ---- token-stream plumbing ----

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_here(message))
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        ParseError::new(self.peek().clone(), message)
    }

    /// A diagnostic that does not abort parsing (over-arity, bad assignment
    /// target): reported through the sink like any other parse error, but
    /// returned as `()` instead of `Err` since the caller keeps going.
    fn soft_error_here(&self, message: &str) {
        self.reporter.error_at(self.peek(), message);
    }

    fn soft_error_at(&self, token: &Token, message: &str) {
        self.reporter.error_at(token, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::reporter::Reporter;

    fn parse(source: &str) -> (Vec<Stmt>, Reporter) {
        let reporter = Reporter::new();
        let tokens = Lexer::new(source).scan(&reporter);
        let stmts = Parser::new(&tokens, &reporter).parse();
        (stmts, reporter)
    }

    #[test]
    fn parses_var_declaration_with_initializer() {
        let (stmts, reporter) = parse("var x = 1 + 2;");
        assert!(!reporter.had_error());
        assert_eq!(stmts.len(), 1);
        assert!(matches!(&stmts[0], Stmt::Var { initializer: Some(_), .. }));
    }

    #[test]
    fn parses_var_declaration_without_initializer() {
        let (stmts, _) = parse("var x;");
        assert!(matches!(&stmts[0], Stmt::Var { initializer: None, .. }));
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let (stmts, _) = parse("1 - 2 - 3;");
        match &stmts[0] {
            Stmt::Expression(Expr::Binary { left, .. }) => {
                assert!(matches!(left.as_ref(), Expr::Binary { .. }));
            }
            other => panic!("expected binary expression statement, got {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let (stmts, reporter) = parse("a = b = 1;");
        assert!(!reporter.had_error());
        match &stmts[0] {
            Stmt::Expression(Expr::Assign { value, .. }) => {
                assert!(matches!(value.as_ref(), Expr::Assign { .. }));
            }
            other => panic!("expected nested assign, got {other:?}"),
        }
    }

    #[test]
    fn invalid_assignment_target_is_reported_and_does_not_abort_parsing() {
        let (stmts, reporter) = parse("1 = 2;");
        assert_eq!(stmts.len(), 1);
        assert!(reporter.had_error());
    }

    #[test]
    fn over_255_parameters_is_reported_as_a_parse_error() {
        let params = (0..256).map(|i| format!("p{i}")).collect::<Vec<_>>().join(", ");
        let source = format!("fun f({params}) {{}}");
        let (_, reporter) = parse(&source);
        assert!(reporter.had_error());
    }

    #[test]
    fn over_255_arguments_is_reported_as_a_parse_error() {
        let args = (0..256).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
        let source = format!("f({args});");
        let (_, reporter) = parse(&source);
        assert!(reporter.had_error());
    }

    #[test]
    fn for_loop_desugars_to_block_with_while() {
        let (stmts, _) = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Block(inner) => {
                assert_eq!(inner.len(), 2);
                assert!(matches!(&inner[0], Stmt::Var { .. }));
                assert!(matches!(&inner[1], Stmt::While { .. }));
            }
            other => panic!("expected desugared block, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_missing_condition_defaults_to_true() {
        let (stmts, _) = parse("for (;;) print 1;");
        match &stmts[0] {
            Stmt::While { condition, .. } => {
                assert!(matches!(condition, Expr::Literal(LiteralValue::Bool(true))));
            }
            other => panic!("expected while, got {other:?}"),
        }
    }

    #[test]
    fn function_declaration_parses_params_and_body() {
        let (stmts, reporter) = parse("fun add(a, b) { return a + b; }");
        assert!(!reporter.had_error());
        match &stmts[0] {
            Stmt::Function(decl) => {
                assert_eq!(decl.name.lexeme, "add");
                assert_eq!(decl.params.len(), 2);
                assert_eq!(decl.body.len(), 1);
            }
            other => panic!("expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn parser_determinism_same_tokens_same_ast_shape() {
        let (a, _) = parse("print 1 + 2 * 3;");
        let (b, _) = parse("print 1 + 2 * 3;");
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }

    #[test]
    fn unterminated_block_is_reported_and_does_not_panic() {
        let (_, reporter) = parse("{ var x = 1;");
        assert!(reporter.had_error());
    }

    #[test]
    fn multiple_parse_errors_are_all_reported() {
        let (_, reporter) = parse("var ; var ;");
        assert!(reporter.had_error());
    }
}
