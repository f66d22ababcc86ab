//! Recursive-descent parser for Rill
//!
//! Consumes the lexer's token stream and produces the statement list of
//! [`crate::ast`]. Every braced block is bracketed with
//! `BlockEnter`/`BlockExit` markers so the semantic pass sees scope
//! boundaries as ordinary statements.
//!
//! Precedence (low to high): comparison < additive < multiplicative <
//! unary `!` < primary. All binary operators are left-associative.

use crate::ast::{BinOp, Expr, Stmt};
use crate::lexer::{Token, TokenKind};
use crate::types::Type;
use std::fmt;

/// Syntax error with the position of the offending token
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Parse a token stream into a statement list.
pub fn parse(tokens: &[Token]) -> Result<Vec<Stmt>, ParseError> {
    Parser::new(tokens).parse()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn parse(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut program = Vec::new();
        while !self.is_at_end() {
            program.push(self.parse_statement()?);
        }
        Ok(program)
    }

    // ----- token helpers -----

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn check_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn check_keyword(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(word))
    }

    fn check_operator(&self, op: &str) -> bool {
        self.peek().is_some_and(|t| t.is_operator(op))
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Position of the current token, or of the last token at EOF.
    fn here(&self) -> (usize, usize) {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let (line, column) = self.here();
        ParseError {
            message: message.into(),
            line,
            column,
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check_kind(kind) {
            if let Some(token) = self.bump() {
                return Ok(token);
            }
        }
        let found = self
            .peek()
            .map(|t| format!("'{}'", t.lexeme))
            .unwrap_or_else(|| "end of input".to_string());
        Err(self.error(format!("expected {}, found {}", what, found)))
    }

    fn expect_operator(&mut self, op: &str, what: &str) -> Result<(), ParseError> {
        if self.check_operator(op) {
            self.bump();
            Ok(())
        } else {
            let found = self
                .peek()
                .map(|t| format!("'{}'", t.lexeme))
                .unwrap_or_else(|| "end of input".to_string());
            Err(self.error(format!("expected {}, found {}", what, found)))
        }
    }

    fn expect_semi(&mut self) -> Result<(), ParseError> {
        self.expect_kind(TokenKind::Semicolon, "';'").map(|_| ())
    }

    // ----- statements -----

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.check_keyword("return") {
            return self.parse_return();
        }
        if self.check_keyword("const") {
            return self.parse_const_declaration();
        }
        if self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Keyword && Type::from_keyword(&t.lexeme).is_some())
        {
            return self.parse_declaration();
        }
        if self.check_keyword("if") {
            return self.parse_if();
        }
        if self.check_keyword("while") {
            return self.parse_while();
        }
        if self.check_kind(TokenKind::Identifier) {
            if self.peek_ahead(1).is_some_and(|t| t.kind == TokenKind::LParen) {
                return self.parse_call_statement();
            }
            return self.parse_assignment();
        }
        match self.peek() {
            Some(t) => Err(self.error(format!("invalid statement, unexpected token '{}'", t.lexeme))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Keyword => match Type::from_keyword(&t.lexeme) {
                Some(ty) => {
                    self.bump();
                    Ok(ty)
                }
                None => Err(self.error(format!("expected a type, found '{}'", t.lexeme))),
            },
            Some(t) => Err(self.error(format!("expected a type, found '{}'", t.lexeme))),
            None => Err(self.error("expected a type, found end of input")),
        }
    }

    fn parse_ident(&mut self) -> Result<String, ParseError> {
        self.expect_kind(TokenKind::Identifier, "an identifier")
            .map(|t| t.lexeme)
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.bump(); // return
        if self.check_kind(TokenKind::Semicolon) {
            self.bump();
            return Ok(Stmt::Return(None));
        }
        let expr = self.parse_expression()?;
        self.expect_semi()?;
        Ok(Stmt::Return(Some(expr)))
    }

    fn parse_const_declaration(&mut self) -> Result<Stmt, ParseError> {
        self.bump(); // const
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        if self.check_kind(TokenKind::Semicolon) {
            return Err(self.error("a constant must be initialized at declaration"));
        }
        self.expect_operator("=", "'=' after constant name")?;
        let init = self.parse_expression()?;
        self.expect_semi()?;
        Ok(Stmt::Declaration {
            ty,
            name,
            init: Some(init),
            is_const: true,
        })
    }

    fn parse_declaration(&mut self) -> Result<Stmt, ParseError> {
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;

        if self.check_kind(TokenKind::LParen) {
            return self.parse_function_declaration(ty, name);
        }

        if self.check_kind(TokenKind::Semicolon) {
            self.bump();
            return Ok(Stmt::Declaration {
                ty,
                name,
                init: None,
                is_const: false,
            });
        }

        self.expect_operator("=", "'=' or ';' after variable name")?;
        let init = self.parse_expression()?;
        self.expect_semi()?;
        Ok(Stmt::Declaration {
            ty,
            name,
            init: Some(init),
            is_const: false,
        })
    }

    /// Parse `ret name(type ident, ...) { ... }`.
    ///
    /// The body is syntax-checked and discarded; only the signature is
    /// kept. Parameter names are parsed but not recorded.
    fn parse_function_declaration(&mut self, ret: Type, name: String) -> Result<Stmt, ParseError> {
        self.bump(); // (
        let mut params = Vec::new();
        if !self.check_kind(TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                self.parse_ident()?;
                params.push(ty);
                if self.check_kind(TokenKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect_kind(TokenKind::RParen, "')' after parameter list")?;
        self.expect_kind(TokenKind::LBrace, "'{' before function body")?;
        while !self.check_kind(TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(self.error(format!("missing '}}' closing function '{}'", name)));
            }
            self.parse_statement()?;
        }
        self.bump(); // }
        Ok(Stmt::FuncDecl { name, params, ret })
    }

    fn parse_assignment(&mut self) -> Result<Stmt, ParseError> {
        let name = self.parse_ident()?;
        self.expect_operator("=", "'=' in assignment")?;
        let expr = self.parse_expression()?;
        self.expect_semi()?;
        Ok(Stmt::Assignment { name, expr })
    }

    fn parse_call_statement(&mut self) -> Result<Stmt, ParseError> {
        let name = self.parse_ident()?;
        let args = self.parse_call_args(&name)?;
        self.expect_semi()?;
        Ok(Stmt::CallStmt { name, args })
    }

    /// Parse a braced block, bracketing its statements with
    /// `BlockEnter`/`BlockExit` markers.
    fn parse_block(&mut self, construct: &str) -> Result<Vec<Stmt>, ParseError> {
        self.expect_kind(TokenKind::LBrace, "'{'")?;
        let mut block = vec![Stmt::BlockEnter];
        while !self.check_kind(TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(self.error(format!("missing '}}' closing the '{}' block", construct)));
            }
            block.push(self.parse_statement()?);
        }
        self.bump(); // }
        block.push(Stmt::BlockExit);
        Ok(block)
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.bump(); // if
        self.expect_kind(TokenKind::LParen, "'(' after 'if'")?;
        let cond = self.parse_expression()?;
        self.expect_kind(TokenKind::RParen, "')' after condition")?;
        let then_block = self.parse_block("if")?;

        let else_block = if self.check_keyword("else") {
            self.bump();
            Some(self.parse_block("else")?)
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.bump(); // while
        self.expect_kind(TokenKind::LParen, "'(' after 'while'")?;
        let cond = self.parse_expression()?;
        self.expect_kind(TokenKind::RParen, "')' after condition")?;
        let body = self.parse_block("while")?;
        Ok(Stmt::While { cond, body })
    }

    // ----- expressions -----

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_comparison()
    }

    fn comparison_op(&self) -> Option<BinOp> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Equals => Some(BinOp::Eq),
            TokenKind::Greater => Some(BinOp::Gt),
            TokenKind::Less => Some(BinOp::Lt),
            TokenKind::GreaterEqual => Some(BinOp::Ge),
            TokenKind::LessEqual => Some(BinOp::Le),
            TokenKind::Operator if token.lexeme == "!=" => Some(BinOp::Ne),
            _ => None,
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_add_sub()?;
        while let Some(op) = self.comparison_op() {
            self.bump();
            let right = self.parse_add_sub()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_add_sub(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_div()?;
        loop {
            let op = if self.check_operator("+") {
                BinOp::Add
            } else if self.check_operator("-") {
                BinOp::Sub
            } else {
                break;
            };
            self.bump();
            let right = self.parse_mul_div()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_mul_div(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.check_operator("*") {
                BinOp::Mul
            } else if self.check_operator("/") {
                BinOp::Div
            } else {
                break;
            };
            self.bump();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check_operator("!") {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        // Parenthesized expression
        if self.check_kind(TokenKind::LParen) {
            self.bump();
            let expr = self.parse_expression()?;
            self.expect_kind(TokenKind::RParen, "')'")?;
            return Ok(expr);
        }

        // Number literal
        if self.check_kind(TokenKind::Number) {
            let token = self.expect_kind(TokenKind::Number, "a number")?;
            return parse_number(&token).map_err(|m| ParseError {
                message: m,
                line: token.line,
                column: token.column,
            });
        }

        // String literal (lexeme keeps its quotes; strip them here)
        if self.check_kind(TokenKind::Str) {
            let token = self.expect_kind(TokenKind::Str, "a string literal")?;
            let inner = token.lexeme.trim_matches('"').to_string();
            return Ok(Expr::Str(inner));
        }

        // Char literal
        if self.check_kind(TokenKind::Char) {
            let token = self.expect_kind(TokenKind::Char, "a character literal")?;
            let inner = token.lexeme.trim_matches('\'').chars().next();
            return match inner {
                Some(c) => Ok(Expr::Char(c)),
                None => Err(self.error("empty character literal")),
            };
        }

        // Boolean literals
        if self.check_keyword("true") {
            self.bump();
            return Ok(Expr::Bool(true));
        }
        if self.check_keyword("false") {
            self.bump();
            return Ok(Expr::Bool(false));
        }

        // Explicit cast: int(...), float(...), string(...), bool(...)
        if let Some(token) = self.peek() {
            if token.kind == TokenKind::Keyword {
                if let Some(ty) = Type::from_keyword(&token.lexeme) {
                    if ty != Type::Char {
                        let target = token.lexeme.clone();
                        self.bump();
                        self.expect_kind(
                            TokenKind::LParen,
                            &format!("'(' after cast to {}", target),
                        )?;
                        let inner = self.parse_expression()?;
                        self.expect_kind(
                            TokenKind::RParen,
                            &format!("')' closing cast to {}", target),
                        )?;
                        return Ok(Expr::Cast(ty, Box::new(inner)));
                    }
                }
            }
        }

        // Identifier or function call
        if self.check_kind(TokenKind::Identifier) {
            let name = self.parse_ident()?;
            if self.check_kind(TokenKind::LParen) {
                let args = self.parse_call_args(&name)?;
                return Ok(Expr::Call(name, args));
            }
            return Ok(Expr::Ident(name));
        }

        match self.peek() {
            Some(t) => Err(self.error(format!("unexpected token '{}' in expression", t.lexeme))),
            None => Err(self.error("unexpected end of input in expression")),
        }
    }

    fn parse_call_args(&mut self, name: &str) -> Result<Vec<Expr>, ParseError> {
        self.expect_kind(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check_kind(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.check_kind(TokenKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if !self.check_kind(TokenKind::RParen) {
            return Err(self.error(format!("expected ')' closing the call to '{}'", name)));
        }
        self.bump();
        Ok(args)
    }
}

/// Parse a number lexeme; a decimal point selects float.
fn parse_number(token: &Token) -> Result<Expr, String> {
    if token.lexeme.contains('.') {
        token
            .lexeme
            .parse::<f64>()
            .map(Expr::Float)
            .map_err(|_| format!("malformed number '{}'", token.lexeme))
    } else {
        token
            .lexeme
            .parse::<i64>()
            .map(Expr::Int)
            .map_err(|_| format!("integer literal '{}' out of range", token.lexeme))
    }
}
