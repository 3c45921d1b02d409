use thiserror::Error;

use crate::ast::{
    BinaryOp, ElseIf, Expr, Function, Item, Param, Program, Stmt, Type, UnaryOp, VarDecl,
};
use crate::token::{Token, TokenKind};

pub mod ast;

/// One accumulated parse diagnostic with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Line {line}, col {column}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Recursive-descent LL(1) parser.
///
/// The parser never aborts: every mismatch records a `SyntaxError` and
/// recovery advances by a single token, so the returned AST may be partial
/// when the diagnostic list is non-empty.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::EndOfFile) {
            let (line, column) = tokens
                .last()
                .map(|t| (t.line, t.column))
                .unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::EndOfFile, "", line, column));
        }
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse_program(mut self) -> (Program, Vec<SyntaxError>) {
        let mut items = Vec::new();
        while !self.at_end() {
            if self.matches(TokenKind::Semicolon) {
                continue;
            }
            items.push(self.parse_top_level());
        }
        (Program { items }, self.errors)
    }

    // ---------------- helpers ----------------

    fn peek(&self) -> &Token {
        // `tokens` always ends with EndOfFile and `pos` never passes it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::EndOfFile
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            return true;
        }
        false
    }

    fn match_type_keyword(&mut self) -> Option<Type> {
        let ty = match self.peek().kind {
            TokenKind::KwInt => Type::Int,
            TokenKind::KwChar => Type::Char,
            TokenKind::KwDouble => Type::Double,
            TokenKind::KwString => Type::String,
            _ => return None,
        };
        self.advance();
        Some(ty)
    }

    fn error_here(&mut self, message: String) {
        let (line, column) = (self.peek().line, self.peek().column);
        self.errors.push(SyntaxError {
            line,
            column,
            message,
        });
    }

    /// Consumes the expected token, or records a diagnostic and recovers by
    /// skipping one token (unless at EOF), returning a dummy token carrying
    /// the observed position.
    fn expect(&mut self, kind: TokenKind, message: &str) -> Token {
        if self.peek().kind == kind {
            let token = self.peek().clone();
            self.advance();
            return token;
        }

        let mut full = if message.is_empty() {
            "Syntax error: expected token".to_string()
        } else {
            message.to_string()
        };
        if !self.at_end() {
            full.push_str(&format!(" at '{}'", self.peek().text));
        }
        self.error_here(full);

        let (line, column) = (self.peek().line, self.peek().column);
        if !self.at_end() {
            self.advance();
            Token::new(TokenKind::Unknown, "", line, column)
        } else {
            Token::new(TokenKind::EndOfFile, "", line, column)
        }
    }

    // ---------------- items ----------------

    fn parse_top_level(&mut self) -> Item {
        if self.peek().kind == TokenKind::KwFn {
            Item::Function(self.parse_function())
        } else {
            Item::Stmt(self.parse_statement())
        }
    }

    fn parse_function(&mut self) -> Function {
        self.expect(TokenKind::KwFn, "expected 'fn'");

        let ret_type = match self.match_type_keyword() {
            Some(ty) => ty,
            None => {
                // recover with the default return type, without consuming
                self.error_here("expected return type after 'fn'".to_string());
                Type::Int
            }
        };

        let name = self
            .expect(TokenKind::Identifier, "expected function name")
            .text;

        self.expect(TokenKind::LParen, "expected '(' after function name");
        let mut params = Vec::new();
        if !self.matches(TokenKind::RParen) {
            loop {
                let ty = match self.match_type_keyword() {
                    Some(ty) => ty,
                    None => {
                        self.error_here("expected argument type".to_string());
                        Type::Int
                    }
                };
                let name = self
                    .expect(TokenKind::Identifier, "expected argument name")
                    .text;
                let mut is_array = false;
                if self.matches(TokenKind::LBracket) {
                    self.expect(TokenKind::RBracket, "expected ']'");
                    is_array = true;
                }
                params.push(Param { name, ty, is_array });

                if self.matches(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen, "expected ')' after arguments");
                break;
            }
        }

        let body = self.parse_block();
        Function {
            name,
            ret_type,
            params,
            body,
        }
    }

    // ---------------- statements ----------------

    fn parse_block(&mut self) -> Vec<Stmt> {
        self.expect(TokenKind::LBrace, "expected '{'");
        let mut statements = Vec::new();
        while !self.at_end() && self.peek().kind != TokenKind::RBrace {
            if self.matches(TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement());
        }
        self.expect(TokenKind::RBrace, "expected '}'");
        statements
    }

    fn parse_statement(&mut self) -> Stmt {
        match self.peek().kind {
            TokenKind::LBrace => Stmt::Block(self.parse_block()),
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::KwDo => self.parse_do_while(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwBreak => {
                self.advance();
                self.expect(TokenKind::Semicolon, "expected ';' after break");
                Stmt::Break
            }
            TokenKind::KwContinue => {
                self.advance();
                self.expect(TokenKind::Semicolon, "expected ';' after continue");
                Stmt::Continue
            }
            kind if kind.is_type_keyword() => self.parse_var_decl_list(),
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_var_decl_list(&mut self) -> Stmt {
        let ty = match self.match_type_keyword() {
            Some(ty) => ty,
            None => {
                self.error_here("expected type".to_string());
                Type::Int
            }
        };

        let mut decls = Vec::new();
        loop {
            let name = self
                .expect(TokenKind::Identifier, "expected variable name")
                .text;
            let mut decl = VarDecl {
                name,
                is_array: false,
                init: None,
                size: None,
            };

            if self.matches(TokenKind::Assign) {
                decl.init = Some(self.parse_assignment());
                if self.matches(TokenKind::LBracket) {
                    decl.is_array = true;
                    decl.size = Some(self.parse_expression());
                    self.expect(TokenKind::RBracket, "expected ']'");
                }
            } else if self.matches(TokenKind::LBracket) {
                decl.is_array = true;
                decl.size = Some(self.parse_expression());
                self.expect(TokenKind::RBracket, "expected ']'");
            }

            decls.push(decl);
            if self.matches(TokenKind::Comma) {
                continue;
            }
            break;
        }
        self.expect(TokenKind::Semicolon, "expected ';' after variable list");
        Stmt::VarDeclList { ty, decls }
    }

    fn parse_if(&mut self) -> Stmt {
        self.expect(TokenKind::KwIf, "expected 'if'");
        self.expect(TokenKind::LParen, "expected '(' after if");
        let cond = self.parse_expression();
        self.expect(TokenKind::RParen, "expected ')' after if condition");
        let then_body = self.parse_block();

        let mut else_ifs = Vec::new();
        let mut else_body = None;
        while self.matches(TokenKind::KwElse) {
            if self.matches(TokenKind::KwIf) {
                self.expect(TokenKind::LParen, "expected '(' after else if");
                let cond = self.parse_expression();
                self.expect(TokenKind::RParen, "expected ')' after else if cond");
                let body = self.parse_block();
                else_ifs.push(ElseIf { cond, body });
            } else {
                else_body = Some(self.parse_block());
                break;
            }
        }

        Stmt::If {
            cond,
            then_body,
            else_ifs,
            else_body,
        }
    }

    fn parse_while(&mut self) -> Stmt {
        self.expect(TokenKind::KwWhile, "expected 'while'");
        self.expect(TokenKind::LParen, "expected '(' after while");
        let cond = self.parse_expression();
        self.expect(TokenKind::RParen, "expected ')' after while condition");
        let body = self.parse_block();
        Stmt::While { cond, body }
    }

    fn parse_do_while(&mut self) -> Stmt {
        self.expect(TokenKind::KwDo, "expected 'do'");
        let body = self.parse_block();
        self.expect(TokenKind::KwWhile, "expected 'while' after do-block");
        self.expect(TokenKind::LParen, "expected '(' after while");
        let cond = self.parse_expression();
        self.expect(TokenKind::RParen, "expected ')'");
        self.expect(TokenKind::Semicolon, "expected ';' after do-while");
        Stmt::DoWhile { body, cond }
    }

    fn parse_for(&mut self) -> Stmt {
        self.expect(TokenKind::KwFor, "expected 'for'");
        self.expect(TokenKind::LParen, "expected '(' after for");

        let init = if self.peek().kind.is_type_keyword() {
            // declaration init consumes its own ';'
            Some(Box::new(self.parse_var_decl_list()))
        } else if self.peek().kind != TokenKind::Semicolon {
            let expr = self.parse_expression();
            self.expect(
                TokenKind::Semicolon,
                "expected ';' after for-init expression",
            );
            Some(Box::new(Stmt::Expr(expr)))
        } else {
            self.advance();
            None
        };

        let cond = if self.peek().kind != TokenKind::Semicolon {
            Some(self.parse_expression())
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "expected ';' after for condition");

        let step = if self.peek().kind != TokenKind::RParen {
            Some(self.parse_expression())
        } else {
            None
        };
        self.expect(TokenKind::RParen, "expected ')' after for header");

        let body = self.parse_block();
        Stmt::For {
            init,
            cond,
            step,
            body,
        }
    }

    fn parse_return(&mut self) -> Stmt {
        self.expect(TokenKind::KwReturn, "expected 'return'");
        let value = if self.peek().kind != TokenKind::Semicolon {
            Some(self.parse_expression())
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "expected ';' after return");
        Stmt::Return(value)
    }

    fn parse_expr_stmt(&mut self) -> Stmt {
        let expr = self.parse_expression();
        self.expect(TokenKind::Semicolon, "expected ';' after expression");
        Stmt::Expr(expr)
    }

    // ---------------- expressions ----------------

    fn parse_expression(&mut self) -> Expr {
        let mut left = self.parse_assignment();
        while self.matches(TokenKind::Comma) {
            let right = self.parse_assignment();
            left = Expr::Comma {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        left
    }

    fn parse_assignment(&mut self) -> Expr {
        let lhs = self.parse_equality();

        if !self.matches(TokenKind::Assign) {
            return lhs;
        }

        if !lhs.is_lvalue() {
            self.error_here("left side of assignment must be variable or array element".to_string());
        }

        // right associative
        let rhs = self.parse_assignment();
        Expr::Assign {
            target: Box::new(lhs),
            value: Box::new(rhs),
        }
    }

    fn parse_equality(&mut self) -> Expr {
        let mut node = self.parse_relational();
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Neq => BinaryOp::Neq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational();
            node = Expr::Binary {
                op,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        node
    }

    fn parse_relational(&mut self) -> Expr {
        let mut node = self.parse_additive();
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive();
            node = Expr::Binary {
                op,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        node
    }

    fn parse_additive(&mut self) -> Expr {
        let mut node = self.parse_multiplicative();
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative();
            node = Expr::Binary {
                op,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        node
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut node = self.parse_unary();
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary();
            node = Expr::Binary {
                op,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        node
    }

    fn parse_unary(&mut self) -> Expr {
        if self.matches(TokenKind::Plus) {
            return Expr::Unary {
                op: UnaryOp::Plus,
                operand: Box::new(self.parse_unary()),
            };
        }
        if self.matches(TokenKind::Minus) {
            return Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(self.parse_unary()),
            };
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Expr {
        match self.peek().kind {
            TokenKind::Number => {
                let text = self.peek().text.clone();
                self.advance();
                Expr::Number(text)
            }
            TokenKind::StringLiteral => {
                let text = self.peek().text.clone();
                self.advance();
                Expr::Str(text)
            }
            TokenKind::Identifier => {
                let name = self.peek().text.clone();
                self.advance();
                self.parse_primary_tail(Expr::Identifier(name))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression();
                self.expect(TokenKind::RParen, "expected ')'");
                expr
            }
            _ => {
                self.error_here(format!(
                    "unexpected token in expression: '{}'",
                    self.peek().text
                ));
                // skip the token and substitute a literal 0 so parsing
                // can continue
                if !self.at_end() {
                    self.advance();
                }
                Expr::Number("0".to_string())
            }
        }
    }

    fn parse_primary_tail(&mut self, mut primary: Expr) -> Expr {
        loop {
            if self.matches(TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.matches(TokenKind::RParen) {
                    args.push(self.parse_expression());
                    while self.matches(TokenKind::Comma) {
                        args.push(self.parse_expression());
                    }
                    self.expect(TokenKind::RParen, "expected ')'");
                }
                primary = Expr::Call {
                    callee: Box::new(primary),
                    args,
                };
                continue;
            }
            if self.matches(TokenKind::LBracket) {
                let index = self.parse_expression();
                self.expect(TokenKind::RBracket, "expected ']'");
                primary = Expr::Index {
                    base: Box::new(primary),
                    index: Box::new(index),
                };
                continue;
            }
            break;
        }
        primary
    }
}

/// Parses a token list into a program plus its accumulated diagnostics.
/// Downstream stages must not run when the diagnostic list is non-empty.
pub fn parse_tokens(tokens: Vec<Token>) -> (Program, Vec<SyntaxError>) {
    Parser::new(tokens).parse_program()
}
