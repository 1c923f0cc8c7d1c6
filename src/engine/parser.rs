//! Recursive-descent parser producing the engine's AST.
//!
//! Statements end at a semicolon, a closing brace, end of input, or a line
//! break (automatic semicolon insertion). Arrow functions are disambiguated
//! from parenthesized expressions by scanning ahead for `=>` past the
//! matching parenthesis.

use std::rc::Rc;

use super::lexer::{tokenize, Keyword, Punct, SyntaxError, Token, TokenKind};
use super::value::{FuncBody, JsFunction};

#[derive(Debug)]
pub(crate) enum Stmt {
    /// `const`/`let`/`var` declaration or a function declaration.
    Decl { name: String, init: Option<Expr> },
    Expr(Expr),
    Return(Option<Expr>),
    Empty,
}

#[derive(Debug)]
pub(crate) struct Expr {
    pub kind: ExprKind,
    pub line: u32,
    pub col: u32,
}

#[derive(Debug)]
pub(crate) enum ExprKind {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    This,
    Ident(String),
    Object(Vec<(String, Expr)>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Function(Rc<JsFunction>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnOp {
    Neg,
    Not,
}

fn keyword_text(kw: Keyword) -> &'static str {
    match kw {
        Keyword::Const => "const",
        Keyword::Let => "let",
        Keyword::Var => "var",
        Keyword::Function => "function",
        Keyword::Return => "return",
        Keyword::This => "this",
        Keyword::True => "true",
        Keyword::False => "false",
        Keyword::Null => "null",
        Keyword::Undefined => "undefined",
    }
}

/// Parse a whole script. `origin` is recorded on function values for
/// diagnostics only.
pub(crate) fn parse(src: &str, origin: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        src,
        origin,
        fn_depth: 0,
    };
    let mut stmts = Vec::new();
    while !parser.at_end() {
        stmts.push(parser.statement()?);
    }
    Ok(stmts)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    src: &'a str,
    origin: &'a str,
    fn_depth: u32,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        self.pos += 1;
        tok
    }

    fn prev(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    fn check_punct(&self, p: Punct) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Punct(q)) if *q == p)
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        if self.check_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: Punct) -> Result<&Token, SyntaxError> {
        if self.check_punct(p) {
            Ok(self.advance())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> SyntaxError {
        match self.peek() {
            Some(tok) => {
                let what = match &tok.kind {
                    TokenKind::Number(_) => "SyntaxError: Unexpected number".to_string(),
                    TokenKind::Str(_) => "SyntaxError: Unexpected string".to_string(),
                    TokenKind::Ident(_) => "SyntaxError: Unexpected identifier".to_string(),
                    TokenKind::Keyword(kw) => {
                        format!("SyntaxError: Unexpected token '{}'", keyword_text(*kw))
                    }
                    TokenKind::Punct(p) => {
                        format!("SyntaxError: Unexpected token '{}'", p.as_str())
                    }
                };
                SyntaxError::new(what, tok.line, tok.col)
            }
            None => {
                let (line, col) = self
                    .tokens
                    .last()
                    .map(|t| (t.line, t.col))
                    .unwrap_or((1, 1));
                SyntaxError::new("SyntaxError: Unexpected end of input", line, col)
            }
        }
    }

    /// Semicolon or an insertion point: `}`, end of input, or a line break
    /// since the previous token.
    fn end_statement(&mut self) -> Result<(), SyntaxError> {
        if self.eat_punct(Punct::Semi) || self.at_end() || self.check_punct(Punct::RBrace) {
            return Ok(());
        }
        let prev_line = self.prev().line;
        match self.peek() {
            Some(tok) if tok.line > prev_line => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Punct(Punct::Semi)) => {
                self.advance();
                Ok(Stmt::Empty)
            }
            Some(TokenKind::Keyword(Keyword::Const | Keyword::Let | Keyword::Var)) => {
                self.advance();
                let name = match self.peek_kind() {
                    Some(TokenKind::Ident(name)) => {
                        let name = name.clone();
                        self.advance();
                        name
                    }
                    _ => return Err(self.unexpected()),
                };
                let init = if self.eat_punct(Punct::Assign) {
                    Some(self.assignment()?)
                } else {
                    None
                };
                self.end_statement()?;
                Ok(Stmt::Decl { name, init })
            }
            Some(TokenKind::Keyword(Keyword::Return)) => {
                let return_tok = self.advance();
                let (return_line, return_col) = (return_tok.line, return_tok.col);
                if self.fn_depth == 0 {
                    return Err(SyntaxError::new(
                        "SyntaxError: Illegal return statement",
                        return_line,
                        return_col,
                    ));
                }
                let value = match self.peek() {
                    None => None,
                    Some(tok)
                        if matches!(
                            tok.kind,
                            TokenKind::Punct(Punct::Semi) | TokenKind::Punct(Punct::RBrace)
                        ) || tok.line > return_line =>
                    {
                        None
                    }
                    Some(_) => Some(self.expression()?),
                };
                self.end_statement()?;
                Ok(Stmt::Return(value))
            }
            Some(TokenKind::Keyword(Keyword::Function))
                if matches!(
                    self.tokens.get(self.pos + 1).map(|t| &t.kind),
                    Some(TokenKind::Ident(_))
                ) =>
            {
                let func = self.function_expression()?;
                let name = match &func.kind {
                    ExprKind::Function(f) => f.name.clone(),
                    _ => None,
                };
                let Some(name) = name else {
                    return Err(self.unexpected());
                };
                self.eat_punct(Punct::Semi);
                Ok(Stmt::Decl {
                    name,
                    init: Some(func),
                })
            }
            Some(_) => {
                let expr = self.expression()?;
                self.end_statement()?;
                Ok(Stmt::Expr(expr))
            }
            None => Err(self.unexpected()),
        }
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.additive()?;
        if self.check_punct(Punct::Assign) {
            let eq = self.advance();
            let (eq_line, eq_col) = (eq.line, eq.col);
            if !matches!(lhs.kind, ExprKind::Ident(_) | ExprKind::Member { .. }) {
                return Err(SyntaxError::new(
                    "SyntaxError: Invalid left-hand side in assignment",
                    eq_line,
                    eq_col,
                ));
            }
            let value = self.assignment()?;
            let (line, col) = (lhs.line, lhs.col);
            return Ok(Expr {
                kind: ExprKind::Assign {
                    target: Box::new(lhs),
                    value: Box::new(value),
                },
                line,
                col,
            });
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Punct(Punct::Plus)) => BinOp::Add,
                Some(TokenKind::Punct(Punct::Minus)) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            let (line, col) = (lhs.line, lhs.col);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
                col,
            };
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Punct(Punct::Star)) => BinOp::Mul,
                Some(TokenKind::Punct(Punct::Slash)) => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            let (line, col) = (lhs.line, lhs.col);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
                col,
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Punct(Punct::Minus)) => Some(UnOp::Neg),
            Some(TokenKind::Punct(Punct::Bang)) => Some(UnOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let tok = self.advance();
            let (line, col) = (tok.line, tok.col);
            let operand = self.unary()?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                line,
                col,
            });
        }
        self.postfix()
    }

    /// Member access and call suffixes.
    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(Punct::Dot) {
                let property = match self.peek_kind() {
                    Some(TokenKind::Ident(name)) => {
                        let name = name.clone();
                        self.advance();
                        name
                    }
                    _ => return Err(self.unexpected()),
                };
                let (line, col) = (expr.line, expr.col);
                expr = Expr {
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        property,
                    },
                    line,
                    col,
                };
            } else if self.check_punct(Punct::LParen) {
                let call_tok = self.advance();
                let (line, col) = (call_tok.line, call_tok.col);
                let mut args = Vec::new();
                if !self.check_punct(Punct::RParen) {
                    loop {
                        args.push(self.assignment()?);
                        if !self.eat_punct(Punct::Comma) {
                            break;
                        }
                    }
                }
                self.expect_punct(Punct::RParen)?;
                expr = Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    line,
                    col,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let Some(tok) = self.peek() else {
            return Err(self.unexpected());
        };
        let (line, col) = (tok.line, tok.col);
        match &tok.kind {
            TokenKind::Number(n) => {
                let n = *n;
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Number(n),
                    line,
                    col,
                })
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Str(s),
                    line,
                    col,
                })
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(true),
                    line,
                    col,
                })
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(false),
                    line,
                    col,
                })
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Null,
                    line,
                    col,
                })
            }
            TokenKind::Keyword(Keyword::Undefined) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Undefined,
                    line,
                    col,
                })
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::This,
                    line,
                    col,
                })
            }
            TokenKind::Keyword(Keyword::Function) => self.function_expression(),
            TokenKind::Ident(name) => {
                if matches!(
                    self.tokens.get(self.pos + 1).map(|t| &t.kind),
                    Some(TokenKind::Punct(Punct::Arrow))
                ) {
                    return self.arrow_function();
                }
                let name = name.clone();
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Ident(name),
                    line,
                    col,
                })
            }
            TokenKind::Punct(Punct::LParen) => {
                if self.paren_starts_arrow() {
                    return self.arrow_function();
                }
                self.advance();
                let expr = self.expression()?;
                self.expect_punct(Punct::RParen)?;
                Ok(expr)
            }
            TokenKind::Punct(Punct::LBrace) => self.object_literal(),
            _ => Err(self.unexpected()),
        }
    }

    /// True when the parenthesis at the current position closes right before
    /// a `=>`.
    fn paren_starts_arrow(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos;
        while let Some(tok) = self.tokens.get(i) {
            match tok.kind {
                TokenKind::Punct(Punct::LParen) => depth += 1,
                TokenKind::Punct(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::Punct(Punct::Arrow))
                        );
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn arrow_function(&mut self) -> Result<Expr, SyntaxError> {
        let Some(start_tok) = self.peek() else {
            return Err(self.unexpected());
        };
        let (line, col, start) = (start_tok.line, start_tok.col, start_tok.start);

        let mut params = Vec::new();
        match self.peek_kind() {
            Some(TokenKind::Ident(name)) => {
                params.push(name.clone());
                self.advance();
            }
            Some(TokenKind::Punct(Punct::LParen)) => {
                self.advance();
                if !self.check_punct(Punct::RParen) {
                    loop {
                        match self.peek_kind() {
                            Some(TokenKind::Ident(name)) => {
                                params.push(name.clone());
                                self.advance();
                            }
                            _ => return Err(self.unexpected()),
                        }
                        if !self.eat_punct(Punct::Comma) {
                            break;
                        }
                    }
                }
                self.expect_punct(Punct::RParen)?;
            }
            _ => return Err(self.unexpected()),
        }
        self.expect_punct(Punct::Arrow)?;

        self.fn_depth += 1;
        let body = if self.check_punct(Punct::LBrace) {
            self.advance();
            let mut stmts = Vec::new();
            while !self.check_punct(Punct::RBrace) {
                if self.at_end() {
                    self.fn_depth -= 1;
                    return Err(self.unexpected());
                }
                match self.statement() {
                    Ok(stmt) => stmts.push(stmt),
                    Err(err) => {
                        self.fn_depth -= 1;
                        return Err(err);
                    }
                }
            }
            self.advance();
            FuncBody::Block(stmts)
        } else {
            match self.assignment() {
                Ok(expr) => FuncBody::Expr(expr),
                Err(err) => {
                    self.fn_depth -= 1;
                    return Err(err);
                }
            }
        };
        self.fn_depth -= 1;

        let end = self.prev().end;
        let func = JsFunction {
            name: None,
            params,
            body,
            source: self.src[start..end].to_string(),
            origin: self.origin.to_string(),
        };
        Ok(Expr {
            kind: ExprKind::Function(Rc::new(func)),
            line,
            col,
        })
    }

    fn function_expression(&mut self) -> Result<Expr, SyntaxError> {
        let fn_tok = self.advance();
        let (line, col, start) = (fn_tok.line, fn_tok.col, fn_tok.start);

        let name = match self.peek_kind() {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };

        self.expect_punct(Punct::LParen)?;
        let mut params = Vec::new();
        if !self.check_punct(Punct::RParen) {
            loop {
                match self.peek_kind() {
                    Some(TokenKind::Ident(param)) => {
                        params.push(param.clone());
                        self.advance();
                    }
                    _ => return Err(self.unexpected()),
                }
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen)?;
        self.expect_punct(Punct::LBrace)?;

        self.fn_depth += 1;
        let mut stmts = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            if self.at_end() {
                self.fn_depth -= 1;
                return Err(self.unexpected());
            }
            match self.statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.fn_depth -= 1;
                    return Err(err);
                }
            }
        }
        self.fn_depth -= 1;
        let end = self.advance().end;

        let func = JsFunction {
            name,
            params,
            body: FuncBody::Block(stmts),
            source: self.src[start..end].to_string(),
            origin: self.origin.to_string(),
        };
        Ok(Expr {
            kind: ExprKind::Function(Rc::new(func)),
            line,
            col,
        })
    }

    fn object_literal(&mut self) -> Result<Expr, SyntaxError> {
        let brace = self.advance();
        let (line, col) = (brace.line, brace.col);
        let mut props = Vec::new();
        if !self.check_punct(Punct::RBrace) {
            loop {
                let key = match self.peek_kind() {
                    Some(TokenKind::Ident(name)) => name.clone(),
                    Some(TokenKind::Str(s)) => s.clone(),
                    _ => return Err(self.unexpected()),
                };
                self.advance();
                self.expect_punct(Punct::Colon)?;
                let value = self.assignment()?;
                props.push((key, value));
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
                if self.check_punct(Punct::RBrace) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RBrace)?;
        Ok(Expr {
            kind: ExprKind::Object(props),
            line,
            col,
        })
    }
}
