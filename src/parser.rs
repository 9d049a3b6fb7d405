// ABOUTME: Recursive-descent statement parser with precedence-climbing expressions

use crate::ast::{Expr, InfixOp, PrefixOp, Stmt};
use crate::diagnostic::Diagnostic;
use crate::lexer::Lexer;
use crate::position::Position;
use crate::token::{Token, TokenKind};

const PREC_LOWEST: u8 = 0;
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_EQUALITY: u8 = 3;
const PREC_COMPARE: u8 = 4;
const PREC_SUM: u8 = 5;
const PREC_PRODUCT: u8 = 6;

fn infix_binding(kind: &TokenKind) -> Option<(u8, InfixOp)> {
    match kind {
        TokenKind::OrOr => Some((PREC_OR, InfixOp::Or)),
        TokenKind::AndAnd => Some((PREC_AND, InfixOp::And)),
        TokenKind::EqEq => Some((PREC_EQUALITY, InfixOp::Eq)),
        TokenKind::NotEq => Some((PREC_EQUALITY, InfixOp::NotEq)),
        TokenKind::Lt => Some((PREC_COMPARE, InfixOp::Lt)),
        TokenKind::Gt => Some((PREC_COMPARE, InfixOp::Gt)),
        TokenKind::LtEq => Some((PREC_COMPARE, InfixOp::LtEq)),
        TokenKind::GtEq => Some((PREC_COMPARE, InfixOp::GtEq)),
        TokenKind::Plus => Some((PREC_SUM, InfixOp::Add)),
        TokenKind::Minus => Some((PREC_SUM, InfixOp::Sub)),
        TokenKind::Star => Some((PREC_PRODUCT, InfixOp::Mul)),
        TokenKind::Slash => Some((PREC_PRODUCT, InfixOp::Div)),
        TokenKind::Percent => Some((PREC_PRODUCT, InfixOp::Mod)),
        _ => None,
    }
}

/// Hybrid parser: recursive descent for statements, precedence climbing for
/// expressions. Never throws; accumulates diagnostics and recovers locally
/// by skipping to the next `;` or `}`.
pub struct Parser {
    lexer: Lexer,
    current: Token,
    peek: Token,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Parser {
            lexer,
            current,
            peek,
            diagnostics: Vec::new(),
        }
    }

    /// Parses the whole token stream. Always returns a (possibly partial)
    /// list of statements, plus any diagnostics recorded along the way.
    pub fn parse_program(mut self) -> (Vec<Stmt>, Vec<Diagnostic>) {
        let mut statements = Vec::new();
        while self.current.kind != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
        }
        (statements, self.diagnostics)
    }

    fn error(&mut self, message: impl Into<String>, position: Position) {
        self.diagnostics.push(Diagnostic::parse(message, position));
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        let previous = std::mem::replace(&mut self.current, std::mem::replace(&mut self.peek, next));
        previous
    }

    /// Skips to just past the next `;` or `}`, or to `Eof`. Guarantees the
    /// parser always makes forward progress after a recorded error.
    fn synchronize(&mut self) {
        loop {
            match self.current.kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        if self.current.kind == kind {
            Some(self.advance())
        } else {
            let position = self.current.position;
            self.error(format!("expected {what}, found '{}'", self.current.lexeme), position);
            self.synchronize();
            None
        }
    }

    fn expect_identifier(&mut self) -> Option<String> {
        if self.current.kind == TokenKind::Identifier {
            let name = self.current.lexeme.clone();
            self.advance();
            Some(name)
        } else {
            let position = self.current.position;
            self.error(format!("expected identifier, found '{}'", self.current.lexeme), position);
            self.synchronize();
            None
        }
    }

    fn eat_semicolon_if_present(&mut self) {
        if self.current.kind == TokenKind::Semicolon {
            self.advance();
        }
    }

    // ----- statements -----

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.current.kind {
            TokenKind::Def => self.parse_def_statement(),
            TokenKind::Let => self.parse_var_decl(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::LBrace => Some(self.parse_block()),
            TokenKind::Identifier if self.peek.kind == TokenKind::Assign => self.parse_assign(),
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_def_statement(&mut self) -> Option<Stmt> {
        let position = self.current.position;
        self.advance(); // `def`
        if self.current.kind == TokenKind::Identifier {
            let name = self.expect_identifier()?;
            let (params, body) = self.parse_function_tail()?;
            Some(Stmt::FunctionDecl {
                name,
                params,
                body: Box::new(body),
                position,
            })
        } else {
            let (params, body) = self.parse_function_tail()?;
            let expr = Expr::FunctionLit {
                params,
                body: Box::new(body),
                position,
            };
            self.eat_semicolon_if_present();
            Some(Stmt::ExpressionStatement(expr, position))
        }
    }

    /// Parses `"(" [Params] ")" Block`, assuming `def` (and any name) has
    /// already been consumed.
    fn parse_function_tail(&mut self) -> Option<(Vec<String>, Stmt)> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if self.current.kind != TokenKind::RParen {
            loop {
                params.push(self.expect_identifier()?);
                if self.current.kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block();
        Some((params, body))
    }

    fn parse_var_decl(&mut self) -> Option<Stmt> {
        let position = self.current.position;
        self.advance(); // `let`
        let name = self.expect_identifier()?;
        let init = if self.current.kind == TokenKind::Assign {
            self.advance();
            Some(self.parse_expr())
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Some(Stmt::VarDecl {
            name,
            init,
            position,
        })
    }

    fn parse_assign(&mut self) -> Option<Stmt> {
        let position = self.current.position;
        let name = self.current.lexeme.clone();
        self.advance(); // identifier
        self.advance(); // `=`
        let expr = self.parse_expr();
        self.expect(TokenKind::Semicolon, "';'")?;
        Some(Stmt::Assign {
            name,
            expr,
            position,
        })
    }

    fn parse_if(&mut self) -> Option<Stmt> {
        let position = self.current.position;
        self.advance(); // `if`
        self.expect(TokenKind::LParen, "'('")?;
        let condition = self.parse_expr();
        self.expect(TokenKind::RParen, "')'")?;
        let then_branch = Box::new(self.parse_block());
        let else_branch = if self.current.kind == TokenKind::Else {
            self.advance();
            if self.current.kind == TokenKind::If {
                Some(Box::new(self.parse_if()?))
            } else {
                Some(Box::new(self.parse_block()))
            }
        } else {
            None
        };
        Some(Stmt::If {
            condition,
            then_branch,
            else_branch,
            position,
        })
    }

    fn parse_while(&mut self) -> Option<Stmt> {
        let position = self.current.position;
        self.advance(); // `while`
        self.expect(TokenKind::LParen, "'('")?;
        let condition = self.parse_expr();
        self.expect(TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_block());
        Some(Stmt::While {
            condition,
            body,
            position,
        })
    }

    fn parse_return(&mut self) -> Option<Stmt> {
        let position = self.current.position;
        self.advance(); // `return`
        let expr = if self.current.kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Some(Stmt::Return { expr, position })
    }

    fn parse_block(&mut self) -> Stmt {
        let position = self.current.position;
        if self.expect(TokenKind::LBrace, "'{'").is_none() {
            return Stmt::Block(Vec::new(), position);
        }
        let mut statements = Vec::new();
        while self.current.kind != TokenKind::RBrace && self.current.kind != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
        }
        if self.current.kind == TokenKind::RBrace {
            self.advance();
        } else {
            let position = self.current.position;
            self.error("expected '}' before end of input", position);
        }
        Stmt::Block(statements, position)
    }

    fn parse_expr_stmt(&mut self) -> Option<Stmt> {
        let position = self.current.position;
        let expr = self.parse_expr();
        self.eat_semicolon_if_present();
        Some(Stmt::ExpressionStatement(expr, position))
    }

    // ----- expressions -----

    fn parse_expr(&mut self) -> Expr {
        self.parse_binary(PREC_LOWEST + 1)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Expr {
        let mut left = self.parse_prefix();
        while let Some((precedence, op)) = infix_binding(&self.current.kind) {
            if precedence < min_precedence {
                break;
            }
            let position = self.current.position;
            self.advance();
            let right = self.parse_binary(precedence + 1);
            left = Expr::Infix {
                lhs: Box::new(left),
                op,
                rhs: Box::new(right),
                position,
            };
        }
        left
    }

    fn parse_prefix(&mut self) -> Expr {
        let position = self.current.position;
        match self.current.kind {
            TokenKind::Minus => {
                self.advance();
                Expr::Prefix {
                    op: PrefixOp::Neg,
                    rhs: Box::new(self.parse_prefix()),
                    position,
                }
            }
            TokenKind::Bang => {
                self.advance();
                Expr::Prefix {
                    op: PrefixOp::Not,
                    rhs: Box::new(self.parse_prefix()),
                    position,
                }
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            match self.current.kind {
                TokenKind::LParen => expr = self.parse_call(expr),
                TokenKind::Dot => expr = self.parse_member(expr),
                TokenKind::LBracket => expr = self.parse_index(expr),
                _ => break,
            }
        }
        expr
    }

    fn parse_call(&mut self, callee: Expr) -> Expr {
        let position = self.current.position;
        self.advance(); // `(`
        let mut args = Vec::new();
        if self.current.kind != TokenKind::RParen {
            loop {
                args.push(self.parse_expr());
                if self.current.kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'");
        Expr::Call {
            callee: Box::new(callee),
            args,
            position,
        }
    }

    fn parse_member(&mut self, object: Expr) -> Expr {
        let position = self.current.position;
        self.advance(); // `.`
        let property = self.expect_identifier().unwrap_or_default();
        Expr::Member {
            object: Box::new(object),
            property,
            position,
        }
    }

    fn parse_index(&mut self, object: Expr) -> Expr {
        let position = self.current.position;
        self.advance(); // `[`
        let index = self.parse_expr();
        self.expect(TokenKind::RBracket, "']'");
        Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
            position,
        }
    }

    fn parse_array_lit(&mut self) -> Expr {
        let position = self.current.position;
        self.advance(); // `[`
        let mut elements = Vec::new();
        if self.current.kind != TokenKind::RBracket {
            loop {
                elements.push(self.parse_expr());
                if self.current.kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket, "']'");
        Expr::ArrayLit { elements, position }
    }

    fn parse_primary(&mut self) -> Expr {
        let position = self.current.position;
        match self.current.kind.clone() {
            TokenKind::Number => {
                let lexeme = self.current.lexeme.clone();
                self.advance();
                let value = lexeme.parse::<f64>().unwrap_or(0.0);
                Expr::Number(value, position)
            }
            TokenKind::String => {
                let text = self.current.lexeme.clone();
                self.advance();
                Expr::String(text, position)
            }
            TokenKind::True => {
                self.advance();
                Expr::Bool(true, position)
            }
            TokenKind::False => {
                self.advance();
                Expr::Bool(false, position)
            }
            TokenKind::Null => {
                self.advance();
                Expr::Null(position)
            }
            TokenKind::Identifier => {
                let name = self.current.lexeme.clone();
                self.advance();
                Expr::Ident(name, position)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr();
                self.expect(TokenKind::RParen, "')'");
                expr
            }
            TokenKind::LBracket => self.parse_array_lit(),
            TokenKind::Def => {
                self.advance();
                match self.parse_function_tail() {
                    Some((params, body)) => Expr::FunctionLit {
                        params,
                        body: Box::new(body),
                        position,
                    },
                    None => Expr::Null(position),
                }
            }
            _ => {
                self.error(
                    format!("no prefix parser for '{}'", self.current.lexeme),
                    position,
                );
                self.advance();
                Expr::Null(position)
            }
        }
    }
}
