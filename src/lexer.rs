// ABOUTME: Single-pass character-stream scanner producing a token stream

use crate::position::Position;
use crate::token::{keyword_kind, Token, TokenKind};

/// Scans source text into tokens one at a time. Never fails outright: lexical
/// errors surface as `Illegal` tokens, leaving recovery to the parser.
pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => break,
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Returns the next token. Once the source is exhausted, returns `Eof`
    /// on every subsequent call.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let start = self.position();

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, "", start);
        };

        match c {
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            '{' => self.single(TokenKind::LBrace, start),
            '}' => self.single(TokenKind::RBrace, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            ',' => self.single(TokenKind::Comma, start),
            ';' => self.single(TokenKind::Semicolon, start),
            '.' => self.single(TokenKind::Dot, start),
            '+' => self.single(TokenKind::Plus, start),
            '-' => self.single(TokenKind::Minus, start),
            '*' => self.single(TokenKind::Star, start),
            '/' => self.single(TokenKind::Slash, start),
            '%' => self.single(TokenKind::Percent, start),
            '=' => self.one_or_two('=', TokenKind::Assign, TokenKind::EqEq, start),
            '!' => self.one_or_two('=', TokenKind::Bang, TokenKind::NotEq, start),
            '<' => self.one_or_two('=', TokenKind::Lt, TokenKind::LtEq, start),
            '>' => self.one_or_two('=', TokenKind::Gt, TokenKind::GtEq, start),
            '&' => {
                if self.peek_at(1) == Some('&') {
                    self.advance();
                    self.advance();
                    Token::new(TokenKind::AndAnd, "&&", start)
                } else {
                    self.advance();
                    Token::new(TokenKind::Illegal, "&", start)
                }
            }
            '|' => {
                if self.peek_at(1) == Some('|') {
                    self.advance();
                    self.advance();
                    Token::new(TokenKind::OrOr, "||", start)
                } else {
                    self.advance();
                    Token::new(TokenKind::Illegal, "|", start)
                }
            }
            '"' | '\'' => self.lex_string(c, start),
            c if c.is_ascii_digit() => self.lex_number(start),
            c if is_ident_start(c) => self.lex_identifier(start),
            other => {
                self.advance();
                Token::new(TokenKind::Illegal, other.to_string(), start)
            }
        }
    }

    fn single(&mut self, kind: TokenKind, start: Position) -> Token {
        let c = self.advance().expect("caller peeked a character");
        Token::new(kind, c.to_string(), start)
    }

    fn one_or_two(
        &mut self,
        second: char,
        one: TokenKind,
        two: TokenKind,
        start: Position,
    ) -> Token {
        let first = self.advance().expect("caller peeked a character");
        if self.peek() == Some(second) {
            self.advance();
            Token::new(two, format!("{first}{second}"), start)
        } else {
            Token::new(one, first.to_string(), start)
        }
    }

    fn lex_number(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') {
            if let Some(next) = self.peek_at(1) {
                if next.is_ascii_digit() {
                    text.push('.');
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_digit() {
                            text.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
            }
        }
        Token::new(TokenKind::Number, text, start)
    }

    fn lex_identifier(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match keyword_kind(&text) {
            Some(kind) => Token::new(kind, text, start),
            None => Token::new(TokenKind::Identifier, text, start),
        }
    }

    fn lex_string(&mut self, quote: char, start: Position) -> Token {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Token::new(TokenKind::Illegal, text, start),
                Some(c) if c == quote => {
                    self.advance();
                    return Token::new(TokenKind::String, text, start);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some('\\') => {
                            text.push('\\');
                            self.advance();
                        }
                        Some(c) if c == quote => {
                            text.push(quote);
                            self.advance();
                        }
                        Some(other) => {
                            text.push('\\');
                            text.push(other);
                            self.advance();
                        }
                        None => return Token::new(TokenKind::Illegal, text, start),
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn eof_repeats_indefinitely() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn skips_whitespace_and_line_comments() {
        let toks = kinds("let // comment\n x");
        assert_eq!(toks, vec![TokenKind::Let, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn skips_block_comments() {
        let toks = kinds("1 /* skip \n this */ + 2");
        assert_eq!(
            toks,
            vec![TokenKind::Number, TokenKind::Plus, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn longest_match_operators() {
        let toks = kinds("== = != ! <= < >= > && ||");
        assert_eq!(
            toks,
            vec![
                TokenKind::EqEq,
                TokenKind::Assign,
                TokenKind::NotEq,
                TokenKind::Bang,
                TokenKind::LtEq,
                TokenKind::Lt,
                TokenKind::GtEq,
                TokenKind::Gt,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn single_ampersand_and_pipe_are_illegal() {
        assert_eq!(kinds("&")[0], TokenKind::Illegal);
        assert_eq!(kinds("|")[0], TokenKind::Illegal);
    }

    #[test]
    fn number_stops_before_trailing_dot_without_digits() {
        let mut lexer = Lexer::new("3.");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Number);
        assert_eq!(tok.lexeme, "3");
        assert_eq!(lexer.next_token().kind, TokenKind::Dot);
    }

    #[test]
    fn fractional_number() {
        let mut lexer = Lexer::new("3.14");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Number);
        assert_eq!(tok.lexeme, "3.14");
    }

    #[test]
    fn string_escapes() {
        let mut lexer = Lexer::new(r#""a\"b\\c""#);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::String);
        assert_eq!(tok.lexeme, "a\"b\\c");
    }

    #[test]
    fn unterminated_string_is_illegal() {
        let mut lexer = Lexer::new("\"abc");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert_eq!(tok.position, Position::new(1, 1));
    }

    #[test]
    fn identifier_vs_keyword() {
        let toks = kinds("def foo let");
        assert_eq!(toks, vec![TokenKind::Def, TokenKind::Identifier, TokenKind::Let, TokenKind::Eof]);
    }

    #[test]
    fn positions_are_monotonic_and_line_resets_column() {
        let mut lexer = Lexer::new("ab\ncd");
        let t1 = lexer.next_token();
        assert_eq!(t1.position, Position::new(1, 1));
        let t2 = lexer.next_token();
        assert_eq!(t2.position, Position::new(2, 1));
        assert!(t1.position < t2.position);
    }
}
