//! Lexer (tokenizer) for Pascal source code
//!
//! [`Lexer`] is an [`Iterator`] over [`Token`]s, so the parser pulls tokens on
//! demand instead of working on a pre-built vector. Keywords and built-in
//! names are matched case-insensitively as whole words; `{ ... }` comments
//! are dropped.
//!
//! An unrecognized character never aborts tokenization: it is recorded as a
//! [`LexError`], logged, and skipped, and the lexer carries on with the next
//! character.

use super::ast::SourceLocation;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Token payloads. Literal and name variants carry their value.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Char(char),
    Str(String),

    // Names
    Ident(String),
    SysFunc(String), // abs chr odd ord pred sqr sqrt succ length
    SysProc(String), // write writeln read readln
    SysType(String), // boolean char integer real

    // Keywords
    And,
    Array,
    Begin,
    Div,
    Do,
    DownTo,
    Else,
    End,
    For,
    If,
    Mod,
    Not,
    Of,
    Or,
    Program,
    Then,
    To,
    Var,
    While,

    // Operators and punctuation
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Assign,    // :=
    Equal,     // =
    Lt,        // <
    Gt,        // >
    Le,        // <=
    Ge,        // >=
    NotEqual,  // <>
    Comma,     // ,
    Semicolon, // ;
    Colon,     // :
    DotDot,    // ..
    Dot,       // .
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Integer(n) => write!(f, "integer literal {}", n),
            TokenKind::Real(x) => write!(f, "real literal {}", x),
            TokenKind::Boolean(b) => write!(f, "boolean literal {}", b),
            TokenKind::Char(c) => write!(f, "char literal '{}'", c),
            TokenKind::Str(s) => write!(f, "string literal '{}'", s),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::SysFunc(s) => write!(f, "built-in function '{}'", s),
            TokenKind::SysProc(s) => write!(f, "built-in procedure '{}'", s),
            TokenKind::SysType(s) => write!(f, "type '{}'", s),
            TokenKind::And => write!(f, "'and'"),
            TokenKind::Array => write!(f, "'array'"),
            TokenKind::Begin => write!(f, "'begin'"),
            TokenKind::Div => write!(f, "'div'"),
            TokenKind::Do => write!(f, "'do'"),
            TokenKind::DownTo => write!(f, "'downto'"),
            TokenKind::Else => write!(f, "'else'"),
            TokenKind::End => write!(f, "'end'"),
            TokenKind::For => write!(f, "'for'"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::Mod => write!(f, "'mod'"),
            TokenKind::Not => write!(f, "'not'"),
            TokenKind::Of => write!(f, "'of'"),
            TokenKind::Or => write!(f, "'or'"),
            TokenKind::Program => write!(f, "'program'"),
            TokenKind::Then => write!(f, "'then'"),
            TokenKind::To => write!(f, "'to'"),
            TokenKind::Var => write!(f, "'var'"),
            TokenKind::While => write!(f, "'while'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Assign => write!(f, "':='"),
            TokenKind::Equal => write!(f, "'='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::NotEqual => write!(f, "'<>'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::DotDot => write!(f, "'..'"),
            TokenKind::Dot => write!(f, "'.'"),
        }
    }
}

/// A token together with the place it starts in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Token { kind, location }
    }

    pub fn line(&self) -> usize {
        self.location.line
    }
}

/// Lexer error type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Lexer error at line {}, column {}: {}", .location.line, .location.column, .message)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for Pascal source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    errors: Vec<LexError>,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    /// Errors reported while scanning. Each one was skipped over.
    pub fn into_errors(self) -> Vec<LexError> {
        self.errors
    }

    /// Scan one token starting at the current position.
    ///
    /// `Ok(None)` means the input is exhausted. On `Err` the offending input
    /// has already been skipped.
    fn scan_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace_and_comments()?;

        let loc = self.current_location();
        let Some(ch) = self.advance() else {
            return Ok(None);
        };

        let kind = match ch {
            '\'' => return self.quoted_literal(loc).map(Some),
            '0'..='9' => return self.number_literal(ch, loc).map(Some),
            'a'..='z' | 'A'..='Z' | '_' => self.identifier_or_keyword(ch),

            ':' => {
                if self.match_char('=') {
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            }
            '<' => {
                if self.match_char('=') {
                    TokenKind::Le
                } else if self.match_char('>') {
                    TokenKind::NotEqual
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.match_char('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '.' => {
                if self.match_char('.') {
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '=' => TokenKind::Equal,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,

            _ => {
                return Err(LexError {
                    message: format!("Illegal character '{}'", ch),
                    location: loc,
                })
            }
        };

        Ok(Some(Token::new(kind, loc)))
    }

    /// Quoted literal. `''` inside the quotes stands for one quote. A literal
    /// holding exactly one character is a char, anything else a string.
    fn quoted_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let start = self.position;
        let mut text = String::new();

        loop {
            match self.peek() {
                Some('\'') if self.peek_ahead(1) == Some('\'') => {
                    self.advance();
                    self.advance();
                    text.push('\'');
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    self.advance();
                    text.push(c);
                }
                None => {
                    // Rewind to just after the opening quote so the body is
                    // lexed as ordinary input.
                    self.rewind_to(start, SourceLocation::new(loc.line, loc.column + 1));
                    return Err(LexError {
                        message: "Unterminated string literal".to_string(),
                        location: loc,
                    });
                }
            }
        }

        let mut chars = text.chars();
        let kind = match (chars.next(), chars.next()) {
            (Some(c), None) => TokenKind::Char(c),
            _ => TokenKind::Str(text),
        };
        Ok(Token::new(kind, loc))
    }

    /// Decimal, octal (`017`), hexadecimal (`0x1F`) or real (`1.5e3`) literal
    fn number_literal(&mut self, first_digit: char, loc: SourceLocation) -> Result<Token, LexError> {
        if first_digit == '0'
            && matches!(self.peek(), Some('x') | Some('X'))
            && self.peek_ahead(1).is_some_and(|c| c.is_ascii_hexdigit())
        {
            self.advance(); // skip 'x'
            let digits = self.take_while(|c| c.is_ascii_hexdigit());
            let value = i64::from_str_radix(&digits, 16).map_err(|_| LexError {
                message: format!("Integer literal out of range: 0x{}", digits),
                location: loc,
            })?;
            return Ok(Token::new(TokenKind::Integer(value), loc));
        }

        let mut text = String::new();
        text.push(first_digit);
        text.push_str(&self.take_while(|c| c.is_ascii_digit()));

        // A '.' followed by a digit makes a real; `1..5` stays a range.
        if self.peek() == Some('.') && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));

            if matches!(self.peek(), Some('e') | Some('E')) {
                let sign = matches!(self.peek_ahead(1), Some('+') | Some('-'));
                let digit_at = if sign { 2 } else { 1 };
                if self.peek_ahead(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    text.push('e');
                    self.advance();
                    if sign {
                        if let Some(s) = self.advance() {
                            text.push(s);
                        }
                    }
                    text.push_str(&self.take_while(|c| c.is_ascii_digit()));
                }
            }

            let value = text.parse::<f64>().map_err(|_| LexError {
                message: format!("Invalid real literal: {}", text),
                location: loc,
            })?;
            if !value.is_finite() {
                return Err(LexError {
                    message: format!("Real literal out of range: {}", text),
                    location: loc,
                });
            }
            return Ok(Token::new(TokenKind::Real(value), loc));
        }

        let value = if text.len() > 1 && text.starts_with('0') {
            i64::from_str_radix(&text, 8).map_err(|_| LexError {
                message: format!("Invalid octal literal: {}", text),
                location: loc,
            })?
        } else {
            text.parse::<i64>().map_err(|_| LexError {
                message: format!("Integer literal out of range: {}", text),
                location: loc,
            })?
        };

        Ok(Token::new(TokenKind::Integer(value), loc))
    }

    /// Parse identifier, keyword or built-in name
    fn identifier_or_keyword(&mut self, first_char: char) -> TokenKind {
        let mut ident = String::new();
        ident.push(first_char);
        ident.push_str(&self.take_while(|c| c.is_ascii_alphanumeric() || c == '_'));

        let lower = ident.to_ascii_lowercase();
        match lower.as_str() {
            "and" => TokenKind::And,
            "array" => TokenKind::Array,
            "begin" => TokenKind::Begin,
            "div" => TokenKind::Div,
            "do" => TokenKind::Do,
            "downto" => TokenKind::DownTo,
            "else" => TokenKind::Else,
            "end" => TokenKind::End,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "mod" => TokenKind::Mod,
            "not" => TokenKind::Not,
            "of" => TokenKind::Of,
            "or" => TokenKind::Or,
            "program" => TokenKind::Program,
            "then" => TokenKind::Then,
            "to" => TokenKind::To,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            "abs" | "chr" | "odd" | "ord" | "pred" | "sqr" | "sqrt" | "succ" | "length" => {
                TokenKind::SysFunc(lower)
            }
            "write" | "writeln" | "read" | "readln" => TokenKind::SysProc(lower),
            "boolean" | "char" | "integer" | "real" => TokenKind::SysType(lower),
            _ => TokenKind::Ident(ident),
        }
    }

    /// Skip whitespace and `{ ... }` comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('{') => self.skip_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    /// Comments do not nest; the first `}` closes.
    fn skip_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        let start = self.position;
        self.advance(); // skip '{'

        while let Some(ch) = self.advance() {
            if ch == '}' {
                return Ok(());
            }
        }

        self.rewind_to(start + 1, SourceLocation::new(start_loc.line, start_loc.column + 1));
        Err(LexError {
            message: "Unterminated comment".to_string(),
            location: start_loc,
        })
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            out.push(ch);
            self.advance();
        }
        out
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn rewind_to(&mut self, position: usize, location: SourceLocation) {
        self.position = position;
        self.line = location.line;
        self.column = location.column;
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            match self.scan_token() {
                Ok(token) => return token,
                Err(err) => {
                    warn!(line = err.location.line, column = err.location.column, "{}", err.message);
                    self.errors.push(err);
                }
            }
        }
    }
}

/// Tokenize a whole source string, returning the tokens and every error that
/// was skipped along the way.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer::new(source);
    let tokens: Vec<Token> = lexer.by_ref().collect();
    (tokens, lexer.into_errors())
}
