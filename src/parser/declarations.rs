//! Declaration parsing implementation
//!
//! This module handles the declaration part of a block:
//!
//! - `var` sections, any number of them before `begin`
//! - Name lists sharing a type: `a, b, c : integer`
//! - Type specs: built-in or named types and one-dimensional arrays
//!
//! # Grammar
//!
//! ```text
//! block      ::= var_section* compound
//! var_section ::= "var" var_item ";" (var_item ";")*
//! var_item   ::= identifier ("," identifier)* ":" type_spec
//! type_spec  ::= sys_type | identifier
//!              | "array" "[" expression ".." expression "]" "of" type_spec
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{ParseError, Parser};

impl<I: Iterator<Item = Token>> Parser<I> {
    /// Parse the declarations and the main compound statement
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let mut declarations = Vec::new();

        while self.match_token(&TokenKind::Var) {
            declarations.push(self.parse_var_section()?);
        }

        if !self.check(&TokenKind::Begin) {
            return Err(self.error_expected("'var' or 'begin'"));
        }
        let body = self.parse_compound()?;

        Ok(Block { declarations, body })
    }

    /// Parse the items of one `var` section (after the `var` keyword)
    fn parse_var_section(&mut self) -> Result<VarDeclarations, ParseError> {
        let mut declarations = Vec::new();

        loop {
            declarations.push(self.parse_var_item()?);
            self.expect_token(&TokenKind::Semicolon, "';' after variable declaration")?;

            if !matches!(self.peek_kind(), Some(TokenKind::Ident(_))) {
                break;
            }
        }

        Ok(VarDeclarations { declarations })
    }

    fn parse_var_item(&mut self) -> Result<VarDeclaration, ParseError> {
        let mut names = vec![self.expect_identifier("variable name")?];
        while self.match_token(&TokenKind::Comma) {
            names.push(self.expect_identifier("variable name after ','")?);
        }

        self.expect_token(&TokenKind::Colon, "':' after variable names")?;
        let type_spec = self.parse_type_spec()?;

        Ok(VarDeclaration { names, type_spec })
    }

    /// Parse a type: built-in type keyword, type name, or array type
    pub(crate) fn parse_type_spec(&mut self) -> Result<TypeSpec, ParseError> {
        if self.match_token(&TokenKind::Array) {
            return self.parse_array_type().map(TypeSpec::Array);
        }

        match self.peek_kind() {
            Some(TokenKind::SysType(_)) | Some(TokenKind::Ident(_)) => {}
            _ => return Err(self.error_expected("type")),
        }

        match self.advance().map(|t| t.kind) {
            Some(TokenKind::SysType(name)) | Some(TokenKind::Ident(name)) => {
                Ok(TypeSpec::Named(Type::new(name)))
            }
            _ => Err(self.error_expected("type")),
        }
    }

    /// Parse `[lower..upper] of element` (after the `array` keyword)
    fn parse_array_type(&mut self) -> Result<ArrayType, ParseError> {
        self.expect_token(&TokenKind::LBracket, "'[' after 'array'")?;
        let lower = self.parse_expression()?;
        self.expect_token(&TokenKind::DotDot, "'..' in array bounds")?;
        let upper = self.parse_expression()?;
        self.expect_token(&TokenKind::RBracket, "']' after array bounds")?;
        self.expect_token(&TokenKind::Of, "'of' after array bounds")?;

        let element_type = Box::new(self.parse_type_spec()?);

        Ok(ArrayType {
            range: IndexRange { lower, upper },
            element_type,
        })
    }
}
