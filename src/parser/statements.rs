//! Statement parsing implementation
//!
//! This module handles parsing of all statement forms:
//!
//! - Compound statements: `begin ... end`
//! - Control flow: `if`, `while`, `for`
//! - Assignments to variables and indexed elements
//! - Procedure calls, with `readln` desugared into [`Statement::ReadlnAssignment`]
//! - The empty statement, e.g. before `end` or between two `;`
//!
//! # Grammar
//!
//! ```text
//! compound   ::= "begin" statement (";" statement)* "end"
//! statement  ::= if_stmt | while_stmt | for_stmt | compound
//!              | lvalue ":=" expression | proc_call | ε
//! proc_call  ::= identifier | sys_proc ("(" arguments ")")?
//! ```
//!
//! A trailing `else` always belongs to the nearest `if` without one.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{ParseError, Parser};

impl<I: Iterator<Item = Token>> Parser<I> {
    /// Parse `begin statement; ... end`
    pub(crate) fn parse_compound(&mut self) -> Result<Compound, ParseError> {
        self.expect_token(&TokenKind::Begin, "'begin'")?;

        let mut statements = vec![self.parse_statement()?];
        while self.match_token(&TokenKind::Semicolon) {
            statements.push(self.parse_statement()?);
        }

        self.expect_token(&TokenKind::End, "';' or 'end'")?;
        Ok(Compound { statements })
    }

    /// Parse a single statement. Anything that cannot start a statement
    /// yields [`Statement::NoOp`] and is left for the caller.
    pub(crate) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Begin) => self.parse_compound().map(Statement::Compound),
            Some(TokenKind::If) => self.parse_if_statement(),
            Some(TokenKind::While) => self.parse_while_statement(),
            Some(TokenKind::For) => self.parse_for_statement(),
            Some(TokenKind::Ident(_)) => self.parse_assignment_or_call(),
            Some(TokenKind::SysProc(_)) => self.parse_sys_proc_call(),
            _ => Ok(Statement::NoOp),
        }
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_token(&TokenKind::If, "'if'")?;
        let condition = self.parse_expression()?;
        self.expect_token(&TokenKind::Then, "'then' after if condition")?;

        let then_part = Box::new(self.parse_statement()?);

        // Greedy: the innermost open `if` takes the `else`
        let else_part = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_part,
            else_part,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_token(&TokenKind::While, "'while'")?;
        let condition = self.parse_expression()?;
        self.expect_token(&TokenKind::Do, "'do' after while condition")?;
        let body = Box::new(self.parse_statement()?);

        Ok(Statement::While { condition, body })
    }

    fn parse_for_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_token(&TokenKind::For, "'for'")?;
        let variable = self.expect_identifier("loop variable")?;
        self.expect_token(&TokenKind::Assign, "':=' after loop variable")?;
        let start = self.parse_expression()?;

        let direction = if self.match_token(&TokenKind::To) {
            Direction::To
        } else if self.match_token(&TokenKind::DownTo) {
            Direction::DownTo
        } else {
            return Err(self.error_expected("'to' or 'downto'"));
        };

        let end = self.parse_expression()?;
        self.expect_token(&TokenKind::Do, "'do' after for range")?;
        let body = Box::new(self.parse_statement()?);

        Ok(Statement::For {
            variable,
            start,
            direction,
            end,
            body,
        })
    }

    /// `name := expr`, `name[index] := expr`, or a bare procedure name
    fn parse_assignment_or_call(&mut self) -> Result<Statement, ParseError> {
        let name = self.expect_identifier("statement")?;

        let target = if self.match_token(&TokenKind::LBracket) {
            let index = self.parse_expression()?;
            self.expect_token(&TokenKind::RBracket, "']' after index")?;
            LValue::ArrayAccess {
                array: name,
                index: Box::new(index),
            }
        } else if self.check(&TokenKind::Assign) {
            LValue::Variable(name)
        } else {
            return Ok(Statement::ProcedureCall {
                name,
                args: Vec::new(),
            });
        };

        self.expect_token(&TokenKind::Assign, "':=' in assignment")?;
        let value = self.parse_expression()?;

        Ok(Statement::Assignment { target, value })
    }

    fn parse_sys_proc_call(&mut self) -> Result<Statement, ParseError> {
        let name = match self.advance().map(|t| t.kind) {
            Some(TokenKind::SysProc(name)) => name,
            _ => return Err(self.error_expected("procedure name")),
        };

        let location = self.current_location();
        let args = if self.match_token(&TokenKind::LParen) {
            let args = self.parse_arguments()?;
            self.expect_token(&TokenKind::RParen, "')' after arguments")?;
            args
        } else {
            Vec::new()
        };

        if name == "readln" {
            return Self::desugar_readln(args, location);
        }

        Ok(Statement::ProcedureCall { name, args })
    }

    /// `readln(a, b)` becomes one [`Statement::ReadlnAssignment`] per target
    fn desugar_readln(args: Vec<Expr>, location: SourceLocation) -> Result<Statement, ParseError> {
        let mut targets = Vec::with_capacity(args.len());
        for arg in &args {
            match LValue::from_expr(arg) {
                Some(target) => targets.push(Statement::ReadlnAssignment {
                    target: Some(target),
                }),
                None => {
                    return Err(ParseError::Invalid {
                        message: "readln argument must be a variable or indexed element".to_string(),
                        location,
                    })
                }
            }
        }

        Ok(match targets.len() {
            0 => Statement::ReadlnAssignment { target: None },
            1 => targets.remove(0),
            _ => Statement::Compound(Compound {
                statements: targets,
            }),
        })
    }
}
