//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: the program header, `var` sections and type specs
//! - `statements`: compound, `if`, `while`, `for`, assignments, procedure calls
//! - `expressions`: relational / additive / multiplicative levels and factors
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.
//!
//! The parser pulls tokens lazily from any `Iterator<Item = Token>`, normally
//! a [`Lexer`], with a single token of lookahead.

use crate::parser::ast::*;
use crate::parser::lexer::{Lexer, Token, TokenKind};
use std::iter::Peekable;
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A token that does not fit the grammar at this point
    #[error(
        "Syntax error at line {}, column {}: expected {}, found {}",
        .location.line, .location.column, .expected, .found
    )]
    UnexpectedToken {
        expected: String,
        found: String,
        location: SourceLocation,
    },

    /// Input ended in the middle of a production
    #[error("Syntax error at end of file: expected {}", .expected)]
    UnexpectedEof { expected: String },

    /// Well-formed tokens that the grammar still rejects, e.g. a `readln`
    /// argument that is not a variable
    #[error("Syntax error at line {}, column {}: {}", .location.line, .location.column, .message)]
    Invalid {
        message: String,
        location: SourceLocation,
    },
}

/// Recursive descent parser for the Pascal subset
pub struct Parser<I: Iterator<Item = Token>> {
    pub(crate) tokens: Peekable<I>,
    pub(crate) last_location: SourceLocation,
}

impl Parser<Lexer> {
    /// Build a parser that lexes `source` on demand
    pub fn from_source(source: &str) -> Self {
        Parser::new(Lexer::new(source))
    }
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        Self {
            tokens: tokens.peekable(),
            last_location: SourceLocation::new(1, 1),
        }
    }

    /// Parse a whole compilation unit: `program NAME; block .`
    ///
    /// Any token after the final `.` is a syntax error.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        self.expect_token(&TokenKind::Program, "'program'")?;
        let name = self.expect_identifier("program name")?;
        self.expect_token(&TokenKind::Semicolon, "';' after program name")?;

        let block = self.parse_block()?;

        self.expect_token(&TokenKind::Dot, "'.' after program body")?;

        if let Some(token) = self.tokens.peek() {
            return Err(ParseError::UnexpectedToken {
                expected: "end of input".to_string(),
                found: token.kind.to_string(),
                location: token.location,
            });
        }

        Ok(Program { name, block })
    }

    // ===== Helper methods =====

    pub(crate) fn peek_kind(&mut self) -> Option<&TokenKind> {
        self.tokens.peek().map(|t| &t.kind)
    }

    pub(crate) fn check(&mut self, kind: &TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| std::mem::discriminant(k) == std::mem::discriminant(kind))
    }

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.next()?;
        self.last_location = token.location;
        Some(token)
    }

    pub(crate) fn current_location(&mut self) -> SourceLocation {
        match self.tokens.peek() {
            Some(token) => token.location,
            None => self.last_location,
        }
    }

    pub(crate) fn expect_token(&mut self, kind: &TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(self.error_expected(expected))
        }
    }

    pub(crate) fn expect_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        if let Some(TokenKind::Ident(_)) = self.peek_kind() {
            if let Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) = self.advance()
            {
                return Ok(name);
            }
        }
        Err(self.error_expected(expected))
    }

    /// Build the error for the current token (or end of input)
    pub(crate) fn error_expected(&mut self, expected: &str) -> ParseError {
        match self.tokens.peek() {
            Some(token) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.to_string(),
                location: token.location,
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }
}

/// Parse a complete program from source text
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::from_source(source).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(source: &str) -> Vec<Statement> {
        parse(source).unwrap().block.body.statements
    }

    #[test]
    fn test_parse_minimal_program() {
        let program = parse("program Empty; begin end.").unwrap();

        assert_eq!(program.name, "Empty");
        assert!(program.block.declarations.is_empty());
        assert_eq!(program.block.body.statements, vec![Statement::NoOp]);
    }

    #[test]
    fn test_parse_declarations() {
        let program = parse(
            "program D; var a, b: integer; r: real; var s: string; v: array[1..3] of char; begin end.",
        )
        .unwrap();

        let decls = &program.block.declarations;
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].declarations.len(), 2);
        assert_eq!(decls[0].declarations[0].names, vec!["a", "b"]);
        assert_eq!(
            decls[0].declarations[0].type_spec,
            TypeSpec::Named(Type::new("integer"))
        );
        assert_eq!(
            decls[1].declarations[0].type_spec,
            TypeSpec::Named(Type::new("string"))
        );
        match &decls[1].declarations[1].type_spec {
            TypeSpec::Array(array) => {
                assert_eq!(array.range.lower, Expr::integer(1));
                assert_eq!(array.range.upper, Expr::integer(3));
                assert_eq!(*array.element_type, TypeSpec::Named(Type::new("char")));
            }
            other => panic!("Expected array type, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_else_binds_to_inner_if() {
        let stmts = body("program P; begin if a then if b then x := 1 else x := 2 end.");

        match &stmts[0] {
            Statement::If {
                then_part,
                else_part,
                ..
            } => {
                assert!(else_part.is_none());
                match then_part.as_ref() {
                    Statement::If { else_part, .. } => {
                        assert!(matches!(
                            else_part.as_deref(),
                            Some(Statement::Assignment { value: Expr::Number(Number::Integer(2)), .. })
                        ));
                    }
                    other => panic!("Expected inner if, got {:?}", other),
                }
            }
            other => panic!("Expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let stmts = body("program P; begin x := 1 + 2 * 3 = 7 end.");

        let Statement::Assignment { value, .. } = &stmts[0] else {
            panic!("Expected assignment");
        };
        let expected = Expr::binary(
            BinOp::Eq,
            Expr::binary(
                BinOp::Add,
                Expr::integer(1),
                Expr::binary(BinOp::Mul, Expr::integer(2), Expr::integer(3)),
            ),
            Expr::integer(7),
        );
        assert_eq!(*value, expected);
    }

    #[test]
    fn test_leading_sign_applies_to_first_term() {
        let stmts = body("program P; begin x := -a + b end.");

        let Statement::Assignment { value, .. } = &stmts[0] else {
            panic!("Expected assignment");
        };
        let expected = Expr::binary(
            BinOp::Add,
            Expr::unary(UnOp::Neg, Expr::Variable("a".to_string())),
            Expr::Variable("b".to_string()),
        );
        assert_eq!(*value, expected);
    }

    #[test]
    fn test_readln_desugaring() {
        let stmts = body("program P; begin readln; readln(x); readln(a[1], y) end.");

        assert_eq!(stmts[0], Statement::ReadlnAssignment { target: None });
        assert_eq!(
            stmts[1],
            Statement::ReadlnAssignment {
                target: Some(LValue::Variable("x".to_string()))
            }
        );
        match &stmts[2] {
            Statement::Compound(compound) => {
                assert_eq!(compound.statements.len(), 2);
                assert!(matches!(
                    compound.statements[0],
                    Statement::ReadlnAssignment {
                        target: Some(LValue::ArrayAccess { .. })
                    }
                ));
            }
            other => panic!("Expected compound, got {:?}", other),
        }
    }

    #[test]
    fn test_readln_rejects_non_variable() {
        let err = parse("program P; begin readln(1 + 2) end.").unwrap_err();
        assert!(matches!(err, ParseError::Invalid { .. }));
    }

    #[test]
    fn test_procedure_and_function_calls() {
        let stmts = body("program P; begin writeln('a', ABS(x)); Foo; write end.");

        match &stmts[0] {
            Statement::ProcedureCall { name, args } => {
                assert_eq!(name, "writeln");
                assert_eq!(args.len(), 2);
                assert!(matches!(&args[1], Expr::FunctionCall { name, .. } if name == "abs"));
            }
            other => panic!("Expected procedure call, got {:?}", other),
        }
        assert!(matches!(&stmts[1], Statement::ProcedureCall { name, args } if name == "Foo" && args.is_empty()));
        assert!(matches!(&stmts[2], Statement::ProcedureCall { name, args } if name == "write" && args.is_empty()));
    }

    #[test]
    fn test_for_statement() {
        let stmts = body("program P; begin for i := 10 downto 1 do x := i end.");

        match &stmts[0] {
            Statement::For {
                variable,
                direction,
                ..
            } => {
                assert_eq!(variable, "i");
                assert_eq!(*direction, Direction::DownTo);
            }
            other => panic!("Expected for statement, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_reports_token_and_line() {
        let err = parse("program P;\nbegin\n  x := ;\nend.").unwrap_err();

        match err {
            ParseError::UnexpectedToken {
                found, location, ..
            } => {
                assert_eq!(found, "';'");
                assert_eq!(location.line, 3);
            }
            other => panic!("Expected unexpected token, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_at_eof() {
        let err = parse("program P; begin x := 1").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
        assert!(err.to_string().contains("end of file"));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse("program P; begin end. x").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { ref expected, .. } if expected == "end of input"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "program P; var i: integer; begin for i := 1 to 3 do if odd(i) then writeln(i) end.";
        assert_eq!(parse(source).unwrap(), parse(source).unwrap());
    }
}
