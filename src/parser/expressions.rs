//! Expression parsing implementation
//!
//! Pascal has only three binary precedence levels plus relations, so each
//! level is its own recursive descent function rather than a precedence
//! climbing table.
//!
//! # Precedence (lowest to highest)
//!
//! ```text
//! expression ::= simple (relop simple)?          = <> < <= > >=
//! simple     ::= ("+" | "-")? term (addop term)* + - or
//! term       ::= factor (mulop factor)*          * / div mod and
//! factor     ::= lvalue | literal | "(" expression ")" | "not" factor
//!              | sys_func ("(" arguments ")")?
//! ```
//!
//! A relation is not associative: `a < b < c` is a syntax error at the
//! second `<`. A leading sign applies to the first term only.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{ParseError, Parser};

impl<I: Iterator<Item = Token>> Parser<I> {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_simple_expression()?;

        let op = match self.peek_kind() {
            Some(TokenKind::Equal) => BinOp::Eq,
            Some(TokenKind::NotEqual) => BinOp::Ne,
            Some(TokenKind::Lt) => BinOp::Lt,
            Some(TokenKind::Le) => BinOp::Le,
            Some(TokenKind::Gt) => BinOp::Gt,
            Some(TokenKind::Ge) => BinOp::Ge,
            _ => return Ok(left),
        };
        self.advance();

        let right = self.parse_simple_expression()?;
        Ok(Expr::binary(op, left, right))
    }

    fn parse_simple_expression(&mut self) -> Result<Expr, ParseError> {
        let sign = if self.match_token(&TokenKind::Plus) {
            Some(UnOp::Plus)
        } else if self.match_token(&TokenKind::Minus) {
            Some(UnOp::Neg)
        } else {
            None
        };

        let mut left = self.parse_term()?;
        if let Some(op) = sign {
            left = Expr::unary(op, left);
        }

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                Some(TokenKind::Or) => BinOp::Or,
                _ => break,
            };
            self.advance();

            let right = self.parse_term()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::Div) => BinOp::IntDiv,
                Some(TokenKind::Mod) => BinOp::Mod,
                Some(TokenKind::And) => BinOp::And,
                _ => break,
            };
            self.advance();

            let right = self.parse_factor()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let is_factor_start = matches!(
            self.peek_kind(),
            Some(
                TokenKind::Ident(_)
                    | TokenKind::Integer(_)
                    | TokenKind::Real(_)
                    | TokenKind::Boolean(_)
                    | TokenKind::Char(_)
                    | TokenKind::Str(_)
                    | TokenKind::SysFunc(_)
                    | TokenKind::LParen
                    | TokenKind::Not
            )
        );
        if !is_factor_start {
            return Err(self.error_expected("expression"));
        }

        let Some(token) = self.advance() else {
            return Err(self.error_expected("expression"));
        };

        match token.kind {
            TokenKind::Integer(n) => Ok(Expr::Number(Number::Integer(n))),
            TokenKind::Real(x) => Ok(Expr::Number(Number::Real(x))),
            TokenKind::Boolean(b) => Ok(Expr::Boolean(b)),
            TokenKind::Char(c) => Ok(Expr::Char(c)),
            TokenKind::Str(s) => Ok(Expr::String(s)),

            TokenKind::Ident(name) => {
                if self.match_token(&TokenKind::LBracket) {
                    let index = self.parse_expression()?;
                    self.expect_token(&TokenKind::RBracket, "']' after index")?;
                    Ok(Expr::ArrayAccess {
                        array: name,
                        index: Box::new(index),
                    })
                } else {
                    Ok(Expr::Variable(name))
                }
            }

            TokenKind::SysFunc(name) => {
                let args = if self.match_token(&TokenKind::LParen) {
                    let args = self.parse_arguments()?;
                    self.expect_token(&TokenKind::RParen, "')' after arguments")?;
                    args
                } else {
                    Vec::new()
                };
                Ok(Expr::FunctionCall { name, args })
            }

            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.expect_token(&TokenKind::RParen, "')' after expression")?;
                Ok(expr)
            }

            TokenKind::Not => {
                let operand = self.parse_factor()?;
                Ok(Expr::unary(UnOp::Not, operand))
            }

            _ => Err(self.error_expected("expression")),
        }
    }

    /// Parse a comma-separated argument list; `()` gives an empty list
    pub(crate) fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }

        args.push(self.parse_expression()?);
        while self.match_token(&TokenKind::Comma) {
            args.push(self.parse_expression()?);
        }

        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{parse, ParseError};

    fn expr(source: &str) -> Expr {
        let program = parse(&format!("program E; begin x := {} end.", source)).unwrap();
        match program.block.body.statements.into_iter().next() {
            Some(Statement::Assignment { value, .. }) => value,
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    #[test]
    fn test_left_associative_terms() {
        assert_eq!(
            expr("a - b - c"),
            Expr::binary(
                BinOp::Sub,
                Expr::binary(BinOp::Sub, var("a"), var("b")),
                var("c")
            )
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            expr("a or b and c"),
            Expr::binary(
                BinOp::Or,
                var("a"),
                Expr::binary(BinOp::And, var("b"), var("c"))
            )
        );
    }

    #[test]
    fn test_not_applies_to_factor() {
        assert_eq!(
            expr("not a = b"),
            Expr::binary(BinOp::Eq, Expr::unary(UnOp::Not, var("a")), var("b"))
        );
    }

    #[test]
    fn test_parenthesized_relation() {
        assert_eq!(
            expr("(a > 1) and (b <= 2.5)"),
            Expr::binary(
                BinOp::And,
                Expr::binary(BinOp::Gt, var("a"), Expr::integer(1)),
                Expr::binary(BinOp::Le, var("b"), Expr::Number(Number::Real(2.5)))
            )
        );
    }

    #[test]
    fn test_literals_and_access() {
        assert_eq!(expr("'c'"), Expr::Char('c'));
        assert_eq!(expr("'hi'"), Expr::String("hi".to_string()));
        assert_eq!(expr("TRUE"), Expr::Boolean(true));
        assert_eq!(
            expr("v[i + 1]"),
            Expr::ArrayAccess {
                array: "v".to_string(),
                index: Box::new(Expr::binary(BinOp::Add, var("i"), Expr::integer(1))),
            }
        );
    }

    #[test]
    fn test_function_call_name_lowercased() {
        assert_eq!(
            expr("Sqr(2) div 3 mod 4"),
            Expr::binary(
                BinOp::Mod,
                Expr::binary(
                    BinOp::IntDiv,
                    Expr::FunctionCall {
                        name: "sqr".to_string(),
                        args: vec![Expr::integer(2)],
                    },
                    Expr::integer(3)
                ),
                Expr::integer(4)
            )
        );
    }

    #[test]
    fn test_chained_relation_rejected() {
        let err = parse("program E; begin x := a < b < c end.").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { ref found, .. } if found == "'<'"));
    }

    #[test]
    fn test_sign_inside_term_rejected() {
        assert!(parse("program E; begin x := a * -b end.").is_err());
    }
}
