//! Pascal source code parser
//!
//! This module transforms Pascal source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → lazy token stream)
//! - [`parse`]: Parsing (tokens → AST), split across `declarations`,
//!   `statements` and `expressions`
//! - [`ast`]: AST node definitions
//! - [`printer`] and [`graph`]: consumers that display a parsed tree
//!
//! # Supported Pascal Subset
//!
//! - Types: `integer`, `real`, `boolean`, `char`, `string`, one-dimensional arrays
//! - Statements: assignments, `if`/`else`, `while`, `for ... to/downto`, compound
//! - Built-in procedures `write`, `writeln`, `read`, `readln` and built-in
//!   functions `abs chr odd ord pred sqr sqrt succ length`
//! - No user-defined procedures or functions
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with one token of lookahead.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod graph;
pub mod lexer;
pub mod parse;
pub mod printer;
mod statements;

pub use parse::{parse, ParseError, Parser};
