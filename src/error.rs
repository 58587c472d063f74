//! Crate-level error for the stages that abort compilation.
//!
//! Lexer errors are recoverable and travel in [`crate::Compilation::lex_errors`].

use crate::codegen::CodegenError;
use crate::parser::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}
