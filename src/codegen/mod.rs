//! Stack-machine code generator
//!
//! This module lowers a parsed [`Program`] to a flat list of instructions:
//! - [`generator`]: the [`CodeGenerator`] context, declarations and statements
//! - `expressions`: type inference and expression lowering
//! - `builtins`: `write`/`read` procedures and the built-in functions
//! - [`symbols`]: global variable table
//! - [`instruction`]: the instruction set and its text form
//! - [`errors`]: generation errors
//!
//! # Memory Model
//!
//! Every variable lives in a global slot. Scalars and strings hold their
//! value directly; an array slot holds the address of a heap block
//! allocated with `allocn` at declaration time.

mod builtins;
pub mod errors;
mod expressions;
pub mod generator;
pub mod instruction;
pub mod symbols;

pub use errors::CodegenError;
pub use expressions::ExprType;
pub use generator::CodeGenerator;
pub use instruction::Instruction;

use crate::parser::ast::Program;

/// Generate the instruction list for a whole program
pub fn generate(program: &Program) -> Result<Vec<Instruction>, CodegenError> {
    let mut generator = CodeGenerator::new();
    generator.generate(program)?;
    Ok(generator.finish())
}
