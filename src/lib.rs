//! # Introduction
//!
//! pascalc compiles a subset of Pascal to text for a stack-based virtual
//! machine and ships a small machine to run the result.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → CodeGenerator → Instructions → Machine
//! ```
//!
//! 1. [`parser`]: tokenises the source and builds an AST. The AST can be
//!    printed back as Pascal, dumped as a tree, or drawn as a Graphviz graph.
//! 2. [`codegen`]: type-checks the AST and lowers it to [`codegen::Instruction`]s.
//! 3. [`vm`]: executes an instruction listing with captured input and output.
//! 4. [`error`]: [`CompileError`] covering the first two stages.
//!
//! ## Supported Pascal subset
//!
//! Types: `integer`, `real`, `boolean`, `char`, `string`, one-dimensional arrays.
//! Control flow: `if/else`, `while`, `for ... to/downto`, `begin ... end`.
//! Built-ins: `write`, `writeln`, `read`, `readln`, `abs`, `chr`, `odd`, `ord`,
//! `pred`, `succ`, `sqr`, `sqrt`, `length`.

pub mod codegen;
pub mod error;
pub mod parser;
pub mod vm;

pub use error::CompileError;
pub use parser::parse;

use codegen::Instruction;
use parser::ast::Program;
use parser::lexer::{LexError, Lexer};
use parser::Parser;
use tracing::debug;

/// Result of a successful compilation
#[derive(Debug, Clone)]
pub struct Compilation {
    pub program: Program,
    pub instructions: Vec<Instruction>,

    /// Lexer diagnostics; the offending input was skipped
    pub lex_errors: Vec<LexError>,
}

impl Compilation {
    /// Instruction listing, one per line
    pub fn listing(&self) -> String {
        self.instructions
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Compile Pascal source to machine instructions
pub fn compile(source: &str) -> Result<Compilation, CompileError> {
    let mut lexer = Lexer::new(source);
    let program = Parser::new(&mut lexer).parse_program()?;
    let lex_errors = lexer.into_errors();
    debug!(
        program = %program.name,
        lex_errors = lex_errors.len(),
        declarations = program.block.declarations.len(),
        statements = program.block.body.statements.len(),
        "parsed"
    );

    let instructions = codegen::generate(&program)?;
    debug!(instructions = instructions.len(), "generated");

    Ok(Compilation {
        program,
        instructions,
        lex_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_listing() {
        let compilation = compile("program P; var x: integer; begin x := 5; writeln(x) end.").unwrap();

        assert!(compilation.lex_errors.is_empty());
        assert_eq!(
            compilation.listing(),
            "pushi 0\nstoreg 0\nstart\npushi 5\nstoreg 0\npushg 0\nwritei\nwriteln\nstop"
        );
    }

    #[test]
    fn test_lex_errors_are_collected() {
        let compilation = compile("program P; begin writeln(1) ? end.").unwrap();
        assert_eq!(compilation.lex_errors.len(), 1);
    }

    #[test]
    fn test_stage_errors() {
        assert!(matches!(compile("program P begin end."), Err(CompileError::Parse(_))));
        assert!(matches!(
            compile("program P; begin y := 1 end."),
            Err(CompileError::Codegen(_))
        ));
    }
}
