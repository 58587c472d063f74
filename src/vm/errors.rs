//! Runtime error types for the stack machine
//!
//! All runtime errors are fatal: the machine stops at the faulting
//! instruction. Errors raised while executing carry the index of that
//! instruction (`pc`).

use crate::codegen::instruction::InstructionParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    /// A listing line that is not a valid instruction
    #[error("Invalid instruction on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: InstructionParseError,
    },

    /// `jz` / `jump` to a label that is never defined
    #[error("Unknown label '{0}'")]
    UnknownLabel(String),

    /// The same label defined twice
    #[error("Label '{0}' is defined more than once")]
    DuplicateLabel(String),

    #[error("Stack underflow at instruction {pc} ({instruction})")]
    StackUnderflow { pc: usize, instruction: String },

    #[error("Type error at instruction {pc} ({instruction}): expected {expected}, found {found}")]
    TypeMismatch {
        pc: usize,
        instruction: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Division by zero at instruction {pc}")]
    DivisionByZero { pc: usize },

    /// Heap cell, string position or global slot that does not exist
    #[error("Index {index} out of bounds (length {len}) at instruction {pc}")]
    OutOfBounds { pc: usize, index: i64, len: usize },

    #[error("Read past end of input at instruction {pc}")]
    InputExhausted { pc: usize },

    #[error("Invalid number '{text}' at instruction {pc}")]
    InvalidNumber { pc: usize, text: String },

    #[error("Invalid character code {code} at instruction {pc}")]
    InvalidChar { pc: usize, code: i64 },

    #[error("Out of memory at instruction {pc}: {what}")]
    OutOfMemory { pc: usize, what: String },

    #[error("Step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),
}

impl VmError {
    /// Index of the faulting instruction, if execution had started
    pub fn pc(&self) -> Option<usize> {
        match self {
            VmError::StackUnderflow { pc, .. }
            | VmError::TypeMismatch { pc, .. }
            | VmError::DivisionByZero { pc }
            | VmError::OutOfBounds { pc, .. }
            | VmError::InputExhausted { pc }
            | VmError::InvalidNumber { pc, .. }
            | VmError::InvalidChar { pc, .. }
            | VmError::OutOfMemory { pc, .. } => Some(*pc),
            VmError::Parse { .. }
            | VmError::UnknownLabel(_)
            | VmError::DuplicateLabel(_)
            | VmError::StepLimitExceeded(_) => None,
        }
    }
}
