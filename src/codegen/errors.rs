//! Code generation error types
//!
//! All of these are fatal: generation stops at the offending construct and
//! no partial listing is returned.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// Reference to a name that was never declared
    #[error("Undeclared variable '{0}'")]
    UndeclaredName(String),

    /// A name declared twice in the program
    #[error("Variable '{0}' is already declared")]
    Redeclared(String),

    /// Assignment or operation between incompatible types
    #[error("Incompatible types in {context}: {left} and {right}")]
    TypeMismatch {
        context: String,
        left: String,
        right: String,
    },

    /// Construct outside the supported subset, e.g. `length` of an integer
    #[error("Unsupported {0}")]
    Unsupported(String),

    /// Array declared with `upper < lower` or non-constant bounds
    #[error("Invalid bounds for array '{name}': {reason}")]
    InvalidArrayBounds { name: String, reason: String },

    /// Generator defect
    #[error("Internal code generator error: {0}")]
    Internal(String),
}

impl CodegenError {
    pub(crate) fn mismatch(context: &str, left: impl ToString, right: impl ToString) -> Self {
        CodegenError::TypeMismatch {
            context: context.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        CodegenError::Unsupported(what.into())
    }
}
