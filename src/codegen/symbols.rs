//! Symbol table for global variables
//!
//! Every declared name gets the next global offset. Offsets are handed out
//! once and never reused, arrays included (an array's offset holds the
//! address of its heap block).

use super::errors::CodegenError;
use rustc_hash::FxHashMap;
use std::fmt;

/// Type of a scalar variable or array element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Integer,
    Real,
    Boolean,
    Char,
}

impl ScalarType {
    /// Resolve a built-in scalar type name (case-insensitive)
    pub fn from_name(name: &str) -> Option<ScalarType> {
        match name.to_ascii_lowercase().as_str() {
            "integer" => Some(ScalarType::Integer),
            "real" => Some(ScalarType::Real),
            "boolean" => Some(ScalarType::Boolean),
            "char" => Some(ScalarType::Char),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Integer => "integer",
            ScalarType::Real => "real",
            ScalarType::Boolean => "boolean",
            ScalarType::Char => "char",
        };
        write!(f, "{}", name)
    }
}

/// Layout of an array variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayInfo {
    pub lower_bound: i64,
    pub size: i64,
    pub element_type: ScalarType,
}

/// How a variable is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Scalar(ScalarType),
    /// A string value held directly in the global slot
    String,
    /// Heap block of `size` cells whose address is held in the global slot
    Array(ArrayInfo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub offset: usize,
    pub kind: StorageKind,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: FxHashMap<String, Symbol>,
    next_offset: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to the next free offset
    pub fn declare(&mut self, name: &str, kind: StorageKind) -> Result<Symbol, CodegenError> {
        if self.symbols.contains_key(name) {
            return Err(CodegenError::Redeclared(name.to_string()));
        }

        let symbol = Symbol {
            offset: self.next_offset,
            kind,
        };
        self.next_offset += 1;
        self.symbols.insert(name.to_string(), symbol);
        Ok(symbol)
    }

    pub fn lookup(&self, name: &str) -> Result<Symbol, CodegenError> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| CodegenError::UndeclaredName(name.to_string()))
    }

    /// Number of global slots in use
    pub fn len(&self) -> usize {
        self.next_offset
    }

    pub fn is_empty(&self) -> bool {
        self.next_offset == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_sequential() {
        let mut table = SymbolTable::new();
        let a = table.declare("a", StorageKind::Scalar(ScalarType::Integer)).unwrap();
        let v = table
            .declare(
                "v",
                StorageKind::Array(ArrayInfo {
                    lower_bound: 1,
                    size: 10,
                    element_type: ScalarType::Integer,
                }),
            )
            .unwrap();
        let s = table.declare("s", StorageKind::String).unwrap();

        assert_eq!((a.offset, v.offset, s.offset), (0, 1, 2));
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup("v").unwrap(), v);
    }

    #[test]
    fn test_redeclaration_and_lookup_errors() {
        let mut table = SymbolTable::new();
        table.declare("x", StorageKind::String).unwrap();

        assert_eq!(
            table.declare("x", StorageKind::Scalar(ScalarType::Real)),
            Err(CodegenError::Redeclared("x".to_string()))
        );
        assert_eq!(
            table.lookup("y"),
            Err(CodegenError::UndeclaredName("y".to_string()))
        );
        // Identifiers are case-sensitive
        assert!(table.lookup("X").is_err());
    }

    #[test]
    fn test_scalar_type_names() {
        assert_eq!(ScalarType::from_name("Integer"), Some(ScalarType::Integer));
        assert_eq!(ScalarType::from_name("REAL"), Some(ScalarType::Real));
        assert_eq!(ScalarType::from_name("string"), None);
    }
}
