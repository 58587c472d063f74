// AST (Abstract Syntax Tree) definitions for the Pascal subset

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Top-level program: `program NAME; block .`
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    pub block: Block,
}

/// Declarations followed by the main compound statement
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub declarations: Vec<VarDeclarations>,
    pub body: Compound,
}

/// One `var` section
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarations {
    pub declarations: Vec<VarDeclaration>,
}

/// `a, b, c : type`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclaration {
    pub names: Vec<String>,
    pub type_spec: TypeSpec,
}

/// Right-hand side of a variable declaration
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    /// Built-in (`integer`, `real`, ...) or named (`string`) type
    Named(Type),
    Array(ArrayType),
}

/// A type referenced by name. Built-in type names are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub name: String,
}

impl Type {
    pub fn new(name: impl Into<String>) -> Self {
        Type { name: name.into() }
    }
}

/// `array [lower..upper] of element_type`
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub range: IndexRange,
    pub element_type: Box<TypeSpec>,
}

/// Array bounds. Both ends are expressions; they are folded to constants
/// during code generation.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRange {
    pub lower: Expr,
    pub upper: Expr,
}

/// `begin stmt; stmt; ... end`
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub statements: Vec<Statement>,
}

/// Loop direction of a `for` statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    To,
    DownTo,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::To => "to",
            Direction::DownTo => "downto",
        }
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Compound(Compound),
    Assignment {
        target: LValue,
        value: Expr,
    },
    ProcedureCall {
        name: String,
        args: Vec<Expr>,
    },
    If {
        condition: Expr,
        then_part: Box<Statement>,
        else_part: Option<Box<Statement>>,
    },
    While {
        condition: Expr,
        body: Box<Statement>,
    },
    For {
        variable: String,
        start: Expr,
        direction: Direction,
        end: Expr,
        body: Box<Statement>,
    },
    /// `readln` rewritten by the parser; `None` reads a line and discards it
    ReadlnAssignment {
        target: Option<LValue>,
    },
    NoOp,
}

/// An assignable storage location
#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    Variable(String),
    ArrayAccess { array: String, index: Box<Expr> },
}

impl LValue {
    /// Name of the variable, array or string being written
    pub fn name(&self) -> &str {
        match self {
            LValue::Variable(name) => name,
            LValue::ArrayAccess { array, .. } => array,
        }
    }

    /// Reinterpret an expression in lvalue position, if it denotes storage
    pub fn from_expr(expr: &Expr) -> Option<LValue> {
        match expr {
            Expr::Variable(name) => Some(LValue::Variable(name.clone())),
            Expr::ArrayAccess { array, index } => Some(LValue::ArrayAccess {
                array: array.clone(),
                index: index.clone(),
            }),
            _ => None,
        }
    }
}

impl From<LValue> for Expr {
    fn from(lvalue: LValue) -> Self {
        match lvalue {
            LValue::Variable(name) => Expr::Variable(name),
            LValue::ArrayAccess { array, index } => Expr::ArrayAccess { array, index },
        }
    }
}

/// Numeric literal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Real(f64),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div, // `/`
    IntDiv,
    Mod,
    // Logical
    And,
    Or,
    // Relational
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::IntDiv => "div",
            BinOp::Mod => "mod",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Eq => "=",
            BinOp::Ne => "<>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus, // +x
    Neg,  // -x
    Not,  // not x
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Plus => "+",
            UnOp::Neg => "-",
            UnOp::Not => "not",
        }
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Variable(String),
    ArrayAccess {
        array: String,
        index: Box<Expr>,
    },
    /// Built-in function call; the name is lower-cased by the lexer
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<Expr>,
    },
    Number(Number),
    String(String),
    Char(char),
    Boolean(bool),
}

impl Expr {
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnOp, operand: Expr) -> Self {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn integer(value: i64) -> Self {
        Expr::Number(Number::Integer(value))
    }
}
