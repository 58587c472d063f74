//! Expression typing and lowering
//!
//! Types are inferred bottom-up while code is emitted: each sub-expression
//! reports the type of the value its code leaves on the stack. Coercions
//! that depend on the other operand are spliced in after both sides are
//! emitted.
//!
//! Characters come in two runtime shapes. A char literal or `char` variable
//! is a one-character string; a character taken out of a string by indexing
//! is a character code. Operations that mix them work on codes.

use super::errors::CodegenError;
use super::instruction::Instruction;
use super::symbols::{ArrayInfo, ScalarType, StorageKind};
use super::CodeGenerator;
use crate::parser::ast::*;
use std::fmt;

/// Static type of an expression's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprType {
    Integer,
    Real,
    Boolean,
    /// One-character string
    Char,
    /// Character code taken from a string
    CharCode,
    String,
    Array,
}

impl ExprType {
    /// Values the machine holds as plain integers
    pub fn is_integral(self) -> bool {
        matches!(self, ExprType::Integer | ExprType::Boolean | ExprType::CharCode)
    }

    fn is_text(self) -> bool {
        matches!(self, ExprType::Char | ExprType::String)
    }
}

impl From<ScalarType> for ExprType {
    fn from(scalar: ScalarType) -> Self {
        match scalar {
            ScalarType::Integer => ExprType::Integer,
            ScalarType::Real => ExprType::Real,
            ScalarType::Boolean => ExprType::Boolean,
            ScalarType::Char => ExprType::Char,
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExprType::Integer => "integer",
            ExprType::Real => "real",
            ExprType::Boolean => "boolean",
            ExprType::Char => "char",
            ExprType::CharCode => "char code",
            ExprType::String => "string",
            ExprType::Array => "array",
        };
        write!(f, "{}", name)
    }
}

/// Conversion applied to an operand right after it is pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Coercion {
    Keep,
    ToReal,
    ToCode,
}

/// How one binary operation is lowered
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BinaryPlan {
    pub left: Coercion,
    pub right: Coercion,
    pub ops: Vec<Instruction>,
    pub result: ExprType,
}

fn relational_ops(op: BinOp) -> Vec<Instruction> {
    match op {
        BinOp::Eq => vec![Instruction::Equal],
        BinOp::Ne => vec![Instruction::Equal, Instruction::Not],
        BinOp::Lt => vec![Instruction::Inf],
        BinOp::Le => vec![Instruction::InfEq],
        BinOp::Gt => vec![Instruction::Sup],
        _ => vec![Instruction::SupEq],
    }
}

/// Coercions that bring both operands of a numeric operation to one
/// representation. The flag is set when the operation runs on reals.
fn numeric_coercions(
    op: BinOp,
    left: ExprType,
    right: ExprType,
) -> Result<(Coercion, Coercion, bool), CodegenError> {
    let mismatch = || CodegenError::mismatch(&format!("operator '{}'", op.symbol()), left, right);

    let operand_ok = |t: ExprType| t.is_integral() || matches!(t, ExprType::Real | ExprType::Char);
    if !operand_ok(left) || !operand_ok(right) {
        return Err(mismatch());
    }

    let real = left == ExprType::Real || right == ExprType::Real;
    let coerce = |t: ExprType| -> Result<Coercion, CodegenError> {
        match t {
            ExprType::Char if real => Err(mismatch()),
            ExprType::Char => Ok(Coercion::ToCode),
            ExprType::Real => Ok(Coercion::Keep),
            _ if real => Ok(Coercion::ToReal),
            _ => Ok(Coercion::Keep),
        }
    };

    Ok((coerce(left)?, coerce(right)?, real))
}

/// Decide how `left op right` is typed and lowered
pub(crate) fn plan_binary(op: BinOp, left: ExprType, right: ExprType) -> Result<BinaryPlan, CodegenError> {
    let context = format!("operator '{}'", op.symbol());

    if op.is_relational() {
        if left.is_text() && right.is_text() && matches!(op, BinOp::Eq | BinOp::Ne) {
            return Ok(BinaryPlan {
                left: Coercion::Keep,
                right: Coercion::Keep,
                ops: relational_ops(op),
                result: ExprType::Boolean,
            });
        }

        let (lc, rc, _) = numeric_coercions(op, left, right)?;
        return Ok(BinaryPlan {
            left: lc,
            right: rc,
            ops: relational_ops(op),
            result: ExprType::Boolean,
        });
    }

    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
            let (lc, rc, real) = numeric_coercions(op, left, right)?;
            let instruction = match (op, real) {
                (BinOp::Add, false) => Instruction::Add,
                (BinOp::Sub, false) => Instruction::Sub,
                (BinOp::Mul, false) => Instruction::Mul,
                (_, false) => Instruction::Div,
                (BinOp::Add, true) => Instruction::FAdd,
                (BinOp::Sub, true) => Instruction::FSub,
                (BinOp::Mul, true) => Instruction::FMul,
                (_, true) => Instruction::FDiv,
            };
            Ok(BinaryPlan {
                left: lc,
                right: rc,
                ops: vec![instruction],
                result: if real { ExprType::Real } else { ExprType::Integer },
            })
        }
        BinOp::IntDiv | BinOp::Mod => {
            let (lc, rc, real) = numeric_coercions(op, left, right)?;
            if real {
                return Err(CodegenError::mismatch(&context, left, right));
            }
            let instruction = if op == BinOp::Mod {
                Instruction::Mod
            } else {
                Instruction::Div
            };
            Ok(BinaryPlan {
                left: lc,
                right: rc,
                ops: vec![instruction],
                result: ExprType::Integer,
            })
        }
        _ => {
            // and / or
            if !left.is_integral() || !right.is_integral() {
                return Err(CodegenError::mismatch(&context, left, right));
            }
            let result = if left == ExprType::Boolean && right == ExprType::Boolean {
                ExprType::Boolean
            } else {
                ExprType::Integer
            };
            let instruction = if op == BinOp::And {
                Instruction::And
            } else {
                Instruction::Or
            };
            Ok(BinaryPlan {
                left: Coercion::Keep,
                right: Coercion::Keep,
                ops: vec![instruction],
                result,
            })
        }
    }
}

fn unary_type(op: UnOp, operand: ExprType) -> Result<ExprType, CodegenError> {
    let mismatch = || CodegenError::mismatch(&format!("unary '{}'", op.symbol()), operand, operand);
    match op {
        UnOp::Plus if operand.is_integral() || matches!(operand, ExprType::Real | ExprType::Char) => {
            Ok(operand)
        }
        UnOp::Neg if operand == ExprType::Real => Ok(ExprType::Real),
        UnOp::Neg if operand.is_integral() || operand == ExprType::Char => Ok(ExprType::Integer),
        UnOp::Not if operand == ExprType::Boolean => Ok(ExprType::Boolean),
        UnOp::Not if operand.is_integral() => Ok(ExprType::Integer),
        _ => Err(mismatch()),
    }
}

impl CodeGenerator {
    /// Emit code leaving the value of `expr` on the stack; returns its type
    pub(crate) fn gen_expr(&mut self, expr: &Expr) -> Result<ExprType, CodegenError> {
        match expr {
            Expr::Variable(name) => {
                let symbol = self.symbols.lookup(name)?;
                let ty = match symbol.kind {
                    StorageKind::Scalar(t) => t.into(),
                    StorageKind::String => ExprType::String,
                    StorageKind::Array(_) => {
                        return Err(CodegenError::unsupported(format!(
                            "use of array '{}' as a value",
                            name
                        )))
                    }
                };
                self.emit(Instruction::PushG(symbol.offset));
                Ok(ty)
            }
            Expr::ArrayAccess { array, index } => {
                let symbol = self.symbols.lookup(array)?;
                match symbol.kind {
                    StorageKind::Array(info) => {
                        self.gen_element_address(symbol.offset, info, index)?;
                        self.emit(Instruction::LoadN);
                        Ok(info.element_type.into())
                    }
                    StorageKind::String => {
                        self.gen_string_position(symbol.offset, index)?;
                        self.emit(Instruction::CharAt);
                        Ok(ExprType::CharCode)
                    }
                    StorageKind::Scalar(t) => Err(CodegenError::unsupported(format!(
                        "indexing of {} variable '{}'",
                        t, array
                    ))),
                }
            }
            Expr::FunctionCall { name, args } => self.gen_function_call(name, args),
            Expr::BinaryOp { op, left, right } => {
                let left_type = self.gen_expr(left)?;
                let left_end = self.code.len();
                let right_type = self.gen_expr(right)?;

                let plan = plan_binary(*op, left_type, right_type)?;
                self.coerce_at(left_end, left_type, plan.left);
                let right_end = self.code.len();
                self.coerce_at(right_end, right_type, plan.right);
                for instruction in plan.ops {
                    self.emit(instruction);
                }
                Ok(plan.result)
            }
            Expr::UnaryOp { op, operand } => self.gen_unary(*op, operand),
            Expr::Number(Number::Integer(n)) => {
                self.emit(Instruction::PushI(*n));
                Ok(ExprType::Integer)
            }
            Expr::Number(Number::Real(x)) => {
                self.emit(Instruction::PushF(*x));
                Ok(ExprType::Real)
            }
            Expr::String(s) => {
                self.emit(Instruction::PushS(s.clone()));
                Ok(ExprType::String)
            }
            Expr::Char(c) => {
                self.emit(Instruction::PushS(c.to_string()));
                Ok(ExprType::Char)
            }
            Expr::Boolean(b) => {
                self.emit(Instruction::PushI(i64::from(*b)));
                Ok(ExprType::Boolean)
            }
        }
    }

    /// Apply `coercion` to an operand of type `ty` whose code ends at `end`
    pub(crate) fn coerce_at(&mut self, end: usize, ty: ExprType, coercion: Coercion) {
        let fix = match coercion {
            Coercion::Keep => return,
            Coercion::ToReal => vec![Instruction::ItoF],
            Coercion::ToCode if ty != ExprType::Char => return,
            Coercion::ToCode => {
                // A char constant is a lone `pushs`; push its code instead
                let constant = match end.checked_sub(1).and_then(|i| self.code.get(i)) {
                    Some(Instruction::PushS(text)) => {
                        let mut chars = text.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => Some(c),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                if let Some(c) = constant {
                    self.code[end - 1] = Instruction::PushI(i64::from(u32::from(c)));
                    return;
                }
                vec![Instruction::PushI(0), Instruction::CharAt]
            }
        };
        self.code.splice(end..end, fix);
    }

    fn gen_unary(&mut self, op: UnOp, operand: &Expr) -> Result<ExprType, CodegenError> {
        let operand_type = self.gen_expr(operand)?;
        let result = unary_type(op, operand_type)?;

        match op {
            UnOp::Plus => {}
            UnOp::Neg if operand_type == ExprType::Real => {
                self.emit(Instruction::PushF(-1.0));
                self.emit(Instruction::FMul);
            }
            UnOp::Neg => {
                self.coerce_at(self.code.len(), operand_type, Coercion::ToCode);
                self.emit(Instruction::Neg);
            }
            UnOp::Not => self.emit(Instruction::Not),
        }

        Ok(result)
    }

    /// Emit `value` converted for storage into a slot of type `target`
    pub(crate) fn gen_converted(
        &mut self,
        value: &Expr,
        target: ExprType,
        context: &str,
    ) -> Result<(), CodegenError> {
        let source = self.gen_expr(value)?;

        match (target, source) {
            (t, s) if t == s => {}
            (ExprType::Integer, ExprType::CharCode) | (ExprType::String, ExprType::Char) => {}
            (ExprType::Real, ExprType::Integer | ExprType::CharCode) => {
                self.emit(Instruction::ItoF)
            }
            (ExprType::Char, ExprType::CharCode) => self.emit(Instruction::Chr),
            _ => return Err(CodegenError::mismatch(context, target, source)),
        }

        Ok(())
    }

    /// Emit a condition for `if` / `while`
    pub(crate) fn gen_condition(&mut self, condition: &Expr, context: &str) -> Result<(), CodegenError> {
        let ty = self.gen_expr(condition)?;
        if !ty.is_integral() {
            return Err(CodegenError::mismatch(context, ExprType::Boolean, ty));
        }
        Ok(())
    }

    fn gen_index(&mut self, index: &Expr) -> Result<(), CodegenError> {
        let ty = self.gen_expr(index)?;
        if !ty.is_integral() {
            return Err(CodegenError::mismatch("array index", ExprType::Integer, ty));
        }
        Ok(())
    }

    /// Push the heap address and zero-based index of an array element
    pub(crate) fn gen_element_address(
        &mut self,
        offset: usize,
        info: ArrayInfo,
        index: &Expr,
    ) -> Result<(), CodegenError> {
        self.emit(Instruction::PushG(offset));
        self.gen_index(index)?;
        if info.lower_bound != 0 {
            self.emit(Instruction::PushI(info.lower_bound));
            self.emit(Instruction::Sub);
        }
        Ok(())
    }

    /// Push a string and the zero-based position of `s[index]`
    pub(crate) fn gen_string_position(&mut self, offset: usize, index: &Expr) -> Result<(), CodegenError> {
        self.emit(Instruction::PushG(offset));
        self.gen_index(index)?;
        self.emit(Instruction::PushI(1));
        self.emit(Instruction::Sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_arithmetic_uses_float_ops() {
        let plan = plan_binary(BinOp::Add, ExprType::Integer, ExprType::Real).unwrap();
        assert_eq!(plan.ops, vec![Instruction::FAdd]);
        assert_eq!(plan.left, Coercion::ToReal);
        assert_eq!(plan.right, Coercion::Keep);
        assert_eq!(plan.result, ExprType::Real);

        let plan = plan_binary(BinOp::Add, ExprType::Integer, ExprType::Integer).unwrap();
        assert_eq!(plan.ops, vec![Instruction::Add]);
        assert_eq!(plan.result, ExprType::Integer);
    }

    #[test]
    fn test_relations_yield_boolean() {
        let plan = plan_binary(BinOp::Ne, ExprType::Integer, ExprType::Integer).unwrap();
        assert_eq!(plan.ops, vec![Instruction::Equal, Instruction::Not]);
        assert_eq!(plan.result, ExprType::Boolean);

        let plan = plan_binary(BinOp::Eq, ExprType::String, ExprType::Char).unwrap();
        assert_eq!((plan.left, plan.right), (Coercion::Keep, Coercion::Keep));
    }

    #[test]
    fn test_char_and_code_meet_as_codes() {
        let plan = plan_binary(BinOp::Eq, ExprType::CharCode, ExprType::Char).unwrap();
        assert_eq!(plan.left, Coercion::Keep);
        assert_eq!(plan.right, Coercion::ToCode);

        let plan = plan_binary(BinOp::Lt, ExprType::Char, ExprType::Char).unwrap();
        assert_eq!((plan.left, plan.right), (Coercion::ToCode, Coercion::ToCode));
    }

    #[test]
    fn test_rejected_operand_types() {
        assert!(plan_binary(BinOp::Add, ExprType::String, ExprType::Integer).is_err());
        assert!(plan_binary(BinOp::Lt, ExprType::String, ExprType::String).is_err());
        assert!(plan_binary(BinOp::Mod, ExprType::Real, ExprType::Integer).is_err());
        assert!(plan_binary(BinOp::And, ExprType::Real, ExprType::Boolean).is_err());
        assert!(plan_binary(BinOp::Eq, ExprType::Array, ExprType::Integer).is_err());
    }

    #[test]
    fn test_logical_result_types() {
        let plan = plan_binary(BinOp::And, ExprType::Boolean, ExprType::Boolean).unwrap();
        assert_eq!(plan.result, ExprType::Boolean);
        let plan = plan_binary(BinOp::Or, ExprType::Integer, ExprType::Boolean).unwrap();
        assert_eq!(plan.result, ExprType::Integer);
    }

    fn body(source: &str) -> Vec<String> {
        let program = crate::parser::parse(source).unwrap();
        let mut generator = CodeGenerator::new();
        generator.generate(&program).unwrap();
        let code = generator.get_code();
        let lines: Vec<&str> = code.lines().collect();
        let start = lines.iter().position(|l| *l == "start").unwrap();
        lines[start + 1..lines.len() - 1].iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_coercions_follow_their_operand() {
        let decls = "program P; var i: integer; r: real; b: boolean; c: char;";

        let code = body(&format!("{} begin r := i * 2 + 0.5 end.", decls));
        assert_eq!(
            code,
            ["pushg 0", "pushi 2", "mul", "itof", "pushf 0.5", "fadd", "storeg 1"]
        );

        let code = body(&format!("{} begin b := c < 'z' end.", decls));
        assert_eq!(
            code,
            ["pushg 3", "pushi 0", "charat", "pushi 122", "inf", "storeg 2"]
        );

        let code = body(&format!("{} begin b := 'a' < c end.", decls));
        assert_eq!(
            code,
            ["pushi 97", "pushg 3", "pushi 0", "charat", "inf", "storeg 2"]
        );

        let code = body(&format!("{} begin r := -(i + 1.5) end.", decls));
        assert_eq!(
            code,
            ["pushg 0", "itof", "pushf 1.5", "fadd", "pushf -1.0", "fmul", "storeg 1"]
        );
    }

    #[test]
    fn test_long_operator_chain() {
        let terms = vec!["i"; 300].join(" + ");
        let code = body(&format!("program P; var i: integer; begin i := {} end.", terms));

        assert_eq!(code.len(), 300 + 299 + 1);
        assert_eq!(code.iter().filter(|l| *l == "add").count(), 299);
        assert_eq!(code.last().map(String::as_str), Some("storeg 0"));
    }

    #[test]
    fn test_unary_types() {
        assert_eq!(unary_type(UnOp::Neg, ExprType::Real), Ok(ExprType::Real));
        assert_eq!(unary_type(UnOp::Neg, ExprType::Char), Ok(ExprType::Integer));
        assert_eq!(unary_type(UnOp::Not, ExprType::Boolean), Ok(ExprType::Boolean));
        assert!(unary_type(UnOp::Not, ExprType::String).is_err());
    }
}
