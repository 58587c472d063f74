//! Built-in procedures and functions
//!
//! - Procedures: `write`, `writeln`, `read`, `readln`
//! - Functions: `abs chr length odd ord pred sqr sqrt succ`, one argument each
//!
//! Each function lowers to a fixed instruction template after its argument.
//! `abs` is the only one that needs a label.

use super::errors::CodegenError;
use super::expressions::{Coercion, ExprType};
use super::instruction::Instruction;
use super::symbols::{ScalarType, StorageKind};
use super::CodeGenerator;
use crate::parser::ast::*;

impl CodeGenerator {
    pub(crate) fn gen_procedure_call(&mut self, name: &str, args: &[Expr]) -> Result<(), CodegenError> {
        match name {
            "write" => self.gen_write(args, false),
            "writeln" => self.gen_write(args, true),
            "read" | "readln" => {
                if args.is_empty() {
                    return self.gen_readln(None);
                }
                for arg in args {
                    let target = LValue::from_expr(arg).ok_or_else(|| {
                        CodegenError::unsupported(format!("{} of '{}'", name, arg))
                    })?;
                    self.gen_readln(Some(&target))?;
                }
                Ok(())
            }
            _ => Err(CodegenError::unsupported(format!(
                "call to procedure '{}'",
                name
            ))),
        }
    }

    fn gen_write(&mut self, args: &[Expr], newline: bool) -> Result<(), CodegenError> {
        for arg in args {
            let instruction = match self.gen_expr(arg)? {
                ExprType::String | ExprType::Char => Instruction::WriteS,
                ExprType::CharCode => Instruction::WriteChr,
                ExprType::Real => Instruction::WriteF,
                ExprType::Integer | ExprType::Boolean => Instruction::WriteI,
                ExprType::Array => {
                    return Err(CodegenError::unsupported(format!("write of array '{}'", arg)))
                }
            };
            self.emit(instruction);
        }

        if newline {
            self.emit(Instruction::WriteLn);
        }
        Ok(())
    }

    /// Convert the string left by `read` for a slot of type `scalar`
    fn emit_input_conversion(&mut self, scalar: ScalarType) {
        match scalar {
            ScalarType::Integer | ScalarType::Boolean => self.emit(Instruction::AtoI),
            ScalarType::Real => self.emit(Instruction::AtoF),
            ScalarType::Char => {
                self.emit(Instruction::PushI(0));
                self.emit(Instruction::CharAt);
                self.emit(Instruction::Chr);
            }
        }
    }

    /// Read one input line into `target`, or discard it
    pub(crate) fn gen_readln(&mut self, target: Option<&LValue>) -> Result<(), CodegenError> {
        let Some(target) = target else {
            self.emit(Instruction::Read);
            self.emit(Instruction::Pop(1));
            return Ok(());
        };

        let symbol = self.symbols.lookup(target.name())?;
        match (target, symbol.kind) {
            (LValue::Variable(_), StorageKind::Scalar(scalar)) => {
                self.emit(Instruction::Read);
                self.emit_input_conversion(scalar);
                self.emit(Instruction::StoreG(symbol.offset));
            }
            (LValue::Variable(_), StorageKind::String) => {
                self.emit(Instruction::Read);
                self.emit(Instruction::StoreG(symbol.offset));
            }
            (LValue::ArrayAccess { index, .. }, StorageKind::Array(info)) => {
                self.gen_element_address(symbol.offset, info, index)?;
                self.emit(Instruction::Read);
                self.emit_input_conversion(info.element_type);
                self.emit(Instruction::StoreN);
            }
            (LValue::ArrayAccess { index, .. }, StorageKind::String) => {
                self.gen_string_position(symbol.offset, index)?;
                self.emit(Instruction::Read);
                self.emit(Instruction::SetCharAt);
                self.emit(Instruction::StoreG(symbol.offset));
            }
            (LValue::Variable(name), StorageKind::Array(_)) => {
                return Err(CodegenError::unsupported(format!(
                    "readln into whole array '{}'",
                    name
                )))
            }
            (LValue::ArrayAccess { array, .. }, StorageKind::Scalar(t)) => {
                return Err(CodegenError::unsupported(format!(
                    "indexing of {} variable '{}'",
                    t, array
                )))
            }
        }
        Ok(())
    }

    /// Built-in functions take exactly one argument
    pub(crate) fn single_argument<'e>(name: &str, args: &'e [Expr]) -> Result<&'e Expr, CodegenError> {
        match args {
            [arg] => Ok(arg),
            _ => Err(CodegenError::unsupported(format!(
                "'{}' with {} arguments",
                name,
                args.len()
            ))),
        }
    }

    /// Result type of built-in `name` applied to an argument of type `arg`
    pub(crate) fn builtin_result(name: &str, arg: ExprType) -> Result<ExprType, CodegenError> {
        let numeric = arg.is_integral() || arg == ExprType::Real;
        let ordinal = arg.is_integral() || arg == ExprType::Char;
        let mismatch = |expected: ExprType| CodegenError::mismatch(name, expected, arg);

        match name {
            "length" => match arg {
                ExprType::String | ExprType::Char | ExprType::Array => Ok(ExprType::Integer),
                _ => Err(CodegenError::unsupported(format!("length of {}", arg))),
            },
            "chr" if arg.is_integral() => Ok(ExprType::Char),
            "chr" => Err(mismatch(ExprType::Integer)),
            "ord" if ordinal => Ok(ExprType::Integer),
            "ord" => Err(mismatch(ExprType::Char)),
            "pred" | "succ" if matches!(arg, ExprType::Char | ExprType::CharCode) => {
                Ok(ExprType::CharCode)
            }
            "pred" | "succ" if ordinal => Ok(ExprType::Integer),
            "pred" | "succ" => Err(mismatch(ExprType::Integer)),
            "abs" | "sqr" if arg == ExprType::Real => Ok(ExprType::Real),
            "abs" | "sqr" if numeric => Ok(ExprType::Integer),
            "abs" | "sqr" => Err(mismatch(ExprType::Integer)),
            "odd" if arg.is_integral() => Ok(ExprType::Boolean),
            "odd" => Err(mismatch(ExprType::Integer)),
            "sqrt" if numeric => Ok(ExprType::Real),
            "sqrt" => Err(mismatch(ExprType::Real)),
            _ => Err(CodegenError::unsupported(format!("function '{}'", name))),
        }
    }

    pub(crate) fn gen_function_call(&mut self, name: &str, args: &[Expr]) -> Result<ExprType, CodegenError> {
        let arg = Self::single_argument(name, args)?;

        // The length of an array is its declared size
        if let ("length", Expr::Variable(array)) = (name, arg) {
            if let StorageKind::Array(info) = self.symbols.lookup(array)?.kind {
                self.emit(Instruction::PushI(info.size));
                return Ok(ExprType::Integer);
            }
        }

        let skip_label = (name == "abs").then(|| format!("ABSSKIPNEG{}", self.next_label()));
        let arg_type = self.gen_expr(arg)?;
        let result = Self::builtin_result(name, arg_type)?;

        match name {
            "length" => self.emit(Instruction::StrLen),
            "chr" => self.emit(Instruction::Chr),
            "ord" => self.coerce_at(self.code.len(), arg_type, Coercion::ToCode),
            "pred" | "succ" => {
                self.coerce_at(self.code.len(), arg_type, Coercion::ToCode);
                self.emit(Instruction::PushI(1));
                self.emit(if name == "pred" {
                    Instruction::Sub
                } else {
                    Instruction::Add
                });
            }
            "abs" => {
                let skip_label = skip_label
                    .ok_or_else(|| CodegenError::Internal("abs without a label".to_string()))?;
                self.emit(Instruction::Dup(1));
                self.emit(if result == ExprType::Real {
                    Instruction::PushF(0.0)
                } else {
                    Instruction::PushI(0)
                });
                self.emit(Instruction::Inf);
                self.emit(Instruction::Jz(skip_label.clone()));
                self.emit(Instruction::Neg);
                self.emit(Instruction::Label(skip_label));
            }
            "odd" => {
                self.emit(Instruction::PushI(2));
                self.emit(Instruction::Mod);
                self.emit(Instruction::PushI(0));
                self.emit(Instruction::Equal);
                self.emit(Instruction::Not);
            }
            "sqr" => {
                self.emit(Instruction::Dup(1));
                self.emit(if result == ExprType::Real {
                    Instruction::FMul
                } else {
                    Instruction::Mul
                });
            }
            "sqrt" => {
                if arg_type != ExprType::Real {
                    self.emit(Instruction::ItoF);
                }
                self.emit(Instruction::FSqrt);
            }
            _ => return Err(CodegenError::unsupported(format!("function '{}'", name))),
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    /// Instructions emitted for the body only
    fn body(source: &str) -> Result<Vec<String>, CodegenError> {
        let program = parse(source).unwrap();
        let mut generator = CodeGenerator::new();
        generator.generate(&program)?;
        let code = generator.get_code();
        let lines: Vec<String> = code.lines().map(str::to_string).collect();
        let start = lines.iter().position(|l| l == "start").unwrap();
        Ok(lines[start + 1..lines.len() - 1].to_vec())
    }

    #[test]
    fn test_writeln_is_type_directed() {
        let code = body(
            "program P; var r: real; s: string; c: char; b: boolean;
             begin writeln('n=', 5, r, s, c, s[1], b) end.",
        )
        .unwrap();
        assert_eq!(
            code,
            [
                r#"pushs "n=""#, "writes", "pushi 5", "writei", "pushg 0", "writef", "pushg 1",
                "writes", "pushg 2", "writes", "pushg 1", "pushi 1", "pushi 1", "sub", "charat",
                "writechr", "pushg 3", "writei", "writeln",
            ]
        );
    }

    #[test]
    fn test_write_without_newline() {
        assert_eq!(body("program P; begin write(1) end.").unwrap(), ["pushi 1", "writei"]);
        assert_eq!(body("program P; begin writeln end.").unwrap(), ["writeln"]);
    }

    #[test]
    fn test_readln_targets() {
        let code = body(
            "program P; var n: integer; r: real; s: string; v: array[1..3] of integer;
             begin readln(n); readln(r); readln(s); readln(v[2]); readln end.",
        )
        .unwrap();
        assert_eq!(
            code,
            [
                "read", "atoi", "storeg 0", "read", "atof", "storeg 1", "read", "storeg 2",
                "pushg 3", "pushi 2", "pushi 1", "sub", "read", "atoi", "storen", "read", "pop 1",
            ]
        );
    }

    #[test]
    fn test_read_behaves_like_readln() {
        let code = body("program P; var a, b: integer; begin read(a, b) end.").unwrap();
        assert_eq!(code, ["read", "atoi", "storeg 0", "read", "atoi", "storeg 1"]);
    }

    #[test]
    fn test_readln_into_char_keeps_first_character() {
        let code = body("program P; var c: char; begin readln(c) end.").unwrap();
        assert_eq!(code, ["read", "pushi 0", "charat", "chr", "storeg 0"]);
    }

    #[test]
    fn test_abs_template() {
        let code = body("program P; var x: integer; begin x := abs(x) end.").unwrap();
        assert_eq!(
            code,
            [
                "pushg 0", "dup 1", "pushi 0", "inf", "jz ABSSKIPNEG0", "neg", "ABSSKIPNEG0:",
                "storeg 0",
            ]
        );
    }

    #[test]
    fn test_function_templates() {
        let code = body(
            "program P; var x: integer; b: boolean; r: real;
             begin b := odd(x); x := sqr(x); r := sqrt(x); x := succ(x); x := pred(x) end.",
        )
        .unwrap();
        assert_eq!(
            code,
            [
                "pushg 0", "pushi 2", "mod", "pushi 0", "equal", "not", "storeg 1", "pushg 0",
                "dup 1", "mul", "storeg 0", "pushg 0", "itof", "fsqrt", "storeg 2", "pushg 0",
                "pushi 1", "add", "storeg 0", "pushg 0", "pushi 1", "sub", "storeg 0",
            ]
        );
    }

    #[test]
    fn test_chr_and_ord() {
        let code = body("program P; var c: char; n: integer; begin c := chr(65); n := ord(c); n := ord('A') end.")
            .unwrap();
        assert_eq!(
            code,
            [
                "pushi 65", "chr", "storeg 0", "pushg 0", "pushi 0", "charat", "storeg 1",
                "pushi 65", "storeg 1",
            ]
        );
    }

    #[test]
    fn test_length() {
        let code = body(
            "program P; var s: string; v: array[1..7] of integer; n: integer;
             begin n := length(s); n := length(v) end.",
        )
        .unwrap();
        assert_eq!(code, ["pushg 0", "strlen", "storeg 2", "pushi 7", "storeg 2"]);
    }

    #[test]
    fn test_length_of_integer_unsupported() {
        let err = body("program P; var n: integer; begin n := length(n) end.").unwrap_err();
        assert!(matches!(err, CodegenError::Unsupported(_)));
    }

    #[test]
    fn test_builtin_arity() {
        let err = body("program P; var n: integer; begin n := abs(n, n) end.").unwrap_err();
        assert!(matches!(err, CodegenError::Unsupported(_)));
    }

    #[test]
    fn test_user_procedure_unsupported() {
        let err = body("program P; begin Foo end.").unwrap_err();
        assert_eq!(
            err,
            CodegenError::Unsupported("call to procedure 'Foo'".to_string())
        );
    }
}
