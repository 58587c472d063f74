// Code generation context: declarations, statements and control flow

use super::errors::CodegenError;
use super::expressions::ExprType;
use super::instruction::Instruction;
use super::symbols::{ArrayInfo, ScalarType, StorageKind, SymbolTable};
use crate::parser::ast::*;
use tracing::{debug, trace};

/// Generation context for one compilation
///
/// Created fresh per program. Code is only ever appended.
#[derive(Debug, Default)]
pub struct CodeGenerator {
    /// Emitted instructions, in order
    pub(crate) code: Vec<Instruction>,

    /// Next label id; each `if` / `while` / `for` / `abs` takes one
    pub(crate) label_count: usize,

    /// Global variables
    pub(crate) symbols: SymbolTable,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower a whole program: declarations, `start`, body, `stop`
    pub fn generate(&mut self, program: &Program) -> Result<(), CodegenError> {
        if !self.code.is_empty() {
            return Err(CodegenError::Internal(
                "code generator used for more than one program".to_string(),
            ));
        }

        for section in &program.block.declarations {
            self.gen_var_declarations(section)?;
        }

        self.emit(Instruction::Start);
        self.gen_compound(&program.block.body)?;
        self.emit(Instruction::Stop);

        debug!(
            program = %program.name,
            globals = self.symbols.len(),
            instructions = self.code.len(),
            "generated code"
        );
        Ok(())
    }

    pub(crate) fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    /// Take a fresh label id
    pub(crate) fn next_label(&mut self) -> usize {
        let id = self.label_count;
        self.label_count += 1;
        id
    }

    /// The listing as text, one instruction per line
    pub fn get_code(&self) -> String {
        self.code
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.code
    }

    // ===== Declarations =====

    fn gen_var_declarations(&mut self, section: &VarDeclarations) -> Result<(), CodegenError> {
        for decl in &section.declarations {
            for name in &decl.names {
                let kind = self.resolve_storage(name, &decl.type_spec)?;
                let symbol = self.symbols.declare(name, kind)?;
                trace!(name = %name, offset = symbol.offset, "declared variable");

                match kind {
                    StorageKind::Scalar(ScalarType::Integer | ScalarType::Boolean) => {
                        self.emit(Instruction::PushI(0));
                    }
                    StorageKind::Scalar(ScalarType::Real) => self.emit(Instruction::PushF(0.0)),
                    StorageKind::Scalar(ScalarType::Char) => {
                        self.emit(Instruction::PushS("\0".to_string()))
                    }
                    StorageKind::String => self.emit(Instruction::PushS(String::new())),
                    StorageKind::Array(info) => {
                        self.emit(Instruction::PushI(info.size));
                        self.emit(Instruction::AllocN);
                    }
                }
                self.emit(Instruction::StoreG(symbol.offset));
            }
        }
        Ok(())
    }

    fn resolve_storage(&self, name: &str, type_spec: &TypeSpec) -> Result<StorageKind, CodegenError> {
        match type_spec {
            TypeSpec::Named(ty) => {
                if let Some(scalar) = ScalarType::from_name(&ty.name) {
                    Ok(StorageKind::Scalar(scalar))
                } else if ty.name.eq_ignore_ascii_case("string") {
                    Ok(StorageKind::String)
                } else {
                    Err(CodegenError::unsupported(format!("type '{}'", ty.name)))
                }
            }
            TypeSpec::Array(array) => {
                let element_type = match array.element_type.as_ref() {
                    TypeSpec::Named(ty) => ScalarType::from_name(&ty.name).ok_or_else(|| {
                        CodegenError::unsupported(format!("array of '{}'", ty.name))
                    })?,
                    TypeSpec::Array(_) => {
                        return Err(CodegenError::unsupported("array of arrays"));
                    }
                };

                let bound = |expr: &Expr| {
                    const_eval(expr).ok_or_else(|| CodegenError::InvalidArrayBounds {
                        name: name.to_string(),
                        reason: format!("'{}' is not an integer constant", expr),
                    })
                };
                let lower = bound(&array.range.lower)?;
                let upper = bound(&array.range.upper)?;

                if upper < lower {
                    return Err(CodegenError::InvalidArrayBounds {
                        name: name.to_string(),
                        reason: format!("upper bound {} is below lower bound {}", upper, lower),
                    });
                }
                let size = upper
                    .checked_sub(lower)
                    .and_then(|d| d.checked_add(1))
                    .ok_or_else(|| CodegenError::InvalidArrayBounds {
                        name: name.to_string(),
                        reason: "array is too large".to_string(),
                    })?;

                Ok(StorageKind::Array(ArrayInfo {
                    lower_bound: lower,
                    size,
                    element_type,
                }))
            }
        }
    }

    // ===== Statements =====

    fn gen_compound(&mut self, compound: &Compound) -> Result<(), CodegenError> {
        for statement in &compound.statements {
            self.gen_statement(statement)?;
        }
        Ok(())
    }

    fn gen_statement(&mut self, statement: &Statement) -> Result<(), CodegenError> {
        match statement {
            Statement::Compound(compound) => self.gen_compound(compound),
            Statement::Assignment { target, value } => self.gen_assignment(target, value),
            Statement::ProcedureCall { name, args } => self.gen_procedure_call(name, args),
            Statement::If {
                condition,
                then_part,
                else_part,
            } => self.gen_if(condition, then_part, else_part.as_deref()),
            Statement::While { condition, body } => self.gen_while(condition, body),
            Statement::For {
                variable,
                start,
                direction,
                end,
                body,
            } => self.gen_for(variable, start, *direction, end, body),
            Statement::ReadlnAssignment { target } => self.gen_readln(target.as_ref()),
            Statement::NoOp => Ok(()),
        }
    }

    fn gen_assignment(&mut self, target: &LValue, value: &Expr) -> Result<(), CodegenError> {
        match target {
            LValue::Variable(name) => {
                let symbol = self.symbols.lookup(name)?;
                let target_type = match symbol.kind {
                    StorageKind::Scalar(t) => ExprType::from(t),
                    StorageKind::String => ExprType::String,
                    StorageKind::Array(_) => {
                        return Err(CodegenError::unsupported(format!(
                            "assignment to whole array '{}'",
                            name
                        )))
                    }
                };
                self.gen_converted(value, target_type, "assignment")?;
                self.emit(Instruction::StoreG(symbol.offset));
            }
            LValue::ArrayAccess { array, index } => {
                let symbol = self.symbols.lookup(array)?;
                match symbol.kind {
                    StorageKind::Array(info) => {
                        self.gen_element_address(symbol.offset, info, index)?;
                        self.gen_converted(value, info.element_type.into(), "assignment")?;
                        self.emit(Instruction::StoreN);
                    }
                    StorageKind::String => {
                        self.gen_string_position(symbol.offset, index)?;
                        match self.gen_expr(value)? {
                            ExprType::Char => {}
                            t if t.is_integral() && t != ExprType::Boolean => {
                                self.emit(Instruction::Chr)
                            }
                            t => {
                                return Err(CodegenError::mismatch(
                                    "string element assignment",
                                    ExprType::Char,
                                    t,
                                ))
                            }
                        }
                        self.emit(Instruction::SetCharAt);
                        self.emit(Instruction::StoreG(symbol.offset));
                    }
                    StorageKind::Scalar(t) => {
                        return Err(CodegenError::unsupported(format!(
                            "indexing of {} variable '{}'",
                            t, array
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    fn gen_if(
        &mut self,
        condition: &Expr,
        then_part: &Statement,
        else_part: Option<&Statement>,
    ) -> Result<(), CodegenError> {
        let id = self.next_label();
        let else_label = format!("ELSE{}", id);
        let end_label = format!("ENDIF{}", id);

        self.gen_condition(condition, "if condition")?;
        self.emit(Instruction::Jz(else_label.clone()));
        self.gen_statement(then_part)?;
        self.emit(Instruction::Jump(end_label.clone()));
        self.emit(Instruction::Label(else_label));
        if let Some(else_part) = else_part {
            self.gen_statement(else_part)?;
        }
        self.emit(Instruction::Label(end_label));
        Ok(())
    }

    fn gen_while(&mut self, condition: &Expr, body: &Statement) -> Result<(), CodegenError> {
        let id = self.next_label();
        let start_label = format!("WHILE{}", id);
        let end_label = format!("ENDWHILE{}", id);

        self.emit(Instruction::Label(start_label.clone()));
        self.gen_condition(condition, "while condition")?;
        self.emit(Instruction::Jz(end_label.clone()));
        self.gen_statement(body)?;
        self.emit(Instruction::Jump(start_label));
        self.emit(Instruction::Label(end_label));
        Ok(())
    }

    fn gen_for(
        &mut self,
        variable: &str,
        start: &Expr,
        direction: Direction,
        end: &Expr,
        body: &Statement,
    ) -> Result<(), CodegenError> {
        let symbol = self.symbols.lookup(variable)?;
        if symbol.kind != StorageKind::Scalar(ScalarType::Integer) {
            let actual = match symbol.kind {
                StorageKind::Scalar(t) => ExprType::from(t),
                StorageKind::String => ExprType::String,
                StorageKind::Array(_) => ExprType::Array,
            };
            return Err(CodegenError::mismatch("for loop variable", ExprType::Integer, actual));
        }

        let id = self.next_label();
        let start_label = format!("FOR{}", id);
        let end_label = format!("ENDFOR{}", id);

        self.gen_converted(start, ExprType::Integer, "for loop start")?;
        self.emit(Instruction::StoreG(symbol.offset));

        self.emit(Instruction::Label(start_label.clone()));
        self.emit(Instruction::PushG(symbol.offset));
        self.gen_converted(end, ExprType::Integer, "for loop bound")?;
        self.emit(match direction {
            Direction::To => Instruction::InfEq,
            Direction::DownTo => Instruction::SupEq,
        });
        self.emit(Instruction::Jz(end_label.clone()));

        self.gen_statement(body)?;

        self.emit(Instruction::PushG(symbol.offset));
        self.emit(Instruction::PushI(1));
        self.emit(match direction {
            Direction::To => Instruction::Add,
            Direction::DownTo => Instruction::Sub,
        });
        self.emit(Instruction::StoreG(symbol.offset));
        self.emit(Instruction::Jump(start_label));
        self.emit(Instruction::Label(end_label));
        Ok(())
    }
}

/// Fold an integer constant expression (array bounds)
pub(crate) fn const_eval(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Number(Number::Integer(n)) => Some(*n),
        Expr::UnaryOp {
            op: UnOp::Plus,
            operand,
        } => const_eval(operand),
        Expr::UnaryOp {
            op: UnOp::Neg,
            operand,
        } => const_eval(operand)?.checked_neg(),
        Expr::BinaryOp { op, left, right } => {
            let (l, r) = (const_eval(left)?, const_eval(right)?);
            match op {
                BinOp::Add => l.checked_add(r),
                BinOp::Sub => l.checked_sub(r),
                BinOp::Mul => l.checked_mul(r),
                BinOp::IntDiv => l.checked_div(r),
                BinOp::Mod => l.checked_rem(r),
                _ => None,
            }
        }
        _ => None,
    }
}
