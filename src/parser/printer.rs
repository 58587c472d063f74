//! AST printers
//!
//! - [`dump`]: indented tree, one node per line, using the same node labels
//!   as the graph visualizer.
//! - `Display for Program`: Pascal source text. Compound expressions are
//!   fully parenthesized, so printing a parsed program and parsing the
//!   result gives back the same tree. An `if` without `else` nested as the
//!   `then` branch of an `if` with `else` is wrapped in `begin ... end`.

use super::ast::*;
use super::graph::{render, GraphSink};
use std::fmt::{self, Write};

/// Render a numeric literal so that the lexer reads it back as the same kind
pub(crate) fn format_number(n: Number) -> String {
    match n {
        Number::Integer(i) => i.to_string(),
        Number::Real(x) => {
            let text = x.to_string();
            if text.contains('.') || text.contains('e') {
                text
            } else {
                format!("{}.0", text)
            }
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Collects rendered nodes with their depth below the root
#[derive(Default)]
struct Outline {
    lines: Vec<(String, usize)>,
}

impl GraphSink for Outline {
    fn add_node(&mut self, label: &str) -> usize {
        self.lines.push((label.to_string(), 0));
        self.lines.len() - 1
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        let depth = self.lines[from].1 + 1;
        self.lines[to].1 = depth;
    }
}

/// Indented tree dump of a program
pub fn dump(program: &Program) -> String {
    let mut outline = Outline::default();
    render(program, &mut outline);

    let mut out = String::new();
    for (label, depth) in &outline.lines {
        let _ = writeln!(out, "{}{}", "  ".repeat(*depth), label);
    }
    out
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "program {};", self.name)?;

        for section in &self.block.declarations {
            writeln!(f, "var")?;
            for decl in &section.declarations {
                writeln!(f, "  {}: {};", decl.names.join(", "), decl.type_spec)?;
            }
        }

        write_compound(f, &self.block.body, 0)?;
        writeln!(f, ".")
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Named(ty) => write!(f, "{}", ty.name),
            TypeSpec::Array(array) => write!(
                f,
                "array[{}..{}] of {}",
                array.range.lower, array.range.upper, array.element_type
            ),
        }
    }
}

fn write_compound(f: &mut fmt::Formatter<'_>, compound: &Compound, indent: usize) -> fmt::Result {
    writeln!(f, "begin")?;
    let count = compound.statements.len();
    for (i, statement) in compound.statements.iter().enumerate() {
        if !matches!(statement, Statement::NoOp) {
            write!(f, "{}", "  ".repeat(indent + 1))?;
            write_statement(f, statement, indent + 1)?;
        }
        if i + 1 < count {
            write!(f, ";")?;
        }
        writeln!(f)?;
    }
    write!(f, "{}end", "  ".repeat(indent))
}

/// Whether a following `else` would attach to an `if` inside `statement`
fn ends_with_open_if(statement: &Statement) -> bool {
    match statement {
        Statement::If { else_part: None, .. } => true,
        Statement::If {
            else_part: Some(else_part),
            ..
        } => ends_with_open_if(else_part),
        Statement::While { body, .. } | Statement::For { body, .. } => ends_with_open_if(body),
        _ => false,
    }
}

fn write_statement(f: &mut fmt::Formatter<'_>, statement: &Statement, indent: usize) -> fmt::Result {
    match statement {
        Statement::Compound(compound) => write_compound(f, compound, indent),
        Statement::Assignment { target, value } => write!(f, "{} := {}", target, value),
        Statement::ProcedureCall { name, args } => {
            write!(f, "{}", name)?;
            write_args(f, args)
        }
        Statement::If {
            condition,
            then_part,
            else_part,
        } => {
            write!(f, "if {} then ", condition)?;
            if else_part.is_some() && ends_with_open_if(then_part) {
                let wrapped = Compound {
                    statements: vec![then_part.as_ref().clone()],
                };
                write_compound(f, &wrapped, indent)?;
            } else {
                write_statement(f, then_part, indent)?;
            }
            if let Some(else_part) = else_part {
                write!(f, " else ")?;
                write_statement(f, else_part, indent)?;
            }
            Ok(())
        }
        Statement::While { condition, body } => {
            write!(f, "while {} do ", condition)?;
            write_statement(f, body, indent)
        }
        Statement::For {
            variable,
            start,
            direction,
            end,
            body,
        } => {
            write!(
                f,
                "for {} := {} {} {} do ",
                variable,
                start,
                direction.keyword(),
                end
            )?;
            write_statement(f, body, indent)
        }
        Statement::ReadlnAssignment { target: None } => write!(f, "readln"),
        Statement::ReadlnAssignment {
            target: Some(target),
        } => write!(f, "readln({})", target),
        Statement::NoOp => Ok(()),
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    write!(f, "(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    write!(f, ")")
}

impl fmt::Display for LValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LValue::Variable(name) => write!(f, "{}", name),
            LValue::ArrayAccess { array, index } => write!(f, "{}[{}]", array, index),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::ArrayAccess { array, index } => write!(f, "{}[{}]", array, index),
            Expr::FunctionCall { name, args } => {
                write!(f, "{}", name)?;
                write_args(f, args)
            }
            Expr::BinaryOp { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::UnaryOp { op: UnOp::Not, operand } => write!(f, "(not {})", operand),
            Expr::UnaryOp { op, operand } => write!(f, "({}{})", op.symbol(), operand),
            Expr::Number(n) => write!(f, "{}", format_number(*n)),
            Expr::String(s) => write!(f, "{}", quote(s)),
            Expr::Char(c) => write!(f, "{}", quote(&c.to_string())),
            Expr::Boolean(b) => write!(f, "{}", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::parse;

    const SAMPLE: &str = "
        program Sample;
        var i, n: integer; r: real;
        var s: string; v: array[1..5] of integer; ok: boolean;
        begin
            readln(n);
            readln(s, v[1]);
            readln;
            r := -2.5 * n + 3.0;
            ok := not (n > 3) or odd(n);
            for i := n downto 1 do
                if v[i] <> 0 then writeln('v = ', v[i]) else begin writeln('it''s zero'); end;
            while i < 10 do i := i + 1;
            s[1] := 'x';
            Foo
        end.
    ";

    #[test]
    fn test_source_round_trip() {
        let program = parse(SAMPLE).unwrap();
        let printed = program.to_string();
        let reparsed = parse(&printed).unwrap();

        assert_eq!(program, reparsed, "printed source:\n{}", printed);
    }

    #[test]
    fn test_else_stays_with_outer_if() {
        let mut program = parse("program P; var a, b: boolean; begin x := 0 end.").unwrap();
        let inner = Statement::If {
            condition: Expr::Variable("b".to_string()),
            then_part: Box::new(Statement::While {
                condition: Expr::Variable("a".to_string()),
                body: Box::new(Statement::If {
                    condition: Expr::Variable("b".to_string()),
                    then_part: Box::new(Statement::NoOp),
                    else_part: None,
                }),
            }),
            else_part: None,
        };
        let assign = program.block.body.statements[0].clone();
        program.block.body.statements[0] = Statement::If {
            condition: Expr::Variable("a".to_string()),
            then_part: Box::new(inner.clone()),
            else_part: Some(Box::new(assign.clone())),
        };

        let printed = program.to_string();
        let reparsed = parse(&printed).unwrap();
        match &reparsed.block.body.statements[0] {
            Statement::If {
                then_part,
                else_part,
                ..
            } => {
                assert_eq!(
                    then_part.as_ref(),
                    &Statement::Compound(Compound {
                        statements: vec![inner]
                    }),
                    "printed source:\n{}",
                    printed
                );
                assert_eq!(else_part.as_deref(), Some(&assign));
            }
            other => panic!("Expected if, got {:?}", other),
        }
        assert_eq!(reparsed.to_string(), printed);
    }

    #[test]
    fn test_expression_rendering() {
        let program = parse("program P; begin x := -a + b * 2.0 end.").unwrap();
        let text = program.to_string();

        assert!(text.contains("x := ((-a) + (b * 2.0))"), "{}", text);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(Number::Integer(42)), "42");
        assert_eq!(format_number(Number::Real(3.0)), "3.0");
        assert_eq!(format_number(Number::Real(0.25)), "0.25");
    }

    #[test]
    fn test_dump_indents_children() {
        let program = parse("program D; begin x := 1 end.").unwrap();
        let text = dump(&program);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Program: D",
                "  Block",
                "    Compound",
                "      Assignment",
                "        Variable: x",
                "        Number: 1",
            ]
        );
    }
}
