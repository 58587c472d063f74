//! AST visualizer
//!
//! [`render`] walks a [`Program`] and describes it as labelled nodes and
//! parent → child edges on a [`GraphSink`]. The sink decides what to do with
//! them: [`DotGraph`] produces Graphviz text, and the tree dump in
//! [`super::printer`] indents them.

use super::ast::*;
use super::printer::format_number;
use std::fmt;

/// Drawing context for [`render`]
pub trait GraphSink {
    /// Add a node and return its id
    fn add_node(&mut self, label: &str) -> usize;

    /// Connect a parent node to a child node
    fn add_edge(&mut self, from: usize, to: usize);
}

/// Graphviz `digraph` built from a rendered AST
#[derive(Debug, Default, Clone)]
pub struct DotGraph {
    nodes: Vec<String>,
    edges: Vec<(usize, usize)>,
}

impl DotGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl GraphSink for DotGraph {
    fn add_node(&mut self, label: &str) -> usize {
        self.nodes.push(label.to_string());
        self.nodes.len() - 1
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        self.edges.push((from, to));
    }
}

impl fmt::Display for DotGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph AST {{")?;
        for (id, label) in self.nodes.iter().enumerate() {
            let escaped = label.replace('\\', "\\\\").replace('"', "\\\"");
            writeln!(f, "    n{} [label=\"{}\"];", id, escaped)?;
        }
        for (from, to) in &self.edges {
            writeln!(f, "    n{} -> n{};", from, to)?;
        }
        writeln!(f, "}}")
    }
}

/// Render `program` onto `sink`, returning the id of the root node
pub fn render<S: GraphSink>(program: &Program, sink: &mut S) -> usize {
    let mut renderer = Renderer { sink };
    renderer.program(program)
}

struct Renderer<'a, S: GraphSink> {
    sink: &'a mut S,
}

impl<S: GraphSink> Renderer<'_, S> {
    fn child(&mut self, parent: usize, label: &str) -> usize {
        let id = self.sink.add_node(label);
        self.sink.add_edge(parent, id);
        id
    }

    fn program(&mut self, program: &Program) -> usize {
        let root = self.sink.add_node(&format!("Program: {}", program.name));
        let block = self.child(root, "Block");

        for section in &program.block.declarations {
            let section_id = self.child(block, "VarDeclarations");
            for decl in &section.declarations {
                let decl_id = self.child(
                    section_id,
                    &format!("VarDeclaration: {}", decl.names.join(", ")),
                );
                self.type_spec(decl_id, &decl.type_spec);
            }
        }

        self.compound(block, &program.block.body);
        root
    }

    fn type_spec(&mut self, parent: usize, type_spec: &TypeSpec) {
        match type_spec {
            TypeSpec::Named(ty) => {
                self.child(parent, &format!("Type: {}", ty.name));
            }
            TypeSpec::Array(array) => {
                let id = self.child(parent, "ArrayType");
                let range = self.child(id, "IndexRange");
                self.expr(range, &array.range.lower);
                self.expr(range, &array.range.upper);
                self.type_spec(id, &array.element_type);
            }
        }
    }

    fn compound(&mut self, parent: usize, compound: &Compound) {
        let id = self.child(parent, "Compound");
        for statement in &compound.statements {
            self.statement(id, statement);
        }
    }

    fn statement(&mut self, parent: usize, statement: &Statement) {
        match statement {
            Statement::Compound(compound) => self.compound(parent, compound),
            Statement::Assignment { target, value } => {
                let id = self.child(parent, "Assignment");
                self.lvalue(id, target);
                self.expr(id, value);
            }
            Statement::ProcedureCall { name, args } => {
                let id = self.child(parent, &format!("ProcedureCall: {}", name));
                for arg in args {
                    self.expr(id, arg);
                }
            }
            Statement::If {
                condition,
                then_part,
                else_part,
            } => {
                let id = self.child(parent, "IfStatement");
                let cond = self.child(id, "Condition");
                self.expr(cond, condition);
                let then_id = self.child(id, "Then");
                self.statement(then_id, then_part);
                if let Some(else_part) = else_part {
                    let else_id = self.child(id, "Else");
                    self.statement(else_id, else_part);
                }
            }
            Statement::While { condition, body } => {
                let id = self.child(parent, "WhileStatement");
                let cond = self.child(id, "Condition");
                self.expr(cond, condition);
                let body_id = self.child(id, "Body");
                self.statement(body_id, body);
            }
            Statement::For {
                variable,
                start,
                direction,
                end,
                body,
            } => {
                let id = self.child(
                    parent,
                    &format!("ForStatement: {} ({})", variable, direction.keyword()),
                );
                let start_id = self.child(id, "Start");
                self.expr(start_id, start);
                let end_id = self.child(id, "End");
                self.expr(end_id, end);
                let body_id = self.child(id, "Body");
                self.statement(body_id, body);
            }
            Statement::ReadlnAssignment { target } => {
                let id = self.child(parent, "Readln");
                if let Some(target) = target {
                    self.lvalue(id, target);
                }
            }
            Statement::NoOp => {
                self.child(parent, "NoOp");
            }
        }
    }

    fn lvalue(&mut self, parent: usize, lvalue: &LValue) {
        match lvalue {
            LValue::Variable(name) => {
                self.child(parent, &format!("Variable: {}", name));
            }
            LValue::ArrayAccess { array, index } => {
                let id = self.child(parent, &format!("ArrayAccess: {}", array));
                self.expr(id, index);
            }
        }
    }

    fn expr(&mut self, parent: usize, expr: &Expr) {
        match expr {
            Expr::Variable(name) => {
                self.child(parent, &format!("Variable: {}", name));
            }
            Expr::ArrayAccess { array, index } => {
                let id = self.child(parent, &format!("ArrayAccess: {}", array));
                self.expr(id, index);
            }
            Expr::FunctionCall { name, args } => {
                let id = self.child(parent, &format!("FunctionCall: {}", name));
                for arg in args {
                    self.expr(id, arg);
                }
            }
            Expr::BinaryOp { op, left, right } => {
                let id = self.child(parent, &format!("BinaryOp: {}", op.symbol()));
                self.expr(id, left);
                self.expr(id, right);
            }
            Expr::UnaryOp { op, operand } => {
                let id = self.child(parent, &format!("UnaryOp: {}", op.symbol()));
                self.expr(id, operand);
            }
            Expr::Number(n) => {
                self.child(parent, &format!("Number: {}", format_number(*n)));
            }
            Expr::String(s) => {
                self.child(parent, &format!("String: '{}'", s));
            }
            Expr::Char(c) => {
                self.child(parent, &format!("Char: '{}'", c));
            }
            Expr::Boolean(b) => {
                self.child(parent, &format!("Boolean: {}", b));
            }
        }
    }
}
