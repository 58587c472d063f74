// Execution engine for the stack machine

use super::errors::VmError;
use super::heap::{Heap, StringHeap};
use super::terminal::Terminal;
use super::value::{StrRef, Value};
use crate::codegen::instruction::Instruction;
use crate::parser::ast::Number;
use crate::parser::printer::format_number;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Default bound on executed instructions
pub const DEFAULT_STEP_LIMIT: u64 = 50_000_000;

/// Number of global slots a program may use
pub const MAX_GLOBALS: usize = 1 << 20;

/// What to do after an instruction
enum Flow {
    Next,
    Jump(usize),
    Halt,
}

/// Stack machine running one instruction listing
pub struct Machine {
    /// Loaded program
    program: Vec<Instruction>,

    /// Label name -> instruction index
    labels: FxHashMap<String, usize>,

    /// Index of the instruction being executed
    pc: usize,

    /// Operand stack
    stack: Vec<Value>,

    /// Global slots; `None` until first stored
    globals: Vec<Option<Value>>,

    /// Cell blocks from `allocn`
    heap: Heap,

    /// All strings created by the program
    strings: StringHeap,

    /// Captured output
    terminal: Terminal,

    /// Remaining input lines for `read`
    input: VecDeque<String>,

    /// Instructions executed so far
    steps: u64,

    /// Maximum instructions before giving up
    step_limit: u64,

    /// Whether `stop` was reached
    halted: bool,
}

fn char_from_code(code: i64) -> Option<char> {
    u32::try_from(code).ok().and_then(char::from_u32)
}

impl Machine {
    /// Load a program, resolving every label
    pub fn new(program: Vec<Instruction>) -> Result<Self, VmError> {
        let mut labels = FxHashMap::default();
        for (index, instruction) in program.iter().enumerate() {
            if let Instruction::Label(name) = instruction {
                if labels.insert(name.clone(), index).is_some() {
                    return Err(VmError::DuplicateLabel(name.clone()));
                }
            }
        }

        for instruction in &program {
            if let Instruction::Jz(target) | Instruction::Jump(target) = instruction {
                if !labels.contains_key(target) {
                    return Err(VmError::UnknownLabel(target.clone()));
                }
            }
        }

        Ok(Machine {
            program,
            labels,
            pc: 0,
            stack: Vec::new(),
            globals: Vec::new(),
            heap: Heap::default(),
            strings: StringHeap::default(),
            terminal: Terminal::new(),
            input: VecDeque::new(),
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
            halted: false,
        })
    }

    /// Load a textual listing, one instruction per line
    pub fn from_source(listing: &str) -> Result<Self, VmError> {
        let mut program = Vec::new();
        for (index, line) in listing.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let instruction = line.parse().map_err(|source| VmError::Parse {
                line: index + 1,
                source,
            })?;
            program.push(instruction);
        }
        Self::new(program)
    }

    /// Supply the lines `read` will return, in order
    pub fn with_input<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    /// Bound the number of distinct strings the program may create
    pub fn with_string_limit(mut self, limit: usize) -> Self {
        self.strings = StringHeap::new(limit);
        self
    }

    /// Run until `stop` or the end of the program
    pub fn run(&mut self) -> Result<(), VmError> {
        while self.step()? {}
        debug!(
            steps = self.steps,
            heap_cells = self.heap.total_cells(),
            strings = self.strings.len(),
            "machine halted"
        );
        Ok(())
    }

    /// Execute one instruction. Returns `false` once the machine has halted.
    pub fn step(&mut self) -> Result<bool, VmError> {
        if self.halted {
            return Ok(false);
        }
        let Some(instruction) = self.program.get(self.pc).cloned() else {
            self.halted = true;
            return Ok(false);
        };
        if self.steps >= self.step_limit {
            return Err(VmError::StepLimitExceeded(self.step_limit));
        }
        self.steps += 1;
        trace!(pc = self.pc, %instruction, depth = self.stack.len(), "step");

        match self.execute(&instruction)? {
            Flow::Next => self.pc += 1,
            Flow::Jump(target) => self.pc = target,
            Flow::Halt => self.halted = true,
        }
        Ok(!self.halted)
    }

    // ===== Accessors =====

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// Value of a global slot, if it was ever stored
    pub fn global(&self, offset: usize) -> Option<Value> {
        self.globals.get(offset).copied().flatten()
    }

    /// Text of a string value
    pub fn string(&self, value: Value) -> Option<&str> {
        self.strings.get(value.as_str_ref()?)
    }

    /// Heap cell of an array whose address is in a global slot
    pub fn heap_cell(&self, address: Value, index: i64) -> Option<Value> {
        match address {
            Value::Addr { block, offset } => self.heap.load(block, offset + index),
            _ => None,
        }
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    // ===== Stack helpers =====

    fn describe(&self) -> String {
        self.program
            .get(self.pc)
            .map(|i| i.to_string())
            .unwrap_or_default()
    }

    fn type_error(&self, expected: &'static str, found: Value) -> VmError {
        VmError::TypeMismatch {
            pc: self.pc,
            instruction: self.describe(),
            expected,
            found: found.kind(),
        }
    }

    fn pop(&mut self) -> Result<Value, VmError> {
        self.stack.pop().ok_or_else(|| VmError::StackUnderflow {
            pc: self.pc,
            instruction: self.describe(),
        })
    }

    fn pop_int(&mut self) -> Result<i64, VmError> {
        let value = self.pop()?;
        value.as_int().ok_or_else(|| self.type_error("integer", value))
    }

    fn pop_number(&mut self) -> Result<Value, VmError> {
        match self.pop()? {
            value @ (Value::Int(_) | Value::Float(_)) => Ok(value),
            other => Err(self.type_error("number", other)),
        }
    }

    fn pop_float(&mut self) -> Result<f64, VmError> {
        let value = self.pop()?;
        value.as_float().ok_or_else(|| self.type_error("number", value))
    }

    fn pop_string(&mut self) -> Result<String, VmError> {
        let value = self.pop()?;
        match value.as_str_ref().and_then(|r| self.strings.get(r)) {
            Some(text) => Ok(text.to_string()),
            None => Err(self.type_error("string", value)),
        }
    }

    fn pop_address(&mut self) -> Result<(usize, i64), VmError> {
        match self.pop()? {
            Value::Addr { block, offset } => Ok((block, offset)),
            other => Err(self.type_error("address", other)),
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn push_string(&mut self, text: String) -> Result<(), VmError> {
        let r: StrRef = self.strings.intern(text).ok_or_else(|| VmError::OutOfMemory {
            pc: self.pc,
            what: "string heap is full".to_string(),
        })?;
        self.push(Value::Str(r));
        Ok(())
    }

    fn char_or_error(&self, code: i64) -> Result<char, VmError> {
        char_from_code(code).ok_or(VmError::InvalidChar { pc: self.pc, code })
    }

    fn jump_to(&self, label: &str) -> Result<Flow, VmError> {
        self.labels
            .get(label)
            .map(|&target| Flow::Jump(target))
            .ok_or_else(|| VmError::UnknownLabel(label.to_string()))
    }

    // ===== Execution =====

    fn execute(&mut self, instruction: &Instruction) -> Result<Flow, VmError> {
        match instruction {
            Instruction::PushI(n) => self.push(Value::Int(*n)),
            Instruction::PushF(x) => self.push(Value::Float(*x)),
            Instruction::PushS(s) => self.push_string(s.clone())?,
            Instruction::PushG(offset) => {
                let value = self.global(*offset).ok_or(VmError::OutOfBounds {
                    pc: self.pc,
                    index: *offset as i64,
                    len: self.globals.len(),
                })?;
                self.push(value);
            }
            Instruction::StoreG(offset) => {
                let value = self.pop()?;
                if *offset >= MAX_GLOBALS {
                    return Err(VmError::OutOfMemory {
                        pc: self.pc,
                        what: format!("global slot {} is beyond the limit of {}", offset, MAX_GLOBALS),
                    });
                }
                if *offset >= self.globals.len() {
                    self.globals.resize(*offset + 1, None);
                }
                self.globals[*offset] = Some(value);
            }
            Instruction::Pop(count) => {
                for _ in 0..*count {
                    self.pop()?;
                }
            }
            Instruction::Dup(count) => {
                if *count > self.stack.len() {
                    return Err(VmError::StackUnderflow {
                        pc: self.pc,
                        instruction: self.describe(),
                    });
                }
                let start = self.stack.len() - count;
                self.stack.extend_from_within(start..);
            }

            Instruction::AllocN => {
                let requested = self.pop_int()?;
                let cells = usize::try_from(requested).map_err(|_| VmError::OutOfMemory {
                    pc: self.pc,
                    what: format!("cannot allocate {} cells", requested),
                })?;
                let block = self.heap.allocate(cells).map_err(|cells| VmError::OutOfMemory {
                    pc: self.pc,
                    what: format!("cannot allocate {} more cells", cells),
                })?;
                self.push(Value::Addr { block, offset: 0 });
            }
            Instruction::LoadN => {
                let index = self.pop_int()?;
                let (block, offset) = self.pop_address()?;
                let value = self
                    .heap
                    .load(block, offset.wrapping_add(index))
                    .ok_or(VmError::OutOfBounds {
                        pc: self.pc,
                        index,
                        len: self.heap.block_len(block),
                    })?;
                self.push(value);
            }
            Instruction::StoreN => {
                let value = self.pop()?;
                let index = self.pop_int()?;
                let (block, offset) = self.pop_address()?;
                if self.heap.store(block, offset.wrapping_add(index), value).is_none() {
                    return Err(VmError::OutOfBounds {
                        pc: self.pc,
                        index,
                        len: self.heap.block_len(block),
                    });
                }
            }

            Instruction::Add | Instruction::Sub | Instruction::Mul | Instruction::Div => {
                let b = self.pop_number()?;
                let a = self.pop_number()?;
                let result = match (a, b) {
                    (Value::Int(a), Value::Int(b)) => Value::Int(match instruction {
                        Instruction::Add => a.wrapping_add(b),
                        Instruction::Sub => a.wrapping_sub(b),
                        Instruction::Mul => a.wrapping_mul(b),
                        _ if b == 0 => return Err(VmError::DivisionByZero { pc: self.pc }),
                        _ => a.wrapping_div(b),
                    }),
                    (a, b) => {
                        let (a, b) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
                        Value::Float(match instruction {
                            Instruction::Add => a + b,
                            Instruction::Sub => a - b,
                            Instruction::Mul => a * b,
                            _ if b == 0.0 => return Err(VmError::DivisionByZero { pc: self.pc }),
                            _ => a / b,
                        })
                    }
                };
                self.push(result);
            }
            Instruction::Mod => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                if b == 0 {
                    return Err(VmError::DivisionByZero { pc: self.pc });
                }
                self.push(Value::Int(a.wrapping_rem(b)));
            }
            Instruction::Neg => match self.pop_number()? {
                Value::Float(x) => self.push(Value::Float(-x)),
                Value::Int(n) => self.push(Value::Int(n.wrapping_neg())),
                other => return Err(self.type_error("number", other)),
            },

            Instruction::FAdd | Instruction::FSub | Instruction::FMul | Instruction::FDiv => {
                let b = self.pop_float()?;
                let a = self.pop_float()?;
                let result = match instruction {
                    Instruction::FAdd => a + b,
                    Instruction::FSub => a - b,
                    Instruction::FMul => a * b,
                    _ if b == 0.0 => return Err(VmError::DivisionByZero { pc: self.pc }),
                    _ => a / b,
                };
                self.push(Value::Float(result));
            }
            Instruction::ItoF => {
                let x = self.pop_float()?;
                self.push(Value::Float(x));
            }
            Instruction::FSqrt => {
                let x = self.pop_float()?;
                self.push(Value::Float(x.sqrt()));
            }

            Instruction::And | Instruction::Or => {
                let b = self.pop_int()? != 0;
                let a = self.pop_int()? != 0;
                let result = if matches!(instruction, Instruction::And) {
                    a && b
                } else {
                    a || b
                };
                self.push(Value::Int(i64::from(result)));
            }
            Instruction::Not => {
                let a = self.pop_int()?;
                self.push(Value::Int(i64::from(a == 0)));
            }
            Instruction::Equal => {
                let b = self.pop()?;
                let a = self.pop()?;
                let equal = match (a, b) {
                    (Value::Int(x), Value::Int(y)) => x == y,
                    (Value::Str(x), Value::Str(y)) => self.strings.get(x) == self.strings.get(y),
                    (Value::Addr { .. }, Value::Addr { .. }) => a == b,
                    (x, y) => match (x.as_float(), y.as_float()) {
                        (Some(x), Some(y)) => x == y,
                        _ => return Err(self.type_error(a.kind(), b)),
                    },
                };
                self.push(Value::Int(i64::from(equal)));
            }
            Instruction::Inf | Instruction::InfEq | Instruction::Sup | Instruction::SupEq => {
                let b = self.pop_number()?;
                let a = self.pop_number()?;
                let ordering = match (a, b) {
                    (Value::Int(x), Value::Int(y)) => x.partial_cmp(&y),
                    (x, y) => x.as_float().partial_cmp(&y.as_float()),
                };
                let result = ordering.is_some_and(|o| match instruction {
                    Instruction::Inf => o.is_lt(),
                    Instruction::InfEq => o.is_le(),
                    Instruction::Sup => o.is_gt(),
                    _ => o.is_ge(),
                });
                self.push(Value::Int(i64::from(result)));
            }

            Instruction::Jz(label) => {
                if self.pop_int()? == 0 {
                    return self.jump_to(label);
                }
            }
            Instruction::Jump(label) => return self.jump_to(label),
            Instruction::Label(_) | Instruction::Start => {}
            Instruction::Stop => return Ok(Flow::Halt),

            Instruction::Read => {
                let line = self
                    .input
                    .pop_front()
                    .ok_or(VmError::InputExhausted { pc: self.pc })?;
                self.push_string(line)?;
            }
            Instruction::AtoI => {
                let text = self.pop_string()?;
                let n = text.trim().parse::<i64>().map_err(|_| VmError::InvalidNumber {
                    pc: self.pc,
                    text: text.clone(),
                })?;
                self.push(Value::Int(n));
            }
            Instruction::AtoF => {
                let text = self.pop_string()?;
                let x = text.trim().parse::<f64>().map_err(|_| VmError::InvalidNumber {
                    pc: self.pc,
                    text: text.clone(),
                })?;
                self.push(Value::Float(x));
            }
            Instruction::WriteI => {
                let n = self.pop_int()?;
                self.terminal.print(&n.to_string());
            }
            Instruction::WriteF => {
                let x = self.pop_float()?;
                self.terminal.print(&format_number(Number::Real(x)));
            }
            Instruction::WriteS => {
                let text = self.pop_string()?;
                self.terminal.print(&text);
            }
            Instruction::WriteChr => {
                let code = self.pop_int()?;
                let c = self.char_or_error(code)?;
                self.terminal.print(c.encode_utf8(&mut [0; 4]));
            }
            Instruction::WriteLn => self.terminal.newline(),

            Instruction::CharAt => {
                let index = self.pop_int()?;
                let text = self.pop_string()?;
                let c = usize::try_from(index)
                    .ok()
                    .and_then(|i| text.chars().nth(i))
                    .ok_or(VmError::OutOfBounds {
                        pc: self.pc,
                        index,
                        len: text.chars().count(),
                    })?;
                self.push(Value::Int(i64::from(u32::from(c))));
            }
            Instruction::SetCharAt => {
                let value = self.pop()?;
                let index = self.pop_int()?;
                let text = self.pop_string()?;

                let replacement = match value {
                    Value::Int(code) => self.char_or_error(code)?,
                    Value::Str(r) => self
                        .strings
                        .get(r)
                        .and_then(|s| s.chars().next())
                        .ok_or(VmError::OutOfBounds {
                            pc: self.pc,
                            index: 0,
                            len: 0,
                        })?,
                    other => return Err(self.type_error("character", other)),
                };

                let len = text.chars().count();
                let position = usize::try_from(index)
                    .ok()
                    .filter(|&i| i < len)
                    .ok_or(VmError::OutOfBounds {
                        pc: self.pc,
                        index,
                        len,
                    })?;
                let updated: String = text
                    .chars()
                    .enumerate()
                    .map(|(i, c)| if i == position { replacement } else { c })
                    .collect();
                self.push_string(updated)?;
            }
            Instruction::Chr => {
                let code = self.pop_int()?;
                let c = self.char_or_error(code)?;
                self.push_string(c.to_string())?;
            }
            Instruction::StrLen => {
                let text = self.pop_string()?;
                self.push(Value::Int(text.chars().count() as i64));
            }
        }

        Ok(Flow::Next)
    }
}
