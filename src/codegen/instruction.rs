//! Stack-machine instruction set
//!
//! The generator appends [`Instruction`] values; their `Display` form is the
//! textual mnemonic the target machine reads (`pushi 5`, `jz ELSE0`,
//! `ELSE0:`). [`FromStr`] reads one such line back, which is how the
//! [`crate::vm`] loads a listing.

use crate::parser::ast::Number;
use crate::parser::printer::format_number;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Constants and globals
    PushI(i64),
    PushF(f64),
    PushS(String),
    PushG(usize),
    StoreG(usize),
    Pop(usize),
    Dup(usize),

    // Heap blocks
    AllocN,
    LoadN,
    StoreN,

    // Integer arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    // Float arithmetic
    FAdd,
    FSub,
    FMul,
    FDiv,
    ItoF,
    FSqrt,

    // Logic and comparison
    And,
    Or,
    Not,
    Equal,
    Inf,
    InfEq,
    Sup,
    SupEq,

    // Control flow
    Jz(String),
    Jump(String),
    Label(String),
    Start,
    Stop,

    // Input and output
    Read,
    AtoI,
    AtoF,
    WriteI,
    WriteF,
    WriteS,
    WriteChr,
    WriteLn,

    // Strings
    CharAt,
    SetCharAt,
    Chr,
    StrLen,
}

impl Instruction {
    /// Mnemonic without operands
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::PushI(_) => "pushi",
            Instruction::PushF(_) => "pushf",
            Instruction::PushS(_) => "pushs",
            Instruction::PushG(_) => "pushg",
            Instruction::StoreG(_) => "storeg",
            Instruction::Pop(_) => "pop",
            Instruction::Dup(_) => "dup",
            Instruction::AllocN => "allocn",
            Instruction::LoadN => "loadn",
            Instruction::StoreN => "storen",
            Instruction::Add => "add",
            Instruction::Sub => "sub",
            Instruction::Mul => "mul",
            Instruction::Div => "div",
            Instruction::Mod => "mod",
            Instruction::Neg => "neg",
            Instruction::FAdd => "fadd",
            Instruction::FSub => "fsub",
            Instruction::FMul => "fmul",
            Instruction::FDiv => "fdiv",
            Instruction::ItoF => "itof",
            Instruction::FSqrt => "fsqrt",
            Instruction::And => "and",
            Instruction::Or => "or",
            Instruction::Not => "not",
            Instruction::Equal => "equal",
            Instruction::Inf => "inf",
            Instruction::InfEq => "infeq",
            Instruction::Sup => "sup",
            Instruction::SupEq => "supeq",
            Instruction::Jz(_) => "jz",
            Instruction::Jump(_) => "jump",
            Instruction::Label(_) => "label",
            Instruction::Start => "start",
            Instruction::Stop => "stop",
            Instruction::Read => "read",
            Instruction::AtoI => "atoi",
            Instruction::AtoF => "atof",
            Instruction::WriteI => "writei",
            Instruction::WriteF => "writef",
            Instruction::WriteS => "writes",
            Instruction::WriteChr => "writechr",
            Instruction::WriteLn => "writeln",
            Instruction::CharAt => "charat",
            Instruction::SetCharAt => "setcharat",
            Instruction::Chr => "chr",
            Instruction::StrLen => "strlen",
        }
    }

    fn from_mnemonic(mnemonic: &str) -> Option<Instruction> {
        let instruction = match mnemonic {
            "allocn" => Instruction::AllocN,
            "loadn" => Instruction::LoadN,
            "storen" => Instruction::StoreN,
            "add" => Instruction::Add,
            "sub" => Instruction::Sub,
            "mul" => Instruction::Mul,
            "div" => Instruction::Div,
            "mod" => Instruction::Mod,
            "neg" => Instruction::Neg,
            "fadd" => Instruction::FAdd,
            "fsub" => Instruction::FSub,
            "fmul" => Instruction::FMul,
            "fdiv" => Instruction::FDiv,
            "itof" => Instruction::ItoF,
            "fsqrt" => Instruction::FSqrt,
            "and" => Instruction::And,
            "or" => Instruction::Or,
            "not" => Instruction::Not,
            "equal" => Instruction::Equal,
            "inf" => Instruction::Inf,
            "infeq" => Instruction::InfEq,
            "sup" => Instruction::Sup,
            "supeq" => Instruction::SupEq,
            "start" => Instruction::Start,
            "stop" => Instruction::Stop,
            "read" => Instruction::Read,
            "atoi" => Instruction::AtoI,
            "atof" => Instruction::AtoF,
            "writei" => Instruction::WriteI,
            "writef" => Instruction::WriteF,
            "writes" => Instruction::WriteS,
            "writechr" => Instruction::WriteChr,
            "writeln" => Instruction::WriteLn,
            "charat" => Instruction::CharAt,
            "setcharat" => Instruction::SetCharAt,
            "chr" => Instruction::Chr,
            "strlen" => Instruction::StrLen,
            _ => return None,
        };
        Some(instruction)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(quoted: &str) -> Result<String, InstructionParseError> {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| InstructionParseError::InvalidOperand(quoted.to_string()))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            _ => return Err(InstructionParseError::InvalidOperand(quoted.to_string())),
        }
    }
    Ok(out)
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushI(n) => write!(f, "pushi {}", n),
            Instruction::PushF(x) => write!(f, "pushf {}", format_number(Number::Real(*x))),
            Instruction::PushS(s) => write!(f, "pushs \"{}\"", escape(s)),
            Instruction::PushG(n) => write!(f, "pushg {}", n),
            Instruction::StoreG(n) => write!(f, "storeg {}", n),
            Instruction::Pop(n) => write!(f, "pop {}", n),
            Instruction::Dup(n) => write!(f, "dup {}", n),
            Instruction::Jz(label) => write!(f, "jz {}", label),
            Instruction::Jump(label) => write!(f, "jump {}", label),
            Instruction::Label(label) => write!(f, "{}:", label),
            other => write!(f, "{}", other.mnemonic()),
        }
    }
}

/// Error reading an instruction line
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstructionParseError {
    #[error("unknown instruction '{0}'")]
    UnknownMnemonic(String),

    #[error("'{0}' expects an operand")]
    MissingOperand(String),

    #[error("invalid operand '{0}'")]
    InvalidOperand(String),

    #[error("unexpected operand after '{0}'")]
    UnexpectedOperand(String),
}

impl FromStr for Instruction {
    type Err = InstructionParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();

        if let Some(label) = line.strip_suffix(':') {
            if !label.is_empty() && !label.contains(char::is_whitespace) {
                return Ok(Instruction::Label(label.to_string()));
            }
        }

        let (mnemonic, operand) = match line.split_once(char::is_whitespace) {
            Some((m, rest)) => (m, Some(rest.trim())),
            None => (line, None),
        };
        let mnemonic = mnemonic.to_ascii_lowercase();

        let required = || {
            operand
                .filter(|o| !o.is_empty())
                .ok_or_else(|| InstructionParseError::MissingOperand(mnemonic.clone()))
        };
        let number = |text: &str| {
            text.parse::<usize>()
                .map_err(|_| InstructionParseError::InvalidOperand(text.to_string()))
        };

        match mnemonic.as_str() {
            "pushi" => {
                let text = required()?;
                text.parse()
                    .map(Instruction::PushI)
                    .map_err(|_| InstructionParseError::InvalidOperand(text.to_string()))
            }
            "pushf" => {
                let text = required()?;
                text.parse()
                    .map(Instruction::PushF)
                    .map_err(|_| InstructionParseError::InvalidOperand(text.to_string()))
            }
            "pushs" => unescape(required()?).map(Instruction::PushS),
            "pushg" => Ok(Instruction::PushG(number(required()?)?)),
            "storeg" => Ok(Instruction::StoreG(number(required()?)?)),
            "pop" => Ok(Instruction::Pop(number(required()?)?)),
            "dup" => Ok(Instruction::Dup(number(required()?)?)),
            "jz" => Ok(Instruction::Jz(required()?.to_string())),
            "jump" => Ok(Instruction::Jump(required()?.to_string())),
            _ => {
                let instruction = Instruction::from_mnemonic(&mnemonic)
                    .ok_or_else(|| InstructionParseError::UnknownMnemonic(mnemonic.clone()))?;
                match operand {
                    Some(o) if !o.is_empty() => {
                        Err(InstructionParseError::UnexpectedOperand(mnemonic.clone()))
                    }
                    _ => Ok(instruction),
                }
            }
        }
    }
}
