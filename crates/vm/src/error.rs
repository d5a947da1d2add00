//! Runtime errors for the hyc VM.
//!
//! Handlers report a [`RuntimeError`]. The execution loop wraps the first
//! one in a [`Fault`] that records where it happened: the instruction
//! address and, when an instruction was fetched, its labels, opcode and
//! argument.

use std::fmt;

use hyc_common::{Instruction, Opcode};
use thiserror::Error;

/// Error class, one per failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An operand was not a `Const` cell.
    Type,
    /// Too few operands, stack overflow, or a corrupt call frame.
    Stack,
    /// Undefined or malformed variable, label, or function name.
    Name,
    /// Division or modulo by zero.
    Arithmetic,
    /// Instruction pointer out of bounds, or a NIL opcode.
    Bounds,
}

/// Errors raised by individual instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// An operation needed a `Const` operand.
    #[error("expected a constant operand, found {found}")]
    NotAConstant { found: &'static str },

    /// Fewer stack cells than the operation consumes.
    #[error("stack underflow: needed {needed} cell(s), found {depth}")]
    StackUnderflow { needed: usize, depth: usize },

    /// The operand stack exceeded its limit.
    #[error("stack overflow (limit {limit} cells)")]
    StackOverflow { limit: usize },

    /// Bookkeeping cells missing or out of order while unwinding a call.
    #[error("corrupt frame: {reason}")]
    CorruptFrame { reason: &'static str },

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("undefined label '{0}'")]
    UndefinedLabel(String),

    #[error("undefined function '{0}'")]
    UndefinedFunction(String),

    /// A variable or parameter declared twice in one frame.
    #[error("variable '{0}' already declared")]
    Redeclared(String),

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// A numeric literal that does not fit in 64 bits and names no variable.
    #[error("integer literal '{0}' out of range")]
    LiteralOutOfRange(String),

    /// The instruction requires an argument and has none.
    #[error("{opcode} requires an argument")]
    MissingOperand { opcode: Opcode },

    #[error("division by zero")]
    DivisionByZero,

    /// Execution ran past the last instruction without EXIT.
    #[error("instruction pointer {pc} outside program (length {len})")]
    PcOutOfBounds { pc: usize, len: usize },

    /// A NIL opcode was fetched.
    #[error("invalid instruction")]
    NilOpcode,
}

impl RuntimeError {
    /// The failure family of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::NotAConstant { .. } => ErrorKind::Type,
            RuntimeError::StackUnderflow { .. }
            | RuntimeError::StackOverflow { .. }
            | RuntimeError::CorruptFrame { .. } => ErrorKind::Stack,
            RuntimeError::UndefinedVariable(_)
            | RuntimeError::UndefinedLabel(_)
            | RuntimeError::UndefinedFunction(_)
            | RuntimeError::Redeclared(_)
            | RuntimeError::InvalidIdentifier(_)
            | RuntimeError::LiteralOutOfRange(_)
            | RuntimeError::MissingOperand { .. } => ErrorKind::Name,
            RuntimeError::DivisionByZero => ErrorKind::Arithmetic,
            RuntimeError::PcOutOfBounds { .. } | RuntimeError::NilOpcode => ErrorKind::Bounds,
        }
    }
}

/// Where a fault happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Instruction address.
    pub at: usize,
    /// Labels on the failing instruction.
    pub labels: Vec<String>,
    /// Failing opcode; `Nil` when no instruction was fetched.
    pub opcode: Opcode,
    /// Argument of the failing instruction.
    pub argument: String,
}

impl Site {
    /// Site of a fetched instruction.
    pub fn instruction(at: usize, instr: &Instruction) -> Self {
        Self {
            at,
            labels: instr.labels.clone(),
            opcode: instr.opcode,
            argument: instr.argument.clone(),
        }
    }

    /// Site of an address with no instruction behind it.
    pub fn address(at: usize) -> Self {
        Self {
            at,
            labels: Vec::new(),
            opcode: Opcode::Nil,
            argument: String::new(),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instruction {}", self.at)?;
        if self.opcode == Opcode::Nil && self.labels.is_empty() {
            return Ok(());
        }
        f.write_str(" (")?;
        if !self.labels.is_empty() {
            write!(f, "{}: ", self.labels.join(", "))?;
        }
        write!(f, "{}", self.opcode)?;
        if !self.argument.is_empty() {
            write!(f, " {}", self.argument)?;
        }
        f.write_str(")")
    }
}

/// A failed run: the first error and the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{site}: {error}")]
pub struct Fault {
    pub site: Site,
    pub error: RuntimeError,
}

impl Fault {
    pub fn new(site: Site, error: RuntimeError) -> Self {
        Self { site, error }
    }

    /// Failure family of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
