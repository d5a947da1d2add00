//! A single resolved instruction.
//!
//! The argument is kept as text. Its meaning depends on the opcode:
//! ```text
//! PUSH / POP / RET / EXIT   integer literal, identifier, or "~" (RET/EXIT)
//! VAR / ARG                 comma-separated identifier list
//! JMP / JZ / CALL           label or function name
//! everything else           unused
//! ```

use crate::opcode::Opcode;

/// Argument of RET/EXIT meaning "the value currently on top of the stack".
pub const TOP_OF_STACK: &str = "~";

/// Marker label carried by the RET synthesized for `ENDFUNC`.
pub const ENDFUNC_LABEL: &str = "ENDFUNC";

/// One program instruction with every label that points at its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Labels attached to this address. Order carries no meaning.
    pub labels: Vec<String>,
    /// The operation to perform.
    pub opcode: Opcode,
    /// Opcode-dependent argument text. Empty when absent.
    pub argument: String,
}

impl Instruction {
    /// Create an unlabeled instruction.
    pub fn new(opcode: Opcode, argument: impl Into<String>) -> Self {
        Self {
            labels: Vec::new(),
            opcode,
            argument: argument.into(),
        }
    }

    /// Attach labels to this instruction.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Split a comma-separated argument (VAR/ARG) into trimmed names.
    ///
    /// A blank argument yields no names. Otherwise every entry is kept,
    /// so `"a, ,b"` yields `["a", "", "b"]` and the empty one fails the
    /// identifier check.
    pub fn names(&self) -> Vec<&str> {
        if self.argument.trim().is_empty() {
            return Vec::new();
        }
        self.argument.split(',').map(str::trim).collect()
    }
}
