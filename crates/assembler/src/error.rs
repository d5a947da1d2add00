//! Error types for the hyc assembler.

use thiserror::Error;

/// Errors produced during assembly. All are fatal: no partial program is
/// returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// The source file could not be read.
    #[error("cannot read '{path}': {message}")]
    Io { path: String, message: String },

    /// An unrecognized opcode name was encountered.
    #[error("line {line}: unknown opcode '{token}'")]
    UnknownOpcode { line: usize, token: String },

    /// A label separator with nothing before it.
    #[error("line {line}: empty label")]
    EmptyLabel { line: usize },

    /// A label or function name that is not a valid identifier.
    #[error("line {line}: invalid identifier '{name}'")]
    InvalidIdentifier { line: usize, name: String },

    /// A label or function name declared more than once.
    #[error("line {line}: duplicate identifier '{name}'")]
    DuplicateIdentifier { line: usize, name: String },

    /// A `FUNC` label without an `@name` part.
    #[error("line {line}: malformed function label '{label}' (expected 'FUNC @name')")]
    MalformedFunctionLabel { line: usize, label: String },

    /// A marker line that takes no argument was followed by more text.
    #[error("line {line}: unexpected text after {marker}: '{text}'")]
    TrailingText {
        line: usize,
        marker: &'static str,
        text: String,
    },
}

impl AsmError {
    /// Source line the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::Io { .. } => None,
            AsmError::UnknownOpcode { line, .. }
            | AsmError::EmptyLabel { line }
            | AsmError::InvalidIdentifier { line, .. }
            | AsmError::DuplicateIdentifier { line, .. }
            | AsmError::MalformedFunctionLabel { line, .. }
            | AsmError::TrailingText { line, .. } => Some(*line),
        }
    }
}
