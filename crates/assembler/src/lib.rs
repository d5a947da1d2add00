//! hyc assembler: line-oriented assembly text to a resolved [`Program`].
//!
//! Assembly is a single all-or-nothing pass: labels are resolved as they are
//! declared and the first error aborts with no partial program.
//!
//! # Usage
//!
//! ```
//! use hyc_assembler::{assemble, Options};
//!
//! let text = "FUNC @main:\nVAR x\nPUSH 10\nPOP x\nRET x\nENDFUNC\n";
//! let program = assemble(text, Options::default()).unwrap();
//! assert_eq!(program.function_address("main"), Some(2));
//! assert_eq!(program.len(), 8); // CALL main, EXIT ~, 5 body, EXIT ~
//! ```
//!
//! # Source format
//!
//! ```text
//! ; comment            # comment
//! name:                label for the next instruction
//! FUNC @name:          function entry
//! opcode argument      instruction (opcode names ignore case)
//! myfunc.arg a, b      parameter list; the prefix is cosmetic
//! ENDFUNC              labeled `ret ~`
//! ```

pub mod error;

mod lexer;
mod listing;
mod parser;

pub use error::AsmError;
pub use listing::listing;

use std::fs;
use std::path::Path;

use hyc_common::Program;
use parser::Assembler;
use tracing::debug;

/// Synthesis flags chosen by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Prepend `CALL main` and the `EXIT ~` it returns to.
    pub entry_call: bool,
    /// Append `EXIT ~`.
    pub exit: bool,
}

impl Options {
    /// Assemble the source exactly as written.
    pub fn bare() -> Self {
        Self {
            entry_call: false,
            exit: false,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            entry_call: true,
            exit: true,
        }
    }
}

/// Assemble source text into a program.
///
/// Returns the first error encountered.
pub fn assemble(text: &str, options: Options) -> Result<Program, AsmError> {
    let mut assembler = Assembler::new();

    for (idx, line) in text.lines().enumerate() {
        assembler.feed(line, idx + 1)?;
    }

    let program = assembler.finish(options);
    debug!(
        instructions = program.len(),
        labels = program.label_map.len(),
        functions = program.func_map.len(),
        "assembled program"
    );
    Ok(program)
}

/// Read and assemble a source file.
pub fn assemble_file(path: impl AsRef<Path>, options: Options) -> Result<Program, AsmError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| AsmError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    assemble(&text, options)
}
