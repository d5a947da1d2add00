//! Single-pass label resolution and instruction emission.
//!
//! Labels accumulate until the next emitted instruction and attach to it,
//! so several labels may name the same address. Addresses are recorded at
//! declaration time as the index of the next instruction.

use std::mem;

use crate::error::AsmError;
use crate::lexer::{scan_line, split_word, Line};
use crate::Options;
use hyc_common::{is_identifier, Instruction, Opcode, Program, ENDFUNC_LABEL, TOP_OF_STACK};

/// Keyword that introduces a function label (`FUNC @name`).
const FUNC_KEYWORD: &str = "FUNC";

/// Name of the function called by the synthesized entry instruction.
pub(crate) const ENTRY_FUNCTION: &str = "main";

/// Assembler state while lines are being fed.
#[derive(Debug, Default)]
pub(crate) struct Assembler {
    program: Program,
    pending_labels: Vec<String>,
}

impl Assembler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Consume one source line.
    pub(crate) fn feed(&mut self, line: &str, line_num: usize) -> Result<(), AsmError> {
        let (label, body) = match scan_line(line) {
            Line::Blank => return Ok(()),
            Line::Source { label, body } => (label, body),
        };

        if let Some(label) = label {
            self.check_label(label, line_num)?;
        }

        if body.is_empty() {
            return Ok(());
        }

        let (token, argument) = split_word(body);

        if token == ENDFUNC_LABEL {
            if !argument.is_empty() {
                return Err(AsmError::TrailingText {
                    line: line_num,
                    marker: ENDFUNC_LABEL,
                    text: argument.to_string(),
                });
            }
            self.pending_labels.push(ENDFUNC_LABEL.to_string());
            self.emit(Opcode::Ret, TOP_OF_STACK);
            return Ok(());
        }

        let name = normalize_declaration(token);
        match Opcode::from_name(name) {
            Opcode::Nil => Err(AsmError::UnknownOpcode {
                line: line_num,
                token: token.to_string(),
            }),
            opcode => {
                self.emit(opcode, argument);
                Ok(())
            }
        }
    }

    /// Validate a label and record its address.
    ///
    /// `FUNC @name` registers a function; anything else registers a jump
    /// label. A name may live in only one of the two maps.
    fn check_label(&mut self, label: &str, line_num: usize) -> Result<(), AsmError> {
        if label.is_empty() {
            return Err(AsmError::EmptyLabel { line: line_num });
        }

        let address = self.program.len();

        if let Some(rest) = function_label_rest(label) {
            let name = rest
                .strip_prefix('@')
                .ok_or_else(|| AsmError::MalformedFunctionLabel {
                    line: line_num,
                    label: label.to_string(),
                })?;
            if name.is_empty() {
                return Err(AsmError::MalformedFunctionLabel {
                    line: line_num,
                    label: label.to_string(),
                });
            }
            self.check_new_name(name, line_num)?;
            self.program.func_map.insert(name.to_string(), address);
            self.pending_labels.push(format!("{FUNC_KEYWORD} @{name}"));
            return Ok(());
        }

        self.check_new_name(label, line_num)?;
        self.program.label_map.insert(label.to_string(), address);
        self.pending_labels.push(label.to_string());
        Ok(())
    }

    fn check_new_name(&self, name: &str, line_num: usize) -> Result<(), AsmError> {
        if !is_identifier(name) {
            return Err(AsmError::InvalidIdentifier {
                line: line_num,
                name: name.to_string(),
            });
        }
        if self.program.func_map.contains_key(name) || self.program.label_map.contains_key(name) {
            return Err(AsmError::DuplicateIdentifier {
                line: line_num,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Append an instruction carrying every pending label.
    fn emit(&mut self, opcode: Opcode, argument: &str) {
        let labels = mem::take(&mut self.pending_labels);
        self.program
            .instructions
            .push(Instruction::new(opcode, argument).with_labels(labels));
    }

    /// Apply entry/exit synthesis and return the finished program.
    ///
    /// The entry prologue is `CALL main` followed by `EXIT ~`, so main's
    /// return lands on an exit that reports its value. Every recorded
    /// address moves up by the prologue length.
    pub(crate) fn finish(mut self, options: Options) -> Program {
        if options.exit {
            self.emit(Opcode::Exit, TOP_OF_STACK);
        }

        if options.entry_call {
            let prologue = [
                Instruction::new(Opcode::Call, ENTRY_FUNCTION),
                Instruction::new(Opcode::Exit, TOP_OF_STACK),
            ];
            let shift = prologue.len();
            self.program.instructions.splice(0..0, prologue);
            for address in self
                .program
                .label_map
                .values_mut()
                .chain(self.program.func_map.values_mut())
            {
                *address += shift;
            }
        }

        self.program
    }
}

/// The part after `FUNC` when `label` is a function label.
fn function_label_rest(label: &str) -> Option<&str> {
    let rest = label.strip_prefix(FUNC_KEYWORD)?;
    if rest.starts_with('@') || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// `myfunc.arg` / `myfunc.var` name the enclosing function for readability;
/// only the suffix identifies the instruction.
fn normalize_declaration(token: &str) -> &str {
    let lower = token.to_ascii_lowercase();
    if lower.ends_with(".arg") {
        "arg"
    } else if lower.ends_with(".var") {
        "var"
    } else {
        token
    }
}
