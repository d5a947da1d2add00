//! Program representation: the instruction sequence plus its address tables.
//!
//! An instruction's index in `instructions` is its address. Label and
//! function names resolve to addresses through two separate maps; the
//! assembler guarantees a name appears in at most one of them.

use std::collections::BTreeMap;

use crate::instruction::Instruction;
use crate::opcode::Opcode;

/// A resolved program, read-only once assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// The instruction stream. Index = address.
    pub instructions: Vec<Instruction>,
    /// Jump targets: label name → address.
    pub label_map: BTreeMap<String, usize>,
    /// Call targets: function name → address of its first instruction.
    pub func_map: BTreeMap<String, usize>,
}

impl Program {
    /// Create a program with no labels or functions.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            label_map: BTreeMap::new(),
            func_map: BTreeMap::new(),
        }
    }

    /// Number of instructions in the program.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at `address`, if in bounds.
    pub fn get(&self, address: usize) -> Option<&Instruction> {
        self.instructions.get(address)
    }

    /// Address recorded for a jump label.
    pub fn label_address(&self, name: &str) -> Option<usize> {
        self.label_map.get(name).copied()
    }

    /// Address recorded for a function entry.
    pub fn function_address(&self, name: &str) -> Option<usize> {
        self.func_map.get(name).copied()
    }

    /// Parameter declaration of the function starting at `address`.
    ///
    /// Returns the ARG instruction when it is the function's first
    /// instruction, `None` otherwise.
    pub fn parameters_at(&self, address: usize) -> Option<&Instruction> {
        self.get(address).filter(|instr| instr.opcode == Opcode::Arg)
    }
}
