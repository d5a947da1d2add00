//! VM state: operand stack, instruction pointer, frames, halt flag.

use std::fmt;

use crate::error::RuntimeError;
use crate::frame::{Frame, FrameArena, FrameId};
use crate::value::StackValue;
use hyc_common::Program;

/// Maximum operand stack depth.
pub const MAX_STACK_DEPTH: usize = 65536;

/// Result of one [`Machine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More instructions to run.
    Running,
    /// EXIT executed with this exit code.
    Halted(i64),
}

/// The hyc virtual machine.
///
/// The program is borrowed read-only; everything else is owned and reset at
/// the start of every [`run`](Machine::run).
pub struct Machine<'a> {
    /// The program being executed.
    pub(crate) program: &'a Program,
    /// Operand stack. Variables are addressed by absolute slot index.
    pub(crate) stack: Vec<StackValue>,
    /// Address of the next instruction to execute.
    pub(crate) ip: usize,
    /// Owner of the current frame and all parked caller frames.
    pub(crate) frames: FrameArena,
    /// The frame variable lookups go through.
    pub(crate) current: FrameId,
    pub(crate) halted: bool,
    pub(crate) exit_code: i64,
}

impl<'a> Machine<'a> {
    /// Create a machine positioned at address 0 with an empty top-level frame.
    pub fn new(program: &'a Program) -> Self {
        let mut frames = FrameArena::new();
        let current = frames.alloc(Frame::new());
        Self {
            program,
            stack: Vec::new(),
            ip: 0,
            frames,
            current,
            halted: false,
            exit_code: 0,
        }
    }

    /// Return to the initial state.
    pub fn reset(&mut self) {
        *self = Machine::new(self.program);
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn stack(&self) -> &[StackValue] {
        &self.stack
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn exit_code(&self) -> i64 {
        self.exit_code
    }

    /// Number of frames alive: the current one plus every parked caller.
    pub fn frame_count(&self) -> usize {
        self.frames.live()
    }

    /// Current value of a variable visible in the current frame.
    pub fn variable(&self, name: &str) -> Option<StackValue> {
        let slot = self.frames.get(self.current)?.slot(name)?;
        self.stack.get(slot).copied()
    }

    /// Bindings of the current frame as `(name, slot)` pairs.
    pub fn bindings(&self) -> Vec<(&str, usize)> {
        self.frames
            .get(self.current)
            .map(|frame| frame.iter().collect())
            .unwrap_or_default()
    }

    /// Push a cell, checking for overflow.
    pub(crate) fn push(&mut self, value: StackValue) -> Result<(), RuntimeError> {
        if self.stack.len() >= MAX_STACK_DEPTH {
            return Err(RuntimeError::StackOverflow {
                limit: MAX_STACK_DEPTH,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    /// Fail unless at least `needed` cells are on the stack.
    pub(crate) fn require(&self, needed: usize) -> Result<(), RuntimeError> {
        if self.stack.len() < needed {
            return Err(RuntimeError::StackUnderflow {
                needed,
                depth: self.stack.len(),
            });
        }
        Ok(())
    }

    /// The `Const` payload `depth` cells below the top (0 = top).
    ///
    /// Callers check depth with [`require`](Self::require) first.
    pub(crate) fn operand(&self, depth: usize) -> Result<i64, RuntimeError> {
        let len = self.stack.len();
        let cell = len
            .checked_sub(depth + 1)
            .and_then(|index| self.stack.get(index))
            .ok_or(RuntimeError::StackUnderflow {
                needed: depth + 1,
                depth: len,
            })?;
        cell.as_const().ok_or(RuntimeError::NotAConstant {
            found: cell.kind_name(),
        })
    }

    pub(crate) fn frame(&self) -> Result<&Frame, RuntimeError> {
        self.frames.get(self.current).ok_or(RuntimeError::CorruptFrame {
            reason: "current frame missing",
        })
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames
            .get_mut(self.current)
            .ok_or(RuntimeError::CorruptFrame {
                reason: "current frame missing",
            })
    }

    /// Stack slot of a variable in the current frame.
    pub(crate) fn slot_of(&self, name: &str) -> Result<usize, RuntimeError> {
        self.frame()?
            .slot(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// The cell held by a variable.
    pub(crate) fn load(&self, name: &str) -> Result<StackValue, RuntimeError> {
        let slot = self.slot_of(name)?;
        self.stack
            .get(slot)
            .copied()
            .ok_or(RuntimeError::CorruptFrame {
                reason: "variable slot above stack top",
            })
    }
}

impl fmt::Display for Machine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ip: {:04}", self.ip)?;
        writeln!(f, "stack ({}):", self.stack.len())?;
        for (slot, cell) in self.stack.iter().enumerate() {
            writeln!(f, "  [{slot:04}] {cell}")?;
        }
        writeln!(f, "frame {}:", self.current)?;
        for (name, slot) in self.bindings() {
            match self.stack.get(slot) {
                Some(cell) => writeln!(f, "  {name} -> [{slot:04}] {cell}")?,
                None => writeln!(f, "  {name} -> [{slot:04}] <gone>")?,
            }
        }
        Ok(())
    }
}
