//! hyc virtual machine: executes assembled programs.
//!
//! The VM is a stack machine with:
//! - One operand stack holding values, variable slots, and call bookkeeping
//! - Per-call variable frames mapping names to absolute stack slots
//! - A frame arena; a parked caller frame is referenced by id from the stack
//!
//! # Usage
//!
//! ```
//! use hyc_common::{Instruction, Opcode, Program};
//! use hyc_vm::run;
//!
//! let program = Program::new(vec![
//!     Instruction::new(Opcode::Push, "40"),
//!     Instruction::new(Opcode::Push, "2"),
//!     Instruction::new(Opcode::Add, ""),
//!     Instruction::new(Opcode::Exit, "~"),
//! ]);
//!
//! assert_eq!(run(&program).unwrap(), 42);
//! ```

pub mod error;
pub mod execute;
pub mod frame;
pub mod machine;
pub mod value;

pub use error::{ErrorKind, Fault, RuntimeError, Site};
pub use frame::FrameId;
pub use machine::{Machine, Step, MAX_STACK_DEPTH};
pub use value::StackValue;

use hyc_common::Program;

/// Execute a program and return its exit code.
///
/// # Errors
///
/// Returns the first [`Fault`]: a type, stack, name, arithmetic, or bounds
/// error together with the instruction that raised it.
pub fn run(program: &Program) -> Result<i64, Fault> {
    let mut machine = Machine::new(program);
    machine.run()
}
