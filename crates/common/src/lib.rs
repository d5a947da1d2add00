//! hyc common types.
//!
//! This crate provides the data structures shared by the assembler and the
//! virtual machine:
//!
//! - [`Opcode`]: the opcode table (names, lookup, handler presence)
//! - [`Instruction`]: one labeled instruction with its text argument
//! - [`Program`]: the instruction sequence with label and function maps
//! - [`is_identifier`]: the identifier rule for labels and variables
//!
//! # Dependencies
//!
//! None. Property tests use `proptest` as a dev-dependency.

pub mod ident;
pub mod instruction;
pub mod opcode;
pub mod program;

// Re-export commonly used types at the crate root.
pub use ident::is_identifier;
pub use instruction::{Instruction, ENDFUNC_LABEL, TOP_OF_STACK};
pub use opcode::Opcode;
pub use program::Program;
