//! Operand stack cells.

use std::fmt;

use crate::frame::FrameId;

/// One cell of the operand stack.
///
/// Only `Const` is a usable operand. The three bookkeeping cells are pushed
/// by CALL, in the order `ArgCount`, `SavedIp`, `SavedFrame`, and consumed
/// only by RET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackValue {
    /// A 64-bit signed integer.
    Const(i64),
    /// A declared variable slot that has not been assigned.
    Uninit,
    /// Number of arguments the caller pushed below this call's bookkeeping.
    ArgCount(usize),
    /// Address of the CALL instruction to return past.
    SavedIp(usize),
    /// The caller's frame, held in the arena until RET reinstates it.
    SavedFrame(FrameId),
}

impl StackValue {
    /// Short tag used in diagnostics and dumps.
    pub fn kind_name(&self) -> &'static str {
        match self {
            StackValue::Const(_) => "CONST",
            StackValue::Uninit => "UNINIT",
            StackValue::ArgCount(_) => "ARG_COUNT",
            StackValue::SavedIp(_) => "SAVED_IP",
            StackValue::SavedFrame(_) => "SAVED_FRAME",
        }
    }

    /// The integer payload of a `Const` cell.
    pub fn as_const(&self) -> Option<i64> {
        match self {
            StackValue::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// True for cells that only CALL/RET may touch.
    pub fn is_bookkeeping(&self) -> bool {
        matches!(
            self,
            StackValue::ArgCount(_) | StackValue::SavedIp(_) | StackValue::SavedFrame(_)
        )
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackValue::Const(v) => write!(f, "CONST {v}"),
            StackValue::Uninit => f.write_str("UNINIT"),
            StackValue::ArgCount(n) => write!(f, "ARG_COUNT {n}"),
            StackValue::SavedIp(ip) => write!(f, "SAVED_IP {ip:04}"),
            StackValue::SavedFrame(id) => write!(f, "SAVED_FRAME {id}"),
        }
    }
}
