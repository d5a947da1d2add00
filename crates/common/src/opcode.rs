//! The opcode table.
//!
//! Every recognized operation name maps to exactly one [`Opcode`]. Names are
//! looked up with a linear scan over [`ALL_OPCODES`]; a miss yields
//! [`Opcode::Nil`], which is never a valid program instruction.

/// Identifies the operation an instruction performs.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Lookup miss sentinel. Never executable.
    Nil = 0x00,

    // Arithmetic
    /// Pop two values, push their sum.
    Add = 0x01,
    /// Pop two values, push (second_popped - first_popped).
    Sub = 0x02,
    /// Pop two values, push their product.
    Mul = 0x03,
    /// Truncating division. Division by zero is a runtime error.
    Div = 0x04,
    /// C-style remainder. Modulo by zero is a runtime error.
    Mod = 0x05,
    /// Negate the top value in place.
    Neg = 0x06,

    // Logical
    /// Replace the top value with 1 if it is zero, else 0.
    Not = 0x07,
    /// Logical AND over truthiness, producing 0/1.
    And = 0x08,
    /// Logical OR over truthiness, producing 0/1.
    Or = 0x09,

    // Bitwise
    BitAnd = 0x0A,
    BitOr = 0x0B,
    BitXor = 0x0C,

    // Comparison, all producing 0/1
    CmpEq = 0x0D,
    CmpNe = 0x0E,
    CmpGt = 0x0F,
    CmpLt = 0x10,
    CmpGe = 0x11,
    CmpLe = 0x12,

    // Stack & data
    /// Push an integer literal or a copy of a variable.
    Push = 0x13,
    /// Pop the top value into a variable.
    Pop = 0x14,

    // Control
    /// Unconditional jump to a label.
    Jmp = 0x15,
    /// Pop the top value, jump to a label if it is zero.
    Jz = 0x16,

    // Declaration
    /// Parameter list of a function. Metadata read by CALL, never executed.
    Arg = 0x17,
    /// Declare local variables as fresh uninitialized stack slots.
    Var = 0x18,

    // Calling
    Call = 0x19,
    Ret = 0x1A,
    Exit = 0x1B,
}

/// All opcodes a program may contain, in table order. `Nil` is excluded.
pub const ALL_OPCODES: [Opcode; 27] = [
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Mod,
    Opcode::Neg,
    Opcode::Not,
    Opcode::And,
    Opcode::Or,
    Opcode::BitAnd,
    Opcode::BitOr,
    Opcode::BitXor,
    Opcode::CmpEq,
    Opcode::CmpNe,
    Opcode::CmpGt,
    Opcode::CmpLt,
    Opcode::CmpGe,
    Opcode::CmpLe,
    Opcode::Push,
    Opcode::Pop,
    Opcode::Jmp,
    Opcode::Jz,
    Opcode::Arg,
    Opcode::Var,
    Opcode::Call,
    Opcode::Ret,
    Opcode::Exit,
];

impl Opcode {
    /// Resolve an operation name. Matching ignores ASCII case.
    ///
    /// Returns [`Opcode::Nil`] when no opcode carries that name.
    pub fn from_name(name: &str) -> Opcode {
        ALL_OPCODES
            .iter()
            .find(|op| op.name().eq_ignore_ascii_case(name))
            .copied()
            .unwrap_or(Opcode::Nil)
    }

    /// Canonical lowercase name used in listings and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Nil => "",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Neg => "neg",
            Opcode::Not => "not",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::BitAnd => "bitand",
            Opcode::BitOr => "bitor",
            Opcode::BitXor => "bitxor",
            Opcode::CmpEq => "cmpeq",
            Opcode::CmpNe => "cmpne",
            Opcode::CmpGt => "cmpgt",
            Opcode::CmpLt => "cmplt",
            Opcode::CmpGe => "cmpge",
            Opcode::CmpLe => "cmple",
            Opcode::Push => "push",
            Opcode::Pop => "pop",
            Opcode::Jmp => "jmp",
            Opcode::Jz => "jz",
            Opcode::Arg => "arg",
            Opcode::Var => "var",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
            Opcode::Exit => "exit",
        }
    }

    /// Whether the engine has a handler for this opcode.
    ///
    /// `Arg` is named but has no handler: CALL reads it as metadata.
    /// `Nil` has neither.
    pub fn has_handler(&self) -> bool {
        !matches!(self, Opcode::Nil | Opcode::Arg)
    }

    /// Opcodes that pop two `Const` cells and push one.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::And
                | Opcode::Or
                | Opcode::BitAnd
                | Opcode::BitOr
                | Opcode::BitXor
                | Opcode::CmpEq
                | Opcode::CmpNe
                | Opcode::CmpGt
                | Opcode::CmpLt
                | Opcode::CmpGe
                | Opcode::CmpLe
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Nil => f.write_str("<nil>"),
            op => f.write_str(op.name()),
        }
    }
}
