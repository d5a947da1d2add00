//! Fetch/execute loop and instruction handlers.
//!
//! Handlers validate everything they need before touching the stack, so a
//! failing instruction leaves the machine exactly as it found it.

use std::mem;

use crate::error::{Fault, RuntimeError, Site};
use crate::frame::Frame;
use crate::machine::{Machine, Step, MAX_STACK_DEPTH};
use crate::value::StackValue;
use hyc_common::{is_identifier, Instruction, Opcode, TOP_OF_STACK};
use tracing::{debug, trace};

/// Where control goes after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Fall through to the next address.
    Next,
    /// Continue at this address.
    Jump(usize),
    /// Stop; `exit_code` is set.
    Halt,
}

/// A RET/EXIT/PUSH argument, classified once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand<'s> {
    Empty,
    Top,
    Literal(i64),
    /// Looks numeric but does not fit in `i64`.
    OutOfRange(&'s str),
    Name(&'s str),
}

fn parse_operand(arg: &str) -> Operand<'_> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Operand::Empty;
    }
    if arg == TOP_OF_STACK {
        return Operand::Top;
    }
    let digits = arg.strip_prefix(&['+', '-'][..]).unwrap_or(arg);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return match arg.parse::<i64>() {
            Ok(value) => Operand::Literal(value),
            Err(_) => Operand::OutOfRange(arg),
        };
    }
    Operand::Name(arg)
}

fn divide(a: i64, b: i64) -> Result<i64, RuntimeError> {
    if b == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(a.wrapping_div(b))
}

fn remainder(a: i64, b: i64) -> Result<i64, RuntimeError> {
    if b == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(a.wrapping_rem(b))
}

fn truth(value: bool) -> i64 {
    value as i64
}

impl<'a> Machine<'a> {
    /// Reset, then execute until EXIT or the first error.
    ///
    /// Returns the exit code.
    pub fn run(&mut self) -> Result<i64, Fault> {
        self.reset();
        loop {
            if let Step::Halted(code) = self.step()? {
                return Ok(code);
            }
        }
    }

    /// Execute one instruction.
    ///
    /// On error the instruction pointer stays on the failing instruction.
    pub fn step(&mut self) -> Result<Step, Fault> {
        if self.halted {
            return Ok(Step::Halted(self.exit_code));
        }

        let program = self.program;
        let instr = program.get(self.ip).ok_or_else(|| {
            Fault::new(
                Site::address(self.ip),
                RuntimeError::PcOutOfBounds {
                    pc: self.ip,
                    len: program.len(),
                },
            )
        })?;

        trace!(
            ip = self.ip,
            opcode = %instr.opcode,
            argument = %instr.argument,
            depth = self.stack.len(),
            "exec"
        );

        let flow = self
            .dispatch(instr)
            .map_err(|error| Fault::new(Site::instruction(self.ip, instr), error))?;

        match flow {
            Flow::Next => self.ip += 1,
            Flow::Jump(target) => self.ip = target,
            Flow::Halt => {
                self.halted = true;
                return Ok(Step::Halted(self.exit_code));
            }
        }
        Ok(Step::Running)
    }

    fn dispatch(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        match instr.opcode {
            Opcode::Nil => Err(RuntimeError::NilOpcode),
            // Parameter metadata, read by CALL.
            Opcode::Arg => Ok(Flow::Next),

            // Arithmetic
            Opcode::Add => self.exec_binary(|a, b| Ok(a.wrapping_add(b))),
            Opcode::Sub => self.exec_binary(|a, b| Ok(a.wrapping_sub(b))),
            Opcode::Mul => self.exec_binary(|a, b| Ok(a.wrapping_mul(b))),
            Opcode::Div => self.exec_binary(divide),
            Opcode::Mod => self.exec_binary(remainder),
            Opcode::Neg => self.exec_unary(i64::wrapping_neg),

            // Logical
            Opcode::Not => self.exec_unary(|a| truth(a == 0)),
            Opcode::And => self.exec_binary(|a, b| Ok(truth(a != 0 && b != 0))),
            Opcode::Or => self.exec_binary(|a, b| Ok(truth(a != 0 || b != 0))),

            // Bitwise
            Opcode::BitAnd => self.exec_binary(|a, b| Ok(a & b)),
            Opcode::BitOr => self.exec_binary(|a, b| Ok(a | b)),
            Opcode::BitXor => self.exec_binary(|a, b| Ok(a ^ b)),

            // Comparison
            Opcode::CmpEq => self.exec_binary(|a, b| Ok(truth(a == b))),
            Opcode::CmpNe => self.exec_binary(|a, b| Ok(truth(a != b))),
            Opcode::CmpGt => self.exec_binary(|a, b| Ok(truth(a > b))),
            Opcode::CmpLt => self.exec_binary(|a, b| Ok(truth(a < b))),
            Opcode::CmpGe => self.exec_binary(|a, b| Ok(truth(a >= b))),
            Opcode::CmpLe => self.exec_binary(|a, b| Ok(truth(a <= b))),

            Opcode::Push => self.exec_push(instr),
            Opcode::Pop => self.exec_pop(instr),
            Opcode::Jmp => self.exec_jmp(instr),
            Opcode::Jz => self.exec_jz(instr),
            Opcode::Var => self.exec_var(instr),
            Opcode::Call => self.exec_call(instr),
            Opcode::Ret => self.exec_ret(instr),
            Opcode::Exit => self.exec_exit(instr),
        }
    }

    // ---- Operators ----

    /// Replace the top two `Const` cells with `op(second, top)`.
    fn exec_binary(
        &mut self,
        op: fn(i64, i64) -> Result<i64, RuntimeError>,
    ) -> Result<Flow, RuntimeError> {
        self.require(2)?;
        let b = self.operand(0)?;
        let a = self.operand(1)?;
        let result = op(a, b)?;

        self.stack.truncate(self.stack.len() - 2);
        self.stack.push(StackValue::Const(result));
        Ok(Flow::Next)
    }

    /// Replace the top `Const` cell with `op(top)`.
    fn exec_unary(&mut self, op: fn(i64) -> i64) -> Result<Flow, RuntimeError> {
        self.require(1)?;
        let a = self.operand(0)?;
        if let Some(top) = self.stack.last_mut() {
            *top = StackValue::Const(op(a));
        }
        Ok(Flow::Next)
    }

    // ---- Data ----

    fn exec_push(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let value = match parse_operand(&instr.argument) {
            Operand::Empty => {
                return Err(RuntimeError::MissingOperand {
                    opcode: Opcode::Push,
                })
            }
            Operand::Literal(value) => value,
            Operand::OutOfRange(text) => self.load_const_or_out_of_range(text)?,
            Operand::Top => self.load_const(TOP_OF_STACK)?,
            Operand::Name(name) => self.load_const(name)?,
        };
        self.push(StackValue::Const(value))?;
        Ok(Flow::Next)
    }

    fn exec_pop(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let name = instr.argument.trim();
        if name.is_empty() {
            return Err(RuntimeError::MissingOperand {
                opcode: Opcode::Pop,
            });
        }
        self.require(1)?;
        let value = self.operand(0)?;
        let slot = self.slot_of(name)?;
        match self.stack.get_mut(slot) {
            Some(cell) => *cell = StackValue::Const(value),
            None => {
                return Err(RuntimeError::CorruptFrame {
                    reason: "variable slot above stack top",
                })
            }
        }
        self.stack.pop();
        Ok(Flow::Next)
    }

    /// Declare each listed name as a fresh `Uninit` slot, in order.
    fn exec_var(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let names = instr.names();
        if names.is_empty() {
            return Err(RuntimeError::MissingOperand {
                opcode: Opcode::Var,
            });
        }
        check_declarations(self.frame()?, &names)?;
        if self.stack.len() + names.len() > MAX_STACK_DEPTH {
            return Err(RuntimeError::StackOverflow {
                limit: MAX_STACK_DEPTH,
            });
        }

        for name in names {
            let slot = self.stack.len();
            self.push(StackValue::Uninit)?;
            self.frame_mut()?.bind(name, slot);
        }
        Ok(Flow::Next)
    }

    // ---- Control ----

    fn exec_jmp(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let target = self.resolve_label(&instr.argument)?;
        Ok(Flow::Jump(target))
    }

    fn exec_jz(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let target = self.resolve_label(&instr.argument)?;
        self.require(1)?;
        let condition = self.operand(0)?;
        self.stack.pop();
        if condition == 0 {
            Ok(Flow::Jump(target))
        } else {
            Ok(Flow::Next)
        }
    }

    /// Bind the callee's parameters to the caller's top cells, park the
    /// caller's frame, and push `ArgCount`, `SavedIp`, `SavedFrame`.
    fn exec_call(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let program = self.program;
        let name = instr.argument.trim();
        let target = program
            .function_address(name)
            .ok_or_else(|| RuntimeError::UndefinedFunction(name.to_string()))?;

        let (params, entry) = match program.parameters_at(target) {
            Some(decl) => (decl.names(), target + 1),
            None => (Vec::new(), target),
        };

        let mut frame = Frame::new();
        check_declarations(&frame, &params)?;
        let argc = params.len();
        self.require(argc)?;
        let base = self.stack.len() - argc;
        for (offset, param) in params.iter().enumerate() {
            frame.bind(param, base + offset);
        }

        if self.stack.len() + 3 > MAX_STACK_DEPTH {
            return Err(RuntimeError::StackOverflow {
                limit: MAX_STACK_DEPTH,
            });
        }

        let callee = self.frames.alloc(frame);
        let caller = mem::replace(&mut self.current, callee);
        self.stack.push(StackValue::ArgCount(argc));
        self.stack.push(StackValue::SavedIp(self.ip));
        self.stack.push(StackValue::SavedFrame(caller));

        debug!(
            function = name,
            args = argc,
            entry,
            frame = %callee,
            "call"
        );
        Ok(Flow::Jump(entry))
    }

    /// Unwind to the nearest `SavedFrame`, drop the call's arguments and
    /// locals, reinstate the caller, and push the return value.
    fn exec_ret(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let value = self.resolve_value(&instr.argument)?;

        let (frame_cell, caller) = self
            .stack
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, cell)| match cell {
                StackValue::SavedFrame(id) => Some((index, *id)),
                _ => None,
            })
            .ok_or(RuntimeError::CorruptFrame {
                reason: "no saved frame on stack",
            })?;

        let ip_cell = frame_cell.checked_sub(1);
        let return_ip = match ip_cell.map(|index| self.stack[index]) {
            Some(StackValue::SavedIp(ip)) => ip,
            _ => {
                return Err(RuntimeError::CorruptFrame {
                    reason: "missing saved instruction pointer",
                })
            }
        };

        let count_cell = frame_cell.checked_sub(2).ok_or(RuntimeError::CorruptFrame {
            reason: "missing argument count",
        })?;
        let argc = match self.stack[count_cell] {
            StackValue::ArgCount(n) => n,
            _ => {
                return Err(RuntimeError::CorruptFrame {
                    reason: "missing argument count",
                })
            }
        };
        let args_start = count_cell
            .checked_sub(argc)
            .ok_or(RuntimeError::CorruptFrame {
                reason: "argument count exceeds stack",
            })?;

        if self.frames.get(caller).is_none() {
            return Err(RuntimeError::CorruptFrame {
                reason: "saved frame missing from arena",
            });
        }

        let finished = mem::replace(&mut self.current, caller);
        self.frames.release(finished);
        self.stack.truncate(args_start);
        self.stack.push(value);

        debug!(
            return_to = return_ip + 1,
            value = %value,
            frame = %caller,
            "ret"
        );
        Ok(Flow::Jump(return_ip + 1))
    }

    fn exec_exit(&mut self, instr: &Instruction) -> Result<Flow, RuntimeError> {
        let code = match self.resolve_value(&instr.argument)? {
            StackValue::Const(v) => v,
            StackValue::Uninit => 0,
            other => {
                return Err(RuntimeError::NotAConstant {
                    found: other.kind_name(),
                })
            }
        };
        self.exit_code = code;
        debug!(exit_code = code, depth = self.stack.len(), "exit");
        Ok(Flow::Halt)
    }

    // ---- Helpers ----

    fn resolve_label(&self, argument: &str) -> Result<usize, RuntimeError> {
        let name = argument.trim();
        self.program
            .label_address(name)
            .ok_or_else(|| RuntimeError::UndefinedLabel(name.to_string()))
    }

    /// A variable's value, which must be `Const`.
    fn load_const(&self, name: &str) -> Result<i64, RuntimeError> {
        let cell = self.load(name)?;
        cell.as_const().ok_or(RuntimeError::NotAConstant {
            found: cell.kind_name(),
        })
    }

    /// Out-of-range literals still get a variable lookup; if that finds
    /// nothing the literal is what gets reported.
    fn load_const_or_out_of_range(&self, text: &str) -> Result<i64, RuntimeError> {
        match self.load_const(text) {
            Err(RuntimeError::UndefinedVariable(_)) => {
                Err(RuntimeError::LiteralOutOfRange(text.to_string()))
            }
            other => other,
        }
    }

    /// Value named by a RET/EXIT argument.
    ///
    /// Empty gives `Uninit`, `~` the top cell, a literal its `Const`, an
    /// identifier the variable's cell. A bookkeeping cell on top means the
    /// call produced nothing and also gives `Uninit`.
    fn resolve_value(&self, argument: &str) -> Result<StackValue, RuntimeError> {
        match parse_operand(argument) {
            Operand::Empty => Ok(StackValue::Uninit),
            Operand::Top => {
                self.require(1)?;
                match self.stack.last().copied() {
                    Some(cell) if cell.is_bookkeeping() => Ok(StackValue::Uninit),
                    Some(cell) => Ok(cell),
                    None => Err(RuntimeError::StackUnderflow {
                        needed: 1,
                        depth: 0,
                    }),
                }
            }
            Operand::Literal(v) => Ok(StackValue::Const(v)),
            Operand::OutOfRange(text) => self
                .load_const_or_out_of_range(text)
                .map(StackValue::Const),
            Operand::Name(name) => {
                let cell = self.load(name)?;
                if cell.is_bookkeeping() {
                    return Err(RuntimeError::NotAConstant {
                        found: cell.kind_name(),
                    });
                }
                Ok(cell)
            }
        }
    }
}

/// Every name must be an identifier, unique in the list, and unbound in
/// `frame`.
fn check_declarations(frame: &Frame, names: &[&str]) -> Result<(), RuntimeError> {
    for (index, name) in names.iter().enumerate() {
        if !is_identifier(name) {
            return Err(RuntimeError::InvalidIdentifier(name.to_string()));
        }
        if frame.contains(name) || names[..index].contains(name) {
            return Err(RuntimeError::Redeclared(name.to_string()));
        }
    }
    Ok(())
}
