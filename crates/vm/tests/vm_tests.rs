//! Integration tests for the hyc VM.
//!
//! Programs are written as assembly text and assembled without entry/exit
//! synthesis unless a test says otherwise.

use hyc_assembler::{assemble, Options};
use hyc_common::{Instruction, Opcode, Program};
use hyc_vm::{run, ErrorKind, Fault, Machine, RuntimeError, StackValue, Step};

// ============================================================
// Helper functions
// ============================================================

/// Assemble source exactly as written.
fn bare(src: &str) -> Program {
    assemble(src, Options::bare()).unwrap()
}

/// Assemble bare and run to completion.
fn run_src(src: &str) -> Result<i64, Fault> {
    run(&bare(src))
}

/// Assemble bare, run, and return the fault.
fn fault(src: &str) -> Fault {
    run_src(src).unwrap_err()
}

/// Step until the instruction pointer reaches `address` (or the program
/// halts or fails).
fn step_to(machine: &mut Machine<'_>, address: usize) {
    while machine.ip() != address {
        match machine.step() {
            Ok(Step::Running) => {}
            other => panic!("did not reach {address}: {other:?}"),
        }
    }
}

// ============================================================
// Documented scenarios
// ============================================================

#[test]
fn variable_roundtrip_then_add_exits_five() {
    let src = "VAR a\nPUSH 2\nPOP a\nPUSH a\nPUSH 3\nadd\nEXIT ~";
    assert_eq!(run_src(src), Ok(5));
}

#[test]
fn main_with_entry_synthesis_exits_ten() {
    let src = "FUNC @main:\nVAR x\nPUSH 10\nPOP x\nRET x\nENDFUNC";
    let program = assemble(src, Options::default()).unwrap();
    assert_eq!(run(&program), Ok(10));
}

// ============================================================
// Arithmetic, logical, bitwise, comparison
// ============================================================

#[test]
fn arithmetic_operand_order() {
    assert_eq!(run_src("push 10\npush 3\nsub\nexit ~"), Ok(7));
    assert_eq!(run_src("push 6\npush 7\nmul\nexit ~"), Ok(42));
    assert_eq!(run_src("push 7\npush 2\ndiv\nexit ~"), Ok(3));
    assert_eq!(run_src("push -7\npush 2\nmod\nexit ~"), Ok(-1));
    assert_eq!(run_src("push 5\nneg\nexit ~"), Ok(-5));
}

#[test]
fn arithmetic_wraps() {
    assert_eq!(
        run_src("push 9223372036854775807\npush 1\nadd\nexit ~"),
        Ok(i64::MIN)
    );
    assert_eq!(
        run_src("push -9223372036854775808\nneg\nexit ~"),
        Ok(i64::MIN)
    );
}

#[test]
fn logical_ops_produce_zero_or_one() {
    assert_eq!(run_src("push 0\nnot\nexit ~"), Ok(1));
    assert_eq!(run_src("push 5\nnot\nexit ~"), Ok(0));
    assert_eq!(run_src("push 3\npush -2\nand\nexit ~"), Ok(1));
    assert_eq!(run_src("push 3\npush 0\nand\nexit ~"), Ok(0));
    assert_eq!(run_src("push 0\npush 9\nor\nexit ~"), Ok(1));
    assert_eq!(run_src("push 0\npush 0\nor\nexit ~"), Ok(0));
}

#[test]
fn bitwise_ops() {
    assert_eq!(run_src("push 12\npush 10\nbitand\nexit ~"), Ok(8));
    assert_eq!(run_src("push 12\npush 10\nbitor\nexit ~"), Ok(14));
    assert_eq!(run_src("push 12\npush 10\nbitxor\nexit ~"), Ok(6));
}

#[test]
fn comparisons_compare_second_against_top() {
    assert_eq!(run_src("push 3\npush 5\ncmplt\nexit ~"), Ok(1));
    assert_eq!(run_src("push 3\npush 5\ncmpgt\nexit ~"), Ok(0));
    assert_eq!(run_src("push 5\npush 5\ncmpge\nexit ~"), Ok(1));
    assert_eq!(run_src("push 5\npush 5\ncmple\nexit ~"), Ok(1));
    assert_eq!(run_src("push 5\npush 5\ncmpeq\nexit ~"), Ok(1));
    assert_eq!(run_src("push 5\npush 4\ncmpne\nexit ~"), Ok(1));
}

#[test]
fn add_underflow_leaves_ip_on_failing_instruction() {
    let program = bare("add\nexit ~");
    let mut machine = Machine::new(&program);
    let err = machine.step().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Stack);
    assert_eq!(err.site.at, 0);
    assert_eq!(err.site.opcode, Opcode::Add);
    assert_eq!(machine.ip(), 0);
    assert!(machine.stack().is_empty());
}

#[test]
fn division_by_zero_leaves_stack_unchanged() {
    for op in ["div", "mod"] {
        let program = bare(&format!("push 4\npush 0\n{op}\nexit ~"));
        let mut machine = Machine::new(&program);
        machine.step().unwrap();
        machine.step().unwrap();
        let err = machine.step().unwrap_err();
        assert_eq!(err.error, RuntimeError::DivisionByZero);
        assert_eq!(err.kind(), ErrorKind::Arithmetic);
        assert_eq!(
            machine.stack(),
            &[StackValue::Const(4), StackValue::Const(0)]
        );
        assert_eq!(machine.ip(), 2);
    }
}

#[test]
fn binary_op_on_uninit_is_type_error() {
    let err = fault("var x\npush 1\nadd\nexit ~");
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.error, RuntimeError::NotAConstant { found: "UNINIT" });
}

// ============================================================
// PUSH / POP / VAR
// ============================================================

#[test]
fn push_uninit_variable_is_type_error() {
    let err = fault("var x\npush x\nexit ~");
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.site.at, 1);
}

#[test]
fn push_undefined_variable() {
    let err = fault("push y\nexit ~");
    assert_eq!(err.error, RuntimeError::UndefinedVariable("y".to_string()));
    assert_eq!(err.kind(), ErrorKind::Name);
}

#[test]
fn push_out_of_range_literal_is_distinguished() {
    let err = fault("push 99999999999999999999\nexit ~");
    assert_eq!(
        err.error,
        RuntimeError::LiteralOutOfRange("99999999999999999999".to_string())
    );
    assert_eq!(err.kind(), ErrorKind::Name);
}

#[test]
fn push_without_argument() {
    let err = fault("push\nexit ~");
    assert_eq!(
        err.error,
        RuntimeError::MissingOperand {
            opcode: Opcode::Push
        }
    );
}

#[test]
fn pop_into_undeclared_variable() {
    let err = fault("push 1\npop z\nexit ~");
    assert_eq!(err.error, RuntimeError::UndefinedVariable("z".to_string()));
}

#[test]
fn pop_empty_stack_underflows() {
    let err = fault("var x\npop x\nexit ~");
    // `var x` pushed one cell, but it is the variable itself and UNINIT.
    assert_eq!(err.kind(), ErrorKind::Type);

    let err = fault("pop x\nexit ~");
    assert_eq!(err.kind(), ErrorKind::Stack);
}

#[test]
fn var_declares_slots_in_order() {
    let program = bare("var a, b, c\nexit 0");
    let mut machine = Machine::new(&program);
    machine.step().unwrap();
    assert_eq!(machine.stack(), &[StackValue::Uninit; 3]);
    assert_eq!(machine.bindings(), vec![("a", 0), ("b", 1), ("c", 2)]);
}

#[test]
fn var_redeclaration_rejected() {
    let err = fault("var x\nvar x\nexit ~");
    assert_eq!(err.error, RuntimeError::Redeclared("x".to_string()));
    assert_eq!(err.site.at, 1);

    let err = fault("var y, y\nexit ~");
    assert_eq!(err.error, RuntimeError::Redeclared("y".to_string()));
}

#[test]
fn var_invalid_identifier() {
    let err = fault("var 1x\nexit ~");
    assert_eq!(err.error, RuntimeError::InvalidIdentifier("1x".to_string()));
}

#[test]
fn var_list_with_blank_entry_rejected() {
    for src in ["var a,,b\nexit 7", "var a,\nexit 7", "var , a\nexit 7"] {
        let program = bare(src);
        let mut machine = Machine::new(&program);
        let err = machine.run().unwrap_err();
        assert_eq!(err.error, RuntimeError::InvalidIdentifier(String::new()));
        assert_eq!(err.site.at, 0);
        assert!(machine.stack().is_empty());
        assert!(machine.bindings().is_empty());
    }
}

#[test]
fn parameter_list_with_blank_entry_rejected() {
    let src = "\
push 1
push 2
call f
exit ~
FUNC @f:
f.arg a,,b
push a
push b
add
ret ~
";
    let err = fault(src);
    assert_eq!(err.error, RuntimeError::InvalidIdentifier(String::new()));
    assert_eq!(err.kind(), ErrorKind::Name);
    assert_eq!(err.site.at, 2);
}

// ============================================================
// JMP / JZ
// ============================================================

#[test]
fn countdown_loop_sums() {
    let src = "\
var n, acc
push 4
pop n
push 0
pop acc
loop: push n
jz done
push acc
push n
add
pop acc
push n
push 1
sub
pop n
jmp loop
done: exit acc
";
    assert_eq!(run_src(src), Ok(10));
}

#[test]
fn jz_pops_condition() {
    let program = bare("push 7\npush 1\njz skip\nskip: exit ~");
    let mut machine = Machine::new(&program);
    step_to(&mut machine, 3);
    assert_eq!(machine.stack(), &[StackValue::Const(7)]);
    assert_eq!(machine.run(), Ok(7));
}

#[test]
fn jump_to_undefined_label() {
    let err = fault("jmp nowhere");
    assert_eq!(err.error, RuntimeError::UndefinedLabel("nowhere".to_string()));
    assert_eq!(err.kind(), ErrorKind::Name);
}

#[test]
fn jz_on_uninit_is_type_error() {
    let err = fault("var x\njz end\nend: exit 0");
    assert_eq!(err.kind(), ErrorKind::Type);
}

// ============================================================
// CALL / RET / EXIT
// ============================================================

#[test]
fn call_binds_parameters_and_returns_value() {
    let src = "\
push 5
push 7
call addtwo
exit ~
FUNC @addtwo:
addtwo.arg a, b
push a
push b
add
ret ~
";
    let program = bare(src);
    let mut machine = Machine::new(&program);
    step_to(&mut machine, 5);
    assert_eq!(machine.variable("a"), Some(StackValue::Const(5)));
    assert_eq!(machine.variable("b"), Some(StackValue::Const(7)));
    assert_eq!(machine.frame_count(), 2);
    step_to(&mut machine, 3);
    // depth before call (2) - argc (2) + 1
    assert_eq!(machine.stack(), &[StackValue::Const(12)]);
    assert_eq!(machine.frame_count(), 1);
    assert_eq!(machine.step(), Ok(Step::Halted(12)));
}

#[test]
fn call_pushes_bookkeeping_in_order() {
    let src = "push 1\ncall f\nexit ~\nFUNC @f:\nf.arg n\nret n";
    let program = bare(src);
    let mut machine = Machine::new(&program);
    machine.step().unwrap();
    machine.step().unwrap();
    let stack = machine.stack();
    assert_eq!(stack.len(), 4);
    assert_eq!(stack[0], StackValue::Const(1));
    assert_eq!(stack[1], StackValue::ArgCount(1));
    assert_eq!(stack[2], StackValue::SavedIp(1));
    assert!(matches!(stack[3], StackValue::SavedFrame(_)));
    assert_eq!(machine.ip(), 4);
}

#[test]
fn caller_bindings_restored_after_return() {
    let src = "\
var x
push 3
pop x
push x
call double
pop x
exit x
FUNC @double:
double.arg x
push x
push x
add
ret ~
";
    let program = bare(src);
    let mut machine = Machine::new(&program);
    assert_eq!(machine.run(), Ok(6));
    assert_eq!(machine.variable("x"), Some(StackValue::Const(6)));
    assert_eq!(machine.bindings(), vec![("x", 0)]);
    assert_eq!(machine.frame_count(), 1);
}

#[test]
fn recursive_factorial() {
    let src = "\
push 5
call fact
exit ~
FUNC @fact:
fact.arg n
push n
jz base
push n
push n
push 1
sub
call fact
mul
ret ~
base: ret 1
";
    assert_eq!(run_src(src), Ok(120));
}

#[test]
fn void_function_returns_uninit() {
    let src = "call noop\nexit ~\nFUNC @noop:\nENDFUNC";
    let program = bare(src);
    let mut machine = Machine::new(&program);
    step_to(&mut machine, 1);
    assert_eq!(machine.stack(), &[StackValue::Uninit]);
    assert_eq!(machine.run(), Ok(0));
}

#[test]
fn ret_variants() {
    assert_eq!(run_src("call f\nexit ~\nFUNC @f:\nret 42"), Ok(42));
    assert_eq!(run_src("call f\nexit ~\nFUNC @f:\nret"), Ok(0));
    assert_eq!(
        run_src("call f\nexit ~\nFUNC @f:\nvar r\npush -4\npop r\nret r"),
        Ok(-4)
    );
}

#[test]
fn ret_outside_call_is_corrupt_frame() {
    let err = fault("push 1\nret ~");
    assert!(matches!(err.error, RuntimeError::CorruptFrame { .. }));
    assert_eq!(err.kind(), ErrorKind::Stack);
    assert_eq!(err.site.at, 1);
}

#[test]
fn call_undefined_function() {
    let err = fault("call nope");
    assert_eq!(err.error, RuntimeError::UndefinedFunction("nope".to_string()));
}

#[test]
fn call_with_too_few_arguments_underflows() {
    let err = fault("push 1\ncall f\nexit ~\nFUNC @f:\nf.arg a, b\nret ~");
    assert_eq!(err.kind(), ErrorKind::Stack);
    assert_eq!(err.site.at, 1);
}

#[test]
fn unbounded_recursion_overflows() {
    let err = fault("call spin\nFUNC @spin:\ncall spin");
    assert_eq!(
        err.error,
        RuntimeError::StackOverflow {
            limit: hyc_vm::MAX_STACK_DEPTH
        }
    );
    assert_eq!(err.kind(), ErrorKind::Stack);
}

#[test]
fn exit_forms() {
    assert_eq!(run_src("exit 42"), Ok(42));
    assert_eq!(run_src("exit -3"), Ok(-3));
    assert_eq!(run_src("exit"), Ok(0));
    assert_eq!(run_src("var x\nexit x"), Ok(0));
}

#[test]
fn exit_does_not_unwind() {
    let program = bare("push 1\npush 2\nexit 9");
    let mut machine = Machine::new(&program);
    assert_eq!(machine.run(), Ok(9));
    assert!(machine.is_halted());
    assert_eq!(machine.exit_code(), 9);
    assert_eq!(machine.stack().len(), 2);
    assert_eq!(machine.step(), Ok(Step::Halted(9)));
}

#[test]
fn exit_top_over_bookkeeping_reads_uninit() {
    let program = bare("call f\nFUNC @f:\nexit ~");
    let mut machine = Machine::new(&program);
    assert_eq!(machine.run(), Ok(0));
    assert_eq!(machine.stack().len(), 3);
}

// ============================================================
// Engine loop
// ============================================================

#[test]
fn arg_in_linear_flow_is_skipped() {
    assert_eq!(run_src("arg a\npush 1\nexit ~"), Ok(1));
}

#[test]
fn running_off_the_end() {
    let err = fault("push 1");
    assert_eq!(err.error, RuntimeError::PcOutOfBounds { pc: 1, len: 1 });
    assert_eq!(err.kind(), ErrorKind::Bounds);
    assert_eq!(err.site.at, 1);
}

#[test]
fn empty_program_is_out_of_bounds() {
    let err = run(&Program::new(vec![])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Bounds);
}

#[test]
fn nil_opcode_is_fatal() {
    let program = Program::new(vec![Instruction::new(Opcode::Nil, "")]);
    let err = run(&program).unwrap_err();
    assert_eq!(err.error, RuntimeError::NilOpcode);
    assert_eq!(err.kind(), ErrorKind::Bounds);
}

#[test]
fn fault_reports_labels_opcode_and_argument() {
    let err = fault("push 1\nL1: push y\nexit ~");
    assert_eq!(err.site.at, 1);
    assert_eq!(err.site.labels, vec!["L1"]);
    assert_eq!(err.site.opcode, Opcode::Push);
    assert_eq!(err.site.argument, "y");
    assert_eq!(
        err.to_string(),
        "instruction 1 (L1: push y): undefined variable 'y'"
    );
}

#[test]
fn run_resets_between_runs() {
    let program = bare("push 2\npush 3\nmul\nexit ~");
    let mut machine = Machine::new(&program);
    assert_eq!(machine.run(), Ok(6));
    assert_eq!(machine.run(), Ok(6));
    assert_eq!(machine.stack(), &[StackValue::Const(6)]);
}

#[test]
fn machine_dump_after_call() {
    let src = "push 1\ncall f\nexit ~\nFUNC @f:\nf.arg n\nret n";
    let program = bare(src);
    let mut machine = Machine::new(&program);
    step_to(&mut machine, 4);
    let dump = machine.to_string();
    assert!(dump.starts_with("ip: 0004\nstack (4):\n"));
    assert!(dump.contains("[0001] ARG_COUNT 1"));
    assert!(dump.contains("[0002] SAVED_IP 0001"));
    assert!(dump.contains("  n -> [0000] CONST 1"));
}

// ============================================================
// Property tests
// ============================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// N binary operations shrink the stack by N.
        #[test]
        fn binary_ops_consume_one_net_cell(values in prop::collection::vec(any::<i64>(), 1..20)) {
            let mut instrs: Vec<Instruction> = values
                .iter()
                .map(|v| Instruction::new(Opcode::Push, v.to_string()))
                .collect();
            for _ in 1..values.len() {
                instrs.push(Instruction::new(Opcode::Add, ""));
            }
            instrs.push(Instruction::new(Opcode::Exit, "~"));
            let program = Program::new(instrs);
            let mut machine = Machine::new(&program);
            let expected = values.iter().fold(0i64, |acc, v| acc.wrapping_add(*v));
            prop_assert_eq!(machine.run(), Ok(expected));
            prop_assert_eq!(machine.stack().len(), 1);
        }

        /// Every binary opcode consumes two cells and produces one.
        #[test]
        fn every_binary_op_nets_minus_one(
            op in prop::sample::select(
                hyc_common::opcode::ALL_OPCODES
                    .iter()
                    .copied()
                    .filter(Opcode::is_binary)
                    .collect::<Vec<_>>()
            ),
            a in any::<i64>(),
            b in 1i64..=i64::MAX,
            filler in prop::collection::vec(any::<i64>(), 0..4),
        ) {
            let mut instrs: Vec<Instruction> = filler
                .iter()
                .chain([a, b].iter())
                .map(|v| Instruction::new(Opcode::Push, v.to_string()))
                .collect();
            instrs.push(Instruction::new(op, ""));
            instrs.push(Instruction::new(Opcode::Exit, "0"));
            let program = Program::new(instrs);
            let mut machine = Machine::new(&program);
            prop_assert_eq!(machine.run(), Ok(0));
            prop_assert_eq!(machine.stack().len(), filler.len() + 1);
        }

        /// NEG and NOT keep the depth.
        #[test]
        fn unary_ops_keep_depth(value in any::<i64>(), neg in any::<bool>()) {
            let op = if neg { "neg" } else { "not" };
            let program = bare(&format!("push {value}\n{op}\nexit 0"));
            let mut machine = Machine::new(&program);
            prop_assert_eq!(machine.run(), Ok(0));
            prop_assert_eq!(machine.stack().len(), 1);
        }

        /// PUSH then POP into a variable round-trips the value.
        #[test]
        fn push_pop_roundtrip(value in any::<i64>()) {
            let src = format!("var x\npush {value}\npop x\npush x\nexit ~");
            prop_assert_eq!(run_src(&src), Ok(value));
        }

        /// JZ branches iff the popped value is zero.
        #[test]
        fn jz_branches_iff_zero(value in prop_oneof![Just(0i64), any::<i64>()]) {
            let src = format!("push {value}\njz zero\nexit 1\nzero: exit 0");
            let expected = if value == 0 { 0 } else { 1 };
            prop_assert_eq!(run_src(&src), Ok(expected));
        }

        /// A call leaves depth - argc + 1 and restores the caller's bindings.
        #[test]
        fn call_ret_is_stack_neutral(
            fillers in prop::collection::vec(any::<i64>(), 0..5),
            args in prop::collection::vec(any::<i64>(), 0..6),
        ) {
            let mut src = String::from("var keep\npush 7\npop keep\n");
            for v in fillers.iter().chain(args.iter()) {
                src.push_str(&format!("push {v}\n"));
            }
            src.push_str("call f\nexit ~\nFUNC @f:\n");
            if !args.is_empty() {
                let params: Vec<String> = (0..args.len()).map(|i| format!("p{i}")).collect();
                src.push_str(&format!("f.arg {}\n", params.join(", ")));
            }
            src.push_str("ret 99\n");

            let program = bare(&src);
            let mut machine = Machine::new(&program);
            prop_assert_eq!(machine.run(), Ok(99));
            let stack = machine.stack();
            // keep + fillers + return value
            prop_assert_eq!(stack.len(), 1 + fillers.len() + 1);
            prop_assert_eq!(stack.last(), Some(&StackValue::Const(99)));
            prop_assert_eq!(machine.variable("keep"), Some(StackValue::Const(7)));
            prop_assert_eq!(machine.frame_count(), 1);
        }
    }
}
