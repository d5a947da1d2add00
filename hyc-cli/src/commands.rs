//! CLI command implementations.

use hyc_assembler::Options;
use hyc_common::Program;
use hyc_vm::{Machine, Step};
use tracing::debug;

/// Input file and flags shared by `run` and `listing`.
#[derive(Debug)]
struct Invocation<'a> {
    input: &'a str,
    options: Options,
    trace: bool,
}

/// Parse `<file> [flags]`. `--trace` is accepted only when `allow_trace`.
fn parse_args<'a>(
    command: &str,
    args: &'a [String],
    allow_trace: bool,
) -> Result<Invocation<'a>, i32> {
    let mut input = None;
    let mut options = Options::default();
    let mut trace = false;

    for arg in args {
        match arg.as_str() {
            "--no-entry" => options.entry_call = false,
            "--no-exit" => options.exit = false,
            "--trace" if allow_trace => trace = true,
            flag if flag.starts_with("--") => {
                eprintln!("error: unknown flag '{flag}' for {command}");
                return Err(1);
            }
            path => {
                if input.is_some() {
                    eprintln!("error: {command} takes exactly one input file");
                    return Err(1);
                }
                input = Some(path);
            }
        }
    }

    match input {
        Some(input) => Ok(Invocation {
            input,
            options,
            trace,
        }),
        None => {
            eprintln!("error: {command} requires an input file");
            eprintln!("Usage: hyc {command} <file> [flags]");
            Err(1)
        }
    }
}

fn load(invocation: &Invocation<'_>) -> Result<Program, i32> {
    hyc_assembler::assemble_file(invocation.input, invocation.options).map_err(|e| {
        eprintln!("error: {e}");
        1
    })
}

/// Assemble and execute a source file; print the exit code.
pub fn run(args: &[String]) -> Result<(), i32> {
    let invocation = parse_args("run", args, true)?;
    let program = load(&invocation)?;
    debug!(input = invocation.input, trace = invocation.trace, "running");

    let outcome = if invocation.trace {
        run_traced(&program)
    } else {
        Machine::new(&program).run()
    };

    match outcome {
        Ok(code) => {
            println!("{code}");
            Ok(())
        }
        Err(e) => {
            eprintln!("runtime error: {e}");
            Err(3)
        }
    }
}

/// Step the machine, dumping its state to stderr after each instruction.
fn run_traced(program: &Program) -> Result<i64, hyc_vm::Fault> {
    let mut machine = Machine::new(program);
    eprint!("{machine}");
    loop {
        let step = machine.step();
        eprintln!("----");
        eprint!("{machine}");
        if let Step::Halted(code) = step? {
            return Ok(code);
        }
    }
}

/// Print the assembled program: instructions, labels, functions.
pub fn listing(args: &[String]) -> Result<(), i32> {
    let invocation = parse_args("listing", args, false)?;
    let program = load(&invocation)?;
    print!("{}", hyc_assembler::listing(&program));
    Ok(())
}
