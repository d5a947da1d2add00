//! hyc CLI: assemble and run stack-machine programs.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Usage/read/assembly error
//! - 3: Runtime error

mod commands;

use std::process;

use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "run" => commands::run(&args[2..]),
        "listing" => commands::listing(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides the default `warn`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    eprintln!("Usage: hyc <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run <file> [--no-entry] [--no-exit] [--trace]   Assemble and execute");
    eprintln!("  listing <file> [--no-entry] [--no-exit]         Print the assembled program");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --no-entry   Do not prepend `CALL main` / `EXIT ~`");
    eprintln!("  --no-exit    Do not append `EXIT ~`");
    eprintln!("  --trace      Dump machine state to stderr after every instruction");
}
