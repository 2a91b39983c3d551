//! Moonlit CLI
//!
//! Entry point for the scripting host. Parses CLI arguments and delegates to
//! the Runtime for execution.

use clap::Parser;
use moonlit_cli::{Cli, CliResult, Output, Runtime};
use std::process::ExitCode;

fn print_outputs(outputs: &[Output]) {
    for output in outputs {
        println!("{}", output);
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let mut runtime = Runtime::from_cli(cli)?;

    if let Some(file) = &cli.file {
        print_outputs(&runtime.execute_file(file)?);
    } else if let Some(code) = &cli.eval {
        print_outputs(&runtime.execute_string(code)?);
    } else if cli.repl {
        runtime.repl()?;
    } else {
        println!("Moonlit {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage:");
        println!("  moonlit --file <FILE>     Execute a script file");
        println!("  moonlit --eval <CODE>     Evaluate inline Lua code");
        println!("  moonlit --repl            Start interactive REPL");
        println!();
        println!("Run 'moonlit --help' for more options.");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {}", err.label(), err);
            ExitCode::FAILURE
        }
    }
}
