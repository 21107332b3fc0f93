//! Psych-DS validator CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use psychds_cli::{init_logging, run, Args};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.debug);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
