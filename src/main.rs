//! # extract-env CLI
//!
//! Binary entry point. Parses arguments, runs the chosen command and turns any
//! error into a message on stderr with exit code 1. Usage errors are left to
//! `clap`, which exits with code 2.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
