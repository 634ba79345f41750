//! # Ansible Development Environment CLI
//!
//! This is the binary entry point for the `ade` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Mapping the outcome to an exit code: `0` on success, `2` when the run
//!   completed with warnings, `1` on errors.
//!
//! The core application logic is defined in the `lib.rs` library crate, ensuring
//! that the binary is a thin wrapper around the reusable library functionality.

mod cli;
mod commands;

use std::process::ExitCode;

use ade::outcome::Status;
use clap::Parser;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(Status::Success) => ExitCode::SUCCESS,
        Ok(Status::Warnings) => ExitCode::from(2),
        Ok(Status::Errors) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
