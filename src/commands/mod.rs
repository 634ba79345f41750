//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `ade`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` plus the global
//!   settings, calls into the `ade` library and returns the run's status.
//!
//! Commands never exit the process themselves; `main` maps the returned
//! status or error to an exit code.

pub mod install;
pub mod list;
pub mod uninstall;

use anyhow::{Context, Result};

use ade::config::{Config, Settings};
use ade::process::SystemRunner;
use ade::request::ResolveContext;

/// Runner, environment and resolution context shared by every command.
pub(crate) fn prepare(settings: &Settings) -> Result<(SystemRunner, Config, ResolveContext)> {
    let runner = SystemRunner::new();
    let config = Config::discover(settings, &runner)?;
    let ctx = ResolveContext::from_process().context("Failed to determine the working directory")?;
    Ok((runner, config, ctx))
}
