//! Uninstall command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use ade::config::Settings;
use ade::outcome::Status;
use ade::uninstaller::{UninstallOptions, Uninstaller};

/// Arguments for the uninstall command
#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Collection to uninstall, e.g. ansible.utils or a local path
    #[arg(value_name = "COLLECTION")]
    pub collection_specifier: Vec<String>,

    /// Uninstall every collection of a requirements file
    #[arg(short, long, value_name = "FILE")]
    pub requirement: Option<PathBuf>,
}

/// Execute the uninstall command
pub fn execute(args: UninstallArgs, settings: &Settings) -> Result<Status> {
    let (_runner, config, ctx) = super::prepare(settings)?;
    let options = UninstallOptions {
        specifiers: args.collection_specifier,
        requirement: args.requirement,
    };
    let outcome = Uninstaller::new(&config, &ctx).run(&options)?;
    Ok(outcome.status())
}
