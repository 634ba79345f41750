//! # List Command Implementation
//!
//! Prints the collections installed in the environment, one per line, with
//! their version and, for editable installs, the source tree they point at.
//! This command never modifies the environment.

use anyhow::Result;
use clap::Args;

use ade::config::Settings;
use ade::inventory::{self, InstalledCollection};
use ade::outcome::Status;

/// List installed collections
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show only editable installs
    #[arg(long)]
    pub editable: bool,
}

/// Execute the list command
pub fn execute(args: ListArgs, settings: &Settings) -> Result<Status> {
    let (_runner, config, _ctx) = super::prepare(settings)?;
    let mut collections = inventory::installed(&config)?;
    if args.editable {
        collections.retain(|c| c.editable_location.is_some());
    }

    if collections.is_empty() {
        println!("No collections installed in {}", config.site_pkg_path().display());
        return Ok(Status::Success);
    }
    for line in render(&collections) {
        println!("{}", line);
    }
    Ok(Status::Success)
}

fn render(collections: &[InstalledCollection]) -> Vec<String> {
    let name_width = collections
        .iter()
        .map(|c| c.fqcn().len())
        .max()
        .unwrap_or(0);
    let version_width = collections
        .iter()
        .map(|c| c.version.len())
        .max()
        .unwrap_or(0);
    collections
        .iter()
        .map(|c| {
            let line = format!(
                "{:<name_width$}  {:<version_width$}",
                c.fqcn(),
                c.version,
                name_width = name_width,
                version_width = version_width
            );
            match &c.editable_location {
                Some(location) => format!("{}  {}", line, location.display()),
                None => line.trim_end().to_string(),
            }
        })
        .collect()
}
