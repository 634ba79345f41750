//! Install command implementation
//!
//! Installs collections given on the command line or in a requirements
//! file, bootstrapping `ansible-core` (and optionally `ansible-dev-tools`)
//! first and finishing with the collections' Python requirements.

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::Args;
use std::path::PathBuf;

use ade::config::Settings;
use ade::installer::{InstallOptions, Installer};
use ade::outcome::Status;

/// Arguments for the install command
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Collections to install: a path, namespace.name[specifier] or a
    /// source control URL. A path may carry optional dependencies, e.g. .[test]
    #[arg(value_name = "COLLECTION")]
    pub collection_specifier: Vec<String>,

    /// Install collections from a requirements file
    #[arg(short, long, value_name = "FILE", conflicts_with = "cpi")]
    pub requirement: Option<PathBuf>,

    /// Install a local collection as symlinks into its source tree
    #[arg(short, long)]
    pub editable: bool,

    /// Install ansible-dev-tools (default)
    #[arg(long, overrides_with = "no_seed")]
    pub seed: bool,

    /// Skip installing ansible-dev-tools
    #[arg(long, overrides_with = "seed", env = "ADE_NO_SEED", value_parser = FalseyValueParser::new())]
    pub no_seed: bool,

    /// Install a specific ansible-core version, branch or URL
    #[arg(long, value_name = "VERSION", env = "ADE_ANSIBLE_CORE_VERSION")]
    pub ansible_core_version: Option<String>,

    /// Install a specific ansible-dev-tools version
    #[arg(long, value_name = "VERSION")]
    pub ansible_dev_tools_version: Option<String>,

    /// Pre-install collections from .config/source-requirements.yml
    #[arg(long)]
    pub cpi: bool,
}

impl InstallArgs {
    pub fn seed(&self) -> bool {
        !self.no_seed
    }

    fn options(&self) -> InstallOptions {
        InstallOptions {
            specifiers: self.collection_specifier.clone(),
            requirement: self.requirement.clone(),
            editable: self.editable,
            seed: self.seed(),
            core_version: self.ansible_core_version.clone(),
            dev_tools_version: self.ansible_dev_tools_version.clone(),
            source_install: self.cpi,
        }
    }
}

/// Execute the install command
pub fn execute(args: InstallArgs, settings: &Settings) -> Result<Status> {
    let (runner, config, ctx) = super::prepare(settings)?;
    let outcome = Installer::new(&config, &runner, &ctx).run(&args.options())?;
    Ok(outcome.status())
}
