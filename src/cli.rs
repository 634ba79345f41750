//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use ade::config::Settings;
use ade::outcome::Status;

use crate::commands;

/// Ansible Development Environment - Manage collections in a virtual environment
#[derive(Parser, Debug)]
#[command(name = "ade")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Target virtual environment.
    #[arg(long, global = true, value_name = "DIR", env = "VIRTUAL_ENV")]
    venv: Option<PathBuf>,

    /// Increase output verbosity; repeat to stream tool output.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Use pip even when uv is available in the environment.
    #[arg(long, global = true, env = "SKIP_UV", value_parser = FalseyValueParser::new())]
    no_uv: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install collections and their Python requirements
    Install(commands::install::InstallArgs),

    /// Uninstall a collection
    Uninstall(commands::uninstall::UninstallArgs),

    /// List installed collections
    List(commands::list::ListArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<Status> {
        self.init_logging()?;
        let settings = self.settings();

        match self.command {
            Commands::Install(args) => commands::install::execute(args, &settings),
            Commands::Uninstall(args) => commands::uninstall::execute(args, &settings),
            Commands::List(args) => commands::list::execute(args, &settings),
        }
    }

    fn settings(&self) -> Settings {
        Settings {
            venv: self.venv.clone(),
            verbose: self.verbose,
            use_uv: !self.no_uv,
            search_path: std::env::var_os("PATH"),
        }
    }

    fn init_logging(&self) -> Result<()> {
        let requested: LevelFilter = self
            .log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid log level '{}'", self.log_level))?;
        let level = match self.verbose {
            0 => requested,
            _ => requested.max(LevelFilter::Debug),
        };
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .format_target(false)
            .format_timestamp(None)
            .try_init();
        Ok(())
    }
}
