//! # Environment Configuration
//!
//! [`Config`] describes the virtual environment every lifecycle operation
//! works against: its root, the interpreter's package directory
//! (site-packages), how to invoke pip, and where to look for tools such as
//! `ansible-galaxy`.
//!
//! The CLI builds a [`Settings`] value from flags and environment variables,
//! then [`Config::discover`] asks the environment's interpreter for its
//! package directory. Nothing below the CLI reads process-wide state.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::defaults::{CACHE_DIR_NAME, COLLECTIONS_DIR};
use crate::error::{Error, Result};
use crate::process::{CommandRunner, CommandSpec};

const SYSCONFIG_SCRIPT: &str = "import json,sysconfig; print(json.dumps(sysconfig.get_paths()))";

#[cfg(windows)]
const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const BIN_DIR: &str = "bin";

/// User-facing settings gathered by the command-line layer.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Virtual environment root.
    pub venv: Option<PathBuf>,
    /// Verbosity, 0 (quiet) to 3 (trace).
    pub verbose: u8,
    /// Use `uv pip` when the environment provides it.
    pub use_uv: bool,
    /// Directories searched for tools missing from the environment.
    pub search_path: Option<OsString>,
}

#[derive(Debug, Deserialize)]
struct SysconfigPaths {
    purelib: PathBuf,
}

/// Resolved view of the target virtual environment.
#[derive(Debug, Clone)]
pub struct Config {
    venv: PathBuf,
    site_pkg_path: PathBuf,
    verbose: u8,
    pip_cmd: Vec<String>,
    search_path: Option<OsString>,
}

impl Config {
    /// Build a configuration from known paths, using `python -m pip`.
    pub fn new(venv: impl Into<PathBuf>, site_pkg_path: impl Into<PathBuf>) -> Self {
        let venv = venv.into();
        let python = venv.join(BIN_DIR).join("python");
        Self {
            pip_cmd: vec![
                python.to_string_lossy().into_owned(),
                "-m".to_string(),
                "pip".to_string(),
            ],
            venv,
            site_pkg_path: site_pkg_path.into(),
            verbose: 0,
            search_path: None,
        }
    }

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_pip_command(mut self, pip_cmd: Vec<String>) -> Self {
        self.pip_cmd = pip_cmd;
        self
    }

    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Locate the environment and ask its interpreter for the package directory.
    pub fn discover(settings: &Settings, runner: &dyn CommandRunner) -> Result<Self> {
        let venv = settings.venv.clone().ok_or_else(|| Error::Environment {
            message: "no virtual environment specified".to_string(),
            hint: Some("Activate one or pass --venv <path>".to_string()),
        })?;
        if !venv.is_dir() {
            return Err(Error::Environment {
                message: format!("virtual environment not found: {}", venv.display()),
                hint: Some(format!("Create it with: python3 -m venv {}", venv.display())),
            });
        }
        let venv = venv.canonicalize()?;
        let python = venv.join(BIN_DIR).join("python");
        if !python.exists() {
            return Err(Error::Environment {
                message: format!("no interpreter found at {}", python.display()),
                hint: None,
            });
        }

        let spec = CommandSpec::new(python.to_string_lossy())
            .args(["-c", SYSCONFIG_SCRIPT]);
        let output = runner
            .run(&spec)
            .map_err(|e| e.in_step("Failed to query the interpreter's package directory"))?;
        let paths: SysconfigPaths = serde_json::from_str(output.stdout.trim())?;
        debug!("Using site-packages directory {}", paths.purelib.display());

        let mut config = Config::new(&venv, paths.purelib)
            .with_verbose(settings.verbose)
            .with_search_path(settings.search_path.clone());
        if settings.use_uv && config.venv_bindir().join("uv").exists() {
            debug!("Using uv for Python package installs");
            config.pip_cmd = vec![
                python.to_string_lossy().into_owned(),
                "-m".to_string(),
                "uv".to_string(),
                "pip".to_string(),
            ];
        }
        Ok(config)
    }

    pub fn venv(&self) -> &Path {
        &self.venv
    }

    pub fn site_pkg_path(&self) -> &Path {
        &self.site_pkg_path
    }

    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Whether external command output should be streamed as it is produced.
    pub fn stream_output(&self) -> bool {
        self.verbose >= 2
    }

    pub fn pip_command(&self) -> &[String] {
        &self.pip_cmd
    }

    /// `<pip> install` ready for package arguments.
    pub fn pip_install(&self) -> CommandSpec {
        CommandSpec::from_argv(&self.pip_cmd)
            .arg("install")
            .stream(self.stream_output())
    }

    pub fn venv_bindir(&self) -> PathBuf {
        self.venv.join(BIN_DIR)
    }

    /// `<site-packages>/ansible_collections`.
    pub fn collections_root(&self) -> PathBuf {
        self.site_pkg_path.join(COLLECTIONS_DIR)
    }

    /// `<venv>/.ansible-dev-environment`.
    pub fn cache_dir(&self) -> PathBuf {
        self.venv.join(CACHE_DIR_NAME)
    }

    pub fn discovered_python_reqs(&self) -> PathBuf {
        self.cache_dir().join("discovered_requirements.txt")
    }

    pub fn discovered_bindep_reqs(&self) -> PathBuf {
        self.cache_dir().join("discovered_bindep.txt")
    }

    /// Find a tool in the environment, then an executable on the search path.
    pub fn find_tool(&self, name: &str) -> Option<PathBuf> {
        let local = [self.venv_bindir(), self.site_pkg_path.join(BIN_DIR)]
            .into_iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file());
        if local.is_some() {
            return local;
        }
        let search_path = self.search_path.as_ref()?;
        which::which_in(name, Some(search_path), &self.venv)
            .inspect_err(|e| debug!("{} not found on the search path: {}", name, e))
            .ok()
    }

    /// The `ansible-galaxy` executable.
    pub fn galaxy_bin(&self) -> Result<PathBuf> {
        self.find_tool("ansible-galaxy")
            .ok_or_else(|| Error::Environment {
                message: "ansible-galaxy not found".to_string(),
                hint: Some("Install ansible-core into the virtual environment".to_string()),
            })
    }
}
