//! # External Process Gateway
//!
//! Every interaction with `ansible-galaxy`, `pip`, `git` and the other tools
//! of the target environment goes through the [`CommandRunner`] trait. The
//! lifecycle engine only ever sees a [`CommandSpec`] going in and a
//! [`CommandOutput`] (or a typed [`Error`]) coming out.
//!
//! ## Design
//!
//! - **`CommandRunner`**: the seam. [`SystemRunner`] spawns real processes;
//!   tests substitute a recording fake that simulates the tools.
//! - **Streaming**: when a spec asks for it, output lines are forwarded to
//!   the debug log while they are produced and still captured in full.
//! - **Timeouts**: a spec may carry a time limit. A child that outlives it
//!   is killed and reported as [`Error::Timeout`].
//! - **Progress**: a spinner is drawn on stderr while a buffered command
//!   runs, unless the runner was built without progress display.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use wait_timeout::ChildExt;

use crate::error::{Error, Result};

/// Description of one external command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub stream: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Build a spec from an argv-style prefix such as `["python", "-m", "pip"]`.
    pub fn from_argv(argv: &[String]) -> Self {
        let mut spec = Self::default();
        if let Some((program, rest)) = argv.split_first() {
            spec.program = program.clone();
            spec.args = rest.to_vec();
        }
        spec
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Final path component of the program, e.g. `ansible-galaxy`.
    pub fn program_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external commands on behalf of the lifecycle engine.
pub trait CommandRunner {
    /// Run a command to completion and capture its output.
    ///
    /// A non-zero exit is not an error here; callers that need that inspect
    /// [`CommandOutput::success`] or use [`CommandRunner::run`].
    fn output(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run a command and fail with [`Error::Command`] on a non-zero exit.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.output(spec)?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::Command {
                command: spec.to_string(),
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
    }
}

/// [`CommandRunner`] backed by `std::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    progress: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self { progress: true }
    }

    /// Disable the spinner drawn while buffered commands run.
    pub fn without_progress(mut self) -> Self {
        self.progress = false;
        self
    }

    fn spinner(&self, spec: &CommandSpec) -> Option<ProgressBar> {
        if !self.progress || spec.stream {
            return None;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar.set_message(format!("Running {}", spec.program_name()));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("Running command: {}", spec);
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| Error::Spawn {
            command: spec.to_string(),
            source,
        })?;
        let stdout = child.stdout.take().map(|pipe| capture(pipe, spec.stream));
        let stderr = child.stderr.take().map(|pipe| capture(pipe, spec.stream));

        let spinner = self.spinner(spec);
        let status = match spec.timeout {
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => Some(status),
                None => {
                    child.kill()?;
                    child.wait()?;
                    None
                }
            },
            None => Some(child.wait()?),
        };
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }

        let Some(status) = status else {
            // Readers are detached: a grandchild may still hold the pipes open
            drop((stdout, stderr));
            return Err(Error::Timeout {
                command: spec.to_string(),
                seconds: spec.timeout.map(|t| t.as_secs()).unwrap_or_default(),
            });
        };
        let output = CommandOutput {
            status: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        };
        debug!("Command {} exited with {:?}", spec.program_name(), output.status);
        Ok(output)
    }
}

fn capture<R: Read + Send + 'static>(pipe: R, stream: bool) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut captured = String::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    if stream {
                        debug!("{}", text.trim_end());
                    }
                    captured.push_str(&text);
                }
            }
        }
        captured
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}
