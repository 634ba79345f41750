//! # Error Handling
//!
//! This module defines the centralized error type for the `ade` library. It
//! uses `thiserror` to describe every failure the lifecycle engine can
//! report, with enough context for the command-line layer to print a useful
//! message.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants carry the offending request, path
//!   or command so the message can be shown to a user as-is. Some variants
//!   carry an optional `hint` which is rendered on its own line.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Compatibility warnings are not errors. They are collected in
//! [`crate::outcome::Outcome`] and never travel through this type.

use std::path::PathBuf;

use thiserror::Error;

fn render_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!("\n  hint: {}", h))
        .unwrap_or_default()
}

/// Main error type for collection lifecycle operations
#[derive(Error, Debug)]
pub enum Error {
    /// A collection request could not be interpreted.
    #[error("Invalid collection request '{request}': {message}{}", render_hint(hint))]
    Request {
        request: String,
        message: String,
        /// Optional hint describing an accepted form
        hint: Option<String>,
    },

    /// A `galaxy.yml` or requirements file is missing, unreadable or incomplete.
    #[error("Collection metadata error in {}: {message}", path.display())]
    Metadata { path: PathBuf, message: String },

    /// An external command ran but exited unsuccessfully.
    #[error("Command failed{}: {command}{}", status.map(|s| format!(" with exit code {}", s)).unwrap_or_default(), if stderr.trim().is_empty() { String::new() } else { format!("\n{}", stderr.trim_end()) })]
    Command {
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// An external command could not be started at all.
    #[error("Unable to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command was killed after running past its time limit.
    #[error("Command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    /// A lifecycle step failed; wraps the underlying cause.
    #[error("{step}: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<Error>,
    },

    /// The filesystem did not end up in the state a step promised.
    #[error("Internal consistency error: {message}")]
    InternalConsistency { message: String },

    /// An editable install could not be materialized.
    #[error("Editable install of {collection} failed: {message}")]
    Editable { collection: String, message: String },

    /// A local collection could not be staged for building.
    #[error("Unable to build {collection}: {message}")]
    Build { collection: String, message: String },

    /// The requested combination of options is not supported.
    #[error("{message}{}", render_hint(hint))]
    Usage {
        message: String,
        hint: Option<String>,
    },

    /// A version or version specifier could not be parsed.
    #[error("Invalid version '{version}': {message}")]
    InvalidVersion { version: String, message: String },

    /// The target virtual environment or one of its tools is unusable.
    #[error("Environment error: {message}{}", render_hint(hint))]
    Environment {
        message: String,
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Attach the name of the lifecycle step that produced this error.
    pub fn in_step(self, step: impl Into<String>) -> Self {
        Error::Step {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// Captured standard error of the failing command, if any.
    ///
    /// Looks through `Step` wrappers.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::Command { stderr, .. } => Some(stderr),
            Error::Step { source, .. } => source.stderr(),
            _ => None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
