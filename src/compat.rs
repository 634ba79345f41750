//! # Runtime Version Compatibility
//!
//! Helpers for choosing and checking the `ansible-core` version installed
//! into an environment:
//!
//! - [`resolve_core_package`] maps a user-supplied version token to what
//!   pip is asked to install (a pinned release, or a development-channel
//!   archive).
//! - [`parse_version`], [`parse_constraint`] and [`satisfies`] compare a
//!   requested runtime version against a published constraint using
//!   `pep440_rs`.
//! - [`CompatibilityAdvisor`] asks pip which `ansible-core` range the
//!   developer-tools meta-package accepts and reports a mismatch as a
//!   [`CompatibilityWarning`]. Every lookup failure is silently treated as
//!   "nothing to report".

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::debug;
use pep440_rs::{Version, VersionSpecifiers};
use regex::RegexBuilder;

use crate::config::Config;
use crate::defaults::{CORE_PACKAGE, CORE_REPO_URL, DRY_RUN_TIMEOUT, META_PACKAGE};
use crate::error::{Error, Result};
use crate::process::{CommandRunner, CommandSpec};

const CONSTRAINT_CAPTURE: &str = r"([><=!~]+[\d.]+(?:\.\*)?)";

/// Map a requested `ansible-core` version to a pip requirement.
///
/// - anything containing `://` is passed through unchanged;
/// - `devel`, `milestone` and `stable-X.Y` become archive URLs;
/// - everything else is pinned with `==`.
pub fn resolve_core_package(version: &str) -> String {
    let version = version.trim();
    if version.contains("://") {
        version.to_string()
    } else if version == "devel" || version == "milestone" || version.starts_with("stable-") {
        format!("{}/{}.tar.gz", CORE_REPO_URL, version)
    } else {
        format!("{}=={}", CORE_PACKAGE, version)
    }
}

/// Parse a Python package version such as `2.16.0` or `2.19.0rc1`.
pub fn parse_version(text: &str) -> Result<Version> {
    Version::from_str(text.trim()).map_err(|e| Error::InvalidVersion {
        version: text.to_string(),
        message: e.to_string(),
    })
}

/// Parse comma-separated specifiers such as `>=2.16.0, <2.19`.
pub fn parse_constraint(text: &str) -> Result<VersionSpecifiers> {
    VersionSpecifiers::from_str(text.trim()).map_err(|e| Error::InvalidVersion {
        version: text.to_string(),
        message: e.to_string(),
    })
}

/// Whether `requested` satisfies every clause of `constraint`.
///
/// Pre-releases are compared like final releases: a requested runtime
/// version is explicit, so there is no opt-in to wait for.
pub fn satisfies(constraint: &VersionSpecifiers, requested: &Version) -> bool {
    if requested.any_prerelease() {
        debug!("Comparing pre-release {} as requested", requested);
    }
    constraint.iter().all(|specifier| specifier.contains(requested))
}

/// Ask pip which constraint `package` places on `dependency`.
///
/// Returns `None` when the query fails, times out, exits non-zero, or its
/// output mentions no constraint.
pub fn dependency_constraint(
    runner: &dyn CommandRunner,
    pip_cmd: &[String],
    package: &str,
    dependency: &str,
    timeout: Duration,
) -> Option<String> {
    let spec = CommandSpec::from_argv(pip_cmd)
        .args(["install", "--dry-run", package])
        .timeout(timeout);
    let output = match runner.output(&spec) {
        Ok(output) if output.success() => output,
        Ok(output) => {
            debug!("Dry-run for {} exited with {:?}", package, output.status);
            return None;
        }
        Err(e) => {
            debug!("Dry-run for {} failed: {}", package, e);
            return None;
        }
    };
    let combined = format!("{}{}", output.stdout, output.stderr);
    match find_constraint(&combined, dependency) {
        Ok(found) => found,
        Err(e) => {
            debug!("Unable to search dry-run output: {}", e);
            None
        }
    }
}

fn find_constraint(text: &str, dependency: &str) -> Result<Option<String>> {
    let dep = regex::escape(dependency);
    let patterns = [
        format!(r"{dep}{CONSTRAINT_CAPTURE}"),
        format!(r"{dep}\s+{CONSTRAINT_CAPTURE}"),
        format!(r"\(\s*{dep}{CONSTRAINT_CAPTURE}\s*\)"),
        format!(r"Requirement.*{dep}{CONSTRAINT_CAPTURE}"),
        format!(r"{dep}\s*\(\s*{CONSTRAINT_CAPTURE}\s*\)"),
    ];
    for pattern in &patterns {
        let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        if let Some(captures) = re.captures(text) {
            return Ok(Some(captures[1].to_string()));
        }
    }
    Ok(None)
}

/// A requested runtime version falls outside the meta-package's range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityWarning {
    pub constraint: String,
    pub requested: String,
}

impl fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requires {}{} but the requested version {} falls outside this range. \
             There may be compatibility issues.",
            META_PACKAGE, CORE_PACKAGE, self.constraint, self.requested
        )
    }
}

/// Checks a requested `ansible-core` version against the meta-package.
pub struct CompatibilityAdvisor<'a> {
    runner: &'a dyn CommandRunner,
    pip_cmd: &'a [String],
    meta_package: String,
    timeout: Duration,
}

impl<'a> CompatibilityAdvisor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a Config) -> Self {
        Self {
            runner,
            pip_cmd: config.pip_command(),
            meta_package: META_PACKAGE.to_string(),
            timeout: DRY_RUN_TIMEOUT,
        }
    }

    /// Query a pinned meta-package release instead of the latest one.
    pub fn with_meta_version(mut self, version: Option<&str>) -> Self {
        if let Some(version) = version {
            self.meta_package = format!("{}=={}", META_PACKAGE, version);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Compare `requested` with the meta-package's constraint.
    ///
    /// Does nothing unless the meta-package is also being installed.
    pub fn check(&self, requested: &str, meta_requested: bool) -> Option<CompatibilityWarning> {
        if !meta_requested {
            return None;
        }
        let constraint = dependency_constraint(
            self.runner,
            self.pip_cmd,
            &self.meta_package,
            CORE_PACKAGE,
            self.timeout,
        )?;
        let specifiers = parse_constraint(&constraint).ok()?;
        let version = parse_version(requested).ok()?;
        debug!(
            "Checking {} {} against {}{}",
            CORE_PACKAGE, requested, META_PACKAGE, constraint
        );
        if satisfies(&specifiers, &version) {
            None
        } else {
            Some(CompatibilityWarning {
                constraint,
                requested: requested.to_string(),
            })
        }
    }
}
