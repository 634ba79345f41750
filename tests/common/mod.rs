//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a fixture holding a fake virtual environment, a
//! working directory and collection source trees, plus a command runner that
//! simulates `ansible-galaxy` well enough to drive full install cycles
//! without network access.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_collection("src", "ns", "coll");
//!     let runner = GalaxySimulator::new();
//!     // ... drive ade::installer::Installer with fixture.config()
//! }
//! ```

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use ade::config::Config;
use ade::error::Result;
use ade::process::{CommandOutput, CommandRunner, CommandSpec};
use ade::request::ResolveContext;
use assert_fs::prelude::*;
use walkdir::WalkDir;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::GalaxySimulator;
    pub use super::TestFixture;
}

/// A temporary virtual environment plus a working directory.
///
/// Layout:
///
/// ```text
/// <tmp>/venv/bin/{ansible,ansible-galaxy,ansible-builder}
/// <tmp>/venv/lib/site-packages/
/// <tmp>/work/
/// <tmp>/empty-path/
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a fixture whose environment already has `ansible-core`.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        for dir in ["venv/bin", "venv/lib/site-packages", "work", "empty-path"] {
            temp_dir
                .child(dir)
                .create_dir_all()
                .expect("Failed to create fixture directory");
        }
        let fixture = Self { temp_dir };
        for tool in ["ansible", "ansible-galaxy", "ansible-builder"] {
            fixture.touch(&format!("venv/bin/{}", tool));
        }
        fixture
    }

    fn touch(&self, path: &str) {
        self.temp_dir
            .child(path)
            .touch()
            .expect("Failed to create file");
    }

    /// Add a collection source tree under the working directory.
    ///
    /// The tree has a `galaxy.yml`, a module, and clutter that must never
    /// reach the environment: a nested virtual environment and byte code.
    pub fn with_collection(self, dir: &str, namespace: &str, name: &str) -> Self {
        self.write_collection(&format!("work/{}", dir), namespace, name);
        self
    }

    /// Add a collection source tree inside the virtual environment itself.
    pub fn with_venv_collection(self, dir: &str, namespace: &str, name: &str) -> Self {
        self.write_collection(&format!("venv/{}", dir), namespace, name);
        self
    }

    fn write_collection(&self, path: &str, namespace: &str, name: &str) {
        let root = self.temp_dir.child(path);
        root.child("galaxy.yml")
            .write_str(&format!(
                "namespace: {}\nname: {}\nversion: 1.0.0\n",
                namespace, name
            ))
            .expect("Failed to write galaxy.yml");
        root.child("plugins/modules/thing.py")
            .write_str("# module\n")
            .expect("Failed to write module");
        root.child("README.md")
            .write_str("# readme\n")
            .expect("Failed to write README");
        root.child(".venv/bin/python")
            .touch()
            .expect("Failed to create nested venv");
        root.child("__pycache__/thing.cpython-312.pyc")
            .touch()
            .expect("Failed to create byte code");
    }

    /// Add a file with the given path and content under the working directory.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child("work")
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Replace a fake tool with an executable shell script.
    #[cfg(unix)]
    pub fn with_script(self, tool: &str, body: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let path = self.venv().join("bin").join(tool);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        self
    }

    /// An interpreter that only answers the package-directory query.
    #[cfg(unix)]
    pub fn with_fake_python(self) -> Self {
        let body = format!("echo '{{\"purelib\": \"{}\"}}'", self.site().display());
        self.with_script("python", &body)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn venv(&self) -> PathBuf {
        self.path().join("venv")
    }

    pub fn site(&self) -> PathBuf {
        self.venv().join("lib/site-packages")
    }

    pub fn work(&self) -> PathBuf {
        self.path().join("work")
    }

    /// `<site-packages>/ansible_collections/<namespace>/<name>`.
    pub fn installed(&self, namespace: &str, name: &str) -> PathBuf {
        self.site()
            .join("ansible_collections")
            .join(namespace)
            .join(name)
    }

    pub fn config(&self) -> Config {
        Config::new(self.venv(), self.site())
    }

    pub fn ctx(&self) -> ResolveContext {
        ResolveContext::new(self.work())
    }

    /// Create a command configured to run in this fixture's working directory.
    ///
    /// Inherited environment that would change the CLI's behaviour is
    /// removed, and `PATH` points at an empty directory so no real tool is
    /// ever picked up.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("ade");
        cmd.current_dir(self.work())
            .env_remove("VIRTUAL_ENV")
            .env_remove("SKIP_UV")
            .env_remove("ADE_NO_SEED")
            .env_remove("ADE_ANSIBLE_CORE_VERSION")
            .env("PATH", self.path().join("empty-path"));
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`CommandRunner`] that behaves like `ansible-galaxy` on a real system.
///
/// - `git` always fails, as in a tree that is not a repository.
/// - `collection build` writes an archive recording the build directory.
/// - `collection install <archive>` copies that directory into place and
///   writes `MANIFEST.json` and an `.info` directory.
/// - `collection install ns.name ...` creates a minimal installed tree.
/// - Everything else succeeds with no output.
pub struct GalaxySimulator {
    calls: RefCell<Vec<CommandSpec>>,
}

impl GalaxySimulator {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Recorded `ansible-galaxy` invocations.
    pub fn galaxy_calls(&self) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.program_name() == "ansible-galaxy")
            .collect()
    }

    fn build(&self, spec: &CommandSpec) -> CommandOutput {
        let cwd = spec.cwd.clone().expect("build runs in the build directory");
        let out = PathBuf::from(&spec.args[3]);
        let meta = ade::galaxy::GalaxyMeta::read(&cwd).expect("staged galaxy.yml");
        let (namespace, name) = meta.identity();
        let version = meta.version.unwrap_or_else(|| "0.0.0".to_string());
        let archive = out.join(format!("{}-{}-{}.tar.gz", namespace, name, version));
        fs::write(
            &archive,
            format!("{}\n{}\n{}\n{}\n", cwd.display(), namespace, name, version),
        )
        .expect("write archive");
        success(&format!("Created collection for {}.{} at {}\n", namespace, name, archive.display()))
    }

    fn install(&self, spec: &CommandSpec) -> CommandOutput {
        let site = spec
            .args
            .iter()
            .position(|a| a == "-p")
            .map(|i| PathBuf::from(&spec.args[i + 1]))
            .expect("install target directory");
        let root = site.join("ansible_collections");
        let targets: Vec<&String> = spec.args[2..]
            .iter()
            .take_while(|a| a.as_str() != "-p")
            .collect();
        if targets.first().map(|t| t.as_str()) == Some("-r") {
            return success("Starting galaxy collection install process\n");
        }

        let mut stdout = String::new();
        for target in targets.iter().map(|t| t.as_str()) {
            let (source, namespace, name, version) = if target.ends_with(".tar.gz") {
                let content = fs::read_to_string(target).expect("read archive");
                let lines: Vec<&str> = content.lines().collect();
                (
                    Some(PathBuf::from(lines[0])),
                    lines[1].to_string(),
                    lines[2].to_string(),
                    lines[3].to_string(),
                )
            } else {
                let fqcn = target.split(':').next().unwrap_or(target);
                let (namespace, name) = fqcn.split_once('.').expect("namespace.name");
                (None, namespace.to_string(), name.to_string(), "1.0.0".to_string())
            };
            let dest = root.join(&namespace).join(&name);
            fs::create_dir_all(&dest).expect("create destination");
            if let Some(source) = source {
                copy_tree(&source, &dest);
            }
            fs::write(
                dest.join("MANIFEST.json"),
                format!(
                    r#"{{"collection_info": {{"namespace": "{}", "name": "{}", "version": "{}"}}}}"#,
                    namespace, name, version
                ),
            )
            .expect("write manifest");
            let info = root.join(format!("{}.{}-{}.info", namespace, name, version));
            fs::create_dir_all(&info).expect("create info dir");
            fs::write(info.join("GALAXY.yml"), format!("version: {}\n", version))
                .expect("write info");
            stdout.push_str(&format!(
                "{}.{}:{} was installed successfully\n",
                namespace, name, version
            ));
        }
        success(&stdout)
    }
}

impl Default for GalaxySimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for GalaxySimulator {
    fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        if spec.program == "git" {
            return Ok(CommandOutput {
                status: Some(128),
                stdout: String::new(),
                stderr: "fatal: not a git repository".to_string(),
            });
        }
        if spec.program_name() != "ansible-galaxy" {
            return Ok(success(""));
        }
        match spec.args.get(1).map(String::as_str) {
            Some("build") => Ok(self.build(spec)),
            Some("install") => Ok(self.install(spec)),
            _ => Ok(success("")),
        }
    }
}

fn success(stdout: &str) -> CommandOutput {
    CommandOutput {
        status: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn copy_tree(from: &Path, to: &Path) {
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.expect("walk build directory");
        let relative = entry.path().strip_prefix(from).expect("relative path");
        if relative.to_string_lossy().ends_with(".tar.gz") {
            continue;
        }
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).expect("create directory");
        } else {
            fs::copy(entry.path(), &target).expect("copy file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_environment() {
        let fixture = TestFixture::new();
        assert!(fixture.venv().join("bin/ansible-galaxy").is_file());
        assert!(fixture.site().is_dir());
        assert!(fixture.work().is_dir());
    }

    #[test]
    fn test_fixture_with_collection() {
        let fixture = TestFixture::new().with_collection("src", "ns", "coll");
        assert!(fixture.work().join("src/galaxy.yml").is_file());
        assert!(fixture.work().join("src/.venv").is_dir());
    }

    #[test]
    fn test_simulator_installs_registry_names() {
        let fixture = TestFixture::new();
        let runner = GalaxySimulator::new();
        let spec = CommandSpec::new("/venv/bin/ansible-galaxy")
            .args(["collection", "install", "ansible.utils", "-p"])
            .path_arg(&fixture.site())
            .arg("--force");
        let output = runner.run(&spec).unwrap();
        assert!(output.stdout.contains("ansible.utils:1.0.0 was installed"));
        assert!(fixture.installed("ansible", "utils").join("MANIFEST.json").is_file());
    }
}
