//! End-to-end tests for CLI exit codes.
//!
//! These tests verify that the CLI returns the documented exit codes:
//!
//! - Exit code 0: Success
//! - Exit code 1: The run failed
//! - Exit code 2: The run completed with warnings, or invalid command-line
//!   usage (handled by clap)

mod common;

use common::prelude::*;

/// Exit code 0 is returned for --help.
#[test]
fn test_exit_code_help() {
    let mut cmd = cargo_bin_cmd!("ade");

    cmd.arg("--help")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("install"));
}

/// Exit code 0 is returned for --version.
#[test]
fn test_exit_code_version() {
    let mut cmd = cargo_bin_cmd!("ade");

    cmd.arg("--version").assert().code(0);
}

/// Exit code 2 is returned for unknown flags.
#[test]
fn test_exit_code_usage_error() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .args(["install", "--no-such-flag"])
        .assert()
        .code(2);
}

/// Exit code 1 is returned when no environment is given.
#[test]
fn test_exit_code_missing_venv() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no virtual environment specified"));
}

/// Exit code 1 is returned when the environment does not exist.
#[test]
fn test_exit_code_venv_not_found() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .args(["list", "--venv"])
        .arg(fixture.path().join("missing"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("virtual environment not found"));
}

#[cfg(unix)]
mod with_environment {
    use super::common::prelude::*;

    fn fixture() -> TestFixture {
        TestFixture::new().with_fake_python()
    }

    /// Exit code 1 is returned for an unrecognised collection specifier.
    #[test]
    fn test_exit_code_invalid_specifier() {
        let fixture = fixture();

        fixture
            .command()
            .args(["install", "--no-seed", "not a collection"])
            .arg("--venv")
            .arg(fixture.venv())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid collection request"));
    }

    /// Exit code 1 is returned for editable installs with a requirements file.
    #[test]
    fn test_exit_code_editable_with_requirements() {
        let fixture = fixture().with_collection("src", "ns", "coll");

        fixture
            .command()
            .args(["install", "-e", "src", "-r", "requirements.yml"])
            .arg("--venv")
            .arg(fixture.venv())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Editable installs cannot be combined"));
    }

    /// Exit code 1 is returned when more than one collection is uninstalled.
    #[test]
    fn test_exit_code_uninstall_many() {
        let fixture = fixture();

        fixture
            .command()
            .args(["uninstall", "a.b", "c.d"])
            .arg("--venv")
            .arg(fixture.venv())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Only one collection"));
    }

    /// Exit code 2 is returned when the collection to remove is not installed.
    #[test]
    fn test_exit_code_uninstall_missing_is_warning() {
        let fixture = fixture();

        fixture
            .command()
            .args(["uninstall", "ns.coll"])
            .arg("--venv")
            .arg(fixture.venv())
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Failed to find ns.coll"));
    }

    /// Exit code 0 is returned for listing an empty environment.
    #[test]
    fn test_exit_code_list_empty() {
        let fixture = fixture();

        fixture
            .command()
            .arg("list")
            .env("VIRTUAL_ENV", fixture.venv())
            .assert()
            .code(0)
            .stdout(predicate::str::contains("No collections installed"));
    }
}
