//! # Ansible Development Environment Library
//!
//! This library installs, replaces and removes Ansible content collections
//! inside an existing Python virtual environment. It is designed to be used
//! by the `ade` command-line tool, but the engine can be driven directly
//! with any [`process::CommandRunner`].
//!
//! ## Quick Example
//!
//! ```
//! use ade::request::{resolve, RequestKind, ResolveContext};
//!
//! let ctx = ResolveContext::new("/tmp");
//! let request = resolve("ansible.utils:>=2.0", &ctx).unwrap();
//! assert_eq!(request.kind(), RequestKind::RegistryName);
//! assert_eq!(request.fqcn(), "ansible.utils");
//! assert_eq!(request.version_specifier(), Some(":>=2.0"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Requests (`request`)**: a user-supplied collection specifier resolved
//!   into a local path, a registry name or a source-control URL.
//! - **Configuration (`config`)**: the target virtual environment, its
//!   package directory and the pip command to use.
//! - **Processes (`process`)**: every external tool runs through the
//!   `CommandRunner` trait.
//! - **Editable installs (`editable`)**: per-entry symlinks from the
//!   environment back into a source tree.
//! - **Compatibility (`compat`)**: PEP 440 versions and specifiers used to
//!   warn about mismatched runtime versions.
//!
//! ## Execution Flow
//!
//! [`installer::Installer`] validates requests, bootstraps the runtime,
//! installs requirements files, builds local collections, installs remote
//! ones in a batch and finally installs Python requirements.
//! [`uninstaller::Uninstaller`] removes collections and their metadata.
//! [`inventory`] reports what is installed.

pub mod compat;
pub mod config;
pub mod defaults;
pub mod editable;
pub mod error;
pub mod galaxy;
pub mod installer;
pub mod inventory;
pub mod outcome;
pub mod process;
pub mod request;
pub mod uninstaller;

#[cfg(test)]
mod request_proptest;
