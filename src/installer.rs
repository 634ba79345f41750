//! # Install Orchestrator
//!
//! Drives a full install into the target environment:
//!
//! 1. **Validation**: every request is resolved and unsupported option
//!    combinations are rejected before anything on disk changes.
//! 2. **Bootstrap**: `ansible-core` and, when seeding, `ansible-dev-tools`
//!    are installed with pip unless already present. A requested core
//!    version is checked against the meta-package first.
//! 3. **Requirements file**: installed with a single `ansible-galaxy` call.
//! 4. **Local collections**: staged into a per-collection build directory,
//!    built into an archive, installed from it, then optionally replaced by
//!    an editable materialization.
//! 5. **Registry and source-control collections**: installed in one batch.
//! 6. **Python requirements**: collected with `ansible-builder introspect`
//!    (plus any optional-dependency files) and installed with pip.
//!
//! Every placement removes what is at the destination first, so running the
//! same install twice converges on the same tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use walkdir::WalkDir;

use crate::compat::{resolve_core_package, CompatibilityAdvisor};
use crate::config::Config;
use crate::defaults::{
    is_excluded, CORE_PACKAGE, GALAXY_FILE, MANIFEST_FILE, META_PACKAGE, SOURCE_REQUIREMENTS,
};
use crate::editable::{self, remove_existing};
use crate::error::{Error, Result};
use crate::galaxy::{info_dirs, Requirements};
use crate::outcome::{oxford_join, Outcome};
use crate::process::{CommandRunner, CommandSpec};
use crate::request::{resolve, resolve_requirement, CollectionRequest, ResolveContext};

static INSTALLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+\.\w+):.*installed").expect("built-in pattern compiles")
});

/// What to install and how.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Collection specifiers as typed by the user.
    pub specifiers: Vec<String>,
    /// Collection requirements file.
    pub requirement: Option<PathBuf>,
    /// Replace local collections with links into their source trees.
    pub editable: bool,
    /// Install the developer-tools meta-package.
    pub seed: bool,
    pub core_version: Option<String>,
    pub dev_tools_version: Option<String>,
    /// Pre-install collections listed in the source requirements file.
    pub source_install: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            specifiers: Vec::new(),
            requirement: None,
            editable: false,
            seed: true,
            core_version: None,
            dev_tools_version: None,
            source_install: false,
        }
    }
}

/// Installs collections into one environment.
pub struct Installer<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    ctx: &'a ResolveContext,
}

impl<'a> Installer<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner, ctx: &'a ResolveContext) -> Self {
        Self {
            config,
            runner,
            ctx,
        }
    }

    pub fn run(&self, options: &InstallOptions) -> Result<Outcome> {
        let mut outcome = Outcome::new();
        let requirement = self.requirement_file(options);
        let requests = self.validate(options, requirement.is_some())?;

        self.bootstrap(options, &mut outcome)?;

        if let Some(file) = &requirement {
            self.install_requirements(file, options.source_install)?;
        }

        let (local, distant): (Vec<_>, Vec<_>) =
            requests.iter().partition(|request| request.is_local());
        for request in &local {
            self.install_local(request, options.editable)?;
        }
        if !distant.is_empty() {
            self.install_distant(&distant)?;
        }

        let optional = self.optional_dependency_files(&requests, &mut outcome);
        self.install_python_requirements(&optional, &mut outcome)?;
        Ok(outcome)
    }

    fn requirement_file(&self, options: &InstallOptions) -> Option<PathBuf> {
        if options.source_install {
            Some(self.ctx.cwd.join(SOURCE_REQUIREMENTS))
        } else {
            options
                .requirement
                .as_ref()
                .map(|file| self.ctx.cwd.join(file))
        }
    }

    /// Resolve every specifier and reject unsupported combinations.
    pub fn validate(
        &self,
        options: &InstallOptions,
        has_requirements: bool,
    ) -> Result<Vec<CollectionRequest>> {
        if options.editable && has_requirements {
            return Err(Error::Usage {
                message: "Editable installs cannot be combined with a requirements file".to_string(),
                hint: None,
            });
        }
        if options.editable && options.specifiers.len() != 1 {
            return Err(Error::Usage {
                message: "Editable installs take exactly one local collection".to_string(),
                hint: Some("Run one editable install per collection".to_string()),
            });
        }

        let requests = options
            .specifiers
            .iter()
            .map(|text| resolve(text, self.ctx))
            .collect::<Result<Vec<_>>>()?;

        if let Some(request) = requests
            .iter()
            .find(|r| r.optional_dependency_groups().len() > 1)
        {
            return Err(Error::Usage {
                message: format!(
                    "Multiple optional dependencies are not supported at this time: {}",
                    request.original()
                ),
                hint: Some("Specify a single group, e.g. path/to/collection[test]".to_string()),
            });
        }
        if options.editable {
            if let Some(request) = requests.iter().find(|r| !r.is_local()) {
                return Err(Error::Usage {
                    message: format!(
                        "Editable installs are only supported for local collections, not {} '{}'",
                        request.kind(),
                        request.original()
                    ),
                    hint: None,
                });
            }
        }
        Ok(requests)
    }

    fn bootstrap(&self, options: &InstallOptions, outcome: &mut Outcome) -> Result<()> {
        if let Some(version) = &options.core_version {
            let advisor = CompatibilityAdvisor::new(self.runner, self.config)
                .with_meta_version(options.dev_tools_version.as_deref());
            if let Some(warning) = advisor.check(version, options.seed) {
                outcome.warn(warning.to_string());
            }
            self.install_core(Some(version.as_str()))?;
        }
        if options.seed {
            self.install_dev_tools(options.dev_tools_version.as_deref())?;
        } else if options.core_version.is_none() {
            self.install_core(None)?;
        }
        Ok(())
    }

    fn install_core(&self, version: Option<&str>) -> Result<()> {
        if self.config.venv_bindir().join("ansible").exists() {
            debug!("{} is already installed", CORE_PACKAGE);
            return Ok(());
        }
        let package = version
            .map(resolve_core_package)
            .unwrap_or_else(|| CORE_PACKAGE.to_string());
        info!("Installing {}", package);
        self.runner
            .run(&self.config.pip_install().arg(package))
            .map_err(|e| e.in_step(format!("Failed to install {}", CORE_PACKAGE)))?;
        Ok(())
    }

    fn install_dev_tools(&self, version: Option<&str>) -> Result<()> {
        if self.config.venv_bindir().join("adt").exists() {
            debug!("{} is already installed", META_PACKAGE);
            return Ok(());
        }
        let package = match version {
            Some(version) => {
                info!(
                    "Pinning {} to {}; older releases may no longer be supported",
                    META_PACKAGE, version
                );
                format!("{}=={}", META_PACKAGE, version)
            }
            None => META_PACKAGE.to_string(),
        };
        info!("Installing {}", package);
        self.runner
            .run(&self.config.pip_install().arg(package))
            .map_err(|e| e.in_step(format!("Failed to install {}", META_PACKAGE)))?;
        Ok(())
    }

    fn galaxy(&self) -> Result<CommandSpec> {
        Ok(CommandSpec::new(self.config.galaxy_bin()?.to_string_lossy())
            .arg("collection")
            .stream(self.config.stream_output()))
    }

    fn galaxy_install(&self) -> Result<CommandSpec> {
        let warn_paths = if self.config.verbose() > 0 { "true" } else { "false" };
        Ok(self
            .galaxy()?
            .arg("install")
            .env("ANSIBLE_GALAXY_COLLECTIONS_PATH_WARNING", warn_paths))
    }

    /// Remove an installed collection and its `.info` directories.
    fn clear_destination(&self, namespace: &str, name: &str) -> Result<()> {
        let destination = crate::request::destination_in(self.config.site_pkg_path(), namespace, name);
        if remove_existing(&destination)? {
            debug!("Removed installed {}", destination.display());
        }
        for info in info_dirs(&self.config.collections_root(), namespace, name)? {
            debug!("Removed {}", info.display());
            fs::remove_dir_all(&info)?;
        }
        Ok(())
    }

    fn install_requirements(&self, file: &Path, source_install: bool) -> Result<()> {
        let method = if source_install { "Pre-installing" } else { "Installing" };
        info!(
            "{} collections from requirements file: {}",
            method,
            file.display()
        );
        let requirements = Requirements::read(file)?;
        for entry in requirements.collections.iter().filter(|e| e.is_collection_name()) {
            let request = resolve_requirement(entry, self.ctx)?;
            self.clear_destination(request.namespace(), request.name())?;
        }

        let spec = self
            .galaxy_install()?
            .arg("-r")
            .path_arg(file)
            .arg("-p")
            .path_arg(self.config.site_pkg_path())
            .arg("--force");
        let output = self
            .runner
            .run(&spec)
            .map_err(|e| e.in_step("Failed to install collections from requirements file"))?;
        let label = if source_install {
            "Source installed collections include"
        } else {
            "Installed collections include"
        };
        log_installed(label, &output.stdout);
        Ok(())
    }

    fn install_local(&self, request: &CollectionRequest, editable: bool) -> Result<()> {
        let source = request.local_path().ok_or_else(|| Error::InternalConsistency {
            message: format!("{} has no local source", request.fqcn()),
        })?;
        let build_dir = request.build_dir(self.config);
        info!(
            "Installing local collection {} from {}",
            request.fqcn(),
            source.display()
        );

        if remove_existing(&build_dir)? {
            debug!("Removed previous build directory {}", build_dir.display());
        }
        fs::create_dir_all(&build_dir)?;
        self.stage(request, source, &build_dir)?;

        let build = self
            .galaxy()?
            .arg("build")
            .arg("--output-path")
            .path_arg(&build_dir)
            .arg("--force")
            .current_dir(&build_dir);
        self.runner
            .run(&build)
            .map_err(|e| e.in_step(format!("Failed to build collection {}", request.fqcn())))?;
        let tarball = single_tarball(&build_dir)?;

        self.clear_destination(request.namespace(), request.name())?;
        let install = self
            .galaxy_install()?
            .path_arg(&tarball)
            .arg("-p")
            .path_arg(self.config.site_pkg_path())
            .arg("--force");
        let output = self
            .runner
            .run(&install)
            .map_err(|e| e.in_step(format!("Failed to install collection {}", request.fqcn())))?;

        let destination = request.destination(self.config);
        if !destination.is_dir() {
            return Err(Error::InternalConsistency {
                message: format!(
                    "{} was reported installed but {} does not exist",
                    request.fqcn(),
                    destination.display()
                ),
            });
        }

        if editable {
            let manifest = destination.join(MANIFEST_FILE);
            if manifest.is_file() {
                fs::copy(&manifest, request.cache_dir(self.config).join(MANIFEST_FILE))?;
            }
            editable::materialize(self.runner, request, &destination)?;
        } else {
            fs::copy(source.join(GALAXY_FILE), destination.join(GALAXY_FILE))?;
        }
        log_installed("Installed collections include", &output.stdout);
        Ok(())
    }

    /// Copy the discovered files of a source tree into the build directory.
    fn stage(&self, request: &CollectionRequest, source: &Path, build_dir: &Path) -> Result<()> {
        let discovery = editable::discover(self.runner, source)?;
        let paths: Vec<&String> = discovery
            .paths
            .iter()
            .filter(|path| !editable::filter_top_level([path.as_str()]).is_empty())
            .collect();
        if paths.is_empty() {
            return Err(Error::Build {
                collection: request.fqcn(),
                message: format!("no files found in {} using {}", source.display(), discovery.method),
            });
        }
        info!("File list generated with {}", discovery.method);

        // A tree nested under the source is left out; one containing it is not
        let build_dir = canonical(build_dir);
        let venv = canonical(self.config.venv());
        let nested = |path: &Path, tree: &Path| path.starts_with(tree) && !source.starts_with(tree);
        let skip = |path: &Path| nested(path, &build_dir) || nested(path, &venv);
        for relative in paths {
            let from = source.join(relative);
            let to = build_dir.join(relative);
            let Ok(meta) = fs::symlink_metadata(&from) else {
                debug!("Skipping {}, not present in the source", relative);
                continue;
            };
            if skip(&from) {
                continue;
            }
            if meta.is_dir() {
                copy_tree(&from, &to, &skip)?;
            } else {
                copy_file(&from, &to)?;
            }
        }
        Ok(())
    }

    fn install_distant(&self, requests: &[&CollectionRequest]) -> Result<()> {
        let targets: Vec<&str> = requests.iter().map(|r| r.install_target()).collect();
        info!("Installing collections: {}", targets.join(" "));
        for request in requests {
            self.clear_destination(request.namespace(), request.name())?;
        }
        let spec = self
            .galaxy_install()?
            .args(targets.iter().copied())
            .arg("-p")
            .path_arg(self.config.site_pkg_path())
            .arg("--force");
        let output = self
            .runner
            .run(&spec)
            .map_err(|e| e.in_step("Failed to install collections"))?;
        log_installed("Installed collections include", &output.stdout);
        Ok(())
    }

    /// Locate `<group>-requirements.txt` or `requirements-<group>.txt` files.
    fn optional_dependency_files(
        &self,
        requests: &[CollectionRequest],
        outcome: &mut Outcome,
    ) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for request in requests {
            let groups = request.optional_dependency_groups();
            if groups.is_empty() {
                continue;
            }
            let Some(root) = request.local_path() else {
                outcome.warn(format!(
                    "Optional dependencies of {} are only read from local collections, skipping",
                    request.original()
                ));
                continue;
            };
            for group in groups {
                let first = root.join(format!("{}-requirements.txt", group));
                let second = root.join(format!("requirements-{}.txt", group));
                if first.is_file() {
                    files.push(first);
                } else if second.is_file() {
                    files.push(second);
                } else {
                    outcome.error(format!(
                        "Failed to find optional dependency file for '{}'. Checked for '{}' and '{}'. Skipping.",
                        group,
                        first.display(),
                        second.display()
                    ));
                }
            }
        }
        if !files.is_empty() {
            let names: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
            info!("Optional dependencies found: {}", oxford_join(&names));
        }
        files
    }

    fn install_python_requirements(&self, optional: &[PathBuf], outcome: &mut Outcome) -> Result<()> {
        let Some(builder) = self.config.find_tool("ansible-builder") else {
            outcome.warn("ansible-builder not found, Python requirements of the installed collections were not installed");
            return Ok(());
        };
        let python_reqs = self.config.discovered_python_reqs();
        let bindep_reqs = self.config.discovered_bindep_reqs();
        fs::create_dir_all(self.config.cache_dir())?;

        let mut introspect = CommandSpec::new(builder.to_string_lossy())
            .arg("introspect")
            .path_arg(self.config.site_pkg_path())
            .arg("--write-pip")
            .path_arg(&python_reqs)
            .arg("--write-bindep")
            .path_arg(&bindep_reqs)
            .arg("--sanitize")
            .stream(self.config.stream_output());
        for file in optional {
            introspect = introspect.arg("--user-pip").path_arg(file);
        }
        self.runner
            .run(&introspect)
            .map_err(|e| e.in_step("Failed to discover requirements"))?;
        for file in [&python_reqs, &bindep_reqs] {
            if !file.exists() {
                fs::write(file, "")?;
            }
        }

        let content = fs::read_to_string(&python_reqs)?;
        if content
            .lines()
            .all(|line| line.trim().is_empty() || line.trim_start().starts_with('#'))
        {
            debug!("No Python requirements discovered");
            return Ok(());
        }
        info!("Installing Python requirements from {}", python_reqs.display());
        let pip = self.config.pip_install().arg("-r").path_arg(&python_reqs);
        self.runner.run(&pip).map_err(|e| {
            e.in_step(format!(
                "Failed to install requirements from {}",
                python_reqs.display()
            ))
        })?;
        info!("All Python requirements are installed");
        Ok(())
    }
}

fn single_tarball(build_dir: &Path) -> Result<PathBuf> {
    let mut built = Vec::new();
    for entry in fs::read_dir(build_dir)? {
        let path = entry?.path();
        let is_archive = path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(".tar.gz"))
            .unwrap_or(false);
        if is_archive && path.is_file() {
            built.push(path);
        }
    }
    match built.len() {
        1 => Ok(built.remove(0)),
        n => Err(Error::InternalConsistency {
            message: format!(
                "expected one collection archive in {}, found {}",
                build_dir.display(),
                n
            ),
        }),
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn copy_tree(from: &Path, to: &Path, skip: &dyn Fn(&Path) -> bool) -> Result<()> {
    let walker = WalkDir::new(from).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !skip(entry.path()) && (entry.depth() == 0 || !is_excluded(&name))
    });
    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Collection names reported as installed in `ansible-galaxy` output.
fn installed_collections(stdout: &str) -> Vec<&str> {
    INSTALLED
        .captures_iter(stdout)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

fn log_installed(label: &str, stdout: &str) {
    let installed = installed_collections(stdout);
    if !installed.is_empty() {
        info!("{}: {}", label, oxford_join(&installed));
    }
}
