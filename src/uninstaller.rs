//! # Uninstall
//!
//! Removes one collection, or every collection of a requirements file, from
//! the environment. Removal is symlink-aware: a legacy whole-tree link is
//! removed without touching the source tree it points to.
//!
//! A collection that is not installed is reported as a warning, never as a
//! failure, so uninstalling twice is safe.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Config;
use crate::editable::remove_existing;
use crate::error::{Error, Result};
use crate::galaxy::{info_dirs, Requirements};
use crate::outcome::Outcome;
use crate::request::{resolve, resolve_requirement, CollectionRequest, ResolveContext};

/// What happened to one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    pub specifiers: Vec<String>,
    pub requirement: Option<PathBuf>,
}

pub struct Uninstaller<'a> {
    config: &'a Config,
    ctx: &'a ResolveContext,
}

impl<'a> Uninstaller<'a> {
    pub fn new(config: &'a Config, ctx: &'a ResolveContext) -> Self {
        Self { config, ctx }
    }

    pub fn run(&self, options: &UninstallOptions) -> Result<Outcome> {
        let mut outcome = Outcome::new();
        let requests = self.requests(options)?;
        for request in &requests {
            self.uninstall(request, &mut outcome)?;
        }
        Ok(outcome)
    }

    fn requests(&self, options: &UninstallOptions) -> Result<Vec<CollectionRequest>> {
        if let Some(file) = &options.requirement {
            let path = self.ctx.cwd.join(file);
            if !path.is_file() {
                return Err(Error::Usage {
                    message: format!("Failed to find requirements file: {}", path.display()),
                    hint: None,
                });
            }
            let requirements = Requirements::read(&path)?;
            return requirements
                .collections
                .iter()
                .filter(|entry| entry.is_collection_name())
                .map(|entry| resolve_requirement(entry, self.ctx))
                .collect();
        }
        match options.specifiers.as_slice() {
            [] => Err(Error::Usage {
                message: "Nothing to uninstall".to_string(),
                hint: Some("Name a collection or pass a requirements file with -r".to_string()),
            }),
            [only] => Ok(vec![resolve(only, self.ctx)?]),
            _ => Err(Error::Usage {
                message: "Only one collection can be uninstalled at a time.".to_string(),
                hint: Some("Use a requirements file to remove several collections".to_string()),
            }),
        }
    }

    /// Remove a single collection and its metadata directories.
    pub fn uninstall(&self, request: &CollectionRequest, outcome: &mut Outcome) -> Result<Removal> {
        let destination = request.destination(self.config);
        let removal = if remove_existing(&destination)? {
            info!("Removed {}: {}", request.fqcn(), destination.display());
            Removal::Removed
        } else {
            outcome.warn(format!(
                "Failed to find {}: {}",
                request.fqcn(),
                destination.display()
            ));
            Removal::NotFound
        };

        let collections_root = self.config.collections_root();
        for info in info_dirs(&collections_root, request.namespace(), request.name())? {
            fs::remove_dir_all(&info)?;
            debug!("Removed {}", info.display());
        }

        if let Some(namespace_dir) = destination.parent() {
            remove_if_empty(namespace_dir, outcome);
        }
        remove_if_empty(&collections_root, outcome);
        Ok(removal)
    }
}

/// Best-effort removal of a directory that may still hold other entries.
fn remove_if_empty(dir: &Path, outcome: &mut Outcome) {
    match fs::remove_dir(dir) {
        Ok(()) => debug!("Removed empty directory {}", dir.display()),
        Err(e) if is_expected(&e) => {}
        Err(e) => outcome.warn(format!("Unable to remove {}: {}", dir.display(), e)),
    }
}

fn is_expected(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Status;
    use tempfile::TempDir;

    struct Env {
        _root: TempDir,
        config: Config,
        ctx: ResolveContext,
        site: PathBuf,
    }

    fn env() -> Env {
        let root = TempDir::new().unwrap();
        let venv = root.path().join("venv");
        let site = venv.join("site-packages");
        let work = root.path().join("work");
        fs::create_dir_all(&site).unwrap();
        fs::create_dir_all(&work).unwrap();
        Env {
            config: Config::new(&venv, &site),
            ctx: ResolveContext::new(&work),
            site,
            _root: root,
        }
    }

    fn install_fake(site: &Path, namespace: &str, name: &str) -> PathBuf {
        let dest = site.join("ansible_collections").join(namespace).join(name);
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("MANIFEST.json"), "{}").unwrap();
        fs::create_dir_all(
            site.join("ansible_collections")
                .join(format!("{}.{}-1.0.0.info", namespace, name)),
        )
        .unwrap();
        dest
    }

    fn options(specifiers: &[&str]) -> UninstallOptions {
        UninstallOptions {
            specifiers: specifiers.iter().map(|s| s.to_string()).collect(),
            requirement: None,
        }
    }

    #[test]
    fn test_uninstall_removes_collection_and_empty_parents() {
        let env = env();
        install_fake(&env.site, "ansible", "utils");
        let outcome = Uninstaller::new(&env.config, &env.ctx)
            .run(&options(&["ansible.utils"]))
            .unwrap();
        assert_eq!(outcome.status(), Status::Success);
        assert!(!env.site.join("ansible_collections").exists());
    }

    #[test]
    fn test_uninstall_keeps_siblings() {
        let env = env();
        install_fake(&env.site, "ansible", "utils");
        let posix = install_fake(&env.site, "ansible", "posix");
        Uninstaller::new(&env.config, &env.ctx)
            .run(&options(&["ansible.utils"]))
            .unwrap();
        assert!(posix.join("MANIFEST.json").exists());
        assert!(env
            .site
            .join("ansible_collections/ansible.posix-1.0.0.info")
            .exists());
        assert!(!env
            .site
            .join("ansible_collections/ansible.utils-1.0.0.info")
            .exists());
    }

    #[test]
    fn test_uninstall_twice_warns() {
        let env = env();
        install_fake(&env.site, "ansible", "utils");
        let uninstaller = Uninstaller::new(&env.config, &env.ctx);
        uninstaller.run(&options(&["ansible.utils"])).unwrap();
        let outcome = uninstaller.run(&options(&["ansible.utils"])).unwrap();
        assert_eq!(outcome.status(), Status::Warnings);
        assert!(outcome.warnings()[0].starts_with("Failed to find ansible.utils"));
    }

    #[cfg(unix)]
    #[test]
    fn test_uninstall_legacy_symlink_keeps_source() {
        let env = env();
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("galaxy.yml"), "namespace: ns\nname: coll\n").unwrap();
        let dest = env.site.join("ansible_collections/ns/coll");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(source.path(), &dest).unwrap();

        let uninstaller = Uninstaller::new(&env.config, &env.ctx);
        let request = resolve("ns.coll", &env.ctx).unwrap();
        let mut outcome = Outcome::new();
        assert_eq!(
            uninstaller.uninstall(&request, &mut outcome).unwrap(),
            Removal::Removed
        );
        assert!(fs::symlink_metadata(&dest).is_err());
        assert!(source.path().join("galaxy.yml").exists());
    }

    #[test]
    fn test_uninstall_rejects_many_specifiers() {
        let env = env();
        let err = Uninstaller::new(&env.config, &env.ctx)
            .run(&options(&["a.b", "c.d"]))
            .unwrap_err();
        assert!(format!("{}", err).contains("Only one collection"));
    }

    #[test]
    fn test_uninstall_from_requirements() {
        let env = env();
        install_fake(&env.site, "ansible", "utils");
        install_fake(&env.site, "ansible", "posix");
        fs::write(
            env.ctx.cwd.join("requirements.yml"),
            "collections:\n  - ansible.utils\n  - name: ansible.posix\n",
        )
        .unwrap();
        let outcome = Uninstaller::new(&env.config, &env.ctx)
            .run(&UninstallOptions {
                specifiers: Vec::new(),
                requirement: Some(PathBuf::from("requirements.yml")),
            })
            .unwrap();
        assert_eq!(outcome.status(), Status::Success);
        assert!(!env.site.join("ansible_collections").exists());
    }

    #[test]
    fn test_uninstall_missing_requirements_file() {
        let env = env();
        let err = Uninstaller::new(&env.config, &env.ctx)
            .run(&UninstallOptions {
                specifiers: Vec::new(),
                requirement: Some(PathBuf::from("nope.yml")),
            })
            .unwrap_err();
        assert!(format!("{}", err).contains("Failed to find requirements file"));
    }
}
