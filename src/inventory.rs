//! Listing of the collections installed in an environment.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::Config;
use crate::defaults::{GALAXY_FILE, MANIFEST_FILE};
use crate::error::Result;
use crate::galaxy::{info_dirs, GalaxyMeta, InstallInfo, Manifest};

const UNKNOWN_VERSION: &str = "unknown";

/// One installed collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledCollection {
    pub namespace: String,
    pub name: String,
    pub version: String,
    /// Source tree of an editable install.
    pub editable_location: Option<PathBuf>,
}

impl InstalledCollection {
    pub fn fqcn(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// Every collection under `<site-packages>/ansible_collections`, sorted by name.
pub fn installed(config: &Config) -> Result<Vec<InstalledCollection>> {
    let root = config.collections_root();
    let mut found = Vec::new();
    if !root.is_dir() {
        return Ok(found);
    }
    for namespace in sorted_dirs(&root)? {
        let ns = file_name(&namespace);
        if ns.ends_with(".info") {
            continue;
        }
        for collection in sorted_dirs(&namespace)? {
            let name = file_name(&collection);
            let version = version_of(&root, &collection, &ns, &name);
            found.push(InstalledCollection {
                editable_location: editable_location(&collection),
                namespace: ns.clone(),
                name,
                version,
            });
        }
    }
    Ok(found)
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn version_of(root: &Path, collection: &Path, namespace: &str, name: &str) -> String {
    let from_info = info_dirs(root, namespace, name)
        .unwrap_or_default()
        .into_iter()
        .rev()
        .find_map(|dir| InstallInfo::read(&dir.join("GALAXY.yml")).ok()?.version);
    let from_galaxy = || {
        collection
            .join(GALAXY_FILE)
            .is_file()
            .then(|| GalaxyMeta::read(collection).ok()?.version)
            .flatten()
    };
    let from_manifest = || {
        Manifest::read(&collection.join(MANIFEST_FILE))
            .ok()?
            .collection_info
            .version
    };
    from_info
        .or_else(from_galaxy)
        .or_else(from_manifest)
        .unwrap_or_else(|| {
            debug!("No version metadata for {}.{}", namespace, name);
            UNKNOWN_VERSION.to_string()
        })
}

/// The source tree an editable install points at, if any.
fn editable_location(collection: &Path) -> Option<PathBuf> {
    // Legacy layout: the whole collection directory is a link
    if let Ok(target) = fs::read_link(collection) {
        return Some(target);
    }
    let galaxy = fs::read_link(collection.join(GALAXY_FILE)).ok()?;
    galaxy.parent().map(Path::to_path_buf)
}
