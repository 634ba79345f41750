//! # Editable Materialization
//!
//! An editable install replaces the installed copy of a collection with a
//! directory of symlinks pointing back into the source tree, one per
//! top-level entry. Linking entry by entry, rather than linking the whole
//! tree, lets the engine leave out anything that would make the
//! environment's package directory reach back into itself, most notably a
//! virtual environment created inside the collection checkout.
//!
//! ## Steps
//!
//! 1. **Discovery**: the tracked files reported by `git ls-files` in the
//!    source root, falling back to a plain directory listing when git is
//!    unavailable or the tree is not a repository. Untracked files are
//!    never exposed.
//! 2. **Filtering**: keep the first path segment of every entry and drop
//!    the names [`crate::defaults::is_excluded`] rejects.
//! 3. **Preparation**: replace whatever is at the destination (including a
//!    legacy whole-tree symlink) with a fresh empty directory.
//! 4. **Linking**: one symlink per surviving entry that still exists.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::defaults::is_excluded;
use crate::error::{Error, Result};
use crate::process::{CommandRunner, CommandSpec};
use crate::request::CollectionRequest;

/// How the top-level entries of a source tree were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMethod {
    GitLsFiles,
    DirectoryListing,
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryMethod::GitLsFiles => f.write_str("git ls-files"),
            DiscoveryMethod::DirectoryListing => f.write_str("directory listing"),
        }
    }
}

/// Paths found under a source root, relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub method: DiscoveryMethod,
    pub paths: Vec<String>,
}

/// One symlink created by [`materialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableLink {
    pub name: String,
    pub link: PathBuf,
    pub target: PathBuf,
}

/// List the tracked files of a source tree.
///
/// An empty but successful `git ls-files` is a valid result and does not
/// trigger the fallback.
pub fn discover(runner: &dyn CommandRunner, root: &Path) -> Result<Discovery> {
    let spec = CommandSpec::new("git")
        .args(["ls-files", "-z"])
        .current_dir(root);
    match runner.output(&spec) {
        Ok(output) if output.success() => {
            let paths = output
                .stdout
                .split('\0')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(Discovery {
                method: DiscoveryMethod::GitLsFiles,
                paths,
            });
        }
        Ok(output) => debug!(
            "git ls-files failed in {}, listing the directory instead: {}",
            root.display(),
            output.stderr.trim()
        ),
        Err(e) => debug!("git unavailable, listing the directory instead: {}", e),
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(root)? {
        paths.push(entry?.file_name().to_string_lossy().into_owned());
    }
    paths.sort();
    Ok(Discovery {
        method: DiscoveryMethod::DirectoryListing,
        paths,
    })
}

/// Reduce discovered paths to the set of top-level names that may be exposed.
pub fn filter_top_level<I, S>(paths: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paths
        .into_iter()
        .filter_map(|path| {
            path.as_ref()
                .split(['/', '\\'])
                .find(|segment| !segment.is_empty() && *segment != ".")
                .map(str::to_string)
        })
        .filter(|name| !is_excluded(name))
        .collect()
}

/// Discover and filter the top-level entries of a source root.
pub fn top_level_entries(runner: &dyn CommandRunner, root: &Path) -> Result<BTreeSet<String>> {
    let discovery = discover(runner, root)?;
    let entries = filter_top_level(&discovery.paths);
    debug!(
        "Found {} top-level entries in {} using {}",
        entries.len(),
        root.display(),
        discovery.method
    );
    Ok(entries)
}

/// Replace the installed collection at `destination` with symlinks into
/// the request's source tree.
pub fn materialize(
    runner: &dyn CommandRunner,
    request: &CollectionRequest,
    destination: &Path,
) -> Result<Vec<EditableLink>> {
    let source = request.local_path().ok_or_else(|| Error::Editable {
        collection: request.fqcn(),
        message: "only local collections can be installed in editable mode".to_string(),
    })?;

    let entries = top_level_entries(runner, source)?;
    if entries.is_empty() {
        return Err(Error::Editable {
            collection: request.fqcn(),
            message: format!("nothing to link from {}", source.display()),
        });
    }

    prepare_destination(destination)?;

    let mut links = Vec::new();
    for name in entries {
        let target = source.join(&name);
        if fs::symlink_metadata(&target).is_err() {
            debug!("Skipping {}, no longer present in the source", name);
            continue;
        }
        let link = destination.join(&name);
        symlink(&target, &link)?;
        links.push(EditableLink { name, link, target });
    }
    info!(
        "Linked {} entries of {} into {}",
        links.len(),
        request.fqcn(),
        destination.display()
    );
    Ok(links)
}

/// Ensure `destination` is an empty real directory.
fn prepare_destination(destination: &Path) -> Result<()> {
    if remove_existing(destination)? {
        debug!("Cleared {}", destination.display());
    }
    fs::create_dir_all(destination)?;
    Ok(())
}

/// Remove whatever is at `path` without following symlinks.
///
/// Returns `false` if nothing was there.
pub fn remove_existing(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => remove_symlink(path).map(|_| true),
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|_| true),
        Ok(_) => fs::remove_file(path).map(|_| true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a symlink without following it.
fn remove_symlink(path: &Path) -> io::Result<()> {
    // Directory symlinks on Windows need remove_dir
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}
