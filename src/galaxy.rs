//! # Collection Metadata Files
//!
//! Serde models for the files the lifecycle engine reads:
//!
//! - `galaxy.yml` at the root of a collection source tree ([`GalaxyMeta`]).
//! - `MANIFEST.json` written by `ansible-galaxy` into an installed
//!   collection ([`Manifest`]).
//! - `GALAXY.yml` inside a `<ns.name>-<version>.info` directory ([`InstallInfo`]).
//! - Requirements files with a `collections:` list ([`Requirements`]).
//!
//! All models accept unknown keys and treat everything but the fields the
//! engine relies on as optional.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

// `version: 1.0` parses as a float in YAML
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The subset of `galaxy.yml` the engine consumes.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GalaxyMeta {
    pub namespace: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, serde_yaml::Value>>,
}

impl GalaxyMeta {
    /// Read `galaxy.yml` from a collection root.
    ///
    /// Fails with [`Error::Metadata`] if the file is missing, unreadable,
    /// invalid YAML, or lacks `namespace`/`name`.
    pub fn read(root: &Path) -> Result<Self> {
        let path = root.join(crate::defaults::GALAXY_FILE);
        let content = fs::read_to_string(&path).map_err(|e| Error::Metadata {
            path: path.clone(),
            message: format!("unable to read file: {}", e),
        })?;
        let meta: GalaxyMeta = serde_yaml::from_str(&content).map_err(|e| Error::Metadata {
            path: path.clone(),
            message: format!("invalid YAML: {}", e),
        })?;
        for (field, value) in [("namespace", &meta.namespace), ("name", &meta.name)] {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(Error::Metadata {
                    path,
                    message: format!("missing required key '{}'", field),
                });
            }
        }
        Ok(meta)
    }

    /// `(namespace, name)`, both guaranteed present after [`GalaxyMeta::read`].
    pub fn identity(&self) -> (String, String) {
        (
            self.namespace.clone().unwrap_or_default(),
            self.name.clone().unwrap_or_default(),
        )
    }
}

/// `MANIFEST.json` written into every installed collection.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Manifest {
    #[serde(default)]
    pub collection_info: ManifestInfo,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ManifestInfo {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
}

impl Manifest {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// `GALAXY.yml` written into `<ns.name>-<version>.info` directories.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct InstallInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    pub server: Option<String>,
}

impl InstallInfo {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// One entry of a requirements file `collections:` list.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequirementEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, deserialize_with = "lenient_string")]
        version: Option<String>,
        source: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
    },
}

impl RequirementEntry {
    pub fn name(&self) -> &str {
        match self {
            RequirementEntry::Name(name) => name,
            RequirementEntry::Detailed { name, .. } => name,
        }
    }

    /// Whether the entry names a collection rather than an archive, URL or
    /// source checkout.
    pub fn is_collection_name(&self) -> bool {
        let name = self.name();
        let typed = match self {
            RequirementEntry::Detailed {
                kind: Some(kind), ..
            } => kind != "galaxy",
            _ => false,
        };
        !typed && !name.contains("://") && !name.ends_with(".tar.gz")
    }

    /// Version constraint, ignoring the `*` wildcard.
    pub fn version(&self) -> Option<&str> {
        match self {
            RequirementEntry::Detailed {
                version: Some(version),
                ..
            } if version.trim() != "*" && !version.trim().is_empty() => Some(version.trim()),
            _ => None,
        }
    }
}

/// A collection requirements file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Requirements {
    #[serde(default)]
    pub collections: Vec<RequirementEntry>,
}

impl Requirements {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Metadata {
            path: path.to_path_buf(),
            message: format!("unable to read requirements file: {}", e),
        })?;
        let requirements: Option<Requirements> =
            serde_yaml::from_str(&content).map_err(|e| Error::Metadata {
                path: path.to_path_buf(),
                message: format!("invalid YAML: {}", e),
            })?;
        Ok(requirements.unwrap_or_default())
    }
}

/// Sibling `<ns.name>*.info` directories of an installed collection.
pub fn info_dirs(collections_root: &Path, namespace: &str, name: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}.{}", namespace, name);
    let mut found = Vec::new();
    if !collections_root.is_dir() {
        return Ok(found);
    }
    for entry in fs::read_dir(collections_root)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if !file_name.ends_with(".info") || !file_name.starts_with(&prefix) {
            continue;
        }
        // ns.name-1.0.0.info, not ns.name_other-1.0.0.info
        let rest = &file_name[prefix.len()..];
        if rest.starts_with('-') || rest == ".info" {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}
