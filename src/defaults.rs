//! Default names, packages and limits used across the lifecycle engine.
//!
//! Centralizing them here keeps the installer, uninstaller and inventory
//! agreeing on where collections live inside a virtual environment.

use std::time::Duration;

/// Directory under site-packages that holds every installed collection.
pub const COLLECTIONS_DIR: &str = "ansible_collections";

/// Per-environment working directory, created directly under the venv root.
pub const CACHE_DIR_NAME: &str = ".ansible-dev-environment";

/// Python distribution providing the Ansible runtime.
pub const CORE_PACKAGE: &str = "ansible-core";

/// Meta-package that bundles the Ansible developer tools.
pub const META_PACKAGE: &str = "ansible-dev-tools";

/// Archive base for installing the runtime from a development channel.
pub const CORE_REPO_URL: &str = "https://github.com/ansible/ansible/archive";

/// Collection metadata file at the root of a collection source tree.
pub const GALAXY_FILE: &str = "galaxy.yml";

/// Metadata file written by `ansible-galaxy` into an installed collection.
pub const MANIFEST_FILE: &str = "MANIFEST.json";

/// Requirements file used for a source pre-install.
pub const SOURCE_REQUIREMENTS: &str = ".config/source-requirements.yml";

/// Virtual environment directory spellings never exposed by an editable install.
pub const VENV_NAMES: [&str; 4] = [".venv", "venv", ".virtualenv", "virtualenv"];

/// Other top-level entries never exposed by an editable install.
pub const EXCLUDED_NAMES: [&str; 2] = [".git", "__pycache__"];

/// File suffixes never exposed by an editable install.
pub const EXCLUDED_SUFFIXES: [&str; 2] = [".pyc", ".pyo"];

/// Time limit for the meta-package dry-run constraint query.
pub const DRY_RUN_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns `true` if a top-level source entry must not be linked or copied.
pub fn is_excluded(name: &str) -> bool {
    VENV_NAMES.contains(&name)
        || EXCLUDED_NAMES.contains(&name)
        || EXCLUDED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
