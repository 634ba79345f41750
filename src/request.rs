//! # Collection Request Resolver
//!
//! Turns the text a user typed (or an entry of a requirements file) into a
//! [`CollectionRequest`]. Four forms are recognised and the first match
//! wins:
//!
//! 1. A trailing `[group,...]` suffix is split off first.
//! 2. Source-control locators: `git+https://…`, `https://….git`,
//!    `user@host:path.git`, `git+ssh://…`.
//! 3. An existing local path, whose `galaxy.yml` names the collection.
//! 4. A registry name `namespace.name` with an optional version specifier.
//!
//! The source-control test runs before any filesystem probing, so a
//! directory that happens to be named like a URL never shadows the URL.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use url::Url;

use crate::config::Config;
use crate::defaults::COLLECTIONS_DIR;
use crate::error::{Error, Result};
use crate::galaxy::{GalaxyMeta, RequirementEntry};

static REGISTRY: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^([A-Za-z0-9]+)\.([A-Za-z0-9]+)(.*)$"));
static SOURCE_CONTROL: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // scheme-prefixed, e.g. git+https://...
        pattern(r"^[A-Za-z0-9]+\+[A-Za-z][A-Za-z0-9+.\-]*://\S+$"),
        pattern(r"^https?://\S+\.git(?:,\S+)?$"),
        // user@host:path.git
        pattern(r"^[A-Za-z0-9._\-]+@[A-Za-z0-9.\-]+:\S+\.git(?:,\S+)?$"),
    ]
});
static ANSIBLE_PREFIX: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?i:ansible)[._\-]"));
static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| pattern(r"[^A-Za-z0-9]+"));

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("built-in pattern compiles")
}

const REGISTRY_HINT: &str =
    "Specify a collection as namespace.name[specifier], e.g. ansible.utils or ansible.utils:>=2.0";

/// How a request will be fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A collection source tree on the local filesystem.
    LocalPath,
    /// A collection fetched from the registry by name.
    RegistryName,
    /// A collection fetched from a version-control locator.
    SourceControlUrl,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestKind::LocalPath => "local path",
            RequestKind::RegistryName => "registry name",
            RequestKind::SourceControlUrl => "source control URL",
        };
        f.write_str(label)
    }
}

/// Where relative paths and `~` are resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    pub cwd: PathBuf,
    pub home: Option<PathBuf>,
}

impl ResolveContext {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            home: None,
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Context of the running process: its working and home directories.
    pub fn from_process() -> Result<Self> {
        Ok(Self {
            cwd: std::env::current_dir()?,
            home: dirs::home_dir(),
        })
    }

    fn expand(&self, text: &str) -> PathBuf {
        let expanded = match (&self.home, text) {
            (Some(home), "~") => home.clone(),
            (Some(home), t) if t.starts_with("~/") => home.join(&t[2..]),
            _ => PathBuf::from(text),
        };
        if expanded.is_absolute() {
            expanded
        } else {
            self.cwd.join(expanded)
        }
    }
}

/// One parsed collection request.
///
/// Exactly one of these holds: `local_path` is set, `kind` is
/// [`RequestKind::RegistryName`], or `source_urls` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    original: String,
    kind: RequestKind,
    namespace: String,
    name: String,
    version_specifier: Option<String>,
    optional_dependency_groups: Vec<String>,
    source_urls: Vec<String>,
    local_path: Option<PathBuf>,
}

impl CollectionRequest {
    fn local(original: &str, path: PathBuf, meta: &GalaxyMeta, groups: Vec<String>) -> Self {
        let (namespace, name) = meta.identity();
        Self {
            original: original.to_string(),
            kind: RequestKind::LocalPath,
            namespace,
            name,
            version_specifier: None,
            optional_dependency_groups: groups,
            source_urls: Vec::new(),
            local_path: Some(path),
        }
    }

    fn registry(original: &str, namespace: &str, name: &str, specifier: Option<String>) -> Self {
        Self {
            original: original.to_string(),
            kind: RequestKind::RegistryName,
            namespace: namespace.to_string(),
            name: name.to_string(),
            version_specifier: specifier,
            optional_dependency_groups: Vec::new(),
            source_urls: Vec::new(),
            local_path: None,
        }
    }

    fn source_control(original: &str, url: &str, groups: Vec<String>) -> Self {
        let (namespace, name) = derive_collection_name(url);
        Self {
            original: original.to_string(),
            kind: RequestKind::SourceControlUrl,
            namespace,
            name,
            version_specifier: None,
            optional_dependency_groups: groups,
            source_urls: vec![url.to_string()],
            local_path: None,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_specifier(&self) -> Option<&str> {
        self.version_specifier.as_deref()
    }

    pub fn optional_dependency_groups(&self) -> &[String] {
        &self.optional_dependency_groups
    }

    pub fn source_urls(&self) -> &[String] {
        &self.source_urls
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn is_local(&self) -> bool {
        self.local_path.is_some()
    }

    /// Fully qualified collection name, `namespace.name`.
    pub fn fqcn(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// What `ansible-galaxy collection install` is given for a non-local request.
    pub fn install_target(&self) -> &str {
        self.source_urls
            .first()
            .map(String::as_str)
            .unwrap_or_else(|| self.original.trim())
    }

    /// `<site-packages>/ansible_collections/<namespace>/<name>`.
    pub fn destination(&self, config: &Config) -> PathBuf {
        destination_in(config.site_pkg_path(), &self.namespace, &self.name)
    }

    /// Per-collection working directory under the environment cache.
    pub fn cache_dir(&self, config: &Config) -> PathBuf {
        config.cache_dir().join(self.fqcn())
    }

    /// Staging directory the local build runs in.
    pub fn build_dir(&self, config: &Config) -> PathBuf {
        self.cache_dir(config).join("build")
    }
}

/// `<site_pkg>/ansible_collections/<namespace>/<name>`.
pub fn destination_in(site_pkg: &Path, namespace: &str, name: &str) -> PathBuf {
    site_pkg.join(COLLECTIONS_DIR).join(namespace).join(name)
}

/// Resolve a command-line collection specifier.
pub fn resolve(text: &str, ctx: &ResolveContext) -> Result<CollectionRequest> {
    let text = text.trim();
    let (base, groups) = split_groups(text);
    debug!("Resolving collection request '{}'", text);

    if is_source_control_url(base) {
        debug!("Request '{}' is a source control URL", text);
        return Ok(CollectionRequest::source_control(text, base, groups));
    }

    if let Some(request) = resolve_local(text, base, &groups, ctx)? {
        return Ok(request);
    }

    if base.len() != text.len() {
        return Err(Error::Request {
            request: text.to_string(),
            message: format!("path not found: {}", ctx.expand(base).display()),
            hint: Some(
                "Provide an existing path to a collection when specifying optional dependencies"
                    .to_string(),
            ),
        });
    }

    resolve_registry(text, None)
}

/// Resolve one entry of a requirements file.
///
/// Entries are local paths or registry names; bracket suffixes and
/// source-control detection do not apply.
pub fn resolve_requirement(
    entry: &RequirementEntry,
    ctx: &ResolveContext,
) -> Result<CollectionRequest> {
    let text = entry.name().trim();
    if let Some(request) = resolve_local(text, text, &[], ctx)? {
        return Ok(request);
    }
    resolve_registry(text, entry.version().map(str::to_string))
}

fn resolve_local(
    original: &str,
    base: &str,
    groups: &[String],
    ctx: &ResolveContext,
) -> Result<Option<CollectionRequest>> {
    if base.is_empty() {
        return Ok(None);
    }
    let path = match ctx.expand(base).canonicalize() {
        Ok(path) => path,
        Err(_) => return Ok(None),
    };
    debug!("Request '{}' is a local path: {}", original, path.display());
    let meta = GalaxyMeta::read(&path)?;
    Ok(Some(CollectionRequest::local(
        original,
        path,
        &meta,
        groups.to_vec(),
    )))
}

fn resolve_registry(text: &str, version: Option<String>) -> Result<CollectionRequest> {
    let captures = REGISTRY.captures(text).ok_or_else(|| Error::Request {
        request: text.to_string(),
        message: "not a local path, source control URL or collection name".to_string(),
        hint: Some(REGISTRY_HINT.to_string()),
    })?;
    let specifier = captures
        .get(3)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or(version);
    debug!(
        "Request '{}' is a registry name with specifier {:?}",
        text, specifier
    );
    Ok(CollectionRequest::registry(
        text,
        &captures[1],
        &captures[2],
        specifier,
    ))
}

/// Split a trailing balanced `[...]` suffix into trimmed, non-empty groups.
///
/// Text without a balanced trailing suffix is returned unchanged.
pub fn split_groups(text: &str) -> (&str, Vec<String>) {
    if !text.ends_with(']') {
        return (text, Vec::new());
    }
    let mut depth = 0usize;
    for (index, ch) in text.char_indices().rev() {
        match ch {
            ']' => depth += 1,
            '[' => {
                depth -= 1;
                if depth == 0 {
                    let inner = &text[index + 1..text.len() - 1];
                    let groups = inner
                        .split(',')
                        .map(str::trim)
                        .filter(|g| !g.is_empty())
                        .map(str::to_string)
                        .collect();
                    return (&text[..index], groups);
                }
            }
            _ => {}
        }
    }
    (text, Vec::new())
}

/// Whether `text` is one of the recognised source-control locator shapes.
pub fn is_source_control_url(text: &str) -> bool {
    SOURCE_CONTROL.iter().any(|re| re.is_match(text))
}

/// Derive `(namespace, name)` from a source-control locator.
///
/// Uses the last two path segments. A leading `ansible.`, `ansible-` or
/// `ansible_` is dropped from the name, and runs of other characters are
/// collapsed into `_`.
pub fn derive_collection_name(url: &str) -> (String, String) {
    let locator = url.split(',').next().unwrap_or(url);
    let path = locator_path(locator);
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.strip_suffix(".git").unwrap_or(s))
        .filter(|s| !s.is_empty())
        .collect();

    let normalize = |segment: &str| -> String {
        let normalized = NON_ALPHANUMERIC.replace_all(segment, "_");
        match normalized.trim_matches('_') {
            "" => "unknown".to_string(),
            trimmed => trimmed.to_string(),
        }
    };
    let strip_prefix = |segment: &str| ANSIBLE_PREFIX.replace(segment, "").into_owned();

    match segments.as_slice() {
        [] => {
            let last = locator
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(locator);
            ("unknown".to_string(), last.to_string())
        }
        [only] => ("unknown".to_string(), normalize(&strip_prefix(*only))),
        [.., owner, repo] => (normalize(*owner), normalize(&strip_prefix(*repo))),
    }
}

fn locator_path(locator: &str) -> String {
    // user@host:path.git has no scheme
    if !locator.contains("://") {
        return locator
            .split_once(':')
            .map(|(_, path)| path.to_string())
            .unwrap_or_default();
    }
    let without_vcs = match locator.split_once('+') {
        Some((vcs, rest)) if !vcs.contains('/') && rest.contains("://") => rest,
        _ => locator,
    };
    match Url::parse(without_vcs) {
        Ok(url) => url.path().to_string(),
        Err(_) => without_vcs
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .map(|(_, path)| path.to_string())
            .unwrap_or_default(),
    }
}
