//! Plugin manifest (`repos.json`): the ordered list of custom node
//! repositories cloned into the application's `custom_nodes` directory.
//!
//! ```json
//! [
//!   { "url": "https://github.com/ltdrdata/ComfyUI-Manager.git" },
//!   { "name": "anymatix-nodes", "url": "https://github.com/anymatix/nodes.git", "ref": "v1.4.0" }
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use comfyport_util::errors::PortableError;

/// One entry as written in `repos.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEntry {
    url: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "ref")]
    git_ref: Option<String>,
}

/// A plugin repository to clone, with its directory name under `custom_nodes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    pub name: String,
    pub url: String,
    /// Branch, tag or commit to check out. `None` means the default branch.
    pub git_ref: Option<String>,
}

/// The validated, ordered plugin list.
#[derive(Debug, Clone, Default)]
pub struct PluginManifest {
    pub plugins: Vec<PluginEntry>,
}

impl PluginManifest {
    /// Load and validate `repos.json` from `path`.
    pub fn from_path(path: &Path) -> Result<Self, PortableError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PortableError::ConfigMissing {
                    what: format!("plugin manifest {}", path.display()),
                });
            }
            Err(e) => return Err(PortableError::Io(e)),
        };
        Self::parse_json(&content).map_err(|e| match e {
            PortableError::ConfigInvalid { message } => PortableError::ConfigInvalid {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate manifest JSON.
    pub fn parse_json(content: &str) -> Result<Self, PortableError> {
        let raw: Vec<RawEntry> =
            serde_json::from_str(content).map_err(|e| PortableError::ConfigInvalid {
                message: format!("malformed plugin manifest: {e}"),
            })?;

        let mut seen = HashSet::new();
        let mut plugins = Vec::with_capacity(raw.len());
        for (index, entry) in raw.into_iter().enumerate() {
            let url = entry.url.trim().to_string();
            if !is_clonable_url(&url) {
                return Err(PortableError::ConfigInvalid {
                    message: format!("entry {index}: '{url}' is not a clonable repository URL"),
                });
            }

            let name = match entry.name {
                Some(n) => n.trim().to_string(),
                None => repo_name_from_url(&url),
            };
            validate_name(&name).map_err(|reason| PortableError::ConfigInvalid {
                message: format!("entry {index} ({url}): invalid plugin name '{name}': {reason}"),
            })?;
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(PortableError::ConfigInvalid {
                    message: format!("entry {index}: duplicate plugin name '{name}'"),
                });
            }

            let git_ref = entry
                .git_ref
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());

            plugins.push(PluginEntry { name, url, git_ref });
        }

        Ok(Self { plugins })
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }
}

/// Directory name for a repository: last path segment without `.git`.
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed
        .rsplit(|c: char| c == '/' || c == ':' || c == '\\')
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Whether `url` is something `git clone` accepts as a remote.
pub fn is_clonable_url(url: &str) -> bool {
    if url.is_empty() || url.chars().any(char::is_whitespace) {
        return false;
    }
    for scheme in ["https://", "http://", "ssh://", "git://", "file://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return !rest.trim_matches('/').is_empty();
        }
    }
    if Path::new(url).is_absolute() {
        return true;
    }
    // scp-like syntax: user@host:path
    match url.split_once(':') {
        Some((host, path)) => host.contains('@') && !host.contains('/') && !path.is_empty(),
        None => false,
    }
}

fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name == "." || name == ".." {
        return Err("name must not be a relative path component");
    }
    if name.contains(['/', '\\']) {
        return Err("name must not contain path separators");
    }
    Ok(())
}
