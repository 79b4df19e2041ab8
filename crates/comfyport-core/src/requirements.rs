//! pip requirement lists (`requirements.txt`) and override merging.

use std::path::Path;

use comfyport_util::errors::PortableError;

/// One requirement specifier, e.g. `torch>=2.1` or `numpy==1.26.4; python_version < "3.12"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Normalized distribution name (PEP 503).
    pub name: String,
    /// The specifier exactly as written.
    pub spec: String,
}

impl Requirement {
    /// Parse a single requirement specifier.
    pub fn parse(spec: &str) -> Result<Self, PortableError> {
        let spec = spec.trim();
        let end = spec
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(spec.len());
        let name = &spec[..end];
        let rest = spec[end..].trim_start();

        if name.is_empty() {
            return Err(PortableError::ConfigInvalid {
                message: format!("'{spec}' does not start with a package name"),
            });
        }
        if rest.starts_with(':') || rest.starts_with('+') {
            return Err(PortableError::ConfigInvalid {
                message: format!(
                    "'{spec}': direct URL requirements must use the `name @ url` form"
                ),
            });
        }

        Ok(Self {
            name: normalize_name(name),
            spec: spec.to_string(),
        })
    }
}

/// A parsed requirements file: pip options (`--extra-index-url ...`) and requirements, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    pub options: Vec<String>,
    pub requirements: Vec<Requirement>,
}

impl RequirementSet {
    /// Read a requirements file. A missing file is [`PortableError::ConfigMissing`].
    pub fn from_path(path: &Path) -> Result<Self, PortableError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PortableError::ConfigMissing {
                    what: format!("requirements file {}", path.display()),
                });
            }
            Err(e) => return Err(PortableError::Io(e)),
        };
        Self::parse(&content).map_err(|e| match e {
            PortableError::ConfigInvalid { message } => PortableError::ConfigInvalid {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, PortableError> {
        let mut set = Self::default();
        for (lineno, line) in content.lines().enumerate() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('-') {
                set.options.push(line.to_string());
                continue;
            }
            let req = Requirement::parse(line).map_err(|e| match e {
                PortableError::ConfigInvalid { message } => PortableError::ConfigInvalid {
                    message: format!("line {}: {message}", lineno + 1),
                },
                other => other,
            })?;
            set.requirements.push(req);
        }
        Ok(set)
    }

    /// Apply `overrides`: a requirement with the same normalized name replaces
    /// the base entry in place, anything else is appended.
    pub fn apply_overrides(&mut self, overrides: &[Requirement]) {
        for over in overrides {
            match self.requirements.iter_mut().find(|r| r.name == over.name) {
                Some(existing) => {
                    tracing::debug!("Override {} replaces {}", over.spec, existing.spec);
                    *existing = over.clone();
                }
                None => self.requirements.push(over.clone()),
            }
        }
    }

    /// Render back to requirements-file syntax.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for opt in &self.options {
            out.push_str(opt);
            out.push('\n');
        }
        for req in &self.requirements {
            out.push_str(&req.spec);
            out.push('\n');
        }
        out
    }
}

/// PEP 503 name normalization: lowercase, runs of `-`, `_`, `.` become one `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_sep = true;
        } else {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #").or_else(|| line.find("\t#")) {
        Some(idx) => &line[..idx],
        None => line,
    }
}
