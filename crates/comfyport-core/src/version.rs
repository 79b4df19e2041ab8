//! Package version read from the project's version file.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use comfyport_util::errors::PortableError;

/// A `major.minor.patch` version, kept verbatim as written in the version file.
///
/// Only plain numeric triples are accepted: no `v` prefix, no pre-release or
/// build suffix. Components are digit strings of any length and are never
/// reinterpreted as numbers, so archive names and release tags reproduce the
/// file content exactly, leading zeros included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion {
    raw: String,
}

impl PackageVersion {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Release tag for this version (`v1.2.3`).
    pub fn tag(&self) -> String {
        format!("v{}", self.raw)
    }
}

/// Read and validate the version file at `path`.
///
/// Fails with [`PortableError::ConfigMissing`] when the file does not exist and
/// with [`PortableError::ConfigInvalid`] when its trimmed content is not a
/// `\d+\.\d+\.\d+` triple.
pub fn read_version(path: &Path) -> Result<PackageVersion, PortableError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PortableError::ConfigMissing {
                what: format!("version file {}", path.display()),
            });
        }
        Err(e) => return Err(PortableError::Io(e)),
    };
    content.parse().map_err(|e: PortableError| match e {
        PortableError::ConfigInvalid { message } => PortableError::ConfigInvalid {
            message: format!("{}: {message}", path.display()),
        },
        other => other,
    })
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PackageVersion {
    type Err = PortableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || PortableError::ConfigInvalid {
            message: format!("'{raw}' is not a major.minor.patch version"),
        };

        let pieces: Vec<&str> = raw.split('.').collect();
        let numeric = |p: &&str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if pieces.len() != 3 || !pieces.iter().all(numeric) {
            return Err(invalid());
        }

        Ok(Self {
            raw: raw.to_string(),
        })
    }
}
