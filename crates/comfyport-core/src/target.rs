use std::fmt;
use std::str::FromStr;

use comfyport_util::errors::PortableError;

/// Operating system half of a [`BuildTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    MacOs,
    Linux,
    Windows,
}

/// CPU architecture half of a [`BuildTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    Arm64,
}

/// An (operating system, CPU architecture) pair a package is built for.
///
/// Written as `<os>-<arch>`, e.g. `macos-arm64` or `linux-x86_64`. The same
/// strings appear in archive names, CI matrix entries and
/// `[[environment.overrides]]` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildTarget {
    pub os: Os,
    pub arch: Arch,
}

impl Os {
    /// Parse an OS name, accepting the spellings used by Rust, Python and CI runners.
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "macos" | "darwin" | "osx" | "mac" => Some(Self::MacOs),
            "linux" => Some(Self::Linux),
            "windows" | "win" | "win32" => Some(Self::Windows),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

impl Arch {
    /// Parse an architecture name (`aarch64`, `arm64`, `amd64`, `x64`, ...).
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Some(Self::X86_64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }
}

impl BuildTarget {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// The target of the machine running this process.
    pub fn host() -> Result<Self, PortableError> {
        let os = Os::parse_name(std::env::consts::OS);
        let arch = Arch::parse_name(std::env::consts::ARCH);
        match (os, arch) {
            (Some(os), Some(arch)) => Ok(Self { os, arch }),
            _ => Err(PortableError::UnsupportedTarget {
                target: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            }),
        }
    }

    /// Platform tag used in archive names (`macos`, `linux`, `windows`).
    pub fn platform(&self) -> &'static str {
        self.os.as_str()
    }

    /// Architecture tag used in archive names (`arm64`, `x86_64`).
    pub fn architecture(&self) -> &'static str {
        self.arch.as_str()
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Whether `pattern` (`*`, `<os>-*`, `*-<arch>` or `<os>-<arch>`) selects this target.
    pub fn matches(&self, pattern: &str) -> bool {
        let pattern = pattern.trim();
        if pattern == "*" {
            return true;
        }
        let Some((os, arch)) = pattern.split_once('-') else {
            return Os::parse_name(pattern) == Some(self.os);
        };
        let os_ok = os == "*" || Os::parse_name(os) == Some(self.os);
        let arch_ok = arch == "*" || Arch::parse_name(arch) == Some(self.arch);
        os_ok && arch_ok
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = PortableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || PortableError::UnsupportedTarget {
            target: s.to_string(),
        };
        let (os, arch) = s.trim().split_once('-').ok_or_else(unsupported)?;
        let os = Os::parse_name(os).ok_or_else(unsupported)?;
        let arch = Arch::parse_name(arch).ok_or_else(unsupported)?;
        Ok(Self { os, arch })
    }
}
