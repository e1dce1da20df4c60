//! Platform resolution for agent binary downloads.
//!
//! Maps raw OS and architecture strings onto one of a fixed set of CDN
//! artifacts, keyed by the agent's major version family. Resolution is
//! data-driven: two ordered rule tables, first full match wins.

use thiserror::Error;

use crate::config::NgrokVersion;

/// Operating system family the agent binary is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
    FreeBsd,
}

/// CPU architecture the agent binary is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
    Arm,
    I386,
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Darwin => write!(f, "darwin"),
            Self::Windows => write!(f, "windows"),
            Self::FreeBsd => write!(f, "freebsd"),
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amd64 => write!(f, "amd64"),
            Self::Arm64 => write!(f, "arm64"),
            Self::Arm => write!(f, "arm"),
            Self::I386 => write!(f, "386"),
        }
    }
}

impl Os {
    /// Local filename of the agent binary on this OS family.
    pub const fn binary_name(self) -> &'static str {
        match self {
            Self::Windows => "ngrok.exe",
            _ => "ngrok",
        }
    }
}

/// Filename of the agent config file, identical on every platform.
pub const CONFIG_NAME: &str = "ngrok.yml";

/// Resolved download artifact and local filenames for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub download_url: String,
    pub binary_name: &'static str,
    pub config_name: &'static str,
}

/// No rule in the platform table matched the reported OS/arch strings.
#[derive(Debug, Clone, Error)]
#[error("unsupported platform: os={os}, arch={arch}")]
pub struct UnsupportedPlatformError {
    pub os: String,
    pub arch: String,
}

struct OsRule {
    any_of: &'static [&'static str],
    os: Os,
}

struct ArchRule {
    all_of: &'static [&'static str],
    arch: Arch,
}

const OS_RULES: &[OsRule] = &[
    OsRule {
        any_of: &["windows", "cygwin", "mingw", "win32", "win64"],
        os: Os::Windows,
    },
    OsRule {
        any_of: &["mac", "darwin"],
        os: Os::Darwin,
    },
    OsRule {
        any_of: &["freebsd"],
        os: Os::FreeBsd,
    },
    OsRule {
        any_of: &["linux"],
        os: Os::Linux,
    },
];

// Ordered most-specific first: a compound string such as "arm x86_64" must
// resolve to the 64-bit arm artifact, not whichever token matches first.
const ARCH_RULES: &[ArchRule] = &[
    ArchRule {
        all_of: &["arm", "x86_64"],
        arch: Arch::Arm64,
    },
    ArchRule {
        all_of: &["aarch64"],
        arch: Arch::Arm64,
    },
    ArchRule {
        all_of: &["arm64"],
        arch: Arch::Arm64,
    },
    ArchRule {
        all_of: &["arm"],
        arch: Arch::Arm,
    },
    ArchRule {
        all_of: &["x86_64"],
        arch: Arch::Amd64,
    },
    ArchRule {
        all_of: &["amd64"],
        arch: Arch::Amd64,
    },
    ArchRule {
        all_of: &["i686"],
        arch: Arch::I386,
    },
    ArchRule {
        all_of: &["i386"],
        arch: Arch::I386,
    },
    ArchRule {
        all_of: &["x86"],
        arch: Arch::I386,
    },
];

fn artifact_url(version: NgrokVersion, os: Os, arch: Arch) -> String {
    let (root, stem) = match version {
        NgrokVersion::V2 => ("https://bin.equinox.io/c/4VmDzA7iaHb", "ngrok-stable"),
        NgrokVersion::V3 => ("https://bin.equinox.io/c/bNyj1mQVY4c", "ngrok-v3-stable"),
    };
    format!("{root}/{stem}-{os}-{arch}.gz")
}

/// Resolve raw OS/arch strings to a download descriptor for the requested
/// major version family.
///
/// Pure and deterministic; fails when no rule matches either string.
pub fn resolve(
    os_raw: &str,
    arch_raw: &str,
    version: NgrokVersion,
) -> Result<PlatformDescriptor, UnsupportedPlatformError> {
    let unsupported = || UnsupportedPlatformError {
        os: os_raw.to_string(),
        arch: arch_raw.to_string(),
    };

    let os_lower = os_raw.to_ascii_lowercase();
    let os = OS_RULES
        .iter()
        .find(|rule| rule.any_of.iter().any(|token| os_lower.contains(token)))
        .map(|rule| rule.os)
        .ok_or_else(unsupported)?;

    let arch_lower = arch_raw.to_ascii_lowercase();
    let arch = ARCH_RULES
        .iter()
        .find(|rule| rule.all_of.iter().all(|token| arch_lower.contains(token)))
        .map(|rule| rule.arch)
        .ok_or_else(unsupported)?;

    Ok(PlatformDescriptor {
        download_url: artifact_url(version, os, arch),
        binary_name: os.binary_name(),
        config_name: CONFIG_NAME,
    })
}

/// Resolve for the host this process is running on.
pub fn resolve_host(version: NgrokVersion) -> Result<PlatformDescriptor, UnsupportedPlatformError> {
    resolve(std::env::consts::OS, std::env::consts::ARCH, version)
}
