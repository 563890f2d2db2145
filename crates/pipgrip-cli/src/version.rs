//! The version shown by `pipgrip --version`.

use std::fmt;

use pipgrip_static::EnvVars;

/// pipgrip's version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// The version, e.g. `0.10.14`.
    pub version: String,
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipgrip, version {}", self.version)
    }
}

/// Returns information about pipgrip's version.
pub fn version() -> VersionInfo {
    let version = std::env::var(EnvVars::PIPGRIP_TEST_VERSION)
        .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
    VersionInfo { version }
}
