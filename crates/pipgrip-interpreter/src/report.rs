use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use tracing::warn;

use pipgrip_normalize::{ExtraName, PackageName};
use pipgrip_pep440::Version;
use pipgrip_pep508::{MarkerEnvironment, Requirement};

/// The installation report written by `pip install --dry-run --report`.
///
/// Only the fields needed to rebuild the dependency graph are read.
///
/// <https://pip.pypa.io/en/stable/reference/installation-report/>
#[derive(Debug, Clone, Deserialize)]
pub struct PipReport {
    /// The format version of the report, `"1"` at the time of writing.
    pub version: String,
    #[serde(default)]
    pub pip_version: Option<String>,
    /// Every distribution pip would install, requested or not.
    pub install: Vec<InstallationReport>,
    /// The marker values of the interpreter pip ran in.
    pub environment: MarkerEnvironment,
}

impl PipReport {
    /// Returns the installation entry for the given package, if pip would install it.
    pub fn get(&self, name: &PackageName) -> Option<&InstallationReport> {
        self.install
            .iter()
            .find(|install| &install.metadata.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationReport {
    pub metadata: Metadata,
    /// Whether the distribution was one of the requirements pip was given.
    #[serde(default)]
    pub requested: bool,
    /// The extras of a requested distribution.
    #[serde(default)]
    pub requested_extras: Vec<ExtraName>,
}

/// The core metadata of a distribution, as JSON.
///
/// <https://packaging.python.org/en/latest/specifications/core-metadata/>
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub name: PackageName,
    pub version: Version,
    /// The `Requires-Dist` entries; entries that fail to parse are dropped with a warning.
    #[serde(default, deserialize_with = "deserialize_requires_dist_lenient")]
    pub requires_dist: Vec<Requirement>,
}

fn deserialize_requires_dist_lenient<'de, D>(deserializer: D) -> Result<Vec<Requirement>, D::Error>
where
    D: Deserializer<'de>,
{
    let requires_dist: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(requires_dist
        .unwrap_or_default()
        .into_iter()
        .filter_map(|requirement| match Requirement::from_str(&requirement) {
            Ok(requirement) => Some(requirement),
            Err(err) => {
                warn!("Ignoring invalid `Requires-Dist` entry `{requirement}`: {err}");
                None
            }
        })
        .collect())
}
