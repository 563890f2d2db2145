//! Collects the top-level requirements from the command line and from requirements files.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use tracing::debug;
use url::Url;

use pipgrip_normalize::PackageName;
use pipgrip_pep508::{Pep508Error, Requirement};
use pipgrip_requirements_txt::RequirementsTxt;
use pipgrip_warnings::warn_user;

/// What to do with requirements that aren't valid PEP 508.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InvalidPolicy {
    /// Abort with the parse error.
    Fail,
    /// Drop the requirement with a warning, as part of `--skip-invalid-input`.
    Skip,
    /// Drop the requirement with a warning.
    Ignore,
}

/// The requirements and pip options from all sources, in input order.
#[derive(Debug, Default)]
pub(crate) struct RequirementsSpecification {
    /// The top-level requirements, at most one per package name.
    pub(crate) requirements: Vec<Requirement>,
    /// Constraints from `-c` lines in requirements files.
    pub(crate) constraints: Vec<Requirement>,
    /// The first `--index-url` of any requirements file.
    pub(crate) index_url: Option<Url>,
    pub(crate) extra_index_urls: Vec<Url>,
    /// Whether any requirements file contains `--pre`.
    pub(crate) prerelease: bool,
    names: FxHashSet<PackageName>,
}

impl RequirementsSpecification {
    /// Read the requirements given on the command line, then those of every requirements file.
    pub(crate) fn from_sources(
        dependencies: &[String],
        requirements_files: &[PathBuf],
        policy: InvalidPolicy,
    ) -> Result<Self> {
        let mut spec = Self::default();

        for dependency in dependencies {
            match Requirement::from_str(dependency) {
                Ok(requirement) => spec.push(requirement),
                Err(err) => handle_invalid(dependency, err, policy)?,
            }
        }

        for path in requirements_files {
            let requirements_txt = RequirementsTxt::parse(path)?;
            for entry in requirements_txt.requirements {
                if !entry.hashes.is_empty() {
                    debug!("Ignoring the hashes of `{}`", entry.requirement);
                }
                spec.push(entry.requirement);
            }
            for invalid in requirements_txt.invalid {
                handle_invalid(&invalid.given, invalid.error, policy)?;
            }
            spec.constraints.extend(requirements_txt.constraints);
            if spec.index_url.is_none() {
                spec.index_url = requirements_txt.index_url;
            }
            spec.extra_index_urls.extend(requirements_txt.extra_index_urls);
            spec.prerelease |= requirements_txt.prerelease;
        }

        Ok(spec)
    }

    fn push(&mut self, requirement: Requirement) {
        if self.names.insert(requirement.name.clone()) {
            self.requirements.push(requirement);
        } else {
            debug!("Ignoring `{requirement}`, `{}` is already required", requirement.name);
        }
    }
}

fn handle_invalid(given: &str, err: Pep508Error, policy: InvalidPolicy) -> Result<()> {
    match policy {
        InvalidPolicy::Fail => Err(err).with_context(|| format!("Failed to parse `{given}`")),
        InvalidPolicy::Skip => {
            debug!("{err}");
            warn_user!("Skipping invalid requirement '{given}'");
            Ok(())
        }
        InvalidPolicy::Ignore => {
            debug!("{err}");
            warn_user!("Ignoring invalid requirement '{given}'");
            Ok(())
        }
    }
}
