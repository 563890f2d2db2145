use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use itertools::Itertools;
use tokio::process::Command;
use tracing::{debug, instrument};
use url::Url;

use pipgrip_pep508::Requirement;

use crate::report::PipReport;
use crate::{Error, Interpreter, PipOutput};

/// The pip options shared by reporting and installing.
#[derive(Debug, Clone, Default)]
pub struct PipOptions {
    /// Only use wheels (`--only-binary=:all:`), never build from source.
    pub no_compile: bool,
    /// Allow pre-releases (`--pre`).
    pub prerelease: bool,
    pub index_url: Option<Url>,
    pub extra_index_urls: Vec<Url>,
    pub cache_dir: Option<PathBuf>,
    pub no_cache_dir: bool,
    /// Passed to pip as a constraints file.
    pub constraints: Vec<Requirement>,
}

impl PipOptions {
    /// Add the options to a pip command; the constraints file is written to `temp_dir`.
    async fn apply(&self, command: &mut Command, temp_dir: &Path) -> Result<(), Error> {
        if self.no_compile {
            command.arg("--only-binary=:all:");
        }
        if self.prerelease {
            command.arg("--pre");
        }
        if let Some(index_url) = &self.index_url {
            command.arg("--index-url").arg(index_url.as_str());
        }
        for extra_index_url in &self.extra_index_urls {
            command.arg("--extra-index-url").arg(extra_index_url.as_str());
        }
        if self.no_cache_dir {
            command.arg("--no-cache-dir");
        } else if let Some(cache_dir) = &self.cache_dir {
            command.arg("--cache-dir").arg(cache_dir);
        }
        if !self.constraints.is_empty() {
            let constraints_txt = temp_dir.join("constraints.txt");
            let mut content = self.constraints.iter().join("\n");
            content.push('\n');
            fs_err::tokio::write(&constraints_txt, content).await?;
            command.arg("--constraint").arg(constraints_txt);
        }
        Ok(())
    }
}

impl Interpreter {
    /// Ask pip what it would install for the requirements, without installing anything.
    #[instrument(skip_all, fields(requirements = requirements.len()))]
    pub async fn report(
        &self,
        requirements: &[Requirement],
        options: &PipOptions,
    ) -> Result<PipReport, Error> {
        let shown = requirements.iter().join(" ");
        // Holds the report and the constraints, deleted on drop.
        let temp_dir = tempfile::tempdir()?;
        let report_json = temp_dir.path().join("report.json");

        let mut command = self.pip_command();
        command
            .args([
                "install",
                "--dry-run",
                "--ignore-installed",
                "--quiet",
                "--no-input",
                "--disable-pip-version-check",
                "--report",
            ])
            .arg(&report_json);
        options.apply(&mut command, temp_dir.path()).await?;
        command.args(requirements.iter().map(ToString::to_string));

        debug!("Requesting pip report for: {shown}");
        let output = command
            .output()
            .await
            .map_err(|err| Error::CommandFailed(self.executable().to_path_buf(), err))?;
        if !output.status.success() {
            return Err(Error::Report {
                requirements: shown,
                output: PipOutput::from_output(&output),
            });
        }

        let report = fs_err::tokio::read(&report_json).await?;
        serde_json::from_slice(&report).map_err(|err| Error::InvalidReport {
            requirements: shown,
            err,
        })
    }

    /// Install the pinned requirements with pip, with pip's output going to the terminal.
    ///
    /// Returns pip's exit status rather than an error when pip fails.
    pub async fn install(
        &self,
        pins: &[String],
        options: &PipOptions,
        user: bool,
    ) -> Result<ExitStatus, Error> {
        let temp_dir = tempfile::tempdir()?;
        let mut command = self.pip_command();
        command.arg("install");
        if user {
            command.arg("--user");
        }
        options.apply(&mut command, temp_dir.path()).await?;
        command.args(pins);

        debug!("Installing: {}", pins.join(" "));
        command
            .status()
            .await
            .map_err(|err| Error::CommandFailed(self.executable().to_path_buf(), err))
    }
}
