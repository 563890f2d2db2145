//! Finds the Python interpreter whose pip does the resolving, and talks to that pip.
//!
//! pip is only ever run as a subprocess (`python -m pip`). Resolution uses pip's
//! [installation report](https://pip.pypa.io/en/stable/reference/installation-report/),
//! available since pip 22.2.

use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Output};

use thiserror::Error;

use pipgrip_pep440::Version;

pub use crate::interpreter::Interpreter;
pub use crate::pip::PipOptions;
pub use crate::report::{InstallationReport, Metadata, PipReport};

mod interpreter;
mod pip;
mod report;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("No Python interpreter found, looked for `python3` and `python` on `PATH`")]
    NotFound,
    #[error("Python interpreter `{}` not found", _0.display())]
    MissingExecutable(PathBuf, #[source] which::Error),
    #[error("Failed to run `{}`", _0.display())]
    CommandFailed(PathBuf, #[source] io::Error),
    #[error("Querying the pip version of `{}` failed", interpreter.display())]
    PipVersion {
        interpreter: PathBuf,
        #[source]
        output: PipOutput,
    },
    #[error("Could not parse a pip version from `{0}`")]
    PipVersionParse(String),
    #[error(
        "pip {version} of `{}` is too old, pip 22.2 or newer is required for `--report`",
        interpreter.display()
    )]
    PipTooOld {
        interpreter: PathBuf,
        version: Version,
    },
    #[error("Failed to get report for {requirements}")]
    Report {
        requirements: String,
        #[source]
        output: PipOutput,
    },
    #[error("Failed to read the installation report for {requirements}")]
    InvalidReport {
        requirements: String,
        #[source]
        err: serde_json::Error,
    },
}

/// What a failed pip invocation had to say for itself.
#[derive(Debug, Error)]
pub struct PipOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl PipOutput {
    pub(crate) fn from_output(output: &Output) -> Self {
        Self {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// pip prints its errors to stderr; the exit status is only shown when it didn't.
impl Display for PipOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.stderr.is_empty() {
            f.write_str(&self.stderr)
        } else if !self.stdout.is_empty() {
            f.write_str(&self.stdout)
        } else {
            write!(f, "pip exited with {}", self.status)
        }
    }
}
