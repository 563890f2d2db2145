use std::path::{Path, PathBuf};
use std::str::FromStr;

use tokio::process::Command;
use tracing::debug;

use pipgrip_pep440::Version;
use pipgrip_static::EnvVars;

use crate::{Error, PipOutput};

/// A Python executable with a pip recent enough to write installation reports.
#[derive(Debug, Clone)]
pub struct Interpreter {
    executable: PathBuf,
}

impl Interpreter {
    /// Find the interpreter to use and check its pip.
    ///
    /// An explicit `python` may be a path or a name on `PATH`. Without one, `python3` and then
    /// `python` are looked up on `PATH`.
    pub async fn find(python: Option<&Path>) -> Result<Self, Error> {
        let executable = find_executable(python)?;
        let pip_version = query_pip_version(&executable).await?;
        if pip_version < Version::new([22, 2]) {
            return Err(Error::PipTooOld {
                interpreter: executable,
                version: pip_version,
            });
        }
        debug!("Using pip {pip_version} from `{}`", executable.display());
        Ok(Self { executable })
    }

    /// Returns the path to the Python executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// A `python -m pip` command with the environment set up for non-interactive use.
    pub(crate) fn pip_command(&self) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(["-m", "pip"])
            .env(EnvVars::PIP_DISABLE_PIP_VERSION_CHECK, "1")
            .env(EnvVars::PIP_NO_INPUT, "1")
            .env(EnvVars::PYTHONIOENCODING, "utf-8");
        command
    }
}

fn find_executable(python: Option<&Path>) -> Result<PathBuf, Error> {
    if let Some(python) = python {
        return which::which(python)
            .map_err(|err| Error::MissingExecutable(python.to_path_buf(), err));
    }
    ["python3", "python"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
        .ok_or(Error::NotFound)
}

async fn query_pip_version(executable: &Path) -> Result<Version, Error> {
    let output = Command::new(executable)
        .args(["-m", "pip", "--version"])
        .env(EnvVars::PIP_DISABLE_PIP_VERSION_CHECK, "1")
        .output()
        .await
        .map_err(|err| Error::CommandFailed(executable.to_path_buf(), err))?;
    if !output.status.success() {
        return Err(Error::PipVersion {
            interpreter: executable.to_path_buf(),
            output: PipOutput::from_output(&output),
        });
    }
    parse_pip_version(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the output of `pip --version`, e.g. `pip 24.0 from /usr/lib/python3/dist-packages/pip
/// (python 3.12)`.
fn parse_pip_version(stdout: &str) -> Result<Version, Error> {
    let stdout = stdout.trim();
    let mut words = stdout.split_whitespace();
    if words.next() != Some("pip") {
        return Err(Error::PipVersionParse(stdout.to_string()));
    }
    words
        .next()
        .and_then(|version| Version::from_str(version).ok())
        .ok_or_else(|| Error::PipVersionParse(stdout.to_string()))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use anyhow::Result;
    use assert_fs::prelude::*;
    use indoc::formatdoc;

    use pipgrip_pep440::Version;

    use crate::{Error, Interpreter};

    use super::parse_pip_version;

    #[test]
    fn pip_version() {
        let version = parse_pip_version(
            "pip 24.0 from /usr/lib/python3/dist-packages/pip (python 3.12)\n",
        )
        .unwrap();
        assert_eq!(version, Version::new([24, 0]));
        let version = parse_pip_version("pip 22.2.2 from /venv/lib/python3.8/site-packages/pip")
            .unwrap();
        assert_eq!(version, Version::new([22, 2, 2]));
    }

    #[test]
    fn pip_version_garbage() {
        let err = parse_pip_version("/usr/bin/python3: No module named pip").unwrap_err();
        insta::assert_snapshot!(err, @"Could not parse a pip version from `/usr/bin/python3: No module named pip`");
        assert!(matches!(
            parse_pip_version("pip unknown"),
            Err(Error::PipVersionParse(_))
        ));
    }

    /// Create a fake Python interpreter executable whose pip prints the given version.
    #[cfg(unix)]
    fn create_mock_interpreter(path: &Path, pip_version: &str) -> Result<()> {
        fs_err::write(
            path,
            formatdoc! {r#"
            #!/bin/sh
            echo "pip {pip_version} from /home/ferris/.local/lib/python3.12/site-packages/pip (python 3.12)"
            "#},
        )?;
        fs_err::set_permissions(path, std::os::unix::fs::PermissionsExt::from_mode(0o770))?;
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn find_explicit() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        let python = temp_dir.child("python");
        create_mock_interpreter(python.path(), "23.3.1")?;

        let interpreter = Interpreter::find(Some(python.path())).await?;
        assert!(interpreter.executable().ends_with("python"));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pip_too_old() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        let python = temp_dir.child("python");
        create_mock_interpreter(python.path(), "21.3")?;

        let err = Interpreter::find(Some(python.path())).await.unwrap_err();
        assert!(matches!(err, Error::PipTooOld { .. }), "{err}");
        assert!(err.to_string().starts_with("pip 21.3 of `"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_interpreter() {
        let err = Interpreter::find(Some(Path::new("/does/not/exist/python")))
            .await
            .unwrap_err();
        insta::assert_snapshot!(err, @"Python interpreter `/does/not/exist/python` not found");
    }
}
