// The `unreachable_pub` is to silence false positives in RustRover.
#![allow(dead_code, unreachable_pub)]

use std::borrow::BorrowMut;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use assert_fs::fixture::{ChildPath, FileWriteStr, PathChild};
use regex::Regex;

use pipgrip_static::EnvVars;

/// The directory with the installation reports served by the fake pip.
pub const REPORTS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../test-data/reports");

/// The version printed by `--version` in tests.
pub const TEST_VERSION: &str = "0.11.0";

/// Read by the fake pip: the directory with the installation reports to serve.
const FAKE_PIP_REPORTS: &str = "FAKE_PIP_REPORTS";
/// Read by the fake pip: a file every pip invocation is appended to.
const FAKE_PIP_LOG: &str = "FAKE_PIP_LOG";
/// Read by the fake pip: the exit code of a `pip install` that isn't a dry run.
const FAKE_PIP_INSTALL_STATUS: &str = "FAKE_PIP_INSTALL_STATUS";

/// Create a new [`TestContext`].
///
/// This macro captures the pipgrip binary path at compile time using
/// `env!("CARGO_BIN_EXE_pipgrip")`, which is only available in the test crate.
#[macro_export]
macro_rules! test_context {
    () => {
        $crate::TestContext::new_with_bin(std::path::PathBuf::from(env!("CARGO_BIN_EXE_pipgrip")))
    };
}

#[doc(hidden)] // Macro and test context only, don't use directly.
pub const INSTA_FILTERS: &[(&str, &str)] = &[
    // Rewrite Windows output to Unix output
    (r"\\([\w\d]|\.)", "/$1"),
    (r"pipgrip\.exe", "pipgrip"),
    // Trim end-of-line whitespaces, to allow removing them on save.
    (r"([^\s])[ \t]+(\r?\n)", "$1$2"),
];

/// Create a context for tests which simplifies shared behavior across tests.
///
/// * Set the current directory to a temporary directory (`temp_dir`).
/// * Put a fake `python` into the temporary directory, whose pip serves the reports in
///   [`REPORTS_DIR`] and logs its invocations to `pip_log`.
/// * Disable colors and progress output.
pub struct TestContext {
    pub temp_dir: ChildPath,
    pub python: ChildPath,
    pub pip_log: ChildPath,

    /// Path to the pipgrip binary.
    pipgrip_bin: PathBuf,

    /// Standard filters for this test context.
    filters: Vec<(String, String)>,

    /// Extra environment variables to apply to all commands.
    extra_env: Vec<(OsString, OsString)>,

    #[allow(dead_code)]
    _root: assert_fs::TempDir,
}

impl TestContext {
    /// Create a new test context with an explicit pipgrip binary path.
    ///
    /// This is called by the `test_context!` macro.
    pub fn new_with_bin(pipgrip_bin: PathBuf) -> Self {
        let root = assert_fs::TempDir::new().expect("Failed to create test root directory");
        let temp_dir = ChildPath::new(root.path()).child("temp");
        fs_err::create_dir_all(&temp_dir).expect("Failed to create test working directory");

        let python = ChildPath::new(root.path()).child("python");
        python
            .write_str(include_str!("python.sh"))
            .expect("Failed to write the fake python");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs_err::set_permissions(&python, std::fs::Permissions::from_mode(0o770))
                .expect("Failed to make the fake python executable");
        }
        let pip_log = ChildPath::new(root.path()).child("pip.log");

        let mut filters = Vec::new();
        filters.extend(
            Self::path_patterns(root.path())
                .into_iter()
                .map(|pattern| (pattern, "[ROOT]/".to_string())),
        );
        filters.extend(
            INSTA_FILTERS
                .iter()
                .map(|(pattern, replacement)| ((*pattern).to_string(), (*replacement).to_string())),
        );

        Self {
            temp_dir,
            python,
            pip_log,
            pipgrip_bin,
            filters,
            extra_env: vec![],
            _root: root,
        }
    }

    /// Let every `pip install` that isn't a dry run fail with the given exit code.
    #[must_use]
    pub fn with_failing_install(mut self, code: u8) -> Self {
        self.extra_env
            .push((FAKE_PIP_INSTALL_STATUS.into(), code.to_string().into()));
        self
    }

    /// Create a pipgrip command for testing.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.pipgrip_bin);
        command
            .current_dir(&self.temp_dir)
            .env_remove(EnvVars::RUST_LOG)
            .env_remove(EnvVars::FORCE_COLOR)
            .env_remove(EnvVars::PIPGRIP_INDEX_URL)
            .env_remove(EnvVars::PIPGRIP_EXTRA_INDEX_URL)
            .env_remove(EnvVars::PIPGRIP_CACHE_DIR)
            .env_remove(EnvVars::PIPGRIP_NO_CACHE)
            .env_remove(EnvVars::PIPGRIP_THREADS)
            .env(EnvVars::PIPGRIP_PYTHON, self.python.as_os_str())
            .env(EnvVars::PIPGRIP_NO_PROGRESS, "1")
            .env(EnvVars::PIPGRIP_TEST_VERSION, TEST_VERSION)
            .env(EnvVars::NO_COLOR, "1")
            .env(FAKE_PIP_REPORTS, REPORTS_DIR)
            .env(FAKE_PIP_LOG, self.pip_log.as_os_str());
        for (key, value) in &self.extra_env {
            command.env(key, value);
        }
        command
    }

    /// Every pip invocation so far, one per line.
    pub fn pip_invocations(&self) -> Vec<String> {
        match fs_err::read_to_string(&self.pip_log) {
            Ok(log) => log.lines().map(|line| self.filter(line)).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// The standard filters of this context.
    pub fn filters(&self) -> Vec<(&str, &str)> {
        self.filters
            .iter()
            .map(|(pattern, replacement)| (pattern.as_str(), replacement.as_str()))
            .collect()
    }

    fn filter(&self, line: &str) -> String {
        let line = apply_filters(line.to_string(), self.filters());
        // The report and constraints live in temporary directories outside the test root.
        Regex::new(r"(--report|--constraint) [^\s]+")
            .expect("valid regex")
            .replace_all(&line, "$1 [TEMP]")
            .into_owned()
    }

    /// Generate escaped regex patterns for the given path.
    fn path_patterns(path: impl AsRef<Path>) -> Vec<String> {
        let mut patterns = Vec::new();

        // We can only canonicalize paths that exist already
        if path.as_ref().exists() {
            patterns.push(Self::path_pattern(
                fs_err::canonicalize(&path).expect("Failed to create canonical path"),
            ));
        }

        // Include a non-canonicalized version
        patterns.push(Self::path_pattern(path));

        patterns
    }

    /// Generate an escaped regex pattern for the given path.
    fn path_pattern(path: impl AsRef<Path>) -> String {
        format!(
            // Trim the trailing separator for cross-platform directories filters
            r"{}\\?/?",
            regex::escape(&path.as_ref().display().to_string())
                // Make separators platform agnostic because on Windows we will display
                // paths with Unix-style separators sometimes
                .replace(r"\\", r"(\\|\/)")
        )
    }
}

/// Helper method to apply filters to a string. Useful when `!pipgrip_snapshot` cannot be used.
pub fn apply_filters<T: AsRef<str>>(mut snapshot: String, filters: impl AsRef<[(T, T)]>) -> String {
    for (matcher, replacement) in filters.as_ref() {
        let re = Regex::new(matcher.as_ref()).expect("Do you need to regex::escape your filter?");
        if re.is_match(&snapshot) {
            snapshot = re.replace_all(&snapshot, replacement.as_ref()).to_string();
        }
    }
    snapshot
}

/// Execute the command and format its output status, stdout and stderr into a snapshot string.
///
/// This function is derived from `insta_cmd`s `spawn_with_info`.
#[expect(clippy::print_stderr)]
pub fn run_and_format<T: AsRef<str>>(
    mut command: impl BorrowMut<Command>,
    filters: impl AsRef<[(T, T)]>,
) -> (String, Output) {
    let program = command
        .borrow_mut()
        .get_program()
        .to_string_lossy()
        .to_string();

    let output = command
        .borrow_mut()
        .output()
        .unwrap_or_else(|err| panic!("Failed to spawn {program}: {err}"));

    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━ Unfiltered output ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!(
        "----- stdout -----\n{}\n----- stderr -----\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
    eprintln!("────────────────────────────────────────────────────────────────────────────────\n");

    let snapshot = apply_filters(
        format!(
            "success: {:?}\nexit_code: {}\n----- stdout -----\n{}\n----- stderr -----\n{}",
            output.status.success(),
            output.status.code().unwrap_or(!0),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ),
        filters,
    );

    (snapshot, output)
}

/// Run [`insta::assert_snapshot!`] on the formatted output of a command, with default filters
/// or with custom filters.
#[macro_export]
macro_rules! pipgrip_snapshot {
    ($spawnable:expr, @$snapshot:literal) => {{
        pipgrip_snapshot!($crate::INSTA_FILTERS.to_vec(), $spawnable, @$snapshot)
    }};
    ($filters:expr, $spawnable:expr, @$snapshot:literal) => {{
        // Take a reference for backwards compatibility with the vec-expecting insta filters.
        let (snapshot, output) = $crate::run_and_format($spawnable, &$filters);
        ::insta::assert_snapshot!(snapshot, @$snapshot);
        output
    }};
}
