/// Declares all environment variables used throughout `pipgrip` and its crates.
pub struct EnvVars;

impl EnvVars {
    /// Equivalent to the `--python` command-line argument. The interpreter whose `pip` is used
    /// to resolve and install.
    pub const PIPGRIP_PYTHON: &'static str = "PIPGRIP_PYTHON";

    /// Equivalent to the `--index-url` command-line argument, forwarded to pip.
    pub const PIPGRIP_INDEX_URL: &'static str = "PIPGRIP_INDEX_URL";

    /// Equivalent to the `--extra-index-url` command-line argument. A space-separated list of
    /// URLs, forwarded to pip.
    pub const PIPGRIP_EXTRA_INDEX_URL: &'static str = "PIPGRIP_EXTRA_INDEX_URL";

    /// Equivalent to the `--cache-dir` command-line argument, forwarded to pip.
    pub const PIPGRIP_CACHE_DIR: &'static str = "PIPGRIP_CACHE_DIR";

    /// Equivalent to the `--no-cache-dir` command-line argument.
    pub const PIPGRIP_NO_CACHE: &'static str = "PIPGRIP_NO_CACHE";

    /// Equivalent to the `--threads` command-line argument. The number of pip subprocesses
    /// that may run at once when reporting on requirements one by one.
    pub const PIPGRIP_THREADS: &'static str = "PIPGRIP_THREADS";

    /// Equivalent to the `--no-progress` command-line argument. Disables the spinner.
    pub const PIPGRIP_NO_PROGRESS: &'static str = "PIPGRIP_NO_PROGRESS";

    /// Used to set the pipgrip version reported by `--version` in tests.
    #[doc(hidden)]
    pub const PIPGRIP_TEST_VERSION: &'static str = "PIPGRIP_TEST_VERSION";

    /// Disables colored output (takes precedence over `FORCE_COLOR`).
    ///
    /// See [no-color.org](https://no-color.org).
    pub const NO_COLOR: &'static str = "NO_COLOR";

    /// Forces colored output regardless of terminal support.
    ///
    /// See [force-color.org](https://force-color.org).
    pub const FORCE_COLOR: &'static str = "FORCE_COLOR";

    /// Used to determine the directories searched for a Python interpreter.
    pub const PATH: &'static str = "PATH";

    /// Used to set the log level, e.g. `RUST_LOG=pipgrip=debug`.
    pub const RUST_LOG: &'static str = "RUST_LOG";

    /// Set by pipgrip on every pip subprocess so that pip doesn't check PyPI for a newer pip.
    #[doc(hidden)]
    pub const PIP_DISABLE_PIP_VERSION_CHECK: &'static str = "PIP_DISABLE_PIP_VERSION_CHECK";

    /// Set by pipgrip on every pip subprocess so that pip never prompts.
    #[doc(hidden)]
    pub const PIP_NO_INPUT: &'static str = "PIP_NO_INPUT";

    /// Set to `utf-8` on Python subprocesses so that their output always decodes.
    #[doc(hidden)]
    pub const PYTHONIOENCODING: &'static str = "PYTHONIOENCODING";
}
