use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use url::Url;

use pipgrip_static::EnvVars;

pub mod version;

// Configures Clap v3-style help menu colors
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "pipgrip", author)]
#[command(
    about = "Lightweight pip dependency resolver with deptree preview functionality.",
    long_about = "Lightweight pip dependency resolver with deptree preview functionality.\n\n\
        For one or more PEP 508 dependency specifications, pipgrip asks pip which \
        distributions it would install and prints them as pins, optionally rendering the \
        full dependency tree."
)]
#[command(disable_version_flag = true)]
#[command(styles = STYLES)]
pub struct Cli {
    /// PEP 508 dependency specifications, e.g. `requests==2.22.0` or `keras[tests]>=2.3`.
    #[arg(value_name = "DEPENDENCIES")]
    pub dependencies: Vec<String>,

    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub pip: PipArgs,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Input options")]
pub struct InputArgs {
    /// Install from the given requirements file. This option can be used multiple times.
    #[arg(long, short, value_name = "FILE")]
    pub requirements_file: Vec<PathBuf>,

    /// Skip invalid requirements and packages that fail to resolve, instead of aborting.
    ///
    /// Requirements with a syntax error are dropped with a warning. Requirements pip can't
    /// resolve on their own are kept in the output without dependencies.
    #[arg(long)]
    pub skip_invalid_input: bool,

    /// Ignore invalid requirements (syntax errors) in the input.
    #[arg(long)]
    pub ignore_invalid: bool,
}

#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Output options")]
pub struct OutputArgs {
    /// Output human readable dependency tree (top-down).
    #[arg(long, short, conflicts_with_all = ["tree_ascii", "reversed_tree"])]
    pub tree: bool,

    /// Output human readable dependency tree with ASCII tree markers.
    #[arg(long, conflicts_with = "reversed_tree")]
    pub tree_ascii: bool,

    /// Output human readable dependency tree (bottom-up), from every package to the
    /// requirements that pulled it in.
    #[arg(long, visible_alias = "reverse-tree")]
    pub reversed_tree: bool,

    /// Maximum tree rendering depth. Zero or negative values mean no limit.
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub max_depth: Option<i64>,

    /// Output pins as JSON dict, or the dependency tree as JSON with `--tree`.
    #[arg(long)]
    pub json: bool,

    /// Output space-separated pins instead of newline-separated pins.
    #[arg(long, conflicts_with_all = ["json", "tree", "tree_ascii", "reversed_tree"])]
    pub pipe: bool,

    /// Sort pins alphabetically before writing out. Can be used bare, or in combination with
    /// `--lock`, `--pipe` or `--json`.
    #[arg(long)]
    pub sort: bool,

    /// Write out pins to `./pipgrip.lock`.
    #[arg(long)]
    pub lock: bool,
}

#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "pip options")]
pub struct PipArgs {
    /// Avoid building/compiling packages from source. Only pre-built wheels are used.
    #[arg(long)]
    pub no_compile: bool,

    /// Install the resolved pins with pip.
    #[arg(long)]
    pub install: bool,

    /// Install to the Python user install directory for your platform, typically
    /// `~/.local/`, or `%APPDATA%\Python` on Windows.
    #[arg(long, requires = "install")]
    pub user: bool,

    /// Include pre-release and development versions. By default, pip only finds stable
    /// versions.
    #[arg(long)]
    pub pre: bool,

    /// Base URL of the Python Package Index, passed on to pip.
    #[arg(long, short, env = EnvVars::PIPGRIP_INDEX_URL, value_name = "URL")]
    pub index_url: Option<Url>,

    /// Extra URLs of package indexes to use in addition to `--index-url`.
    ///
    /// The environment variable takes a space-separated list.
    #[arg(long, env = EnvVars::PIPGRIP_EXTRA_INDEX_URL, value_delimiter = ' ', value_name = "URL")]
    pub extra_index_url: Vec<Url>,

    /// Use a custom pip cache directory.
    #[arg(long, env = EnvVars::PIPGRIP_CACHE_DIR, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Disable pip's cache.
    #[arg(
        long,
        env = EnvVars::PIPGRIP_NO_CACHE,
        value_parser = clap::builder::BoolishValueParser::new(),
        conflicts_with = "cache_dir"
    )]
    pub no_cache_dir: bool,

    /// The Python interpreter whose pip is used, e.g. `/usr/bin/python3.12` or `python3.12`.
    ///
    /// Defaults to the first `python3` or `python` on `PATH`.
    #[arg(long, env = EnvVars::PIPGRIP_PYTHON, value_name = "PYTHON")]
    pub python: Option<PathBuf>,

    /// Maximum number of pip subprocesses when reporting on requirements one by one. Defaults
    /// to the number of available CPUs.
    #[arg(long, env = EnvVars::PIPGRIP_THREADS, value_name = "N")]
    pub threads: Option<NonZeroUsize>,
}

#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Global options")]
pub struct GlobalArgs {
    /// Use verbose output.
    ///
    /// `-v` shows debug messages, `-vv` shows them as a tree of spans. You can configure
    /// fine-grained logging using the `RUST_LOG` environment variable.
    /// (<https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives>)
    #[arg(long, short, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Control colors in output.
    #[arg(long, value_enum, default_value = "auto", value_name = "COLOR_CHOICE")]
    pub color: ColorChoice,

    /// Hide all progress outputs.
    #[arg(
        long,
        env = EnvVars::PIPGRIP_NO_PROGRESS,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub no_progress: bool,

    /// Show the version and exit.
    #[arg(long, short = 'V')]
    pub version: bool,
}

#[derive(Debug, Copy, Clone, clap::ValueEnum)]
pub enum ColorChoice {
    /// Enables colored output only when the output is going to a terminal or TTY with support.
    Auto,

    /// Enables colored output regardless of the detected environment.
    Always,

    /// Disables colored output.
    Never,
}

impl From<ColorChoice> for anstream::ColorChoice {
    fn from(value: ColorChoice) -> Self {
        match value {
            ColorChoice::Auto => Self::Auto,
            ColorChoice::Always => Self::Always,
            ColorChoice::Never => Self::Never,
        }
    }
}
