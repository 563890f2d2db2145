use std::num::NonZeroUsize;
use std::path::PathBuf;

use url::Url;

use pipgrip_cli::{Cli, ColorChoice, GlobalArgs, InputArgs, OutputArgs, PipArgs};
use pipgrip_static::EnvVars;
use pipgrip_warnings::warn_user;

use crate::requirements::InvalidPolicy;

/// The resolved global settings to use for any invocation of the CLI.
#[derive(Debug, Clone)]
pub(crate) struct GlobalSettings {
    pub(crate) verbose: u8,
    pub(crate) color: ColorChoice,
    pub(crate) no_progress: bool,
}

impl GlobalSettings {
    /// Resolve the [`GlobalSettings`] from the CLI arguments and the environment.
    pub(crate) fn resolve(args: &GlobalArgs) -> Self {
        Self {
            verbose: args.verbose,
            color: if std::env::var_os(EnvVars::NO_COLOR)
                .is_some_and(|no_color| !no_color.is_empty())
            {
                ColorChoice::Never
            } else if std::env::var_os(EnvVars::FORCE_COLOR)
                .is_some_and(|force_color| !force_color.is_empty())
            {
                ColorChoice::Always
            } else {
                args.color
            },
            no_progress: args.no_progress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TreeStyle {
    /// `├──` and friends.
    Unicode,
    /// `|--` and friends.
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TreeSettings {
    pub(crate) style: TreeStyle,
    /// From every package to the packages depending on it.
    pub(crate) reversed: bool,
    pub(crate) json: bool,
    /// The number of levels to show, the top level included.
    pub(crate) max_depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// One pin per line.
    Flat,
    /// All pins on a single line.
    Pipe,
    /// A JSON object from package name to version.
    Json,
    Tree(TreeSettings),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutputSettings {
    pub(crate) format: OutputFormat,
    pub(crate) sort: bool,
}

impl OutputSettings {
    fn resolve(args: &OutputArgs) -> Self {
        let OutputArgs {
            tree,
            tree_ascii,
            reversed_tree,
            max_depth,
            json,
            pipe,
            sort,
            lock: _,
        } = *args;

        let format = if tree || tree_ascii || reversed_tree {
            OutputFormat::Tree(TreeSettings {
                style: if tree_ascii {
                    TreeStyle::Ascii
                } else {
                    TreeStyle::Unicode
                },
                reversed: reversed_tree,
                json,
                max_depth: max_depth
                    .and_then(|depth| usize::try_from(depth).ok())
                    .filter(|depth| *depth > 0),
            })
        } else {
            if max_depth.is_some() {
                warn_user!("`--max-depth` has no effect without a tree output");
            }
            if json {
                OutputFormat::Json
            } else if pipe {
                OutputFormat::Pipe
            } else {
                OutputFormat::Flat
            }
        };

        Self { format, sort }
    }
}

/// The pip options given on the command line; requirements files may add to them.
#[derive(Debug, Clone, Default)]
pub(crate) struct PipSettings {
    pub(crate) no_compile: bool,
    pub(crate) prerelease: bool,
    pub(crate) index_url: Option<Url>,
    pub(crate) extra_index_urls: Vec<Url>,
    pub(crate) cache_dir: Option<PathBuf>,
    pub(crate) no_cache_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InstallSettings {
    /// Install into the user site (`pip install --user`).
    pub(crate) user: bool,
}

/// The resolved settings to use for a `pipgrip` invocation.
#[derive(Debug, Clone)]
pub(crate) struct ResolveSettings {
    pub(crate) dependencies: Vec<String>,
    pub(crate) requirements_files: Vec<PathBuf>,
    pub(crate) invalid: InvalidPolicy,
    pub(crate) python: Option<PathBuf>,
    pub(crate) pip: PipSettings,
    pub(crate) concurrency: usize,
    pub(crate) output: OutputSettings,
    pub(crate) lock: bool,
    pub(crate) install: Option<InstallSettings>,
}

impl ResolveSettings {
    /// Resolve the [`ResolveSettings`] from the CLI arguments.
    pub(crate) fn resolve(cli: Cli) -> Self {
        let Cli {
            dependencies,
            input,
            output,
            pip,
            global: _,
        } = cli;
        let InputArgs {
            requirements_file,
            skip_invalid_input,
            ignore_invalid,
        } = input;
        let PipArgs {
            no_compile,
            install,
            user,
            pre,
            index_url,
            extra_index_url,
            cache_dir,
            no_cache_dir,
            python,
            threads,
        } = pip;

        let invalid = if skip_invalid_input {
            InvalidPolicy::Skip
        } else if ignore_invalid {
            InvalidPolicy::Ignore
        } else {
            InvalidPolicy::Fail
        };

        Self {
            dependencies,
            requirements_files: requirements_file,
            invalid,
            python,
            pip: PipSettings {
                no_compile,
                prerelease: pre,
                index_url,
                extra_index_urls: extra_index_url,
                cache_dir,
                no_cache_dir,
            },
            concurrency: threads.map_or_else(
                || std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
                NonZeroUsize::get,
            ),
            output: OutputSettings::resolve(&output),
            lock: output.lock,
            install: install.then_some(InstallSettings { user }),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use pipgrip_cli::Cli;

    use super::{OutputFormat, ResolveSettings, TreeSettings, TreeStyle};
    use crate::requirements::InvalidPolicy;

    fn settings(args: &[&str]) -> ResolveSettings {
        let cli = Cli::try_parse_from(std::iter::once("pipgrip").chain(args.iter().copied()))
            .unwrap();
        ResolveSettings::resolve(cli)
    }

    #[test]
    fn defaults() {
        let settings = settings(&["requests"]);
        assert_eq!(settings.output.format, OutputFormat::Flat);
        assert_eq!(settings.invalid, InvalidPolicy::Fail);
        assert!(settings.install.is_none());
        assert!(settings.concurrency >= 1);
    }

    #[test]
    fn tree_formats() {
        assert_eq!(
            settings(&["--tree-ascii", "--max-depth", "2", "requests"])
                .output
                .format,
            OutputFormat::Tree(TreeSettings {
                style: TreeStyle::Ascii,
                reversed: false,
                json: false,
                max_depth: Some(2),
            })
        );
        assert_eq!(
            settings(&["--reversed-tree", "--json", "--max-depth", "-1", "requests"])
                .output
                .format,
            OutputFormat::Tree(TreeSettings {
                style: TreeStyle::Unicode,
                reversed: true,
                json: true,
                max_depth: None,
            })
        );
        assert_eq!(
            settings(&["--tree", "--max-depth", "0", "requests"])
                .output
                .format,
            OutputFormat::Tree(TreeSettings {
                style: TreeStyle::Unicode,
                reversed: false,
                json: false,
                max_depth: None,
            })
        );
    }

    #[test]
    fn flat_formats() {
        assert_eq!(settings(&["--json", "six"]).output.format, OutputFormat::Json);
        assert_eq!(settings(&["--pipe", "six"]).output.format, OutputFormat::Pipe);
    }

    #[test]
    fn skip_wins_over_ignore() {
        assert_eq!(
            settings(&["--skip-invalid-input", "--ignore-invalid"]).invalid,
            InvalidPolicy::Skip
        );
        assert_eq!(settings(&["--ignore-invalid"]).invalid, InvalidPolicy::Ignore);
    }

    #[test]
    fn threads() {
        assert_eq!(settings(&["--threads", "3", "six"]).concurrency, 3);
    }
}
