use anstream::{eprint, print};
use indicatif::ProgressDrawTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Printer {
    /// A printer that prints to standard streams (e.g., stdout).
    Default,
    /// A printer that prints all output, including debug messages.
    Verbose,
    /// A printer that prints to standard streams, excluding all progress outputs
    NoProgress,
}

impl Printer {
    /// Return the [`ProgressDrawTarget`] for this printer.
    pub(crate) fn target(self) -> ProgressDrawTarget {
        match self {
            Self::Default => ProgressDrawTarget::stderr(),
            // Confusingly, hide the progress bar when in verbose mode.
            // Otherwise, it gets interleaved with debug messages.
            Self::Verbose => ProgressDrawTarget::hidden(),
            Self::NoProgress => ProgressDrawTarget::hidden(),
        }
    }

    /// Return the [`Stdout`] for this printer.
    #[allow(clippy::unused_self)]
    pub(crate) fn stdout(self) -> Stdout {
        Stdout
    }

    /// Return the [`Stderr`] for this printer.
    #[allow(clippy::unused_self)]
    pub(crate) fn stderr(self) -> Stderr {
        Stderr
    }
}

/// The result of a command; only results are ever written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Stdout;

impl std::fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        #[allow(clippy::print_stdout, clippy::ignored_unit_patterns)]
        {
            print!("{s}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Stderr;

impl std::fmt::Write for Stderr {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        #[allow(clippy::print_stderr, clippy::ignored_unit_patterns)]
        {
            eprint!("{s}");
        }
        Ok(())
    }
}
