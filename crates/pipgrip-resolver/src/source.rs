use std::future::Future;

use pipgrip_interpreter::{Error, Interpreter, PipOptions, PipReport};
use pipgrip_pep508::Requirement;

/// Where installation reports come from.
///
/// The resolver only decides what to ask for and in which order; [`PipReportSource`] is the
/// implementation that runs pip.
pub trait ReportSource {
    /// Report what would be installed for the requirements, all of them together.
    fn report<'a>(
        &'a self,
        requirements: &'a [Requirement],
    ) -> impl Future<Output = Result<PipReport, Error>> + 'a;
}

/// Reports from `pip install --dry-run --report` of the given interpreter.
#[derive(Debug)]
pub struct PipReportSource {
    interpreter: Interpreter,
    options: PipOptions,
}

impl PipReportSource {
    pub fn new(interpreter: Interpreter, options: PipOptions) -> Self {
        Self {
            interpreter,
            options,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn options(&self) -> &PipOptions {
        &self.options
    }
}

impl ReportSource for PipReportSource {
    fn report<'a>(
        &'a self,
        requirements: &'a [Requirement],
    ) -> impl Future<Output = Result<PipReport, Error>> + 'a {
        self.interpreter.report(requirements, &self.options)
    }
}
