use std::num::NonZeroUsize;
use std::sync::Arc;

use futures::{StreamExt, stream};
use itertools::Itertools;
use tracing::debug;

use pipgrip_interpreter::{Error, PipReport};
use pipgrip_pep508::Requirement;

use crate::error::ResolveError;
use crate::resolution::{Resolution, SkippedRequirement};
use crate::source::ReportSource;

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Skip requirements pip can't report on instead of failing.
    pub skip_invalid: bool,
    /// The number of reports requested at once when reporting on requirements one by one.
    pub concurrency: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            skip_invalid: false,
            concurrency: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

pub trait Reporter: Send + Sync {
    /// Callback to invoke when pip is asked for a report on some requirements.
    fn on_report_start(&self, requirements: &[Requirement]) -> usize;

    /// Callback to invoke when a report request finished, successfully or not.
    fn on_report_complete(&self, id: usize);

    /// Callback to invoke when the resolution is complete.
    fn on_complete(&self);
}

/// Turns top-level requirements into a [`Resolution`], asking a [`ReportSource`] for the
/// installation reports.
pub struct Resolver<'a, S: ReportSource> {
    source: &'a S,
    options: ResolverOptions,
    reporter: Option<Arc<dyn Reporter>>,
}

impl<'a, S: ReportSource> Resolver<'a, S> {
    pub fn new(source: &'a S, options: ResolverOptions) -> Self {
        Self {
            source,
            options,
            reporter: None,
        }
    }

    /// Set the [`Reporter`] to use for this resolver.
    #[must_use]
    pub fn with_reporter(self, reporter: impl Reporter + 'static) -> Self {
        Self {
            reporter: Some(Arc::new(reporter)),
            ..self
        }
    }

    /// Resolve the requirements with a single report for all of them.
    ///
    /// When that fails and invalid requirements may be skipped, every requirement is reported
    /// on by itself. The ones that fail become skipped nodes of the resolution, the others are
    /// reported on together once more.
    pub async fn resolve(&self, requirements: &[Requirement]) -> Result<Resolution, ResolveError> {
        let resolution = self.resolve_inner(requirements).await;
        if let Some(reporter) = &self.reporter {
            reporter.on_complete();
        }
        resolution
    }

    async fn resolve_inner(&self, requirements: &[Requirement]) -> Result<Resolution, ResolveError> {
        if requirements.is_empty() {
            return Ok(Resolution::default());
        }

        let err = match self.report(requirements).await {
            Ok(report) => return Ok(Resolution::from_report(requirements, Some(&report), Vec::new())),
            Err(err) => err,
        };
        if !self.options.skip_invalid {
            return Err(err.into());
        }

        // A lone requirement has already been reported on by itself.
        if let [requirement] = requirements {
            debug!("Skipping `{requirement}`: {err}");
            let skipped = vec![SkippedRequirement {
                requirement: requirement.clone(),
                error: err,
            }];
            return Ok(Resolution::from_report(requirements, None, skipped));
        }

        debug!("Reporting on each requirement individually after: {err}");
        let results: Vec<(&Requirement, Result<PipReport, Error>)> = stream::iter(requirements)
            .map(|requirement| async move {
                let result = self.report(std::slice::from_ref(requirement)).await;
                (requirement, result)
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut survivors = Vec::new();
        let mut reports = Vec::new();
        let mut skipped = Vec::new();
        for (requirement, result) in results {
            match result {
                Ok(report) => {
                    survivors.push(requirement.clone());
                    reports.push(report);
                }
                Err(error) => {
                    debug!("Skipping `{requirement}`: {error}");
                    skipped.push(SkippedRequirement {
                        requirement: requirement.clone(),
                        error,
                    });
                }
            }
        }

        let report = match (survivors.len(), reports.pop()) {
            (_, None) => None,
            (1, Some(report)) => Some(report),
            (_, Some(_)) => {
                debug!(
                    "Reporting on the remaining requirements: {}",
                    survivors.iter().join(" ")
                );
                Some(
                    self.report(&survivors)
                        .await
                        .map_err(ResolveError::Conflict)?,
                )
            }
        };
        Ok(Resolution::from_report(
            requirements,
            report.as_ref(),
            skipped,
        ))
    }

    async fn report(&self, requirements: &[Requirement]) -> Result<PipReport, Error> {
        let id = self
            .reporter
            .as_ref()
            .map(|reporter| reporter.on_report_start(requirements));
        let result = self.source.report(requirements).await;
        if let (Some(reporter), Some(id)) = (&self.reporter, id) {
            reporter.on_report_complete(id);
        }
        result
    }
}
