use std::error::Error;
use std::fmt::Write;
use std::iter;

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::debug;

use pipgrip_interpreter::{Interpreter, PipOptions};
use pipgrip_resolver::{Node, PipReportSource, Resolution, Resolver, ResolverOptions};
use pipgrip_warnings::warn_user;

use crate::commands::ExitStatus;
use crate::commands::render::{pins, render};
use crate::commands::reporters::ResolverReporter;
use crate::printer::Printer;
use crate::requirements::{InvalidPolicy, RequirementsSpecification};
use crate::settings::{InstallSettings, ResolveSettings};

/// The lock file written by `--lock`, in the working directory.
const LOCK_FILE: &str = "pipgrip.lock";

/// Resolve the requirements, print the result, and optionally lock and install it.
pub(crate) async fn resolve(settings: ResolveSettings, printer: Printer) -> Result<ExitStatus> {
    let spec = RequirementsSpecification::from_sources(
        &settings.dependencies,
        &settings.requirements_files,
        settings.invalid,
    )?;
    if spec.requirements.is_empty() {
        debug!("No requirements given, nothing to resolve");
        return Ok(ExitStatus::Success);
    }

    let options = PipOptions {
        no_compile: settings.pip.no_compile,
        prerelease: settings.pip.prerelease || spec.prerelease,
        index_url: settings.pip.index_url.or(spec.index_url),
        extra_index_urls: settings
            .pip
            .extra_index_urls
            .into_iter()
            .chain(spec.extra_index_urls)
            .unique()
            .collect(),
        cache_dir: settings.pip.cache_dir,
        no_cache_dir: settings.pip.no_cache_dir,
        constraints: spec.constraints,
    };

    let interpreter = Interpreter::find(settings.python.as_deref()).await?;
    let source = PipReportSource::new(interpreter, options);

    let resolver_options = ResolverOptions {
        skip_invalid: settings.invalid == InvalidPolicy::Skip,
        concurrency: settings.concurrency,
    };
    let resolution = Resolver::new(&source, resolver_options)
        .with_reporter(ResolverReporter::from(printer))
        .resolve(&spec.requirements)
        .await?;

    for skipped in resolution.skipped() {
        warn_user!(
            "Skipping `{}`, which failed to resolve: {}",
            skipped.requirement,
            reason(&skipped.error)
        );
    }

    write!(printer.stdout(), "{}", render(&resolution, settings.output)?)?;

    if settings.lock {
        let pins = resolved_pins(&resolution, settings.output.sort, "the lock file");
        let mut contents = pins.join("\n");
        contents.push('\n');
        fs_err::tokio::write(LOCK_FILE, contents)
            .await
            .with_context(|| format!("Failed to write `{LOCK_FILE}`"))?;
        debug!("Wrote {} pins to `{LOCK_FILE}`", pins.len());
    }

    if let Some(InstallSettings { user }) = settings.install {
        let pins = resolved_pins(&resolution, settings.output.sort, "the installation");
        let status = source
            .interpreter()
            .install(&pins, source.options(), user)
            .await?;
        if !status.success() {
            return Ok(status
                .code()
                .and_then(|code| u8::try_from(code).ok())
                .map_or(ExitStatus::Error, ExitStatus::External));
        }
    }

    Ok(ExitStatus::Success)
}

/// The `name==version` pins of the resolved packages; skipped requirements have no version
/// pip agreed on and are left out.
fn resolved_pins(resolution: &Resolution, sort: bool, purpose: &str) -> Vec<String> {
    pins(resolution, sort)
        .into_iter()
        .filter_map(|node| match node {
            Node::Package(_) => Some(node.to_string()),
            Node::Skipped(requirement) => {
                warn_user!("Leaving the skipped `{requirement}` out of {purpose}");
                None
            }
        })
        .collect()
}

/// The last line pip had to say about a failure, e.g. `ERROR: No matching distribution found
/// for gevent==20.9.0`.
fn reason(err: &pipgrip_interpreter::Error) -> String {
    let Some(root) = iter::successors(Some(err as &dyn Error), |&err| err.source()).last() else {
        return err.to_string();
    };
    let message = root.to_string();
    message
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map_or_else(|| err.to_string(), ToString::to_string)
}
