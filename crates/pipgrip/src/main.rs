use std::fmt::Write;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use pipgrip_cli::Cli;
use pipgrip_cli::version;

use crate::commands::ExitStatus;
use crate::printer::Printer;
use crate::settings::{GlobalSettings, ResolveSettings};

mod commands;
mod logging;
mod printer;
mod requirements;
mod settings;

async fn run(cli: Cli) -> Result<ExitStatus> {
    let globals = GlobalSettings::resolve(&cli.global);

    // Configure the `anstream` crate, which controls colored output.
    anstream::ColorChoice::write_global(globals.color.into());

    if cli.global.version {
        writeln!(Printer::Default.stdout(), "{}", version::version())?;
        return Ok(ExitStatus::Success);
    }

    logging::setup_logging(logging::Level::from(globals.verbose))?;

    let printer = if globals.verbose > 0 {
        Printer::Verbose
    } else if globals.no_progress {
        Printer::NoProgress
    } else {
        Printer::Default
    };

    pipgrip_warnings::enable();

    let settings = ResolveSettings::resolve(cli);
    commands::resolve(settings, printer).await
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    let result = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(run(cli)),
        Err(err) => Err(anyhow::Error::new(err).context("Failed building the runtime")),
    };

    match result {
        Ok(code) => code.into(),
        Err(err) => {
            let mut stderr = Printer::Default.stderr();
            // Nothing else to do if stderr is gone.
            let _ = pipgrip_warnings::write_error_chain(err.as_ref(), &mut stderr);
            ExitStatus::Error.into()
        }
    }
}
