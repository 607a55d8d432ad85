//! quill - compile templates into JavaScript classes.

use clap::Parser;
use miette::Result;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod config;
mod orchestrator;
mod output;

use cli::Args;
use orchestrator::Orchestrator;

fn main() -> ExitCode {
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    init_logging(args.verbose);

    match run(args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `QUILL_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "quill=debug,quill_compiler=debug,quill_core=debug,quill_lexer=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("QUILL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    let watch = args.watch;
    let orchestrator = Orchestrator::new(args)?;

    if watch {
        orchestrator.run_watch()?;
        return Ok(ExitCode::SUCCESS);
    }

    let summary = orchestrator.run_once()?;
    if summary.error_count > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
