//! bockrose CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use bockrose::cli::{Cli, process_exit_code};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let level = if cli.debug { "debug" } else { "info" };

    // Container output owns stdout.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("bockrose={level}").parse()?)
                .add_directive(format!("bockrose_printer={level}").parse()?),
        )
        .init();

    let code = cli.execute().await?;
    Ok(ExitCode::from(process_exit_code(code)))
}
