//! bockrose CLI.

use std::path::PathBuf;

use bockrose_printer::{ConsoleConsumer, LogPrinter, RunOptions};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, bail};

use crate::runner::Runner;
use crate::spec::ProjectSpec;

/// bockrose - run a stack of processes with compose-style logs
#[derive(Parser)]
#[command(name = "bockrose")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to bockrose.yaml
    #[arg(short, long, default_value = "bockrose.yaml")]
    pub file: PathBuf,

    /// Project name
    #[arg(short, long, env = "BOCKROSE_PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// bockrose commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Start services and follow their output
    Up {
        /// Stop all containers if any container exits
        #[arg(long)]
        abort_on_container_exit: bool,

        /// Return the exit code of the selected service (implies --abort-on-container-exit)
        #[arg(long, value_name = "SERVICE")]
        exit_code_from: Option<String>,

        /// Produce monochrome output
        #[arg(long)]
        no_color: bool,

        /// Don't print prefix in logs
        #[arg(long)]
        no_log_prefix: bool,

        /// Specific services to start
        services: Vec<String>,
    },

    /// Validate and show configuration
    Config {
        /// Output format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Yaml)]
        format: ConfigFormat,

        /// Only validate
        #[arg(short, long)]
        quiet: bool,
    },
}

/// Output format of `bockrose config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl Cli {
    /// Execute the CLI command, returning the process exit code.
    pub async fn execute(self) -> Result<i32> {
        let spec = ProjectSpec::from_file(&self.file)?;
        let project = self
            .project_name
            .clone()
            .unwrap_or_else(|| spec.project_name());

        match self.command {
            Commands::Up {
                abort_on_container_exit,
                exit_code_from,
                no_color,
                no_log_prefix,
                services,
            } => {
                let options = up_options(&spec, abort_on_container_exit, exit_code_from)?;
                up(&spec, &project, &services, options, no_color, no_log_prefix).await
            }

            Commands::Config { format, quiet } => {
                if quiet {
                    println!("Configuration is valid");
                } else {
                    let mut resolved = spec.clone();
                    resolved.name = Some(project);
                    match format {
                        ConfigFormat::Yaml => print!("{}", serde_yaml::to_string(&resolved)?),
                        ConfigFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&resolved)?);
                        }
                    }
                }
                Ok(0)
            }
        }
    }
}

/// Low 8 bits of `code`, as the shell would see it.
pub fn process_exit_code(code: i32) -> u8 {
    u8::try_from(code.rem_euclid(256)).unwrap_or(u8::MAX)
}

/// Resolve `up` flags into printer options.
fn up_options(
    spec: &ProjectSpec,
    abort_on_container_exit: bool,
    exit_code_from: Option<String>,
) -> Result<RunOptions> {
    let mut options = RunOptions::default().cascade_stop(abort_on_container_exit);
    if let Some(service) = exit_code_from {
        if !spec.services.contains_key(&service) {
            bail!("No such service: {service}");
        }
        options = options.cascade_stop(true).exit_code_from(service);
    }
    Ok(options)
}

async fn up(
    spec: &ProjectSpec,
    project: &str,
    services: &[String],
    options: RunOptions,
    no_color: bool,
    no_log_prefix: bool,
) -> Result<i32> {
    let runner = Runner::new(spec, project, services)?;

    let mut consumer = ConsoleConsumer::new(std::io::stdout()).with_prefix(!no_log_prefix);
    if no_color {
        consumer = consumer.with_color(false);
    }
    let printer = LogPrinter::new(consumer);
    let events = printer.sender();

    tracing::info!(project, containers = runner.units().len(), "Starting project");
    let mut tasks = runner.start(&events);

    let interrupt = {
        let events = events.clone();
        let stop = runner.stopper();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("Gracefully stopping... (press Ctrl+C again to force)");
                events.cancel().await;
                stop().await.ok();
                let _ = tokio::signal::ctrl_c().await;
                std::process::exit(130);
            }
        })
    };
    drop(events);

    let result = printer.run(options, runner.stopper()).await;

    interrupt.abort();
    if result.is_err() {
        runner.stop();
    }
    while tasks.join_next().await.is_some() {}

    Ok(result?)
}
