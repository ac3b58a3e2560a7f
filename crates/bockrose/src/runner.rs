//! Local process runner.
//!
//! Every service replica runs as a child process. Its supervisor task
//! reports the container lifecycle to the log printer: `Attach` when the
//! process starts, one `Log` per output line and `Exit` when it ends.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Ready;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use bockrose_printer::{ContainerEvent, EventSender};
use miette::Diagnostic;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use crate::spec::{ProjectSpec, RestartPolicy};

/// Exit code reported when a container process cannot be spawned.
pub const SPAWN_FAILED_EXIT_CODE: i32 = 127;

/// Runner errors.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum RunnerError {
    /// Service is not defined in the project.
    #[error("No such service: {name}")]
    #[diagnostic(code(bockrose::runner::unknown_service))]
    UnknownService {
        /// Requested service name.
        name: String,
    },

    /// Nothing to run.
    #[error("No containers to start")]
    #[diagnostic(
        code(bockrose::runner::empty),
        help("Check `deploy.replicas` of the selected services")
    )]
    NoContainers,
}

/// One container: a replica of a service.
#[derive(Debug, Clone)]
pub struct Unit {
    /// Container name, `<project>-<service>-<n>`.
    pub name: String,
    /// Service name.
    pub service: String,
    /// Program and arguments.
    pub command: Vec<String>,
    /// Extra environment.
    pub environment: HashMap<String, String>,
    /// Working directory.
    pub working_dir: Option<PathBuf>,
    /// Restart policy.
    pub restart: RestartPolicy,
}

/// Starts units and stops them on request.
#[derive(Debug)]
pub struct Runner {
    units: Vec<Unit>,
    stop: Arc<watch::Sender<bool>>,
}

impl Runner {
    /// Plan the containers of `services` (all services when empty).
    pub fn new(spec: &ProjectSpec, project: &str, services: &[String]) -> Result<Self, RunnerError> {
        if let Some(name) = services.iter().find(|s| !spec.services.contains_key(*s)) {
            return Err(RunnerError::UnknownService { name: name.clone() });
        }

        let mut units = Vec::new();
        for (name, service) in &spec.services {
            if !services.is_empty() && !services.contains(name) {
                continue;
            }
            let working_dir = service
                .working_dir
                .as_ref()
                .map(|dir| spec.base_path.join(dir));
            for i in 1..=service.replicas() {
                units.push(Unit {
                    name: format!("{project}-{name}-{i}"),
                    service: name.clone(),
                    command: service.command.clone(),
                    environment: service.environment.clone(),
                    working_dir: working_dir.clone(),
                    restart: service.restart,
                });
            }
        }
        if units.is_empty() {
            return Err(RunnerError::NoContainers);
        }

        let (stop, _) = watch::channel(false);
        Ok(Self {
            units,
            stop: Arc::new(stop),
        })
    }

    /// Planned containers.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Spawn one supervisor task per container, reporting to `events`.
    pub fn start(&self, events: &EventSender) -> JoinSet<()> {
        let mut tasks = JoinSet::new();
        for unit in &self.units {
            tracing::info!(container = %unit.name, "Starting container");
            tasks.spawn(supervise(
                unit.clone(),
                events.clone(),
                self.stop.subscribe(),
            ));
        }
        tasks
    }

    /// Kill every container and disable restarts.
    pub fn stop(&self) {
        tracing::info!(count = self.units.len(), "Stopping containers");
        self.stop.send_replace(true);
    }

    /// Stop action for the log printer.
    pub fn stopper(&self) -> impl FnOnce() -> Ready<Result<(), Infallible>> + use<> {
        let stop = Arc::clone(&self.stop);
        move || {
            stop.send_replace(true);
            std::future::ready(Ok(()))
        }
    }
}

/// Run `unit` until it exits for good or the runner stops.
async fn supervise(unit: Unit, events: EventSender, mut stop: watch::Receiver<bool>) {
    let mut restarts = 0;
    // Exit code reported with `restarting` that still needs a final exit.
    let mut pending: Option<i32> = None;

    loop {
        if *stop.borrow() {
            if let Some(code) = pending {
                events
                    .handle_event(ContainerEvent::exit(&unit.name, &unit.service, code))
                    .await;
            }
            return;
        }

        events
            .handle_event(ContainerEvent::attach(&unit.name, &unit.service))
            .await;

        let exit_code = match run_once(&unit, &events, &mut stop).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(container = %unit.name, error = %e, "Failed to start container");
                events
                    .handle_event(ContainerEvent::log(
                        &unit.name,
                        &unit.service,
                        format!("failed to start: {e}"),
                    ))
                    .await;
                events
                    .handle_event(ContainerEvent::exit(
                        &unit.name,
                        &unit.service,
                        SPAWN_FAILED_EXIT_CODE,
                    ))
                    .await;
                return;
            }
        };

        if !*stop.borrow() && unit.restart.should_restart(exit_code, restarts) {
            restarts += 1;
            tracing::debug!(container = %unit.name, exit_code, restarts, "Restarting container");
            events
                .handle_event(ContainerEvent::restart(&unit.name, &unit.service, exit_code))
                .await;
            pending = Some(exit_code);
            continue;
        }

        events
            .handle_event(ContainerEvent::exit(&unit.name, &unit.service, exit_code))
            .await;
        return;
    }
}

/// Spawn the process once and wait for it, forwarding its output.
async fn run_once(
    unit: &Unit,
    events: &EventSender,
    stop: &mut watch::Receiver<bool>,
) -> io::Result<i32> {
    let (program, args) = unit
        .command
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .envs(&unit.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &unit.working_dir {
        command.current_dir(dir);
    }

    let mut child = command.spawn()?;
    tracing::debug!(container = %unit.name, pid = ?child.id(), "Container started");

    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, unit, events));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, unit, events));
    }

    let status = tokio::select! {
        status = child.wait() => status?,
        () = stopped(stop) => {
            tracing::debug!(container = %unit.name, "Killing container");
            if let Err(e) = child.start_kill() {
                tracing::warn!(container = %unit.name, error = %e, "Failed to kill container");
            }
            child.wait().await?
        }
    };

    // Flush remaining output before the exit is reported.
    for reader in readers {
        if let Err(e) = reader.await {
            tracing::warn!(container = %unit.name, error = %e, "Output forwarder failed");
        }
    }

    Ok(exit_code(status))
}

/// Resolves once a stop is requested. Never resolves if the runner is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Forward each line of `stream` as a log event.
fn forward_lines<R>(stream: R, unit: &Unit, events: &EventSender) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let events = events.clone();
    let container = unit.name.clone();
    let service = unit.service.clone();

    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    events
                        .handle_event(ContainerEvent::log(&container, &service, line))
                        .await;
                }
                Err(e) => {
                    tracing::warn!(container = %container, error = %e, "Failed to read container output");
                    break;
                }
            }
        }
    })
}

/// Exit code of a finished process, `128 + signal` when killed.
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}
