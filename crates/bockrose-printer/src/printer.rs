//! The printer loop.

use std::collections::HashSet;
use std::future::Future;

use crate::consumer::LogConsumer;
use crate::error::{BoxError, PrinterError, PrinterResult};
use crate::event::ContainerEvent;
use crate::queue::{self, EventQueue, EventSender};

/// Notice printed once when a container exit aborts the stack.
pub const ABORT_NOTICE: &str = "Aborting on container exit...";

/// How a [`LogPrinter::run`] reacts to container exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop every container as soon as one exits.
    pub cascade_stop: bool,
    /// Service whose exit code becomes the result. `None` means the first
    /// service to exit. Only used with `cascade_stop`.
    pub exit_code_from: Option<String>,
}

impl RunOptions {
    /// Enable or disable cascade stop.
    #[must_use]
    pub fn cascade_stop(mut self, enabled: bool) -> Self {
        self.cascade_stop = enabled;
        self
    }

    /// Take the result from `service`. An empty name leaves it unset.
    #[must_use]
    pub fn exit_code_from(mut self, service: impl Into<String>) -> Self {
        let service = service.into();
        self.exit_code_from = (!service.is_empty()).then_some(service);
        self
    }
}

/// Mutable state of one run. Lives inside the loop only.
#[derive(Debug, Default)]
struct Coordination {
    containers: HashSet<String>,
    /// Set once at least one container registered.
    attached: bool,
    aborting: bool,
    exit_code_from: Option<String>,
    exit_code: i32,
}

impl Coordination {
    fn is_done(&self) -> bool {
        self.attached && self.containers.is_empty()
    }
}

/// Multiplexes container events into a [`LogConsumer`] and computes the
/// stack's exit code.
#[derive(Debug)]
pub struct LogPrinter<C> {
    consumer: C,
    sender: EventSender,
    queue: EventQueue,
}

impl<C: LogConsumer> LogPrinter<C> {
    /// Create a printer forwarding to `consumer`.
    pub fn new(consumer: C) -> Self {
        let (sender, queue) = queue::channel();
        Self {
            consumer,
            sender,
            queue,
        }
    }

    /// Handle for submitting events. Take as many as needed before [`run`](Self::run).
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Process events until the last attached container exits.
    ///
    /// With `cascade_stop`, the first exit marks the stack as aborting and
    /// awaits `stop` exactly once. A failing `stop` ends the run with
    /// [`PrinterError::StopFailed`]. Returns the exit code of the selected
    /// service, or 0 without `cascade_stop`.
    pub async fn run<F, Fut, E>(self, options: RunOptions, stop: F) -> PrinterResult<i32>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<BoxError>,
    {
        let Self {
            mut consumer,
            sender,
            mut queue,
        } = self;
        // Only external senders keep the stream open.
        drop(sender);

        let RunOptions {
            cascade_stop,
            exit_code_from,
        } = options;
        let mut state = Coordination {
            exit_code_from: exit_code_from.filter(|s| !s.is_empty()),
            ..Coordination::default()
        };
        let mut stop = Some(stop);

        while let Some(event) = queue.next().await {
            tracing::debug!(kind = event.kind(), container = ?event.container(), "Event");
            match event {
                ContainerEvent::UserCancel => {
                    tracing::debug!("Cancel requested");
                    state.aborting = true;
                }
                ContainerEvent::Attach { container, .. } => {
                    if state.containers.contains(&container) {
                        continue;
                    }
                    tracing::debug!(container = %container, "Container attached");
                    consumer.register(&container);
                    state.containers.insert(container);
                    state.attached = true;
                }
                ContainerEvent::Log {
                    container,
                    service,
                    line,
                } => {
                    if !state.aborting {
                        consumer.log(&container, &service, &line);
                    }
                }
                ContainerEvent::Exit {
                    container,
                    service,
                    exit_code,
                    restarting,
                } => {
                    tracing::debug!(container = %container, exit_code, restarting, "Container exited");
                    if !restarting {
                        state.containers.remove(&container);
                    }
                    if !state.aborting {
                        consumer.status(&container, &format!("exited with code {exit_code}"));
                    }
                    if cascade_stop {
                        if !state.aborting {
                            state.aborting = true;
                            println!("{ABORT_NOTICE}");
                            tracing::info!(container = %container, "Stopping remaining containers");
                            if let Some(stop) = stop.take() {
                                if let Err(err) = stop().await {
                                    let source = err.into();
                                    tracing::warn!(error = %source, "Stop action failed");
                                    return Err(PrinterError::StopFailed { source });
                                }
                            }
                        }
                        let source = state
                            .exit_code_from
                            .get_or_insert_with(|| service.clone());
                        if *source == service {
                            tracing::debug!(service = %service, exit_code, "Recorded exit code");
                            state.exit_code = exit_code;
                        }
                    }
                    if state.is_done() {
                        tracing::info!(exit_code = state.exit_code, "All containers exited");
                        return Ok(state.exit_code);
                    }
                }
            }
        }

        Err(PrinterError::Disconnected {
            remaining: state.containers.len(),
        })
    }
}
