//! Container lifecycle events.

/// Event emitted by a container watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEvent {
    /// Container output is attached.
    Attach {
        /// Container name.
        container: String,
        /// Service the container belongs to.
        service: String,
    },
    /// One line of container output.
    Log {
        /// Container name.
        container: String,
        /// Service the container belongs to.
        service: String,
        /// Output line, without trailing newline.
        line: String,
    },
    /// Container exited.
    Exit {
        /// Container name.
        container: String,
        /// Service the container belongs to.
        service: String,
        /// Process exit code.
        exit_code: i32,
        /// The container is being restarted by its restart policy.
        restarting: bool,
    },
    /// The user asked to stop (Ctrl-C).
    UserCancel,
}

impl ContainerEvent {
    /// Build an [`ContainerEvent::Attach`] event.
    pub fn attach(container: impl Into<String>, service: impl Into<String>) -> Self {
        Self::Attach {
            container: container.into(),
            service: service.into(),
        }
    }

    /// Build a [`ContainerEvent::Log`] event.
    pub fn log(
        container: impl Into<String>,
        service: impl Into<String>,
        line: impl Into<String>,
    ) -> Self {
        Self::Log {
            container: container.into(),
            service: service.into(),
            line: line.into(),
        }
    }

    /// Build a terminal [`ContainerEvent::Exit`] event.
    pub fn exit(container: impl Into<String>, service: impl Into<String>, exit_code: i32) -> Self {
        Self::Exit {
            container: container.into(),
            service: service.into(),
            exit_code,
            restarting: false,
        }
    }

    /// Build an [`ContainerEvent::Exit`] event for a container about to restart.
    pub fn restart(
        container: impl Into<String>,
        service: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self::Exit {
            container: container.into(),
            service: service.into(),
            exit_code,
            restarting: true,
        }
    }

    /// Container name, if the event concerns one.
    pub fn container(&self) -> Option<&str> {
        match self {
            Self::Attach { container, .. }
            | Self::Log { container, .. }
            | Self::Exit { container, .. } => Some(container),
            Self::UserCancel => None,
        }
    }

    /// Short event kind, used in traces.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Attach { .. } => "attach",
            Self::Log { .. } => "log",
            Self::Exit { .. } => "exit",
            Self::UserCancel => "cancel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_sets_flag() {
        let event = ContainerEvent::restart("web-1", "web", 1);
        assert!(matches!(
            event,
            ContainerEvent::Exit {
                restarting: true,
                exit_code: 1,
                ..
            }
        ));
        assert_eq!(event.container(), Some("web-1"));
    }

    #[test]
    fn cancel_has_no_container() {
        assert_eq!(ContainerEvent::UserCancel.container(), None);
        assert_eq!(ContainerEvent::UserCancel.kind(), "cancel");
    }
}
