//! Log printer errors.

use miette::Diagnostic;
use thiserror::Error;

/// Boxed error returned by a stop action.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using [`PrinterError`].
pub type PrinterResult<T> = Result<T, PrinterError>;

/// Errors that end a [`LogPrinter::run`](crate::LogPrinter::run).
#[derive(Error, Diagnostic, Debug)]
pub enum PrinterError {
    /// The stop action failed while aborting on a container exit.
    #[error("Failed to stop containers: {source}")]
    #[diagnostic(
        code(bockrose::printer::stop_failed),
        help("Some containers may still be running")
    )]
    StopFailed {
        /// Error returned by the stop action.
        source: BoxError,
    },

    /// Every event sender was dropped before the last container exited.
    #[error("Event stream closed with {remaining} container(s) still attached")]
    #[diagnostic(code(bockrose::printer::disconnected))]
    Disconnected {
        /// Containers still registered when the stream closed.
        remaining: usize,
    },
}
