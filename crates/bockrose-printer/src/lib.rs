//! # bockrose-printer
//!
//! Log and exit event coordination for bockrose.
//!
//! Every running container feeds [`ContainerEvent`]s into a single
//! [`LogPrinter`] through cloned [`EventSender`] handles. The printer is the
//! only owner of the coordination state:
//! - which containers are still attached
//! - whether the stack is aborting
//! - which service decides the overall exit code
//!
//! It forwards registrations, statuses and log lines to a [`LogConsumer`]
//! and returns once the last attached container has exited.

#![warn(missing_docs)]

pub mod consumer;
pub mod error;
pub mod event;
pub mod printer;
pub mod queue;
pub mod terminal;

pub use consumer::LogConsumer;
pub use error::{PrinterError, PrinterResult};
pub use event::ContainerEvent;
pub use printer::{LogPrinter, RunOptions};
pub use queue::EventSender;
pub use terminal::ConsoleConsumer;
