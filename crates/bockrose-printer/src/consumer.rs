//! Presentation side of the printer.

/// Receives what the printer decides to show.
///
/// Methods are only ever called from the task running
/// [`LogPrinter::run`](crate::LogPrinter::run), one at a time.
pub trait LogConsumer {
    /// A container started producing output.
    fn register(&mut self, container: &str);

    /// A status change for a container, e.g. `exited with code 0`.
    fn status(&mut self, container: &str, message: &str);

    /// One line of output from a container of `service`.
    fn log(&mut self, container: &str, service: &str, line: &str);
}

impl<T: LogConsumer + ?Sized> LogConsumer for &mut T {
    fn register(&mut self, container: &str) {
        (**self).register(container);
    }

    fn status(&mut self, container: &str, message: &str) {
        (**self).status(container, message);
    }

    fn log(&mut self, container: &str, service: &str, line: &str) {
        (**self).log(container, service, line);
    }
}

impl<T: LogConsumer + ?Sized> LogConsumer for Box<T> {
    fn register(&mut self, container: &str) {
        (**self).register(container);
    }

    fn status(&mut self, container: &str, message: &str) {
        (**self).status(container, message);
    }

    fn log(&mut self, container: &str, service: &str, line: &str) {
        (**self).log(container, service, line);
    }
}
