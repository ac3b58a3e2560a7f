//! Terminal rendering of container output.

use std::collections::HashMap;
use std::io::Write;

use console::Style;

use crate::consumer::LogConsumer;

/// Colours handed out to containers, in order.
fn palette() -> [Style; 6] {
    [
        Style::new().cyan(),
        Style::new().yellow(),
        Style::new().green(),
        Style::new().magenta(),
        Style::new().blue(),
        Style::new().cyan().bright(),
    ]
}

/// [`LogConsumer`] writing `name | line` output, one colour per container.
pub struct ConsoleConsumer<W: Write> {
    out: W,
    color: bool,
    prefix: bool,
    width: usize,
    styles: HashMap<String, Style>,
    next_style: usize,
}

impl<W: Write> ConsoleConsumer<W> {
    /// Create a consumer writing to `out`. Colours follow the terminal's
    /// capabilities.
    pub fn new(out: W) -> Self {
        Self {
            out,
            color: console::colors_enabled(),
            prefix: true,
            width: 0,
            styles: HashMap::new(),
            next_style: 0,
        }
    }

    /// Enable or disable colours.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Enable or disable the `name |` prefix on log lines.
    #[must_use]
    pub fn with_prefix(mut self, prefix: bool) -> Self {
        self.prefix = prefix;
        self
    }

    /// Consume the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, container: &str, text: &str) -> String {
        match self.styles.get(container) {
            Some(style) if self.color => style.apply_to(text).force_styling(true).to_string(),
            _ => text.to_string(),
        }
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}") {
            tracing::warn!(error = %e, "Failed to write container output");
        }
    }
}

impl<W: Write> LogConsumer for ConsoleConsumer<W> {
    fn register(&mut self, container: &str) {
        self.width = self.width.max(container.chars().count());
        if !self.styles.contains_key(container) {
            let styles = palette();
            let style = styles[self.next_style % styles.len()].clone();
            self.next_style += 1;
            self.styles.insert(container.to_string(), style);
        }
    }

    fn status(&mut self, container: &str, message: &str) {
        let line = self.paint(container, &format!("{container} {message}"));
        self.write_line(&line);
    }

    fn log(&mut self, container: &str, _service: &str, line: &str) {
        let prefix = if self.prefix {
            let width = self.width;
            self.paint(container, &format!("{container:<width$} | "))
        } else {
            String::new()
        };
        for part in line.split('\n') {
            let part = part.strip_suffix('\r').unwrap_or(part);
            self.write_line(&format!("{prefix}{part}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> ConsoleConsumer<Vec<u8>> {
        ConsoleConsumer::new(Vec::new()).with_color(false)
    }

    fn output(consumer: ConsoleConsumer<Vec<u8>>) -> String {
        String::from_utf8(consumer.into_inner()).unwrap()
    }

    #[test]
    fn pads_prefix_to_widest_container() {
        let mut console = plain();
        console.register("web-1");
        console.register("database-1");
        console.log("web-1", "web", "listening");
        console.log("database-1", "database", "ready");

        assert_eq!(
            output(console),
            "web-1      | listening\ndatabase-1 | ready\n"
        );
    }

    #[test]
    fn status_has_no_separator() {
        let mut console = plain();
        console.register("web-1");
        console.status("web-1", "exited with code 0");

        assert_eq!(output(console), "web-1 exited with code 0\n");
    }

    #[test]
    fn multi_line_payload_is_prefixed_per_line() {
        let mut console = plain();
        console.register("web-1");
        console.log("web-1", "web", "one\r\ntwo");

        assert_eq!(output(console), "web-1 | one\nweb-1 | two\n");
    }

    #[test]
    fn prefix_can_be_disabled() {
        let mut console = plain().with_prefix(false);
        console.register("web-1");
        console.log("web-1", "web", "bare");

        assert_eq!(output(console), "bare\n");
    }

    #[test]
    fn colored_output_uses_ansi_codes() {
        let mut console = ConsoleConsumer::new(Vec::new()).with_color(true);
        console.register("web-1");
        console.log("web-1", "web", "hi");

        let out = output(console);
        assert!(out.starts_with("\u{1b}["));
        assert!(out.contains("web-1 | "));
        assert!(out.ends_with("hi\n"));
    }
}
