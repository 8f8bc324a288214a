use crate::application::commands::InboundCommand;
use crate::error::{PaymentError, Result};
use std::io::BufRead;

/// Reads inbound commands from a JSON-lines source.
///
/// Each non-blank line is one command. A line that does not parse yields an
/// `Err` item and reading carries on with the next line.
pub struct CommandReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> CommandReader<R> {
    /// Creates a new `CommandReader` from any buffered source (e.g., a
    /// `BufReader<File>` or locked stdin).
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Lazily parses commands, paired with their 1-based line number.
    pub fn commands(self) -> impl Iterator<Item = (usize, Result<InboundCommand>)> {
        self.source
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .filter(|(_, line)| !matches!(line, Ok(text) if text.trim().is_empty()))
            .map(|(number, line)| {
                let parsed = line
                    .map_err(PaymentError::from)
                    .and_then(|text| serde_json::from_str(&text).map_err(PaymentError::from));
                (number, parsed)
            })
    }
}
