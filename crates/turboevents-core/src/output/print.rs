//! Output printing event payloads, one per line.

use std::io::{self, Stdout, Write};
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::Deserialize;
use turboevents_types::Event;

use super::{Output, OutputError};
use crate::format::JoinFormat;

/// How a [`PrintOutput`] renders each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintFormat {
    /// The payload alone.
    #[default]
    Plain,
    /// RFC 3339 timestamp, a comma, then the payload.
    Timestamped,
}

impl FromStr for PrintFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "timestamped" => Ok(Self::Timestamped),
            other => Err(format!("unknown print format: {other}")),
        }
    }
}

/// Writes each triggered event as a line.
#[derive(Debug)]
pub struct PrintOutput<W = Stdout> {
    writer: W,
    format: PrintFormat,
}

impl PrintOutput<Stdout> {
    /// Print plain payloads to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), PrintFormat::Plain)
    }
}

impl Default for PrintOutput<Stdout> {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<W: Write + Send> PrintOutput<W> {
    /// Print to `writer` using `format`.
    pub const fn new(writer: W, format: PrintFormat) -> Self {
        Self { writer, format }
    }

    /// Consume the output and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&self, event: &Event) -> String {
        match self.format {
            PrintFormat::Plain => event.payload.to_string(),
            PrintFormat::Timestamped => JoinFormat::csv().serialize(&[
                &event.time.to_rfc3339_opts(SecondsFormat::Millis, true),
                &event.payload,
            ]),
        }
    }
}

impl<W: Write + Send> Output for PrintOutput<W> {
    fn name(&self) -> &'static str {
        "print"
    }

    fn trigger(&mut self, event: &Event) -> Result<(), OutputError> {
        let line = self.render(event);
        writeln!(self.writer, "{line}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}
