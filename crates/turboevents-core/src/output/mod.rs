//! Outputs: destinations that triggered events are delivered to.
//!
//! The generator calls [`Output::trigger`] once per event, at the event's
//! time, in timestamp order. [`FanOut`] delivers every event to several
//! outputs in registration order.
//!
//! # Kinds
//!
//! - [`PrintOutput`] -- writes payloads to standard output (or any writer)
//! - [`MemoryOutput`] -- records events for an embedding program to inspect
//! - the NATS broker output lives in the `turboevents-nats` crate

mod memory;
mod print;

use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;
use turboevents_types::Event;

pub use memory::{MemoryHandle, MemoryOutput};
pub use print::{PrintFormat, PrintOutput};

/// Errors that can occur while delivering events.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Writing to the underlying sink failed.
    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Publishing to a broker failed or the publisher has shut down.
    #[error("publish error: {0}")]
    Publish(String),

    /// A shared buffer was poisoned by a panicking writer.
    #[error("output buffer poisoned")]
    Poisoned,
}

/// A destination for triggered events.
pub trait Output: Send {
    /// Short human-readable description used in logs.
    fn name(&self) -> &str;

    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the event could not be delivered.
    fn trigger(&mut self, event: &Event) -> Result<(), OutputError>;

    /// Push out anything buffered. Called once at the end of every run.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if buffered data could not be written.
    fn flush(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Output kinds selectable by name from configuration or the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Print payloads to standard output.
    #[default]
    Print,
    /// Publish events to a NATS subject.
    Nats,
}

impl OutputKind {
    /// The name used in configuration files and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Nats => "nats",
        }
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "print" => Ok(Self::Print),
            "nats" => Ok(Self::Nats),
            other => Err(format!("unknown output kind: {other}")),
        }
    }
}

impl core::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers every event to a list of outputs.
///
/// A failing output does not keep the others from receiving the event; the
/// first error is reported after all outputs have been tried.
#[derive(Default)]
pub struct FanOut {
    outputs: Vec<Box<dyn Output>>,
}

impl FanOut {
    /// Create an empty fan-out.
    pub const fn new() -> Self {
        Self {
            outputs: Vec::new(),
        }
    }

    /// Append an output.
    pub fn push(&mut self, output: Box<dyn Output>) {
        self.outputs.push(output);
    }

    /// Remove every output.
    pub fn clear(&mut self) {
        self.outputs.clear();
    }

    /// Number of registered outputs.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether no outputs are registered.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Names of the registered outputs, in order.
    pub fn names(&self) -> Vec<&str> {
        self.outputs.iter().map(|output| output.name()).collect()
    }

    fn each(
        &mut self,
        mut op: impl FnMut(&mut dyn Output) -> Result<(), OutputError>,
    ) -> Result<(), OutputError> {
        let mut first_error = None;
        for output in &mut self.outputs {
            if let Err(e) = op(output.as_mut()) {
                warn!(output = output.name(), error = %e, "output failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl core::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FanOut").field("outputs", &self.names()).finish()
    }
}

impl Output for FanOut {
    fn name(&self) -> &'static str {
        "fan-out"
    }

    fn trigger(&mut self, event: &Event) -> Result<(), OutputError> {
        self.each(|output| output.trigger(event))
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        self.each(|output| output.flush())
    }
}
