//! Inputs: factories of event streams.
//!
//! At the start of every run the generator asks each registered [`Input`]
//! for its streams, and calls [`Input::finish`] on every input once the run
//! is over.
//!
//! # Kinds
//!
//! - [`ContainerInput`] -- replays events held in memory
//! - [`CountDownInput`] -- synthesizes integer events counting down to 1
//! - [`XmlFileInput`] -- replays recorded events from an XML export

mod container;
mod count_down;
pub mod xml;

use std::path::PathBuf;

pub use container::ContainerInput;
pub use count_down::{
    CountDownInput, DEFAULT_COUNT_DOWN_INTERVAL, DEFAULT_COUNT_DOWN_INTERVAL_MS,
};
pub use xml::{XmlError, XmlFileInput};

use crate::stream::{EventStream, RunConfig};

/// Errors that can occur while an input creates its streams.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// An input file could not be read.
    #[error("failed to read input file '{}': {source}", path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An XML input could not be turned into streams.
    #[error("XML input '{}': {source}", path.display())]
    Xml {
        /// The XML file.
        path: PathBuf,
        /// The underlying XML error.
        #[source]
        source: XmlError,
    },
}

/// A source of event streams, such as a file or an in-memory container.
pub trait Input: Send {
    /// Short human-readable description used in logs.
    fn name(&self) -> &str;

    /// Create the streams this input contributes to a run.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] if the underlying source cannot be read.
    fn add_streams(&mut self, config: &RunConfig) -> Result<Vec<Box<dyn EventStream>>, InputError>;

    /// Release resources held by the input once the run is over.
    fn finish(&mut self) {}
}
