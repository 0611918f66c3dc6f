//! Error types for the NATS output.

use turboevents_core::OutputError;

/// Errors that can occur while publishing events to NATS.
#[derive(Debug, thiserror::Error)]
pub enum NatsOutputError {
    /// Failed to connect to the NATS server.
    #[error("failed to connect to NATS at {url}: {reason}")]
    Connect {
        /// The server URL.
        url: String,
        /// Why the connection failed.
        reason: String,
    },

    /// An event could not be encoded as JSON.
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    /// The background publisher has already stopped.
    #[error("NATS publisher is closed")]
    Closed,

    /// The background publisher panicked or was cancelled.
    #[error("NATS publisher task failed: {0}")]
    Task(String),
}

impl From<NatsOutputError> for OutputError {
    fn from(err: NatsOutputError) -> Self {
        Self::Publish(err.to_string())
    }
}
