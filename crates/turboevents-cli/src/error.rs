//! Error types for the `turboevents` binary.
//!
//! [`CliError`] wraps every failure mode of startup and of the run itself,
//! so `main` can propagate with `?`.

/// Top-level error for the `turboevents` binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: turboevents_core::ConfigError,
    },

    /// XML files were given without a control string.
    #[error("XML files need a control string: pass --control or set inputs.default_control")]
    MissingControl,

    /// Registering inputs or running failed.
    #[error("run error: {source}")]
    Run {
        /// The underlying batcher error.
        #[from]
        source: turboevents_core::BatcherError,
    },

    /// Connecting to or draining the NATS output failed.
    #[error("NATS error: {source}")]
    Nats {
        /// The underlying NATS output error.
        #[from]
        source: turboevents_nats::NatsOutputError,
    },
}
