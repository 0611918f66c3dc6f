//! NATS broker output for the turboevents generator.
//!
//! [`NatsOutput`] publishes every triggered event on one subject. Publishing
//! happens on a background task so triggering never waits on the network.
//!
//! # Modules
//!
//! - [`error`] -- [`NatsOutputError`].
//! - [`output`] -- [`NatsOutput`], its [`NatsPublisher`] task and message
//!   body encoding.

pub mod error;
pub mod output;

pub use error::NatsOutputError;
pub use output::{NatsOutput, NatsPublisher, PublishStats, encode_body};
