//! Event streams, inputs, outputs, and the real-time generator loop.
//!
//! Inputs create event streams at the start of every run. The generator
//! merges the streams and triggers each event on the registered outputs when
//! the wall clock reaches the event's time.
//!
//! # Modules
//!
//! - [`batcher`] -- [`EventBatcher`], the facade for embedding programs.
//! - [`clock`] -- Local timestamp parsing, time shift and run window
//!   arithmetic.
//! - [`config`] -- Configuration loading from `turboevents.yaml` into
//!   strongly-typed structs.
//! - [`format`] -- [`JoinFormat`] separator-joined rendering.
//! - [`generator`] -- The run loop, [`RunControl`] and [`RunSummary`].
//! - [`input`] -- Container, count-down and XML file inputs.
//! - [`output`] -- Print, memory and fan-out outputs.
//! - [`stream`] -- The [`EventStream`] trait and the built-in streams.
//!
//! [`EventStream`]: stream::EventStream

pub mod batcher;
pub mod clock;
pub mod config;
pub mod format;
pub mod generator;
pub mod input;
pub mod output;
pub mod stream;

pub use batcher::{BatcherError, EventBatcher};
pub use config::{ConfigError, MessageBody, NatsConfig, TurboConfig};
pub use format::JoinFormat;
pub use generator::{EndReason, Generator, GeneratorError, RunControl, RunSummary};
pub use input::{Input, InputError};
pub use output::{Output, OutputError, OutputKind};
