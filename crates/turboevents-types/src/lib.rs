//! Shared type definitions for the turboevents generator.
//!
//! Events flow from inputs, through the generator, to outputs. Every crate in
//! the workspace agrees on the shapes defined here.
//!
//! # Modules
//!
//! - [`event`] -- Timestamped events and their payloads
//! - [`ids`] -- Type-safe UUID wrappers for run identifiers

pub mod event;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use event::{Event, Payload};
pub use ids::RunId;
