//! Input replaying events held in an in-memory container.

use turboevents_types::Event;

use super::{Input, InputError};
use crate::clock;
use crate::stream::{ContainerStream, EventStream, RunConfig};

/// An input whose single stream replays a vector of events.
///
/// Events are yielded in the order given. With time shift enabled, every
/// event moves so that the earliest one falls at the run start. The events
/// are handed to the first run that uses the input; later runs see an
/// empty stream.
#[derive(Debug, Default)]
pub struct ContainerInput {
    events: Vec<Event>,
}

impl ContainerInput {
    /// Create a container input from `events`.
    pub const fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Number of events waiting to be replayed.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the container holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Input for ContainerInput {
    fn name(&self) -> &'static str {
        "container"
    }

    fn add_streams(&mut self, config: &RunConfig) -> Result<Vec<Box<dyn EventStream>>, InputError> {
        let events = std::mem::take(&mut self.events);
        let shift = match events.iter().map(|event| event.time).min() {
            Some(first) if config.time_shift => clock::shift_to(config.start, first),
            _ => chrono::TimeDelta::zero(),
        };
        Ok(vec![Box::new(ContainerStream::with_shift(events, shift))])
    }
}
