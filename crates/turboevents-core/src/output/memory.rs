//! Output recording events in a shared buffer.

use std::sync::{Arc, Mutex, PoisonError};

use turboevents_types::Event;

use super::{Output, OutputError};

/// Records every triggered event.
///
/// The paired [`MemoryHandle`] stays with the caller after the output has
/// been handed to a generator or batcher.
#[derive(Debug)]
pub struct MemoryOutput {
    events: Arc<Mutex<Vec<Event>>>,
}

/// Read access to the events recorded by a [`MemoryOutput`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemoryOutput {
    /// Create an output and the handle to read what it records.
    pub fn with_handle() -> (Self, MemoryHandle) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                events: Arc::clone(&events),
            },
            MemoryHandle { events },
        )
    }
}

impl Output for MemoryOutput {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn trigger(&mut self, event: &Event) -> Result<(), OutputError> {
        self.events
            .lock()
            .map_err(|_err| OutputError::Poisoned)?
            .push(event.clone());
        Ok(())
    }
}

impl MemoryHandle {
    /// Return a copy of every event recorded so far, in trigger order.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return the payloads recorded so far, rendered as strings.
    pub fn payloads(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|event| event.payload.to_string())
            .collect()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
