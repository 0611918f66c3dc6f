//! Event streams: ordered sources of events merged by the generator.
//!
//! A stream yields its own events in non-decreasing time order. The
//! generator keeps one pending event per stream and always triggers the
//! earliest pending event across all streams next.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use turboevents_types::Event;

/// Per-run settings handed to inputs and streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Wall-clock time the run started.
    pub start: DateTime<Utc>,
    /// Whether recorded timestamps are moved so each input starts at
    /// [`start`](Self::start).
    pub time_shift: bool,
}

impl RunConfig {
    /// Create a run configuration starting now.
    pub fn starting_now(time_shift: bool) -> Self {
        Self {
            start: Utc::now(),
            time_shift,
        }
    }
}

/// An ordered source of events.
pub trait EventStream: Send {
    /// Produce the next event, or `None` once the stream is exhausted.
    fn generate(&mut self, config: &RunConfig) -> Option<Event>;
}

/// A stream over events held in memory.
#[derive(Debug)]
pub struct ContainerStream {
    events: std::vec::IntoIter<Event>,
    shift: TimeDelta,
}

impl ContainerStream {
    /// Create a stream that yields `events` in the given order.
    pub fn new(events: Vec<Event>) -> Self {
        Self::with_shift(events, TimeDelta::zero())
    }

    /// Create a stream that moves every event by `shift` as it is yielded.
    pub fn with_shift(events: Vec<Event>, shift: TimeDelta) -> Self {
        Self {
            events: events.into_iter(),
            shift,
        }
    }

    /// Number of events not yet yielded.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventStream for ContainerStream {
    fn generate(&mut self, _config: &RunConfig) -> Option<Event> {
        self.events.next().map(|event| event.shifted(self.shift))
    }
}

/// A synthetic stream counting down from `count` to 1.
///
/// The first event falls one `interval` after the run start, and each
/// following event one `interval` later.
#[derive(Debug, Clone)]
pub struct CountDownStream {
    remaining: i64,
    interval: TimeDelta,
    last: Option<DateTime<Utc>>,
}

impl CountDownStream {
    /// Create a count-down stream.
    pub fn new(count: i64, interval: Duration) -> Self {
        Self {
            remaining: count,
            interval: TimeDelta::from_std(interval).unwrap_or(TimeDelta::MAX),
            last: None,
        }
    }
}

impl EventStream for CountDownStream {
    fn generate(&mut self, config: &RunConfig) -> Option<Event> {
        if self.remaining <= 0 {
            return None;
        }
        let base = self.last.unwrap_or(config.start);
        let time = base.checked_add_signed(self.interval)?;
        let event = Event::new(time, self.remaining);
        self.last = Some(time);
        self.remaining = self.remaining.saturating_sub(1);
        Some(event)
    }
}
