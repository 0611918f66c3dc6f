//! Input synthesizing count-down streams.

use std::time::Duration;

use super::{Input, InputError};
use crate::stream::{CountDownStream, EventStream, RunConfig};

/// Milliseconds between count-down events when none is given.
pub const DEFAULT_COUNT_DOWN_INTERVAL_MS: u64 = 1000;

/// Interval between count-down events when none is given.
pub const DEFAULT_COUNT_DOWN_INTERVAL: Duration =
    Duration::from_millis(DEFAULT_COUNT_DOWN_INTERVAL_MS);

/// An input with one stream counting down from `count` to 1.
///
/// Every run gets a fresh stream, so the same input can be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountDownInput {
    count: i64,
    interval: Duration,
    name: String,
}

impl CountDownInput {
    /// Create a count-down input.
    pub fn new(count: i64, interval: Duration) -> Self {
        Self {
            count,
            interval,
            name: format!("count-down({count}, {}ms)", interval.as_millis()),
        }
    }

    /// Create a count-down input with [`DEFAULT_COUNT_DOWN_INTERVAL`].
    pub fn with_default_interval(count: i64) -> Self {
        Self::new(count, DEFAULT_COUNT_DOWN_INTERVAL)
    }

    /// Number of events each run produces.
    pub const fn count(&self) -> i64 {
        self.count
    }

    /// Interval between events.
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl Input for CountDownInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_streams(&mut self, _config: &RunConfig) -> Result<Vec<Box<dyn EventStream>>, InputError> {
        Ok(vec![Box::new(CountDownStream::new(self.count, self.interval))])
    }
}
