//! The real-time generator loop.
//!
//! This module provides [`Generator::run`], which merges the streams of all
//! inputs and triggers each event on the output when the wall clock reaches
//! its time. A run supports:
//!
//! - **Timestamp order**: the earliest pending event across all streams is
//!   always next; equal timestamps fire in the order they were queued
//! - **Bounded runs**: an optional window after which no further events fire
//! - **Clean stop**: another task can end the run through [`RunControl`]
//! - **Best-effort delivery**: a failed trigger is logged and counted, never
//!   fatal

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use turboevents_types::{Event, RunId};

use crate::clock;
use crate::input::{Input, InputError};
use crate::output::Output;
use crate::stream::{EventStream, RunConfig};

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// An input could not create its streams. No event was triggered.
    #[error("input '{input}' failed: {source}")]
    Input {
        /// Name of the failing input.
        input: String,
        /// The underlying input error.
        #[source]
        source: InputError,
    },
}

/// Reason a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Every stream was exhausted.
    Drained,
    /// The next event falls after the end of the run window.
    WindowElapsed,
    /// A stop was requested through [`RunControl`].
    Stopped,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Identifier of the run, also attached to its log lines.
    pub run_id: RunId,
    /// Why the run ended.
    pub end_reason: EndReason,
    /// Events delivered to the output.
    pub triggered: u64,
    /// Events the output failed to deliver.
    pub failed: u64,
    /// Streams still holding an undelivered event when the run ended.
    ///
    /// This counts streams, not events: a count-down with three values left
    /// counts once.
    pub pending_streams: usize,
    /// Wall-clock time the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock time the run ended.
    pub finished_at: DateTime<Utc>,
}

/// Shared stop switch for a running generator.
///
/// Wrap it in an [`Arc`](std::sync::Arc) to stop a run from another task
/// (for example a Ctrl-C handler). A stopped control stays stopped until
/// [`RunControl::reset`] is called.
#[derive(Debug, Default)]
pub struct RunControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Notification used to wake a sleeping run loop.
    stop_notify: Notify,
}

impl RunControl {
    /// Create a control with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a clean stop and wake the run loop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Clear a previous stop request so the control can serve another run.
    pub fn reset(&self) {
        self.stop_requested.store(false, Ordering::Release);
    }

    /// Wait until a stop is requested.
    ///
    /// Returns immediately if one already has been.
    pub async fn stopped(&self) {
        while !self.is_stop_requested() {
            self.stop_notify.notified().await;
        }
    }
}

/// Heap key: earliest time first, then queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Due {
    time: DateTime<Utc>,
    seq: u64,
    slot: usize,
}

struct Slot {
    stream: Box<dyn EventStream>,
    pending: Option<Event>,
}

/// Min-heap of streams keyed by their pending event.
#[derive(Default)]
struct Queue {
    heap: BinaryHeap<Reverse<Due>>,
    slots: Vec<Slot>,
    next_seq: u64,
}

impl Queue {
    fn push_stream(&mut self, mut stream: Box<dyn EventStream>, config: &RunConfig) {
        if let Some(event) = stream.generate(config) {
            let slot = self.slots.len();
            let time = event.time;
            self.slots.push(Slot {
                stream,
                pending: Some(event),
            });
            self.schedule(time, slot);
        }
    }

    fn schedule(&mut self, time: DateTime<Utc>, slot: usize) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Reverse(Due { time, seq, slot }));
    }

    fn peek_time(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(due)| due.time)
    }

    /// Take the earliest event and queue its stream's next one.
    fn pop(&mut self, config: &RunConfig) -> Option<Event> {
        let Reverse(due) = self.heap.pop()?;
        let slot = self.slots.get_mut(due.slot)?;
        let event = slot.pending.take()?;
        if let Some(next) = slot.stream.generate(config) {
            let time = next.time;
            slot.pending = Some(next);
            self.schedule(time, due.slot);
        }
        Some(event)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Merges input streams and triggers events in real time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Generator {
    time_shift: bool,
    window: Option<Duration>,
}

impl Generator {
    /// Create a generator without a run window.
    pub const fn new(time_shift: bool) -> Self {
        Self {
            time_shift,
            window: None,
        }
    }

    /// Bound every run to `window`.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Whether recorded timestamps are shifted onto the run start.
    pub const fn time_shift(&self) -> bool {
        self.time_shift
    }

    /// The run window, if any.
    pub const fn window(&self) -> Option<Duration> {
        self.window
    }

    /// Run until the streams drain, the window elapses, or a stop is
    /// requested.
    ///
    /// Every input is asked for its streams before the first event fires,
    /// and told to finish once the run is over. The output is flushed at the
    /// end of the run.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::Input`] if an input cannot create its
    /// streams.
    pub async fn run(
        &self,
        inputs: &mut [Box<dyn Input>],
        output: &mut dyn Output,
        control: &RunControl,
    ) -> Result<RunSummary, GeneratorError> {
        let run_id = RunId::new();
        let config = RunConfig::starting_now(self.time_shift);
        let deadline = self
            .window
            .map(|window| clock::window_deadline(config.start, window));

        info!(
            %run_id,
            inputs = inputs.len(),
            output = output.name(),
            time_shift = self.time_shift,
            window_ms = self
                .window
                .map(|w| u64::try_from(w.as_millis()).unwrap_or(u64::MAX)),
            "Run starting"
        );

        let mut queue = Queue::default();
        if let Err(e) = prepare(inputs, &config, &mut queue) {
            finish(inputs);
            return Err(e);
        }
        debug!(%run_id, streams = queue.len(), "Streams queued");

        let mut triggered: u64 = 0;
        let mut failed: u64 = 0;

        let end_reason = loop {
            if control.is_stop_requested() {
                break EndReason::Stopped;
            }
            let Some(due) = queue.peek_time() else {
                break EndReason::Drained;
            };
            if deadline.is_some_and(|deadline| due > deadline) {
                break EndReason::WindowElapsed;
            }

            let delay = clock::delay_until(due, Utc::now());
            if !delay.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = control.stopped() => break EndReason::Stopped,
                }
            }

            let Some(event) = queue.pop(&config) else {
                break EndReason::Drained;
            };
            debug!(%run_id, time = %event.time, payload = %event.payload, "Triggering event");
            match output.trigger(&event) {
                Ok(()) => triggered = triggered.saturating_add(1),
                Err(e) => {
                    warn!(%run_id, output = output.name(), error = %e, "failed to trigger event");
                    failed = failed.saturating_add(1);
                }
            }
        };

        finish(inputs);
        if let Err(e) = output.flush() {
            warn!(%run_id, output = output.name(), error = %e, "failed to flush output");
        }

        let summary = RunSummary {
            run_id,
            end_reason,
            triggered,
            failed,
            pending_streams: queue.len(),
            started_at: config.start,
            finished_at: Utc::now(),
        };
        log_run_end(&summary);
        Ok(summary)
    }
}

fn prepare(
    inputs: &mut [Box<dyn Input>],
    config: &RunConfig,
    queue: &mut Queue,
) -> Result<(), GeneratorError> {
    for input in inputs.iter_mut() {
        let streams = input
            .add_streams(config)
            .map_err(|source| GeneratorError::Input {
                input: input.name().to_owned(),
                source,
            })?;
        for stream in streams {
            queue.push_stream(stream, config);
        }
    }
    Ok(())
}

fn finish(inputs: &mut [Box<dyn Input>]) {
    for input in inputs.iter_mut() {
        input.finish();
    }
}

/// Log the end of a run.
pub fn log_run_end(summary: &RunSummary) {
    let elapsed_ms = summary
        .finished_at
        .signed_duration_since(summary.started_at)
        .num_milliseconds();
    info!(
        run_id = %summary.run_id,
        reason = ?summary.end_reason,
        triggered = summary.triggered,
        failed = summary.failed,
        pending_streams = summary.pending_streams,
        elapsed_ms,
        "Run ended"
    );
    if summary.failed > 0 {
        warn!(
            run_id = %summary.run_id,
            failed = summary.failed,
            "some events could not be delivered"
        );
    }
}
