//! The `EventBatcher` facade.
//!
//! An embedding program collects events with [`EventBatcher::add_event`],
//! turns them into a container input, registers outputs, and replays
//! everything in real time with one of the `run` methods:
//!
//! ```no_run
//! # async fn demo() -> Result<(), turboevents_core::BatcherError> {
//! use chrono::{TimeDelta, Utc};
//! use turboevents_core::EventBatcher;
//!
//! let mut batcher = EventBatcher::default();
//! let now = Utc::now();
//! batcher.add_event(now + TimeDelta::seconds(1), "Hello,");
//! batcher.add_event(now + TimeDelta::seconds(2), "World!");
//! batcher.create_container_input();
//! batcher.set_print_output();
//! batcher.run_for_secs(3.0).await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use turboevents_types::Event;

use crate::clock::{self, ClockError};
use crate::generator::{Generator, GeneratorError, RunControl, RunSummary};
use crate::input::{ContainerInput, CountDownInput, Input, XmlError, XmlFileInput};
use crate::output::{FanOut, Output, PrintOutput};

/// Errors returned by [`EventBatcher`].
#[derive(Debug, thiserror::Error)]
pub enum BatcherError {
    /// A run was requested with no output registered.
    #[error("no output registered")]
    NoOutput,

    /// The run window is negative or not a finite number of seconds.
    #[error("invalid run window: {0}")]
    InvalidWindow(#[source] ClockError),

    /// The run failed.
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// An XML input could not be created from its control string.
    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Collects inputs and outputs and replays events in real time.
///
/// Inputs are consumed by a run; outputs stay registered for the next one.
pub struct EventBatcher {
    time_shift: bool,
    inputs: Vec<Box<dyn Input>>,
    outputs: FanOut,
    pending: Vec<Event>,
    control: Arc<RunControl>,
}

impl Default for EventBatcher {
    fn default() -> Self {
        Self::new(false)
    }
}

impl core::fmt::Debug for EventBatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBatcher")
            .field("time_shift", &self.time_shift)
            .field("inputs", &self.input_names())
            .field("outputs", &self.outputs)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl EventBatcher {
    /// Create a batcher. With `time_shift`, recorded timestamps are moved so
    /// each input's first event happens at the run start.
    pub fn new(time_shift: bool) -> Self {
        Self {
            time_shift,
            inputs: Vec::new(),
            outputs: FanOut::new(),
            pending: Vec::new(),
            control: Arc::new(RunControl::new()),
        }
    }

    /// Whether time shift is enabled.
    pub const fn time_shift(&self) -> bool {
        self.time_shift
    }

    /// Replace every registered output with a single print output on
    /// standard output.
    pub fn set_print_output(&mut self) {
        self.outputs.clear();
        self.add_print_output();
    }

    /// Append a print output on standard output, keeping the others.
    pub fn add_print_output(&mut self) {
        self.add_output(Box::new(PrintOutput::stdout()));
    }

    /// Append any output.
    pub fn add_output(&mut self, output: Box<dyn Output>) {
        debug!(output = output.name(), "Output registered");
        self.outputs.push(output);
    }

    /// Names of the registered outputs, in registration order.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.names()
    }

    /// Register any input for the next run.
    pub fn add_input(&mut self, input: Box<dyn Input>) {
        debug!(input = input.name(), "Input registered");
        self.inputs.push(input);
    }

    /// Names of the inputs registered for the next run.
    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|input| input.name()).collect()
    }

    /// Record a text event for the next container input.
    pub fn add_event(&mut self, time: DateTime<Utc>, text: impl Into<String>) {
        self.pending.push(Event::new(time, text.into()));
    }

    /// Number of events recorded since the last container input.
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Move the recorded events into a new container input.
    ///
    /// Events are ordered by time; events with equal times keep the order
    /// they were added in. With no recorded events the input is empty.
    pub fn create_container_input(&mut self) {
        let mut events = std::mem::take(&mut self.pending);
        events.sort_by_key(|event| event.time);
        self.add_input(Box::new(ContainerInput::new(events)));
    }

    /// Register an input counting down from `count` to 1, one value per
    /// `interval`.
    pub fn create_count_down_input(&mut self, count: i64, interval: Duration) {
        self.add_input(Box::new(CountDownInput::new(count, interval)));
    }

    /// Register an XML file input. The file is read when the run starts.
    ///
    /// # Errors
    ///
    /// Returns [`BatcherError::Xml`] if `control` is not a valid control
    /// string.
    pub fn create_xml_file_input(
        &mut self,
        path: impl Into<PathBuf>,
        control: &str,
    ) -> Result<(), BatcherError> {
        let input = XmlFileInput::new(path, control)?;
        self.add_input(Box::new(input));
        Ok(())
    }

    /// Handle for stopping a run from another task.
    ///
    /// A stop requested before a run starts ends that run at once. The
    /// request is cleared when the run returns, so the next run starts
    /// fresh.
    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    /// Run for at most `window`, or until every stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`BatcherError::NoOutput`] if no output is registered, or
    /// [`BatcherError::Generator`] if an input fails.
    pub async fn run(&mut self, window: Duration) -> Result<RunSummary, BatcherError> {
        self.run_with(Some(window)).await
    }

    /// Run for at most `secs` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`BatcherError::InvalidWindow`] if `secs` is negative or not
    /// finite, otherwise the errors of [`EventBatcher::run`].
    pub async fn run_for_secs(&mut self, secs: f64) -> Result<RunSummary, BatcherError> {
        let window = clock::window_from_secs(secs).map_err(BatcherError::InvalidWindow)?;
        self.run(window).await
    }

    /// Run until every stream is exhausted or a stop is requested.
    ///
    /// # Errors
    ///
    /// Same as [`EventBatcher::run`].
    pub async fn run_to_completion(&mut self) -> Result<RunSummary, BatcherError> {
        self.run_with(None).await
    }

    async fn run_with(&mut self, window: Option<Duration>) -> Result<RunSummary, BatcherError> {
        if self.outputs.is_empty() {
            return Err(BatcherError::NoOutput);
        }
        let mut generator = Generator::new(self.time_shift);
        if let Some(window) = window {
            generator = generator.with_window(window);
        }
        let mut inputs = std::mem::take(&mut self.inputs);
        let result = generator
            .run(&mut inputs, &mut self.outputs, &self.control)
            .await;
        self.control.reset();
        result.map_err(BatcherError::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::generator::EndReason;
    use crate::output::MemoryOutput;

    fn memory_batcher(time_shift: bool) -> (EventBatcher, crate::output::MemoryHandle) {
        let (output, handle) = MemoryOutput::with_handle();
        let mut batcher = EventBatcher::new(time_shift);
        batcher.add_output(Box::new(output));
        (batcher, handle)
    }

    #[test]
    fn set_print_output_replaces_and_add_appends() {
        let (mut batcher, _handle) = memory_batcher(false);
        batcher.add_print_output();
        assert_eq!(batcher.output_names(), vec!["memory", "print"]);
        batcher.set_print_output();
        assert_eq!(batcher.output_names(), vec!["print"]);
        batcher.add_print_output();
        assert_eq!(batcher.output_names(), vec!["print", "print"]);
    }

    #[test]
    fn create_container_input_empties_pending() {
        let mut batcher = EventBatcher::default();
        batcher.add_event(Utc::now(), "a");
        batcher.add_event(Utc::now(), "b");
        assert_eq!(batcher.pending_events(), 2);
        batcher.create_container_input();
        assert_eq!(batcher.pending_events(), 0);
        batcher.create_container_input();
        assert_eq!(batcher.input_names(), vec!["container", "container"]);
    }

    #[test]
    fn invalid_control_string_is_rejected() {
        let mut batcher = EventBatcher::default();
        let err = batcher.create_xml_file_input("data.xml", "").unwrap_err();
        assert!(matches!(err, BatcherError::Xml(_)));
        assert!(batcher.input_names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_without_output_fails() {
        let mut batcher = EventBatcher::default();
        batcher.create_count_down_input(1, Duration::from_millis(10));
        let err = batcher.run_to_completion().await.unwrap_err();
        assert!(matches!(err, BatcherError::NoOutput));
    }

    #[tokio::test(start_paused = true)]
    async fn run_without_inputs_drains_immediately() {
        let (mut batcher, handle) = memory_batcher(false);
        let summary = batcher.run(Duration::from_secs(60)).await.unwrap();
        assert_eq!(summary.end_reason, EndReason::Drained);
        assert_eq!(summary.triggered, 0);
        assert!(handle.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn negative_window_is_rejected() {
        let (mut batcher, _handle) = memory_batcher(false);
        let err = batcher.run_for_secs(-1.0).await.unwrap_err();
        assert!(matches!(err, BatcherError::InvalidWindow(_)));
        let err = batcher.run_for_secs(f64::NAN).await.unwrap_err();
        assert!(matches!(err, BatcherError::InvalidWindow(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn container_events_replay_sorted() {
        let (mut batcher, handle) = memory_batcher(false);
        let now = Utc::now();
        batcher.add_event(now + TimeDelta::milliseconds(300), "third");
        batcher.add_event(now + TimeDelta::milliseconds(100), "first");
        batcher.add_event(now + TimeDelta::milliseconds(200), "second");
        batcher.add_event(now + TimeDelta::milliseconds(200), "second-tie");
        batcher.create_container_input();

        let summary = batcher.run_to_completion().await.unwrap();
        assert_eq!(summary.end_reason, EndReason::Drained);
        assert_eq!(summary.triggered, 4);
        assert_eq!(handle.payloads(), vec!["first", "second", "second-tie", "third"]);
    }

    #[tokio::test(start_paused = true)]
    async fn inputs_are_consumed_outputs_kept() {
        let (mut batcher, handle) = memory_batcher(false);
        batcher.create_count_down_input(2, Duration::from_millis(10));
        let first = batcher.run_to_completion().await.unwrap();
        assert_eq!(first.triggered, 2);
        assert!(batcher.input_names().is_empty());
        assert_eq!(batcher.output_names(), vec!["memory"]);

        let second = batcher.run_to_completion().await.unwrap();
        assert_eq!(second.triggered, 0);
        assert_eq!(handle.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn time_shift_moves_old_events_to_run_start() {
        let (mut batcher, handle) = memory_batcher(true);
        let long_ago = Utc::now() - TimeDelta::days(365);
        batcher.add_event(long_ago, "a");
        batcher.add_event(long_ago + TimeDelta::seconds(1), "b");
        batcher.create_container_input();

        let summary = batcher.run(Duration::from_secs(5)).await.unwrap();
        assert_eq!(summary.triggered, 2);
        let events = handle.events();
        assert!(events[0].time >= summary.started_at);
        assert_eq!(events[1].time - events[0].time, TimeDelta::seconds(1));
    }
}
