//! End-to-end runs of the generator through the `EventBatcher` facade.
//!
//! Time is paused, so scheduled sleeps complete instantly while the run
//! still walks every event in timestamp order.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use turboevents_core::output::{MemoryHandle, MemoryOutput};
use turboevents_core::{EndReason, EventBatcher, Output, OutputError, RunControl};
use turboevents_types::Event;

fn batcher_with_memory() -> (EventBatcher, MemoryHandle) {
    let (output, handle) = MemoryOutput::with_handle();
    let mut batcher = EventBatcher::default();
    batcher.add_output(Box::new(output));
    (batcher, handle)
}

/// Fails every other event.
struct Flaky {
    calls: u32,
}

impl Output for Flaky {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn trigger(&mut self, _event: &Event) -> Result<(), OutputError> {
        self.calls = self.calls.wrapping_add(1);
        if self.calls % 2 == 0 {
            return Err(OutputError::Publish("rejected".to_owned()));
        }
        Ok(())
    }
}

/// Requests a stop as soon as it sees its first event.
struct StopAfterFirst {
    control: Arc<RunControl>,
}

impl Output for StopAfterFirst {
    fn name(&self) -> &'static str {
        "stop-after-first"
    }

    fn trigger(&mut self, _event: &Event) -> Result<(), OutputError> {
        self.control.request_stop();
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn merged_inputs_trigger_in_timestamp_order() {
    let (mut batcher, handle) = batcher_with_memory();
    batcher.create_count_down_input(3, Duration::from_millis(100));
    batcher.create_count_down_input(2, Duration::from_millis(150));
    let now = Utc::now();
    batcher.add_event(now + TimeDelta::milliseconds(120), "x");
    batcher.create_container_input();

    let summary = batcher.run_to_completion().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::Drained);
    assert_eq!(summary.triggered, 6);
    assert_eq!(summary.pending_streams, 0);

    let events = handle.events();
    assert_eq!(events.len(), 6);
    assert!(events.windows(2).all(|pair| pair[0].time <= pair[1].time));
    assert_eq!(events[0].payload.to_string(), "3");
}

#[tokio::test(start_paused = true)]
async fn window_stops_before_late_events() {
    let (mut batcher, handle) = batcher_with_memory();
    batcher.create_count_down_input(5, Duration::from_secs(1));

    let summary = batcher.run_for_secs(2.5).await.unwrap();
    assert_eq!(summary.end_reason, EndReason::WindowElapsed);
    assert_eq!(summary.triggered, 2);
    assert_eq!(summary.pending_streams, 1);
    assert_eq!(handle.payloads(), vec!["5", "4"]);
}

#[tokio::test(start_paused = true)]
async fn output_failures_are_counted_not_fatal() {
    let mut batcher = EventBatcher::default();
    batcher.add_output(Box::new(Flaky { calls: 0 }));
    batcher.create_count_down_input(4, Duration::from_millis(10));

    let summary = batcher.run_to_completion().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::Drained);
    assert_eq!(summary.triggered, 2);
    assert_eq!(summary.failed, 2);
}

#[tokio::test(start_paused = true)]
async fn stop_from_output_ends_run() {
    let mut batcher = EventBatcher::default();
    let control = batcher.control();
    batcher.add_output(Box::new(StopAfterFirst { control }));
    batcher.create_count_down_input(3, Duration::from_millis(10));

    let summary = batcher.run_to_completion().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::Stopped);
    assert_eq!(summary.triggered, 1);
    assert_eq!(summary.pending_streams, 1);
}

#[tokio::test(start_paused = true)]
async fn stop_interrupts_a_sleeping_run() {
    let (mut batcher, handle) = batcher_with_memory();
    batcher.create_count_down_input(3, Duration::from_secs(10));

    let control = batcher.control();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        control.request_stop();
    });

    let summary = batcher.run_to_completion().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::Stopped);
    assert_eq!(summary.triggered, 0);
    assert!(handle.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_does_not_carry_over_to_the_next_run() {
    let (mut batcher, handle) = batcher_with_memory();
    batcher.control().request_stop();
    batcher.create_count_down_input(2, Duration::from_millis(10));
    let stopped = batcher.run_to_completion().await.unwrap();
    assert_eq!(stopped.end_reason, EndReason::Stopped);
    assert_eq!(stopped.triggered, 0);

    batcher.create_count_down_input(2, Duration::from_millis(10));
    let summary = batcher.run_to_completion().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::Drained);
    assert_eq!(handle.payloads(), vec!["2", "1"]);
}

#[tokio::test(start_paused = true)]
async fn huge_window_runs_until_drained() {
    let (mut batcher, handle) = batcher_with_memory();
    batcher.create_count_down_input(2, Duration::from_millis(10));

    let summary = batcher.run_for_secs(1e13).await.unwrap();
    assert_eq!(summary.end_reason, EndReason::Drained);
    assert_eq!(summary.pending_streams, 0);
    assert_eq!(handle.payloads(), vec!["2", "1"]);
}

#[tokio::test(start_paused = true)]
async fn non_positive_count_down_yields_nothing() {
    let (mut batcher, handle) = batcher_with_memory();
    batcher.create_count_down_input(0, Duration::from_millis(10));
    batcher.create_count_down_input(-3, Duration::from_millis(10));

    let summary = batcher.run_to_completion().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::Drained);
    assert!(handle.is_empty());
}
