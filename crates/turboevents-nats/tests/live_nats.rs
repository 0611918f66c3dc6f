//! Integration tests against a live NATS server.
//!
//! Run with:
//!
//! ```bash
//! docker run --rm -p 4222:4222 nats
//! cargo test -p turboevents-nats -- --ignored
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use async_nats::Subscriber;
use chrono::Utc;
use futures::StreamExt as _;
use tokio::time::timeout;
use turboevents_core::config::{MessageBody, NatsConfig};
use turboevents_core::output::MemoryOutput;
use turboevents_core::{EndReason, EventBatcher};
use turboevents_nats::NatsOutput;

const NATS_URL: &str = "nats://localhost:4222";

async fn subscribe(subject: &str) -> Subscriber {
    let client = async_nats::connect(NATS_URL)
        .await
        .expect("Failed to connect to NATS -- is the server running?");
    let subscriber = client
        .subscribe(subject.to_owned())
        .await
        .expect("Failed to subscribe");
    client.flush().await.expect("Failed to flush subscription");
    subscriber
}

async fn next_body(subscriber: &mut Subscriber) -> String {
    let message = timeout(Duration::from_secs(5), subscriber.next())
        .await
        .expect("Timed out waiting for message")
        .expect("Subscription closed");
    String::from_utf8(message.payload.to_vec()).unwrap()
}

#[tokio::test]
#[ignore = "requires live NATS server (docker run -p 4222:4222 nats)"]
async fn publishes_raw_payloads_in_order() {
    let subject = format!("turboevents.test.{}", Utc::now().timestamp_micros());
    let mut subscriber = subscribe(&subject).await;

    let config = NatsConfig {
        url: NATS_URL.to_owned(),
        subject: subject.clone(),
        body: MessageBody::Raw,
        ..NatsConfig::default()
    };
    let (output, publisher) = NatsOutput::connect(&config).await.unwrap();
    let (memory, handle) = MemoryOutput::with_handle();

    let mut batcher = EventBatcher::default();
    batcher.add_output(Box::new(output));
    batcher.add_output(Box::new(memory));
    batcher.create_count_down_input(3, Duration::from_millis(20));
    let summary = batcher.run_to_completion().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::Drained);
    assert_eq!(handle.len(), 3);

    drop(batcher);
    let stats = publisher.shutdown().await.unwrap();
    assert_eq!(stats.published, 3);

    for expected in ["3", "2", "1"] {
        assert_eq!(next_body(&mut subscriber).await, expected);
    }
}

#[tokio::test]
#[ignore = "requires live NATS server (docker run -p 4222:4222 nats)"]
async fn shutdown_reports_published_count() {
    let subject = format!("turboevents.test.{}", Utc::now().timestamp_micros());
    let mut subscriber = subscribe(&subject).await;

    let config = NatsConfig {
        url: NATS_URL.to_owned(),
        subject: subject.clone(),
        body: MessageBody::Json,
        ..NatsConfig::default()
    };
    let (mut output, publisher) = NatsOutput::connect(&config).await.unwrap();
    assert_eq!(publisher.subject(), config.subject);
    let event = turboevents_types::Event::new(Utc::now(), "hello");
    turboevents_core::Output::trigger(&mut output, &event).unwrap();
    drop(output);

    let stats = publisher.shutdown().await.unwrap();
    assert_eq!(stats.published, 1);
    assert_eq!(stats.failed, 0);

    let body = next_body(&mut subscriber).await;
    let decoded: turboevents_types::Event = serde_json::from_str(&body).unwrap();
    assert_eq!(decoded.payload.to_string(), "hello");
}

#[tokio::test]
#[ignore = "requires no NATS server listening on port 4999"]
async fn unreachable_server_is_connect_error() {
    let config = NatsConfig {
        url: "nats://localhost:4999".to_owned(),
        ..NatsConfig::default()
    };
    let err = NatsOutput::connect(&config).await.unwrap_err();
    assert!(matches!(err, turboevents_nats::NatsOutputError::Connect { .. }));
}
