//! Output publishing triggered events on a NATS subject.

use async_nats::{Client, ConnectOptions};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use turboevents_core::config::{MessageBody, NatsConfig};
use turboevents_core::{Output, OutputError};
use turboevents_types::Event;

use crate::error::NatsOutputError;

/// Counters reported by the background publisher when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    /// Messages accepted by the client.
    pub published: u64,
    /// Messages the client rejected.
    pub failed: u64,
}

/// Encode an event as a message body.
///
/// # Errors
///
/// Returns [`NatsOutputError::Encode`] if JSON serialization fails.
pub fn encode_body(event: &Event, body: MessageBody) -> Result<Vec<u8>, NatsOutputError> {
    match body {
        MessageBody::Raw => Ok(event.payload.to_bytes()),
        MessageBody::Json => Ok(serde_json::to_vec(event)?),
    }
}

/// Publishes every triggered event on one NATS subject.
///
/// `trigger` queues the encoded message on an unbounded channel; a
/// background task publishes the queue in order. Once every `NatsOutput`
/// has been dropped, [`NatsPublisher::shutdown`] drains the queue.
#[derive(Debug)]
pub struct NatsOutput {
    body: MessageBody,
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

/// Handle to the background task publishing for a [`NatsOutput`].
#[derive(Debug)]
pub struct NatsPublisher {
    subject: String,
    task: JoinHandle<PublishStats>,
}

impl NatsOutput {
    /// Connect to the server described by `config` and start the publisher.
    ///
    /// # Errors
    ///
    /// Returns [`NatsOutputError::Connect`] if the connection cannot be
    /// established.
    pub async fn connect(config: &NatsConfig) -> Result<(Self, NatsPublisher), NatsOutputError> {
        info!(url = %config.url, subject = %config.subject, tls = config.uses_tls(), "connecting to NATS server");
        let mut options = ConnectOptions::new().name("turboevents");
        if let Some(ca) = &config.tls_ca {
            options = options.add_root_certificates(ca.clone());
        }
        if let (Some(cert), Some(key)) = (&config.tls_cert, &config.tls_key) {
            options = options.add_client_certificate(cert.clone(), key.clone());
        }
        if config.uses_tls() {
            options = options.require_tls(true);
        }
        let client = options
            .connect(config.url.as_str())
            .await
            .map_err(|e| NatsOutputError::Connect {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;
        info!("NATS connection established");
        Ok(Self::start(client, config.subject.clone(), config.body))
    }

    /// Start publishing on an already connected client.
    pub fn start(client: Client, subject: String, body: MessageBody) -> (Self, NatsPublisher) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(publish_loop(client, subject.clone(), receiver));
        (Self { body, sender }, NatsPublisher { subject, task })
    }
}

impl NatsPublisher {
    /// The subject events are published on.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Wait for the queue to drain and flush the client.
    ///
    /// The queue closes when the paired [`NatsOutput`] is dropped; call this
    /// after dropping it.
    ///
    /// # Errors
    ///
    /// Returns [`NatsOutputError::Task`] if the publisher task panicked.
    pub async fn shutdown(self) -> Result<PublishStats, NatsOutputError> {
        let stats = self
            .task
            .await
            .map_err(|e| NatsOutputError::Task(e.to_string()))?;
        info!(
            subject = %self.subject,
            published = stats.published,
            failed = stats.failed,
            "NATS output shut down"
        );
        Ok(stats)
    }
}

impl Output for NatsOutput {
    fn name(&self) -> &'static str {
        "nats"
    }

    fn trigger(&mut self, event: &Event) -> Result<(), OutputError> {
        let message = encode_body(event, self.body)?;
        self.sender
            .send(message)
            .map_err(|_err| NatsOutputError::Closed)?;
        Ok(())
    }
}

async fn publish_loop(
    client: Client,
    subject: String,
    mut receiver: mpsc::UnboundedReceiver<Vec<u8>>,
) -> PublishStats {
    let mut stats = PublishStats::default();
    while let Some(message) = receiver.recv().await {
        match client.publish(subject.clone(), message.into()).await {
            Ok(()) => {
                stats.published = stats.published.saturating_add(1);
                debug!(subject = %subject, "event published");
            }
            Err(e) => {
                stats.failed = stats.failed.saturating_add(1);
                warn!(subject = %subject, error = %e, "failed to publish event");
            }
        }
    }
    if let Err(e) = client.flush().await {
        warn!(subject = %subject, error = %e, "failed to flush NATS client");
    }
    stats
}
