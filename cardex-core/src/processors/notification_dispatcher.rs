//! NotificationDispatcher processor.
//!
//! The NotificationDispatcher is responsible for:
//! - Receiving `SettlementEvent`s from the queue
//! - Turning each event into one `NotificationPayload` per recipient
//! - Delivering payloads to the configured sink (signed webhook, or the log)
//! - Retrying failed deliveries with exponential backoff, up to
//!   `max_attempts`, in background tasks
//!
//! Nothing here can affect settlement state: by the time an event arrives the
//! transition it describes is committed.

use crate::config::{ConfigStore, NotificationConfig, WebhookTarget};
use crate::events::{SettlementEvent, SettlementEventReceiver};
use async_trait::async_trait;
use cardex_sdk::objects::NotificationPayload;
use cardex_sdk::signature::{SIGNATURE_HEADER, SignedObject};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Backoff exponent cap (2^11 = 2048 seconds).
const MAX_RETRY_EXPONENT: u32 = 11;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("notification delivery failed with status {status}: {body}")]
    DeliveryFailed { status: u16, body: String },

    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for notification payloads.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DispatchError>;
}

/// POSTs the payload as JSON with a `Cardex-Signature` header.
pub struct WebhookSink {
    http_client: reqwest::Client,
    target: WebhookTarget,
}

impl WebhookSink {
    pub fn new(http_client: reqwest::Client, target: WebhookTarget) -> Self {
        Self {
            http_client,
            target,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        let signed = SignedObject::new(payload.clone(), &self.target.secret)?;

        let response = self
            .http_client
            .post(self.target.url.clone())
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signed.to_header())
            .body(signed.json)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DispatchError::DeliveryFailed {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Logs notifications. Used when no webhook is configured.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        info!(
            event_id = %payload.event_id,
            kind = %payload.kind,
            recipient = %payload.recipient,
            subject = ?payload.subject,
            status = %payload.status,
            "Notification"
        );
        Ok(())
    }
}

/// NotificationDispatcher delivers settlement events to the parties involved.
pub struct NotificationDispatcher {
    http_client: reqwest::Client,
    /// Overrides the configured sink. Tests use this to observe deliveries.
    sink_override: Option<Arc<dyn NotificationSink>>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            sink_override: None,
        }
    }

    /// Deliver everything to `sink`, ignoring the configured webhook.
    pub fn with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink_override: Some(sink),
            ..Self::new()
        }
    }

    /// Run until shutdown is signaled or every event sender is dropped.
    ///
    /// The config is read per event, so a reload takes effect for the next
    /// event without restarting the dispatcher.
    pub async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut event_rx: SettlementEventReceiver,
        config: ConfigStore<NotificationConfig>,
    ) {
        info!("NotificationDispatcher started");
        let mut deliveries = JoinSet::new();
        let mut config_watcher = config.subscribe();

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("NotificationDispatcher received shutdown signal");
                        if !deliveries.is_empty() {
                            warn!(pending = deliveries.len(), "Abandoning in-flight notifications");
                        }
                        deliveries.abort_all();
                        break;
                    }
                }

                Ok(()) = config_watcher.changed() => {
                    info!(version = config.version(), "Notification config reloaded");
                }

                event = event_rx.recv() => {
                    let Some(event) = event else {
                        info!("SettlementEvent channel closed, draining deliveries");
                        while deliveries.join_next().await.is_some() {}
                        break;
                    };
                    debug!(event_id = %event.event_id, kind = %event.kind, "Received SettlementEvent");
                    let settings = config.snapshot().await;
                    self.dispatch(&mut deliveries, event, &settings);
                    while deliveries.try_join_next().is_some() {}
                }
            }
        }

        info!("NotificationDispatcher shutdown complete");
    }

    fn sink_for(&self, settings: &NotificationConfig) -> Arc<dyn NotificationSink> {
        if let Some(sink) = &self.sink_override {
            return Arc::clone(sink);
        }
        match &settings.webhook {
            Some(target) => Arc::new(WebhookSink::new(self.http_client.clone(), target.clone())),
            None => Arc::new(LogSink),
        }
    }

    /// Spawn one delivery task per recipient.
    fn dispatch(
        &self,
        deliveries: &mut JoinSet<bool>,
        event: SettlementEvent,
        settings: &NotificationConfig,
    ) {
        let sink = self.sink_for(settings);
        for recipient in &event.recipients {
            let payload = event.payload_for(*recipient);
            let sink = Arc::clone(&sink);
            let max_attempts = settings.max_attempts;
            deliveries.spawn(async move { deliver_with_retry(sink.as_ref(), payload, max_attempts).await });
        }
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Try up to `max_attempts` times (at least once). Returns whether the
/// payload was delivered.
pub async fn deliver_with_retry(
    sink: &dyn NotificationSink,
    payload: NotificationPayload,
    max_attempts: u32,
) -> bool {
    let max_attempts = max_attempts.max(1);
    for attempt in 0..max_attempts {
        match sink.deliver(&payload).await {
            Ok(()) => {
                debug!(
                    event_id = %payload.event_id,
                    recipient = %payload.recipient,
                    attempt = attempt + 1,
                    "Notification delivered"
                );
                return true;
            }
            Err(e) => {
                warn!(
                    event_id = %payload.event_id,
                    recipient = %payload.recipient,
                    attempt = attempt + 1,
                    max_attempts,
                    error = %e,
                    "Notification delivery failed"
                );
                if attempt + 1 < max_attempts {
                    tokio::time::sleep(calculate_retry_delay(attempt)).await;
                }
            }
        }
    }

    error!(
        event_id = %payload.event_id,
        recipient = %payload.recipient,
        kind = %payload.kind,
        "Giving up on notification"
    );
    false
}

/// Calculate the next retry delay based on retry count.
///
/// Uses exponential backoff: 2^retry_count seconds.
pub fn calculate_retry_delay(retry_count: u32) -> Duration {
    let seconds = 2u64.pow(retry_count.min(MAX_RETRY_EXPONENT));
    Duration::from_secs(seconds)
}
