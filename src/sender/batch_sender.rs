use super::client::{BatchClient, SendError};
use super::metrics::MetricsCollector;
use super::outcome::{DeliveryOutcome, classify};
use super::response::BatchResponse;
use crate::buffer::{BatchBuffer, PendingRecord};
use crate::domain::FlushStatus;
use crate::reliability::{Backoff, Watchdog};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Drives one delivery attempt of the buffer's contents at a time.
///
/// Owns the backoff controller and the watchdog for its destination; neither
/// is shared with other destinations.
pub struct BatchSender<C> {
    client: C,
    stream: String,
    plugin_id: usize,
    backoff: Backoff,
    watchdog: Watchdog,
    metrics: MetricsCollector,
}

impl<C: BatchClient> BatchSender<C> {
    pub fn new(
        client: C,
        stream: impl Into<String>,
        plugin_id: usize,
        backoff: Backoff,
        watchdog: Watchdog,
    ) -> Self {
        Self {
            client,
            stream: stream.into(),
            plugin_id,
            backoff,
            watchdog,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Sends everything in `buffer` and updates it according to the outcome.
    ///
    /// - `Ok`: fully delivered (buffer cleared) or partially delivered (buffer
    ///   now holds only the failed records, resent on the next send).
    /// - `Retry`: nothing was delivered; the buffer is untouched.
    /// - `Error`: the service rejected the batch outright; it is discarded.
    pub async fn send_current_batch(&mut self, buffer: &mut BatchBuffer) -> FlushStatus {
        if buffer.is_empty() {
            return FlushStatus::Ok;
        }

        self.backoff.wait().await;
        self.watchdog.check();

        let batch_id = Uuid::new_v4();
        let sent = buffer.len();
        self.metrics.record_attempt();

        let result = self
            .client
            .put_record_batch(&self.stream, buffer.records())
            .await;
        let outcome = classify(sent, &result);

        if outcome.is_zero_progress() {
            self.watchdog.start();
        }
        if outcome.throughput_exceeded() {
            self.throttled();
        }

        match outcome {
            DeliveryOutcome::FullSuccess => {
                debug!(
                    plugin_id = self.plugin_id,
                    %batch_id,
                    records = sent,
                    bytes = buffer.data_length(),
                    "Sent events to {}", self.stream
                );
                self.watchdog.reset();
                self.backoff.reset();
                buffer.clear();
                self.metrics.record_success(sent);
                FlushStatus::Ok
            }
            DeliveryOutcome::PartialFailure { failed, .. } => {
                warn!(
                    plugin_id = self.plugin_id,
                    %batch_id,
                    failed = failed.len(),
                    "{} records failed to be delivered. Will retry.",
                    failed.len()
                );
                let resend = match &result {
                    Ok(response) => failed_records(buffer.records(), response),
                    Err(_) => Vec::new(),
                };
                self.metrics.record_partial(sent - resend.len(), resend.len());
                buffer.replace_with(resend);
                FlushStatus::Ok
            }
            DeliveryOutcome::TotalFailure { .. } => {
                error!(
                    plugin_id = self.plugin_id,
                    %batch_id,
                    records = sent,
                    "PutRecordBatch request returned with no records successfully received"
                );
                if let Ok(response) = &result {
                    log_record_errors(self.plugin_id, response);
                }
                FlushStatus::Retry
            }
            DeliveryOutcome::InconsistentManifest { sent, entries, .. } => {
                error!(
                    plugin_id = self.plugin_id,
                    %batch_id,
                    sent,
                    entries,
                    "PutRecordBatch response does not match the records sent; resending batch"
                );
                FlushStatus::Retry
            }
            DeliveryOutcome::TransportError(e) => self.handle_send_error(e, buffer),
        }
    }

    fn handle_send_error(&mut self, e: SendError, buffer: &mut BatchBuffer) -> FlushStatus {
        error!(plugin_id = self.plugin_id, "PutRecordBatch failed with {}", e);
        self.metrics.record_transport_failure();

        if e.is_retryable() {
            FlushStatus::Retry
        } else {
            error!(
                plugin_id = self.plugin_id,
                records = buffer.len(),
                "Discarding batch rejected by the service"
            );
            self.metrics.record_discarded(buffer.len());
            buffer.clear();
            FlushStatus::Error
        }
    }

    fn throttled(&mut self) {
        warn!(
            plugin_id = self.plugin_id,
            "Throughput limits for the delivery stream may have been exceeded."
        );
        self.metrics.record_throughput_exceeded();
        self.backoff.start_backoff();
    }
}

/// Records whose manifest entry reports a failure, in their original order.
fn failed_records(sent: &[PendingRecord], response: &BatchResponse) -> Vec<PendingRecord> {
    sent.iter()
        .zip(response.request_responses.iter())
        .filter(|(_, entry)| entry.is_failure())
        .map(|(record, entry)| {
            debug!(
                "Record failed to send with error: {}",
                entry.error_message.as_deref().unwrap_or_default()
            );
            record.clone()
        })
        .collect()
}

fn log_record_errors(plugin_id: usize, response: &BatchResponse) {
    for entry in &response.request_responses {
        if let Some(message) = &entry.error_message {
            debug!(plugin_id, "Record failed to send with error: {}", message);
        }
    }
}
