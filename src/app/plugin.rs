use super::config::Config;
use crate::buffer::{BatchBuffer, BufferError};
use crate::domain::{FlushStatus, ForwarderError, RecordMap};
use crate::reliability::{Backoff, Watchdog};
use crate::sender::{BatchClient, BatchSender, DeliveryMetrics};
use crate::transform::{RecordTransformer, TransformError};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// One configured output: transformer, pending batch and delivery state.
///
/// Instances share nothing; the host calls `add_record` and `flush` on one
/// instance from one task at a time.
pub struct OutputPlugin<C> {
    id: usize,
    transformer: RecordTransformer,
    buffer: BatchBuffer,
    sender: BatchSender<C>,
}

impl<C: BatchClient> OutputPlugin<C> {
    pub fn new(
        id: usize,
        transformer: RecordTransformer,
        buffer: BatchBuffer,
        sender: BatchSender<C>,
    ) -> Self {
        Self {
            id,
            transformer,
            buffer,
            sender,
        }
    }

    /// Builds an instance whose watchdog terminates the process on a stall.
    pub fn from_config(id: usize, config: &Config, client: C) -> Result<Self, ForwarderError> {
        let transformer = RecordTransformer::new(config.transform_config())?;
        let buffer = BatchBuffer::new(config.batch_limits())
            .with_simple_aggregation(config.simple_aggregation);
        let sender = BatchSender::new(
            client,
            config.delivery_stream.clone(),
            id,
            Backoff::new(config.backoff_config()),
            Watchdog::exiting(config.stall_threshold(), id),
        );

        info!(
            plugin_id = id,
            stream = %config.delivery_stream,
            region = %config.region,
            "Initialized output plugin"
        );
        Ok(Self::new(id, transformer, buffer, sender))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn buffer(&self) -> &BatchBuffer {
        &self.buffer
    }

    pub fn sender(&self) -> &BatchSender<C> {
        &self.sender
    }

    pub fn metrics(&self) -> DeliveryMetrics {
        self.sender.metrics().snapshot()
    }

    /// Transforms and buffers one record, sending the current batch first
    /// when the record would not fit.
    ///
    /// A record that cannot be transformed (oversized, unserializable) is
    /// dropped with `Ok`; a timestamp that cannot be rendered is `Error`.
    /// When the forced send leaves too little room the record is not
    /// buffered and `Retry` is returned; `Retry` always means the record was
    /// not kept and should be offered again.
    pub async fn add_record(
        &mut self,
        record: RecordMap,
        timestamp: Option<DateTime<Utc>>,
    ) -> FlushStatus {
        let data = match self.transformer.transform(record, timestamp) {
            Ok(data) => data,
            Err(TransformError::Timestamp(e)) => {
                error!(plugin_id = self.id, "Could not create timestamp: {}", e);
                return FlushStatus::Error;
            }
            Err(e) => {
                error!(plugin_id = self.id, "Unable to process record: {}", e);
                return FlushStatus::Ok;
            }
        };
        let new_len = data.len();

        let mut status = FlushStatus::Ok;
        if self.buffer.would_overflow(new_len) {
            debug!(
                plugin_id = self.id,
                records = self.buffer.len(),
                bytes = self.buffer.data_length(),
                "Batch full, sending before adding record"
            );
            status = self.sender.send_current_batch(&mut self.buffer).await;

            if self.buffer.would_overflow(new_len) {
                warn!(
                    plugin_id = self.id,
                    records = self.buffer.len(),
                    "No room for record after send; asking host to retry"
                );
                return match status {
                    FlushStatus::Error => FlushStatus::Error,
                    _ => FlushStatus::Retry,
                };
            }
        }

        match self.buffer.append(data) {
            Ok(()) => status,
            Err(e @ BufferError::RecordTooLarge { .. }) => {
                error!(plugin_id = self.id, "Dropping record: {}", e);
                status
            }
            Err(e) => {
                warn!(plugin_id = self.id, "Could not buffer record: {}", e);
                FlushStatus::Retry
            }
        }
    }

    /// Sends whatever is pending. An empty buffer is `Ok` without a request.
    pub async fn flush(&mut self) -> FlushStatus {
        self.sender.send_current_batch(&mut self.buffer).await
    }

    pub fn pending_records(&self) -> usize {
        self.buffer.len()
    }
}
