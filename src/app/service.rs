use super::config::Config;
use super::host::{PluginHandle, PluginHost};
use crate::domain::{FlushStatus, ForwarderError, record_from_json};
use crate::sender::{BatchClient, ClientError, FirehoseHttpClient};
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::app::ConfigError),
    #[error("Client error: {0}")]
    ClientError(#[from] ClientError),
    #[error("Forwarder error: {0}")]
    ForwarderError(#[from] ForwarderError),
    #[error("Input error: {0}")]
    InputError(#[from] std::io::Error),
}

/// Totals for one run of the input loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSummary {
    pub lines_read: u64,
    pub malformed_lines: u64,
    pub final_status: FlushStatus,
}

/// Feeds newline-delimited JSON into one output and flushes it on a timer.
pub struct ServiceManager<C> {
    config: Config,
    host: PluginHost<C>,
    handle: PluginHandle,
    shutdown: CancellationToken,
}

impl ServiceManager<FirehoseHttpClient> {
    pub fn new(config: Config) -> Result<Self, ServiceError> {
        let client = FirehoseHttpClient::new(config.client_config())?;
        info!(endpoint = %client.endpoint(), "Using Firehose endpoint");
        Self::with_client(config, client)
    }
}

impl<C: BatchClient> ServiceManager<C> {
    pub fn with_client(config: Config, client: C) -> Result<Self, ServiceError> {
        let mut host = PluginHost::new();
        let handle = host.register(&config, client)?;
        Ok(Self {
            config,
            host,
            handle,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn host(&self) -> &PluginHost<C> {
        &self.host
    }

    pub fn handle(&self) -> PluginHandle {
        self.handle
    }

    /// Runs until end of input or cancellation, then flushes once more.
    ///
    /// A record the output refused with `Retry` is held back, and input
    /// reading pauses, until a later tick manages to buffer it.
    pub async fn run<R>(&mut self, reader: R) -> Result<ServiceSummary, ServiceError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let period = self.config.flush_interval().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut lines_read = 0u64;
        let mut malformed_lines = 0u64;
        let mut held: Option<(String, DateTime<Utc>)> = None;
        let shutdown = self.shutdown.clone();

        info!(
            stream = %self.config.delivery_stream,
            flush_interval_ms = self.config.flush_interval_ms,
            "Forwarding records"
        );

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let status = self.flush_and_report("interval").await?;
                    // a failed flush leaves the buffer full; wait for the next tick
                    if status != FlushStatus::Retry
                        && let Some((line, timestamp)) = held.take()
                    {
                        held = self.offer(line, timestamp, &mut malformed_lines).await?;
                    }
                }
                line = lines.next_line(), if held.is_none() => match line? {
                    Some(line) => {
                        lines_read += 1;
                        held = self.offer(line, Utc::now(), &mut malformed_lines).await?;
                    }
                    None => {
                        debug!(lines_read, "End of input");
                        break;
                    }
                },
            }
        }

        let final_status = match held.take() {
            Some((line, timestamp)) => {
                let status = self.flush_and_report("shutdown").await?;
                if status == FlushStatus::Retry {
                    error!("Dropping record that could not be buffered before shutdown");
                    status
                } else {
                    if self.offer(line, timestamp, &mut malformed_lines).await?.is_some() {
                        error!("Dropping record that could not be buffered before shutdown");
                    }
                    self.flush_and_report("shutdown").await?
                }
            }
            None => self.flush_and_report("shutdown").await?,
        };
        self.shutdown.cancel();

        Ok(ServiceSummary {
            lines_read,
            malformed_lines,
            final_status,
        })
    }

    /// Hands one input line to the output; returns it back when it must be
    /// offered again later.
    async fn offer(
        &mut self,
        line: String,
        timestamp: DateTime<Utc>,
        malformed_lines: &mut u64,
    ) -> Result<Option<(String, DateTime<Utc>)>, ServiceError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let value: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(e) => {
                *malformed_lines += 1;
                warn!("Skipping malformed input line: {}", e);
                return Ok(None);
            }
        };

        let status = self
            .host
            .add_record(self.handle, record_from_json(value), Some(timestamp))
            .await?;

        match status {
            FlushStatus::Ok => Ok(None),
            FlushStatus::Retry => {
                warn!("Output is full and could not send; will retry on next flush");
                Ok(Some((line, timestamp)))
            }
            FlushStatus::Error => {
                error!("Output reported a non-retryable error while adding a record");
                Ok(None)
            }
        }
    }

    async fn flush_and_report(&mut self, reason: &str) -> Result<FlushStatus, ServiceError> {
        let status = self.host.flush(self.handle).await?;
        match status {
            FlushStatus::Ok => debug!(reason, "Flush complete"),
            FlushStatus::Retry => warn!(reason, "Flush failed; will retry on next flush"),
            FlushStatus::Error => error!(reason, "Flush failed with a non-retryable error"),
        }
        Ok(status)
    }
}
