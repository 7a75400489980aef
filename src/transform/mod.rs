//! Record transformation: turns a host record into a delivery-ready payload.
//!
//! Steps, in order: timestamp injection, key allowlist, byte decoding, dot
//! replacement in field names, JSON serialization with a trailing newline,
//! and the per-record size ceiling.

pub mod decode;
pub mod keys;
pub mod timestamp;

pub use decode::{decode_map, decode_value};
pub use keys::{filter_data_keys, parse_data_keys, replace_dots};
pub use timestamp::{DEFAULT_TIME_FORMAT, TimestampFormatError, TimestampFormatter};

use crate::domain::{RecordKey, RecordMap, RecordValue};
use crate::domain::record::serialize_map;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Largest payload accepted for a single record (1000 KiB).
pub const MAX_RECORD_SIZE: usize = 1_024_000;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Log record of {size} bytes greater than max size allowed ({limit} bytes)")]
    Oversized { size: usize, limit: usize },
    #[error("Failed to marshal record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Could not create timestamp: {0}")]
    Timestamp(#[from] TimestampFormatError),
}

/// What to do with a record whose payload exceeds [`MAX_RECORD_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversizePolicy {
    /// Discard the record
    #[default]
    Drop,
    /// Cut the payload down to the ceiling, keeping the trailing newline
    Truncate,
}

#[derive(Debug, Clone, Default)]
pub struct TransformConfig {
    /// Comma-separated allowlist of top-level keys.
    pub data_keys: Option<String>,
    pub replace_dots: Option<String>,
    pub time_key: Option<String>,
    pub time_key_format: Option<String>,
    pub oversize_policy: OversizePolicy,
    pub max_record_size: usize,
}

impl TransformConfig {
    pub fn new() -> Self {
        Self {
            max_record_size: MAX_RECORD_SIZE,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordTransformer {
    data_keys: Option<Vec<String>>,
    replace_dots: Option<String>,
    time: Option<(String, TimestampFormatter)>,
    oversize_policy: OversizePolicy,
    max_record_size: usize,
}

impl RecordTransformer {
    pub fn new(config: TransformConfig) -> Result<Self, TimestampFormatError> {
        let data_keys = config
            .data_keys
            .as_deref()
            .map(parse_data_keys)
            .filter(|keys| !keys.is_empty());

        let time = match config.time_key.filter(|k| !k.is_empty()) {
            Some(key) => {
                let pattern = config.time_key_format.as_deref().unwrap_or(DEFAULT_TIME_FORMAT);
                Some((key, TimestampFormatter::new(pattern)?))
            }
            None => None,
        };

        let max_record_size = if config.max_record_size == 0 {
            MAX_RECORD_SIZE
        } else {
            config.max_record_size
        };

        Ok(Self {
            data_keys,
            replace_dots: config.replace_dots.filter(|r| !r.is_empty()),
            time,
            oversize_policy: config.oversize_policy,
            max_record_size,
        })
    }

    pub fn max_record_size(&self) -> usize {
        self.max_record_size
    }

    /// Injects the formatted timestamp under the configured time key, if any.
    ///
    /// A missing timestamp falls back to the current time. Any field already
    /// named like the time key, text or bytes, is replaced.
    pub fn inject_timestamp(
        &self,
        record: &mut RecordMap,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), TimestampFormatError> {
        if let Some((key, formatter)) = &self.time {
            let rendered = formatter.format(&timestamp.unwrap_or_else(Utc::now))?;
            record.retain(|existing, _| existing.as_text().as_deref() != Some(key.as_str()));
            record.insert(RecordKey::from(key.as_str()), RecordValue::String(rendered));
        }
        Ok(())
    }

    /// Full transformation. On error nothing is produced.
    pub fn transform(
        &self,
        mut record: RecordMap,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Bytes, TransformError> {
        self.inject_timestamp(&mut record, timestamp)?;
        self.process_record(record)
    }

    /// Everything after timestamp injection.
    pub fn process_record(&self, mut record: RecordMap) -> Result<Bytes, TransformError> {
        if let Some(keys) = &self.data_keys {
            filter_data_keys(&mut record, keys);
        }

        let mut record = decode_map(record);

        if let Some(replacement) = &self.replace_dots {
            record = replace_dots(record, replacement);
        }

        let mut data = Vec::with_capacity(256);
        serialize_map(&record, &mut serde_json::Serializer::new(&mut data)).map_err(|e| {
            debug!("Failed to marshal record: {:?}", record);
            e
        })?;
        data.push(b'\n');

        if data.len() > self.max_record_size {
            match self.oversize_policy {
                OversizePolicy::Drop => {
                    return Err(TransformError::Oversized {
                        size: data.len(),
                        limit: self.max_record_size,
                    });
                }
                OversizePolicy::Truncate => {
                    debug!(
                        size = data.len(),
                        limit = self.max_record_size,
                        "Truncating oversized record"
                    );
                    data.truncate(self.max_record_size - 1);
                    data.push(b'\n');
                }
            }
        }

        Ok(Bytes::from(data))
    }
}
