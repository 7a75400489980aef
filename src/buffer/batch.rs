use super::error::BufferError;
use crate::transform::MAX_RECORD_SIZE;
use bytes::{Bytes, BytesMut};

/// Most records accepted in a single batch call.
pub const MAX_RECORDS_PER_BATCH: usize = 500;
/// Most bytes accepted in a single batch call (4 MiB).
pub const MAX_BATCH_BYTES: usize = 4_194_304;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_records: usize,
    pub max_bytes: usize,
    pub max_record_size: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_records: MAX_RECORDS_PER_BATCH,
            max_bytes: MAX_BATCH_BYTES,
            max_record_size: MAX_RECORD_SIZE,
        }
    }
}

/// A serialized payload waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    data: Bytes,
}

impl PendingRecord {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

/// Ordered pending records plus a running byte count.
///
/// Order is delivery order and survives resends, so a response manifest can
/// be matched back to records by position.
#[derive(Debug, Clone)]
pub struct BatchBuffer {
    records: Vec<PendingRecord>,
    data_length: usize,
    limits: BatchLimits,
    simple_aggregation: bool,
}

impl BatchBuffer {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            records: Vec::with_capacity(limits.max_records),
            data_length: 0,
            limits,
            simple_aggregation: false,
        }
    }

    /// Packs consecutive payloads into one record while they fit under the
    /// per-record ceiling.
    pub fn with_simple_aggregation(mut self, enabled: bool) -> Self {
        self.simple_aggregation = enabled;
        self
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    pub fn records(&self) -> &[PendingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn data_length(&self) -> usize {
        self.data_length
    }

    fn can_aggregate(&self, new_len: usize) -> bool {
        self.simple_aggregation
            && self
                .records
                .last()
                .is_some_and(|last| last.len() + new_len <= self.limits.max_record_size)
    }

    /// True when `new_len` more bytes cannot be added without sending first.
    pub fn would_overflow(&self, new_len: usize) -> bool {
        let bytes_exceeded = self.data_length + new_len > self.limits.max_bytes;
        if self.can_aggregate(new_len) {
            return bytes_exceeded;
        }
        self.records.len() >= self.limits.max_records || bytes_exceeded
    }

    /// Adds a payload. Callers send the current contents first whenever
    /// [`would_overflow`](Self::would_overflow) reports true.
    pub fn append(&mut self, data: Bytes) -> Result<(), BufferError> {
        let new_len = data.len();

        if new_len > self.limits.max_record_size {
            return Err(BufferError::RecordTooLarge {
                size: new_len,
                limit: self.limits.max_record_size,
            });
        }
        if self.data_length + new_len > self.limits.max_bytes {
            return Err(BufferError::BufferOverflow {
                attempted: new_len,
                current: self.data_length,
                capacity: self.limits.max_bytes,
            });
        }

        if self.can_aggregate(new_len) {
            if let Some(last) = self.records.last_mut() {
                let mut merged = BytesMut::with_capacity(last.len() + new_len);
                merged.extend_from_slice(&last.data);
                merged.extend_from_slice(&data);
                last.data = merged.freeze();
            }
        } else {
            if self.records.len() >= self.limits.max_records {
                return Err(BufferError::RecordLimitReached {
                    count: self.records.len(),
                    limit: self.limits.max_records,
                });
            }
            self.records.push(PendingRecord::new(data));
        }

        self.data_length += new_len;
        self.debug_check_invariants();
        Ok(())
    }

    /// Installs exactly `subset` as the new contents and recounts bytes.
    pub fn replace_with(&mut self, subset: Vec<PendingRecord>) {
        self.data_length = subset.iter().map(PendingRecord::len).sum();
        self.records = subset;
        self.debug_check_invariants();
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.data_length = 0;
    }

    /// Whether the byte counter matches the records actually held.
    pub fn is_consistent(&self) -> bool {
        self.data_length == self.records.iter().map(PendingRecord::len).sum::<usize>()
    }

    fn debug_check_invariants(&self) {
        debug_assert!(self.is_consistent(), "batch byte counter out of sync");
        debug_assert!(self.records.len() <= self.limits.max_records);
    }
}

impl Default for BatchBuffer {
    fn default() -> Self {
        Self::new(BatchLimits::default())
    }
}
