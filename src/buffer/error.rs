use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Buffer full: {count} records, limit {limit}")]
    RecordLimitReached { count: usize, limit: usize },

    #[error("Buffer overflow: attempted to add {attempted} bytes to {current}, capacity {capacity}")]
    BufferOverflow {
        attempted: usize,
        current: usize,
        capacity: usize,
    },

    #[error("Record of {size} bytes exceeds the per-record limit of {limit} bytes")]
    RecordTooLarge { size: usize, limit: usize },
}
