pub mod batch;
pub mod error;

pub use batch::{BatchBuffer, BatchLimits, MAX_BATCH_BYTES, MAX_RECORDS_PER_BATCH, PendingRecord};
pub use error::BufferError;
