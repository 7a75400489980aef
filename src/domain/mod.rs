//! Domain layer for rask-firehose-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `RecordValue` / `RecordKey`: the host's loosely-typed record, as tagged variants
//! - `FlushStatus`: the status handed back to the host
//! - `ForwarderError`: errors reported to the host

pub mod error;
pub mod record;
pub mod status;

pub use error::ForwarderError;
pub use record::{RecordKey, RecordMap, RecordValue, record_from_json};
pub use status::FlushStatus;
