use crate::transform::TimestampFormatError;
use thiserror::Error;

/// Errors surfaced to the host by the output and its handle registry.
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("Timestamp format error: {0}")]
    TimestampFormat(#[from] TimestampFormatError),

    #[error("Unknown plugin handle: {0}")]
    UnknownHandle(usize),
}
