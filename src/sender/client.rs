use super::response::{BatchResponse, THROUGHPUT_EXCEEDED_CODE};
use crate::buffer::PendingRecord;
use std::sync::Arc;
use thiserror::Error;

const REJECTED_CODES: &[&str] = &[
    "ResourceNotFoundException",
    "InvalidArgumentException",
    "InvalidKMSResourceException",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Throughput limits for the delivery stream may have been exceeded: {message}")]
    ThroughputExceeded { message: String },
    #[error("Request rejected ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("Service error ({code}): {message}")]
    Service { code: String, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SendError {
    /// Maps a service error code onto the matching variant.
    pub fn from_error_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == THROUGHPUT_EXCEEDED_CODE {
            SendError::ThroughputExceeded { message }
        } else if REJECTED_CODES.contains(&code) {
            SendError::Rejected {
                code: code.to_string(),
                message,
            }
        } else {
            SendError::Service {
                code: code.to_string(),
                message,
            }
        }
    }

    pub fn is_throughput_exceeded(&self) -> bool {
        matches!(self, SendError::ThroughputExceeded { .. })
    }

    /// Whether resending the same batch later can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SendError::Rejected { .. })
    }
}

/// The ingestion service's "send batch" operation.
///
/// On success the response manifest has one entry per submitted record, in
/// the same order.
pub trait BatchClient: Send + Sync {
    fn put_record_batch(
        &self,
        stream: &str,
        records: &[PendingRecord],
    ) -> impl std::future::Future<Output = Result<BatchResponse, SendError>> + Send;
}

impl<C: BatchClient> BatchClient for Arc<C> {
    fn put_record_batch(
        &self,
        stream: &str,
        records: &[PendingRecord],
    ) -> impl std::future::Future<Output = Result<BatchResponse, SendError>> + Send {
        (**self).put_record_batch(stream, records)
    }
}
