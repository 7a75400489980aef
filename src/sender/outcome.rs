use super::client::SendError;
use super::response::BatchResponse;

/// Classification of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every record was accepted.
    FullSuccess,
    /// Some records failed; `failed` holds their positions in the sent batch.
    PartialFailure {
        failed: Vec<usize>,
        throughput_exceeded: bool,
    },
    /// The call succeeded but no record was accepted.
    TotalFailure { throughput_exceeded: bool },
    /// The manifest cannot be matched to the sent records.
    InconsistentManifest {
        sent: usize,
        entries: usize,
        throughput_exceeded: bool,
    },
    /// The call itself failed.
    TransportError(SendError),
}

impl DeliveryOutcome {
    /// Whether this attempt delivered nothing at all.
    pub fn is_zero_progress(&self) -> bool {
        !matches!(
            self,
            DeliveryOutcome::FullSuccess | DeliveryOutcome::PartialFailure { .. }
        )
    }

    pub fn throughput_exceeded(&self) -> bool {
        match self {
            DeliveryOutcome::PartialFailure {
                throughput_exceeded,
                ..
            }
            | DeliveryOutcome::TotalFailure {
                throughput_exceeded,
            }
            | DeliveryOutcome::InconsistentManifest {
                throughput_exceeded,
                ..
            } => *throughput_exceeded,
            DeliveryOutcome::TransportError(e) => e.is_throughput_exceeded(),
            DeliveryOutcome::FullSuccess => false,
        }
    }
}

/// Classifies the result of sending `sent` records.
pub fn classify(sent: usize, result: &Result<BatchResponse, SendError>) -> DeliveryOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => return DeliveryOutcome::TransportError(e.clone()),
    };

    if response.request_responses.is_empty() {
        return if response.failed_put_count == 0 {
            DeliveryOutcome::FullSuccess
        } else {
            DeliveryOutcome::InconsistentManifest {
                sent,
                entries: 0,
                throughput_exceeded: false,
            }
        };
    }

    let throughput_exceeded = response
        .request_responses
        .iter()
        .any(|entry| entry.is_throughput_exceeded());

    if response.request_responses.len() != sent {
        return DeliveryOutcome::InconsistentManifest {
            sent,
            entries: response.request_responses.len(),
            throughput_exceeded,
        };
    }

    let failed: Vec<usize> = response
        .request_responses
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_failure())
        .map(|(i, _)| i)
        .collect();

    if failed.is_empty() {
        if response.failed_put_count > 0 {
            return DeliveryOutcome::InconsistentManifest {
                sent,
                entries: response.request_responses.len(),
                throughput_exceeded: false,
            };
        }
        DeliveryOutcome::FullSuccess
    } else if failed.len() == sent {
        DeliveryOutcome::TotalFailure {
            throughput_exceeded,
        }
    } else {
        DeliveryOutcome::PartialFailure {
            failed,
            throughput_exceeded,
        }
    }
}
