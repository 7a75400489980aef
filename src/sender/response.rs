use serde::{Deserialize, Serialize};

/// Per-record error code meaning the stream's throughput limit was hit.
pub const THROUGHPUT_EXCEEDED_CODE: &str = "ServiceUnavailableException";

/// Result for one submitted record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RecordResult {
    pub fn delivered(record_id: impl Into<String>) -> Self {
        Self {
            record_id: Some(record_id.into()),
            ..Self::default()
        }
    }

    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            record_id: None,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error_code.is_some() || self.error_message.is_some()
    }

    pub fn is_throughput_exceeded(&self) -> bool {
        self.error_code.as_deref() == Some(THROUGHPUT_EXCEEDED_CODE)
    }
}

/// Manifest returned by a batch call, parallel to the submitted records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchResponse {
    #[serde(default)]
    pub failed_put_count: usize,
    #[serde(default)]
    pub request_responses: Vec<RecordResult>,
}

impl BatchResponse {
    pub fn from_results(request_responses: Vec<RecordResult>) -> Self {
        let failed_put_count = request_responses.iter().filter(|r| r.is_failure()).count();
        Self {
            failed_put_count,
            request_responses,
        }
    }

    pub fn all_delivered(count: usize) -> Self {
        Self::from_results(
            (0..count)
                .map(|i| RecordResult::delivered(format!("record-{i}")))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_manifest() {
        let body = r#"{
            "Encrypted": false,
            "FailedPutCount": 1,
            "RequestResponses": [
                {"RecordId": "a"},
                {"ErrorCode": "ServiceUnavailableException", "ErrorMessage": "Slow down."}
            ]
        }"#;

        let response: BatchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.failed_put_count, 1);
        assert!(!response.request_responses[0].is_failure());
        assert!(response.request_responses[1].is_failure());
        assert!(response.request_responses[1].is_throughput_exceeded());
    }

    #[test]
    fn test_minimal_manifest() {
        let response: BatchResponse = serde_json::from_str(r#"{"FailedPutCount": 0}"#).unwrap();
        assert_eq!(response, BatchResponse::default());
    }
}
