use super::client::{BatchClient, SendError};
use super::response::BatchResponse;
use crate::buffer::PendingRecord;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

const TARGET_PUT_RECORD_BATCH: &str = "Firehose_20150804.PutRecordBatch";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub region: String,
    /// Overrides the regional endpoint, e.g. for a local test double.
    pub endpoint: Option<String>,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            user_agent: default_user_agent(),
        }
    }

    pub fn resolve_endpoint(&self) -> Result<Url, ClientError> {
        let raw = match &self.endpoint {
            Some(endpoint) if !endpoint.is_empty() => endpoint.clone(),
            _ => format!("https://firehose.{}.amazonaws.com", self.region),
        };
        raw.parse()
            .map_err(|e| ClientError::InvalidConfiguration(format!("Invalid endpoint URL: {}", e)))
    }
}

pub fn default_user_agent() -> String {
    format!("rask-firehose-forwarder/{} ({})", crate::VERSION, std::env::consts::OS)
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutRecordBatchRequest<'a> {
    delivery_stream_name: &'a str,
    records: Vec<EncodedRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EncodedRecord {
    data: String,
}

#[derive(Deserialize, Default)]
struct ServiceErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// Strips the namespace prefix of a JSON protocol error type.
fn error_code(error_type: &str) -> &str {
    error_type
        .rsplit_once('#')
        .map(|(_, code)| code)
        .unwrap_or(error_type)
}

/// Firehose client speaking the JSON 1.1 protocol over reqwest.
///
/// Requests are not signed; point `endpoint` at a signing proxy or a local
/// service when running outside a trusted network.
#[derive(Debug, Clone)]
pub struct FirehoseHttpClient {
    client: Client,
    endpoint_url: Url,
}

impl FirehoseHttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let endpoint_url = config.resolve_endpoint()?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint_url,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint_url
    }

    async fn send(
        &self,
        stream: &str,
        records: &[PendingRecord],
    ) -> Result<BatchResponse, SendError> {
        let request = PutRecordBatchRequest {
            delivery_stream_name: stream,
            records: records
                .iter()
                .map(|record| EncodedRecord {
                    data: STANDARD.encode(record.data()),
                })
                .collect(),
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| SendError::InvalidResponse(format!("Failed to encode request: {}", e)))?;

        let response = self
            .client
            .post(self.endpoint_url.clone())
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", TARGET_PUT_RECORD_BATCH)
            .body(body)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_slice(&bytes)
                .map_err(|e| SendError::InvalidResponse(e.to_string()));
        }

        debug!(status = status.as_u16(), "PutRecordBatch returned an error response");
        let parsed: ServiceErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
        let message = parsed.message.unwrap_or_else(|| status.to_string());
        match parsed.error_type {
            Some(error_type) => Err(SendError::from_error_code(error_code(&error_type), message)),
            None if status == StatusCode::SERVICE_UNAVAILABLE => {
                Err(SendError::ThroughputExceeded { message })
            }
            None => Err(SendError::Service {
                code: status.as_u16().to_string(),
                message,
            }),
        }
    }
}

impl BatchClient for FirehoseHttpClient {
    fn put_record_batch(
        &self,
        stream: &str,
        records: &[PendingRecord],
    ) -> impl std::future::Future<Output = Result<BatchResponse, SendError>> + Send {
        self.send(stream, records)
    }
}
