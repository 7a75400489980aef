pub mod batch_sender;
pub mod client;
pub mod http;
pub mod metrics;
pub mod outcome;
pub mod response;

pub use batch_sender::BatchSender;
pub use client::{BatchClient, SendError};
pub use http::{ClientConfig, ClientError, FirehoseHttpClient, default_user_agent};
pub use metrics::{DeliveryMetrics, MetricsCollector};
pub use outcome::{DeliveryOutcome, classify};
pub use response::{BatchResponse, RecordResult, THROUGHPUT_EXCEEDED_CODE};
