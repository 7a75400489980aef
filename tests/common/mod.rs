#![allow(dead_code)]

use bytes::Bytes;
use rask_firehose_forwarder::buffer::{BatchBuffer, PendingRecord};
use rask_firehose_forwarder::reliability::{Backoff, BackoffConfig, Watchdog};
use rask_firehose_forwarder::sender::{
    BatchClient, BatchResponse, BatchSender, RecordResult, SendError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory client that answers from a queue of scripted replies and
/// records every batch it was handed. An empty script means full success.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<BatchResponse, SendError>>>,
    sent: Mutex<Vec<Vec<Bytes>>>,
    sent_at: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_reply(&self, reply: Result<BatchResponse, SendError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Manifest where the positions in `failed` carry `code`.
    pub fn push_manifest(&self, total: usize, failed: &[usize], code: &str) {
        let entries = (0..total)
            .map(|i| {
                if failed.contains(&i) {
                    RecordResult::failed(code, format!("record {i} failed"))
                } else {
                    RecordResult::delivered(format!("id-{i}"))
                }
            })
            .collect();
        self.push_reply(Ok(BatchResponse::from_results(entries)));
    }

    pub fn batches(&self) -> Vec<Vec<Bytes>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.sent_at.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl BatchClient for ScriptedClient {
    fn put_record_batch(
        &self,
        _stream: &str,
        records: &[PendingRecord],
    ) -> impl std::future::Future<Output = Result<BatchResponse, SendError>> + Send {
        self.sent
            .lock()
            .unwrap()
            .push(records.iter().map(|r| r.data().clone()).collect());
        self.sent_at.lock().unwrap().push(tokio::time::Instant::now());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(BatchResponse::all_delivered(records.len())));
        async move { reply }
    }
}

/// Watchdog stand-in that counts how often it fired instead of exiting.
pub fn observed_watchdog(threshold: Duration) -> (Watchdog, Arc<AtomicUsize>) {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let watchdog = Watchdog::new(
        threshold,
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    (watchdog, fired)
}

pub fn sender(
    client: Arc<ScriptedClient>,
) -> (BatchSender<Arc<ScriptedClient>>, Arc<AtomicUsize>) {
    let (watchdog, fired) = observed_watchdog(Duration::from_secs(600));
    let sender = BatchSender::new(
        client,
        "test-stream",
        0,
        Backoff::new(BackoffConfig::default()),
        watchdog,
    );
    (sender, fired)
}

/// A newline-terminated payload of exactly `len` bytes starting with `tag`.
pub fn payload(tag: &str, len: usize) -> Bytes {
    let mut data = tag.as_bytes().to_vec();
    data.resize(len - 1, b'.');
    data.push(b'\n');
    Bytes::from(data)
}

pub fn filled_buffer(payloads: &[Bytes]) -> BatchBuffer {
    let mut buffer = BatchBuffer::default();
    for p in payloads {
        buffer.append(p.clone()).unwrap();
    }
    buffer
}
