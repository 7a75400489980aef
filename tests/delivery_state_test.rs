mod common;

use common::{ScriptedClient, filled_buffer, payload, sender};
use rask_firehose_forwarder::FlushStatus;
use rask_firehose_forwarder::buffer::BatchBuffer;
use rask_firehose_forwarder::sender::{SendError, THROUGHPUT_EXCEEDED_CODE};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn test_empty_buffer_makes_no_call() {
    let client = ScriptedClient::new();
    let (mut sender, _) = sender(client.clone());
    let mut buffer = BatchBuffer::default();

    assert_eq!(sender.send_current_batch(&mut buffer).await, FlushStatus::Ok);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_full_success_clears_everything() {
    let client = ScriptedClient::new();
    let (mut sender, _) = sender(client.clone());
    let mut buffer = filled_buffer(&[payload("a", 10), payload("b", 20)]);

    let status = sender.send_current_batch(&mut buffer).await;

    assert_eq!(status, FlushStatus::Ok);
    assert!(buffer.is_empty());
    assert_eq!(buffer.data_length(), 0);
    assert!(!sender.backoff().is_active());
    assert!(!sender.watchdog().is_running());
    assert_eq!(client.batches()[0].len(), 2);
    assert_eq!(sender.metrics().snapshot().records_delivered, 2);
}

#[tokio::test]
async fn test_partial_failure_keeps_only_failed_record() {
    let client = ScriptedClient::new();
    client.push_manifest(3, &[1], "InternalFailure");
    let (mut sender, _) = sender(client.clone());
    let second = payload("second", 37);
    let mut buffer = filled_buffer(&[payload("first", 10), second.clone(), payload("third", 12)]);

    let status = sender.send_current_batch(&mut buffer).await;

    assert_eq!(status, FlushStatus::Ok);
    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.records()[0].data(), &second);
    assert_eq!(buffer.data_length(), 37);
    assert!(buffer.is_consistent());
    // partial progress neither arms nor clears the watchdog
    assert!(!sender.watchdog().is_running());
    assert!(!sender.backoff().is_active());
}

#[tokio::test]
async fn test_partial_throughput_failure_starts_backoff_only() {
    let client = ScriptedClient::new();
    client.push_manifest(2, &[0], THROUGHPUT_EXCEEDED_CODE);
    let (mut sender, _) = sender(client);
    let mut buffer = filled_buffer(&[payload("a", 10), payload("b", 10)]);

    sender.send_current_batch(&mut buffer).await;

    assert!(sender.backoff().is_active());
    assert!(!sender.watchdog().is_running());
    assert_eq!(buffer.len(), 1);
}

#[tokio::test]
async fn test_total_failure_leaves_buffer_and_starts_watchdog() {
    let client = ScriptedClient::new();
    client.push_manifest(3, &[0, 1, 2], "InternalFailure");
    let (mut sender, _) = sender(client);
    let payloads = [payload("a", 10), payload("b", 11), payload("c", 12)];
    let mut buffer = filled_buffer(&payloads);

    let status = sender.send_current_batch(&mut buffer).await;

    assert_eq!(status, FlushStatus::Retry);
    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.data_length(), 33);
    assert!(sender.watchdog().is_running());
    assert!(!sender.backoff().is_active());
}

#[tokio::test]
async fn test_transport_error_leaves_buffer_and_starts_watchdog() {
    let client = ScriptedClient::new();
    client.push_reply(Err(SendError::Transport("connection reset".to_string())));
    let (mut sender, _) = sender(client);
    let mut buffer = filled_buffer(&[payload("a", 10), payload("b", 10)]);

    let status = sender.send_current_batch(&mut buffer).await;

    assert_eq!(status, FlushStatus::Retry);
    assert_eq!(buffer.len(), 2);
    assert!(sender.watchdog().is_running());
    assert!(!sender.backoff().is_active());
}

#[tokio::test]
async fn test_throttled_call_starts_backoff() {
    let client = ScriptedClient::new();
    client.push_reply(Err(SendError::ThroughputExceeded {
        message: "slow down".to_string(),
    }));
    let (mut sender, _) = sender(client);
    let mut buffer = filled_buffer(&[payload("a", 10)]);

    assert_eq!(sender.send_current_batch(&mut buffer).await, FlushStatus::Retry);
    assert!(sender.backoff().is_active());
    assert!(sender.watchdog().is_running());
    assert_eq!(sender.metrics().snapshot().throughput_exceeded, 1);
}

#[tokio::test]
async fn test_rejected_batch_is_discarded() {
    let client = ScriptedClient::new();
    client.push_reply(Err(SendError::from_error_code(
        "ResourceNotFoundException",
        "stream not found",
    )));
    let (mut sender, _) = sender(client);
    let mut buffer = filled_buffer(&[payload("a", 10), payload("b", 10)]);

    assert_eq!(sender.send_current_batch(&mut buffer).await, FlushStatus::Error);
    assert!(buffer.is_empty());
    assert!(sender.watchdog().is_running());
    assert_eq!(sender.metrics().snapshot().records_discarded, 2);
}

#[tokio::test]
async fn test_mismatched_manifest_is_retried_verbatim() {
    let client = ScriptedClient::new();
    client.push_manifest(2, &[1], "InternalFailure");
    let (mut sender, _) = sender(client);
    let mut buffer = filled_buffer(&[payload("a", 10), payload("b", 10), payload("c", 10)]);

    assert_eq!(sender.send_current_batch(&mut buffer).await, FlushStatus::Retry);
    assert_eq!(buffer.len(), 3);
    assert!(buffer.is_consistent());
    assert!(!sender.backoff().is_active());
}

#[tokio::test]
async fn test_mismatched_manifest_with_throttled_entry_starts_backoff() {
    let client = ScriptedClient::new();
    client.push_manifest(2, &[0], THROUGHPUT_EXCEEDED_CODE);
    let (mut sender, _) = sender(client);
    let mut buffer = filled_buffer(&[payload("a", 10), payload("b", 10), payload("c", 10)]);

    assert_eq!(sender.send_current_batch(&mut buffer).await, FlushStatus::Retry);
    assert_eq!(buffer.len(), 3);
    assert!(sender.backoff().is_active());
    assert!(sender.watchdog().is_running());
    assert_eq!(sender.metrics().snapshot().throughput_exceeded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_then_resets_after_success() {
    let client = ScriptedClient::new();
    for _ in 0..3 {
        client.push_manifest(1, &[0], THROUGHPUT_EXCEEDED_CODE);
    }
    let (mut sender, _) = sender(client.clone());
    let mut buffer = filled_buffer(&[payload("a", 10)]);

    // first failure activates backoff without waiting
    let start = tokio::time::Instant::now();
    assert_eq!(sender.send_current_batch(&mut buffer).await, FlushStatus::Retry);
    assert_eq!(start.elapsed(), Duration::ZERO);

    let mut previous = Duration::ZERO;
    for _ in 0..2 {
        let before = tokio::time::Instant::now();
        sender.send_current_batch(&mut buffer).await;
        let waited = before.elapsed();
        assert!(waited >= previous);
        assert!(waited >= Duration::from_millis(100));
        previous = waited;
    }

    // script exhausted: next call succeeds and resets the sequence
    assert_eq!(sender.send_current_batch(&mut buffer).await, FlushStatus::Ok);
    assert!(!sender.backoff().is_active());
    assert_eq!(sender.backoff().current_interval(), Duration::from_millis(100));
    assert!(!sender.watchdog().is_running());
    assert_eq!(client.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_fires_before_next_call_after_threshold() {
    let client = ScriptedClient::new();
    client.push_reply(Err(SendError::Transport("down".to_string())));
    let (mut sender, fired) = sender(client.clone());
    let mut buffer = filled_buffer(&[payload("a", 10)]);

    sender.send_current_batch(&mut buffer).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::advance(Duration::from_secs(601)).await;
    sender.send_current_batch(&mut buffer).await;

    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_failures_do_not_push_deadline_out() {
    let client = ScriptedClient::new();
    client.push_reply(Err(SendError::Transport("down".to_string())));
    client.push_reply(Err(SendError::Transport("down".to_string())));
    let (mut sender, _) = sender(client);
    let mut buffer = filled_buffer(&[payload("a", 10)]);

    sender.send_current_batch(&mut buffer).await;
    let deadline = sender.watchdog().deadline();
    tokio::time::advance(Duration::from_secs(30)).await;
    sender.send_current_batch(&mut buffer).await;

    assert_eq!(sender.watchdog().deadline(), deadline);
}
