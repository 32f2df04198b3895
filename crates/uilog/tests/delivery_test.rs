//! End-to-end delivery against a live mock collector.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uilog::prelude::*;
use uilog::{ErrorDetail, EventKind};
use uilog_testing::{FixedHost, MockCollector, RecordingTransport};

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(300);

fn http_context(host: FixedHost) -> LoggerContext {
    LoggerContext::builder().host(host).build().unwrap()
}

#[tokio::test]
async fn test_eviction_then_flush_posts_once() {
    let collector = MockCollector::start().await;
    let context = http_context(FixedHost::default());
    let logger = context
        .init(
            SessionConfig::new()
                .api_url(collector.ingest_url())
                .max_log_size(2)
                .send_debug_log_to_api(true),
        )
        .unwrap();

    logger.log("a").unwrap();
    logger.log("b").unwrap();
    logger.log("c").unwrap();
    logger.flush().unwrap();

    let received = collector.wait_for(1, WAIT).await;
    assert_eq!(received.len(), 1);

    let batch = &received[0];
    assert_eq!(batch.method, "POST");
    assert_eq!(batch.path, uilog_testing::INGEST_PATH);
    assert_eq!(batch.content_type(), Some("application/json"));
    assert_eq!(batch.logs(), vec!["b", "c"]);

    let payload = batch.payload.as_ref().unwrap();
    assert_eq!(payload.header["action"], "auditClientLogs");
    assert_eq!(payload.header["corrId"], "auditClientLogs-1700000000000");
    assert_eq!(payload.timestamp, 1_700_000_000_000);

    assert!(logger.pending().await.unwrap().is_empty());
    context.reset().await;
}

#[tokio::test]
async fn test_custom_header_is_sent_verbatim() {
    let collector = MockCollector::start().await;
    let context = http_context(FixedHost::default());
    let logger = context
        .init(
            SessionConfig::new()
                .api_url(collector.ingest_url())
                .header("action", "checkoutAudit")
                .header("tenant", "acme")
                .send_debug_log_to_api(true),
        )
        .unwrap();

    logger.log("cart opened").unwrap();
    logger.flush().unwrap();

    let received = collector.wait_for(1, WAIT).await;
    let payload = received[0].payload.as_ref().unwrap();
    assert_eq!(payload.header.len(), 2);
    assert_eq!(payload.header["action"], "checkoutAudit");
    assert_eq!(payload.header["tenant"], "acme");
    context.reset().await;
}

#[tokio::test]
async fn test_flush_disabled_keeps_buffer() {
    let collector = MockCollector::start().await;
    let context = http_context(FixedHost::default());
    let logger = context
        .init(SessionConfig::new().api_url(collector.ingest_url()))
        .unwrap();

    logger.log("a").unwrap();
    logger.log("b").unwrap();
    logger.flush().unwrap();

    collector.assert_quiet(QUIET).await;
    let pending = logger.pending().await.unwrap();
    let messages: Vec<_> = pending.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["a", "b"]);
    context.reset().await;
}

#[tokio::test]
async fn test_error_is_delivered_immediately() {
    let collector = MockCollector::start().await;
    let context = http_context(FixedHost::default());
    let logger = context
        .init(
            SessionConfig::new()
                .api_url(collector.ingest_url())
                .send_error_log_to_api(true),
        )
        .unwrap();

    logger.error("payment declined").unwrap();

    let received = collector.wait_for(1, WAIT).await;
    assert_eq!(received.len(), 1);

    let logs = received[0].logs();
    assert_eq!(logs.len(), 1);
    let detail: ErrorDetail = serde_json::from_str(&logs[0]).unwrap();
    assert_eq!(detail.error, "payment declined");
    assert_eq!(detail.last_api_call, None);
    assert_eq!(detail.timestamp, 1_700_000_000_000);

    tokio::time::sleep(QUIET).await;
    assert_eq!(collector.request_count(), 1);
    context.reset().await;
}

#[tokio::test]
async fn test_error_ships_preceding_logs() {
    let transport = RecordingTransport::new();
    let context = LoggerContext::builder()
        .host(FixedHost::default())
        .transport(transport.clone())
        .build()
        .unwrap();
    let logger = context
        .init(
            SessionConfig::new()
                .api_url("https://logs.example.com/ingest")
                .send_error_log_to_api(true),
        )
        .unwrap();

    logger.log("opened settings").unwrap();
    logger.log("clicked save").unwrap();
    logger.error("save failed").unwrap();

    let deliveries = transport.wait_for(1, WAIT).await;
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].url, "https://logs.example.com/ingest");

    let logs = deliveries[0].logs();
    assert_eq!(&logs[..2], &["opened settings", "clicked save"]);
    let detail: Value = serde_json::from_str(&logs[2]).unwrap();
    assert_eq!(detail["error"], "save failed");
    context.reset().await;
}

#[tokio::test]
async fn test_error_without_delivery_stays_buffered() {
    let transport = RecordingTransport::new();
    let context = LoggerContext::builder()
        .host(FixedHost::default())
        .transport(transport.clone())
        .build()
        .unwrap();
    let logger = context.init(SessionConfig::new().max_log_size(1)).unwrap();

    logger.error("first").unwrap();
    logger.error("second").unwrap();
    logger.log("after").unwrap();

    // Errors grow the buffer past its size; the next log trims one entry.
    let pending = logger.pending().await.unwrap();
    let kinds: Vec<_> = pending.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Error, EventKind::Log]);
    let detail: ErrorDetail = serde_json::from_str(&pending[0].message).unwrap();
    assert_eq!(detail.error, "second");
    assert_eq!(transport.count(), 0);
    context.reset().await;
}

#[tokio::test]
async fn test_failed_delivery_is_not_retried() {
    let collector = MockCollector::start().await;
    collector.respond_with(503);
    let context = http_context(FixedHost::default());
    let logger = context
        .init(
            SessionConfig::new()
                .api_url(collector.ingest_url())
                .send_debug_log_to_api(true),
        )
        .unwrap();

    logger.log("lost").unwrap();
    logger.flush().unwrap();
    assert_eq!(collector.wait_for(1, WAIT).await.len(), 1);

    logger.flush().unwrap();
    tokio::time::sleep(QUIET).await;
    assert_eq!(collector.request_count(), 1);
    assert!(logger.pending().await.unwrap().is_empty());
    context.reset().await;
}

#[tokio::test]
async fn test_unreachable_collector_drops_batch() {
    let transport = RecordingTransport::new();
    transport.fail_with("connection refused");
    let context = LoggerContext::builder()
        .host(FixedHost::default())
        .transport(transport.clone())
        .build()
        .unwrap();
    let logger = context
        .init(SessionConfig::new().send_debug_log_to_api(true))
        .unwrap();

    logger.log("a").unwrap();
    logger.flush().unwrap();
    assert_eq!(transport.wait_for(1, WAIT).await.len(), 1);

    logger.log("b").unwrap();
    logger.flush().unwrap();
    let deliveries = transport.wait_for(2, WAIT).await;
    assert_eq!(deliveries[1].logs(), vec!["b"]);
    context.reset().await;
}

#[derive(Clone, Default)]
struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_dev_mode_never_delivers() {
    let output = CapturedOutput::default();
    let writer = output.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let collector = MockCollector::start().await;
    let context = http_context(FixedHost::localhost(1_700_000_000_000));
    let logger = context
        .init(
            SessionConfig::new()
                .api_url(collector.ingest_url())
                .send_debug_log_to_api(true)
                .send_error_log_to_api(true),
        )
        .unwrap();
    assert!(logger.is_dev());

    logger.log("rendering").unwrap();
    logger.error("render failed").unwrap();
    logger.flush().unwrap();

    collector.assert_quiet(QUIET).await;
    assert!(logger.pending().await.unwrap().is_empty());

    let text = output.text();
    assert!(text.contains("uilog::console"), "{}", text);
    assert!(text.contains("rendering"), "{}", text);
    assert!(text.contains("render failed"), "{}", text);
    context.reset().await;
}

#[tokio::test]
async fn test_timestamps_prefix_log_lines() {
    let transport = RecordingTransport::new();
    let context = LoggerContext::builder()
        .host(FixedHost::new(1_700_000_000_123))
        .transport(transport.clone())
        .build()
        .unwrap();
    let logger = context
        .init(
            SessionConfig::new()
                .enable_timestamps(true)
                .send_debug_log_to_api(true),
        )
        .unwrap();

    logger.log("ready").unwrap();
    logger.flush().unwrap();

    let deliveries = transport.wait_for(1, WAIT).await;
    assert_eq!(deliveries[0].logs(), vec!["2023-11-14T22:13:20.123Z ready"]);
    context.reset().await;
}
