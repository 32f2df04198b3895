//! Errors carry the last outbound call observed by the network capture.

use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tower::{service_fn, Layer, ServiceExt};
use uilog::prelude::*;
use uilog::ErrorDetail;
use uilog_testing::{FixedHost, MockCollector, RecordingTransport};

const NOW: i64 = 1_700_000_000_000;

fn context(host: FixedHost, transport: &RecordingTransport) -> LoggerContext {
    LoggerContext::builder()
        .host(host)
        .transport(transport.clone())
        .build()
        .unwrap()
}

fn detail(delivery: &uilog_testing::Delivery) -> ErrorDetail {
    let logs = delivery.logs();
    serde_json::from_str(logs.last().unwrap()).unwrap()
}

#[tokio::test]
async fn test_error_carries_last_client_call() {
    let api = MockCollector::start().await;
    api.respond_with(500);

    let host = FixedHost::new(NOW);
    let transport = RecordingTransport::new();
    let context = context(host.clone(), &transport);
    let logger = context
        .init(
            SessionConfig::new()
                .auto_capture_api(true)
                .send_error_log_to_api(true),
        )
        .unwrap();

    let client = InstrumentedClient::new(reqwest::Client::new(), logger.network_interceptor().clone());
    let url = format!("{}/orders", api.base_url());
    let response = client
        .send(client.post(&url).json(&json!({"sku": "A-1", "qty": 2})))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);

    host.advance(250);
    logger.error("order submission failed").unwrap();

    let deliveries = transport.wait_for(1, Duration::from_secs(5)).await;
    let detail = detail(&deliveries[0]);
    assert_eq!(detail.error, "order submission failed");
    assert_eq!(detail.timestamp, NOW + 250);

    let call = detail.last_api_call.unwrap();
    assert_eq!(call.url, url);
    assert_eq!(call.method, "POST");
    assert_eq!(call.payload, Some(json!({"sku": "A-1", "qty": 2})));
    assert_eq!(call.timestamp, NOW);
    assert_eq!(call.status, Some(500));
    context.reset().await;
}

#[tokio::test]
async fn test_error_carries_last_layer_call() {
    let transport = RecordingTransport::new();
    let context = context(FixedHost::new(NOW), &transport);
    let logger = context
        .init(
            SessionConfig::new()
                .auto_capture_api(true)
                .send_error_log_to_api(true),
        )
        .unwrap();

    let layer = NetworkCaptureLayer::new(logger.network_interceptor().clone());
    let service = layer.layer(service_fn(|_req: http::Request<String>| async {
        Ok::<_, Infallible>(
            http::Response::builder()
                .status(http::StatusCode::NOT_FOUND)
                .body(String::new())
                .unwrap(),
        )
    }));

    let request = http::Request::get("https://api.example.com/profile/42")
        .body(String::new())
        .unwrap();
    service.oneshot(request).await.unwrap();

    logger.error("profile missing").unwrap();

    let deliveries = transport.wait_for(1, Duration::from_secs(5)).await;
    let call = detail(&deliveries[0]).last_api_call.unwrap();
    assert_eq!(call.url, "https://api.example.com/profile/42");
    assert_eq!(call.method, "GET");
    assert_eq!(call.payload, None);
    assert_eq!(call.status, Some(404));
    context.reset().await;
}

#[tokio::test]
async fn test_tracked_request_records_manual_calls() {
    let transport = RecordingTransport::new();
    let context = context(FixedHost::new(NOW), &transport);
    let logger = context
        .init(SessionConfig::new().auto_capture_api(true))
        .unwrap();

    let mut request = logger
        .network_interceptor()
        .open("PUT", "https://api.example.com/settings");
    request.send(Some(json!({"theme": "dark"})));
    request.complete(204);

    logger.error("settings not applied").unwrap();
    let pending = logger.pending().await.unwrap();
    let detail: ErrorDetail = serde_json::from_str(&pending[0].message).unwrap();
    let call = detail.last_api_call.unwrap();
    assert_eq!(call.method, "PUT");
    assert_eq!(call.payload, Some(json!({"theme": "dark"})));
    assert_eq!(call.status, Some(204));
    context.reset().await;
}

#[tokio::test]
async fn test_api_capture_disabled_records_nothing() {
    let api = MockCollector::start().await;
    let transport = RecordingTransport::new();
    let context = context(FixedHost::new(NOW), &transport);
    let logger = context.init(SessionConfig::new()).unwrap();
    assert!(!logger.network_interceptor().is_installed());

    let client = InstrumentedClient::new(reqwest::Client::new(), logger.network_interceptor().clone());
    client.send(client.get(api.base_url())).await.unwrap();

    logger.error("no correlation").unwrap();
    let pending = logger.pending().await.unwrap();
    let detail: ErrorDetail = serde_json::from_str(&pending[0].message).unwrap();
    assert_eq!(detail.last_api_call, None);
    context.reset().await;
}

#[tokio::test]
async fn test_reset_clears_last_call() {
    let transport = RecordingTransport::new();
    let context = context(FixedHost::new(NOW), &transport);
    let logger = context
        .init(SessionConfig::new().auto_capture_api(true))
        .unwrap();

    let mut request = logger
        .network_interceptor()
        .open("GET", "https://api.example.com/a");
    request.send(None);
    request.complete(200);
    assert!(context.network().last_call().is_some());

    context.reset().await;
    assert!(context.network().last_call().is_none());
    assert!(!context.network().is_installed());
}
