//! Integration tests for the webhook alert channel
//!
//! Uses wiremock to stand in for the incoming-webhook endpoint.

use std::time::Duration;

use pvmirror_core::ports::IAlertChannel;
use pvmirror_webhook::{AlertError, WebhookAlertChannel};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn channel_for(server: &MockServer, timeout: Duration) -> WebhookAlertChannel {
    WebhookAlertChannel::new(&format!("{}/hooks/backup", server.uri()), timeout)
        .expect("valid mock URL")
}

#[tokio::test]
async fn test_alert_posts_text_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/backup"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "text": "sync to-destination exhausted 3 attempts"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let channel = channel_for(&server, Duration::from_secs(5));
    channel
        .send("sync to-destination exhausted 3 attempts")
        .await
        .expect("alert should be accepted");
}

#[tokio::test]
async fn test_multiline_alert_is_sent_verbatim() {
    let server = MockServer::start().await;
    let text = "Received SIGTERM\nlast lines:\n2026-05-01 12:00:00 [INFO]: a";

    Mock::given(method("POST"))
        .and(path("/hooks/backup"))
        .and(body_json(serde_json::json!({ "text": text })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let channel = channel_for(&server, Duration::from_secs(5));
    channel.post(text).await.expect("204 is a success");
}

#[tokio::test]
async fn test_server_error_is_reported_with_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/backup"))
        .respond_with(ResponseTemplate::new(500).set_body_string("invalid_token"))
        .expect(1)
        .mount(&server)
        .await;

    let channel = channel_for(&server, Duration::from_secs(5));
    match channel.post("hello").await {
        Err(AlertError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "invalid_token");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let channel = channel_for(&server, Duration::from_millis(100));
    let err = channel.post("hello").await.unwrap_err();
    assert!(matches!(err, AlertError::Transport(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_an_error() {
    // Bind and drop a server so the port is very likely closed.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let channel = WebhookAlertChannel::new(&format!("{uri}/hooks"), Duration::from_secs(2))
        .expect("valid URL");
    assert!(channel.send("hello").await.is_err());
}
