//! End-to-end tests for the messages service.

mod common;

use common::*;
use integrations_mail::types::{ListMessagesQuery, MessageStatus, SendMessageRequest};
use integrations_mail::{ErrorKind, MailError};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn welcome() -> SendMessageRequest {
    SendMessageRequest::new("noreply@example.com", "Welcome")
        .to("user@example.com")
        .text("Hello!")
}

#[tokio::test]
async fn test_send_message_success() {
    let server = MockServer::start().await;

    mock_with_auth("POST", &messages_path())
        .and(header_exists("idempotency-key"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({
            "from": { "email": "noreply@example.com" },
            "to": [{ "email": "user@example.com" }],
            "subject": "Welcome",
            "text": "Hello!"
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "msg_1",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let sent = client
        .messages()
        .send(&welcome(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sent.id, "msg_1");
    assert_eq!(sent.status, MessageStatus::Queued);
}

#[tokio::test]
async fn test_send_retries_server_errors_with_same_key() {
    let server = MockServer::start().await;

    mock_with_auth("POST", &messages_path())
        .and(header("idempotency-key", "order-42"))
        .respond_with(error_response(503, "unavailable", "try again"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    mock_with_auth("POST", &messages_path())
        .and(header("idempotency-key", "order-42"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "msg_2",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let sent = client
        .messages()
        .send(&welcome().idempotency_key("order-42"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sent.id, "msg_2");
}

#[tokio::test]
async fn test_rate_limited_until_retries_exhausted() {
    let server = MockServer::start().await;

    mock_with_auth("POST", &messages_path())
        .respond_with(error_response(429, "rate_limited", "slow down").insert_header("retry-after", "1"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .messages()
        .send(&welcome(), &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        MailError::RetriesExhausted { attempts, .. } => assert_eq!(*attempts, 3),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind(), Some(ErrorKind::RateLimit));
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(1)));
}

#[tokio::test]
async fn test_validation_error_is_not_retried() {
    let server = MockServer::start().await;

    mock_with_auth("POST", &messages_path())
        .respond_with(
            error_response(422, "invalid_recipient", "bad address").insert_header("x-request-id", "req_9"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .messages()
        .send(&welcome(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::Api { status: 422, .. }));
    assert_eq!(err.request_id(), Some("req_9"));
    assert!(err.to_string().contains("bad address"));
}

#[tokio::test]
async fn test_invalid_message_never_reaches_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let no_recipient = SendMessageRequest::new("noreply@example.com", "Welcome").text("Hello!");
    let err = client
        .messages()
        .send(&no_recipient, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_send_batch_keys_derive_from_batch_key() {
    let server = MockServer::start().await;
    let accepted = ResponseTemplate::new(202).set_body_json(json!({ "id": "msg", "status": "queued" }));

    mock_with_auth("POST", &messages_path())
        .and(header("idempotency-key", "batch-1"))
        .respond_with(accepted.clone())
        .expect(1)
        .mount(&server)
        .await;

    mock_with_auth("POST", &messages_path())
        .and(header_exists("idempotency-key"))
        .respond_with(accepted)
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let batch = vec![welcome(), welcome(), welcome()];
    let sent = client
        .messages()
        .send_batch(&batch, "batch-1", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sent.len(), 3);
}

#[tokio::test]
async fn test_get_and_list_messages() {
    let server = MockServer::start().await;
    let message = json!({
        "id": "msg_1",
        "from": { "email": "noreply@example.com" },
        "to": [{ "email": "user@example.com", "name": "User" }],
        "subject": "Welcome",
        "status": "delivered",
        "created_at": "2024-03-01T10:00:00Z",
        "delivered_at": "2024-03-01T10:00:02Z"
    });

    mock_with_auth("GET", &format!("{}/msg_1", messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(message.clone()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .and(query_param("limit", "10"))
        .and(query_param("status", "delivered"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [message],
            "next_cursor": "c2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();

    let fetched = client.messages().get("msg_1", &cancel).await.unwrap();
    assert_eq!(fetched.status, MessageStatus::Delivered);
    assert_eq!(fetched.to[0].name.as_deref(), Some("User"));

    let query = ListMessagesQuery::default()
        .limit(10)
        .status(MessageStatus::Delivered);
    let page = client.messages().list(&query, &cancel).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.next_cursor.as_deref(), Some("c2"));
}

#[tokio::test]
async fn test_not_found_is_classified() {
    let server = MockServer::start().await;

    mock_with_auth("GET", &format!("{}/missing", messages_path()))
        .respond_with(error_response(404, "not_found", "no such message"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .messages()
        .get("missing", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    assert!(!err.is_retryable());
}
