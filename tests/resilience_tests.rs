//! End-to-end tests for rate limiting, cancellation and statistics.

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use integrations_mail::config::{CategoryLimit, CustomerLimits, RateLimitConfig, RetryPolicy};
use integrations_mail::types::{SendMessageRequest, StatisticsQuery};
use integrations_mail::{EndpointCategory, MailClient, MailError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn message() -> SendMessageRequest {
    SendMessageRequest::new("noreply@example.com", "Report")
        .to("ops@example.com")
        .text("Numbers attached.")
}

async fn accept_all_sends(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "id": "m", "status": "queued" })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_statistics_request() {
    let server = MockServer::start().await;

    mock_with_auth("GET", &format!("/v2/accounts/{}/statistics/bounces", ACCOUNT))
        .and(query_param("from", "2024-03-01T00:00:00+00:00"))
        .and(query_param("to", "2024-03-08T00:00:00+00:00"))
        .and(query_param("tag", "welcome"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "data": [
                { "date": "2024-03-01", "count": 1 },
                { "date": "2024-03-04", "count": 2 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let query = StatisticsQuery::between(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
    )
    .tag("welcome");

    let stats = client
        .statistics()
        .bounces(&query, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.data.len(), 2);
    assert_eq!(stats.data[1].count, 2);
}

#[tokio::test]
async fn test_send_bucket_spaces_requests() {
    let server = MockServer::start().await;
    accept_all_sends(&server).await;

    let limits = RateLimitConfig::default()
        .with_limit(EndpointCategory::SendMessage, CategoryLimit::new(10.0, 1));
    let client = MailClient::new(config_for(&server, fast_retry(0), limits)).unwrap();
    let cancel = CancellationToken::new();

    let start = Instant::now();
    for _ in 0..3 {
        client.messages().send(&message(), &cancel).await.unwrap();
    }

    assert!(start.elapsed() >= Duration::from_millis(180), "{:?}", start.elapsed());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_categories_do_not_share_tokens() {
    let server = MockServer::start().await;
    accept_all_sends(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/accounts/{}/statistics/opens", ACCOUNT)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 0 })))
        .mount(&server)
        .await;

    let limits = RateLimitConfig::default()
        .with_limit(EndpointCategory::Statistics, CategoryLimit::new(0.1, 1));
    let client = MailClient::new(config_for(&server, fast_retry(0), limits)).unwrap();
    let cancel = CancellationToken::new();

    client
        .statistics()
        .opens(&StatisticsQuery::default(), &cancel)
        .await
        .unwrap();

    let start = Instant::now();
    client.messages().send(&message(), &cancel).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));

    let status = client.rate_limiter().status(EndpointCategory::Statistics);
    assert!(status.tokens_available < 1.0);
}

#[tokio::test]
async fn test_cancel_while_waiting_for_token() {
    let server = MockServer::start().await;
    accept_all_sends(&server).await;

    let limits = RateLimitConfig::default()
        .with_limit(EndpointCategory::SendMessage, CategoryLimit::new(0.1, 1));
    let client = MailClient::new(config_for(&server, fast_retry(0), limits)).unwrap();

    let cancel = CancellationToken::new();
    client.messages().send(&message(), &cancel).await.unwrap();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = client.messages().send(&message(), &cancel).await.unwrap_err();
    assert!(matches!(err, MailError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_runtime_limit_changes() {
    let server = MockServer::start().await;
    accept_all_sends(&server).await;

    let limits = RateLimitConfig::default()
        .with_limit(EndpointCategory::SendMessage, CategoryLimit::new(0.1, 1));
    let client = MailClient::new(config_for(&server, RetryPolicy::disabled(), limits)).unwrap();
    let cancel = CancellationToken::new();

    client.messages().send(&message(), &cancel).await.unwrap();

    client.rate_limiter().set_global_enabled(false);
    let start = Instant::now();
    client.messages().send(&message(), &cancel).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
    client.rate_limiter().set_global_enabled(true);

    client
        .rate_limiter()
        .apply_customer_limits(&CustomerLimits::default().send_message(1000.0, 5))
        .unwrap();
    let status = client.rate_limiter().status(EndpointCategory::SendMessage);
    assert_eq!(status.burst_size, 5);
    assert_eq!(status.requests_per_second, 1000.0);

    let invalid = CustomerLimits::default().general(50.0, 10).send_message(0.0, 5);
    assert!(client.rate_limiter().apply_customer_limits(&invalid).is_err());
    assert_eq!(
        client.rate_limiter().status(EndpointCategory::General).requests_per_second,
        CategoryLimit::default_for(EndpointCategory::General).requests_per_second
    );
}
