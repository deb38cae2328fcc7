//! Integration tests for the HTTP fetch adapter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use grabber_core::fetch::{FetchSettings, HttpFetcher, RateLimiter};
use grabber_core::user_agent::BROWSER_USER_AGENT;
use grabber_core::{FetchError, FetchRequest, Fetcher};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

#[tokio::test]
async fn test_fetch_sends_browser_user_agent() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", BROWSER_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
    let response = fetcher
        .fetch(&FetchRequest::get(format!("{}/page", mock_server.uri())))
        .await
        .unwrap();

    assert!(response.is_ok());
    assert_eq!(response.text(), "hello");
}

#[tokio::test]
async fn test_fetch_follows_redirects_and_reports_final_url() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let target = format!("{}/landing", mock_server.uri());
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", target.as_str()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200).set_body_string("article"))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
    let start = format!("{}/start", mock_server.uri());

    let followed = fetcher.fetch(&FetchRequest::get(&start)).await.unwrap();
    assert_eq!(followed.status, 200);
    assert_eq!(followed.final_url, target);
    assert_eq!(followed.requested_url, start);

    let stopped = fetcher
        .fetch(&FetchRequest::get(&start).without_redirects())
        .await
        .unwrap();
    assert_eq!(stopped.status, 302);
    assert_eq!(stopped.final_url, start);
}

#[tokio::test]
async fn test_fetch_returns_error_statuses_as_values() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_raw("<h1>Not found</h1>", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
    let response = fetcher
        .fetch(&FetchRequest::get(format!("{}/gone", mock_server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.is_ok());
    assert_eq!(response.content_type.as_deref(), Some("text/html"));
}

#[tokio::test]
async fn test_fetch_header_overrides_are_sent() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/spoofed"))
        .and(header("referer", "https://scholar.example/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
    let request = FetchRequest::get(format!("{}/spoofed", mock_server.uri())).with_headers(vec![(
        "Referer".to_string(),
        "https://scholar.example/".to_string(),
    )]);
    let response = fetcher.fetch(&request).await.unwrap();
    assert!(response.is_ok());
}

#[tokio::test]
async fn test_fetch_timeout_is_typed() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
    let request = FetchRequest::get(format!("{}/slow", mock_server.uri()))
        .with_timeout(Duration::from_millis(200));
    let err = fetcher.fetch(&request).await.unwrap_err();

    assert!(err.is_timeout(), "Expected timeout, got: {err}");
    assert!(matches!(err, FetchError::Timeout { .. }));
}

#[tokio::test]
async fn test_fetch_waits_on_rate_limiter_per_host() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(150)));
    let fetcher = HttpFetcher::with_rate_limiter(FetchSettings::default(), limiter).unwrap();
    let url = format!("{}/a", mock_server.uri());

    let started = Instant::now();
    fetcher.fetch(&FetchRequest::get(&url)).await.unwrap();
    fetcher.fetch(&FetchRequest::get(&url)).await.unwrap();

    assert!(
        started.elapsed() >= Duration::from_millis(150),
        "second request should wait for the per-host delay"
    );
}
