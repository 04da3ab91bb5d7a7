
use std::time::{Duration, Instant};

use anyhow::Result;
use oauth2::AccessToken;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xero_access::{
    BackoffConfig, ClientConfig, Error, Headers, QueryParameters, RateLimitConfig, TenantId,
};

use test_utils::{TENANT, TOKEN, create_test_client};

fn accept_json() -> Headers {
    Headers::from([("Accept".to_string(), "application/json".to_string())])
}

#[tokio::test]
async fn find_sends_credentials_tenant_and_query() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Invoices"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header("xero-tenant-id", TENANT))
        .and(header("accept", "application/json"))
        .and(query_param("where", "Status==\"DRAFT\""))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Invoices":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, ClientConfig::new());
    let query = QueryParameters::from([
        ("where".to_string(), "Status==\"DRAFT\"".to_string()),
        ("page".to_string(), "2".to_string()),
    ]);
    let bytes = client.find("Invoices", &accept_json(), &query).await?;

    assert_eq!(bytes, br#"{"Invoices":[]}"#);
    assert_eq!(client.rate_limiter().recorded(&TenantId::from(TENANT)), 1);
    Ok(())
}

#[tokio::test]
async fn writes_send_body_with_their_method() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api.xro/2.0/Contacts"))
        .and(body_bytes(br#"{"Contacts":[{"Name":"A"}]}"#.to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api.xro/2.0/Contacts/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("updated"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api.xro/2.0/Contacts/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("removed"))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, ClientConfig::new());
    let body = br#"{"Contacts":[{"Name":"A"}]}"#;

    assert_eq!(client.create("Contacts", &accept_json(), body).await?, b"created");
    assert_eq!(client.update("Contacts/abc", &accept_json(), body).await?, b"updated");
    assert_eq!(client.remove("Contacts/abc", &accept_json()).await?, b"removed");
    assert_eq!(client.rate_limiter().recorded(&TenantId::from(TENANT)), 3);
    Ok(())
}

#[tokio::test]
async fn non_ok_status_carries_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Invoices/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string("The resource you're looking for cannot be found"),
        )
        .mount(&server)
        .await;

    let client = create_test_client(&server, ClientConfig::new());
    let error = client
        .find("Invoices/missing", &accept_json(), &QueryParameters::new())
        .await
        .unwrap_err();

    match error {
        Error::Api { status, body, .. } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert!(body.contains("cannot be found"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_ok_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = create_test_client(&server, ClientConfig::new());
    let result = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await;

    assert!(matches!(result, Err(Error::EmptyResponse { .. })));
}

#[tokio::test]
async fn transport_failure_is_recorded_and_reported() {
    test_utils::do_setup();
    let client = xero_access::Client::new(
        oauth2::AccessToken::new(TOKEN.to_string()),
        TENANT,
        ClientConfig::new().with_base_url("http://127.0.0.1:1/api.xro/2.0/"),
    )
    .unwrap();

    let result = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await;

    assert!(matches!(result, Err(Error::Transport(_))));
    assert_eq!(client.rate_limiter().recorded(&TenantId::from(TENANT)), 1);
}

#[tokio::test]
async fn throttled_request_is_retried_after_server_delay() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Contacts"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "1")
                .insert_header("X-Rate-Limit-Problem", "minute"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Contacts":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, ClientConfig::new());
    let started = Instant::now();
    let bytes = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await?;

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(bytes, br#"{"Contacts":[]}"#);
    // Both the throttled attempt and the retry count against the window.
    assert_eq!(client.rate_limiter().recorded(&TenantId::from(TENANT)), 2);
    Ok(())
}

#[tokio::test]
async fn throttled_without_retry_after_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, ClientConfig::new());
    let error = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), Some(StatusCode::TOO_MANY_REQUESTS));
    assert!(matches!(error, Error::Api { .. }));
    assert_eq!(error.response_body(), Some("slow down"));
}

#[tokio::test]
async fn retries_stop_at_the_configured_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_string("still throttled"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = ClientConfig::new().with_backoff(BackoffConfig::default().with_max_retries(1));
    let client = create_test_client(&server, config);
    let error = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await
        .unwrap_err();

    match error {
        Error::RateLimitExceeded {
            attempts,
            retry_after,
            response_body,
            ..
        } => {
            assert_eq!(attempts, 1);
            assert_eq!(retry_after, Some(Duration::ZERO));
            assert_eq!(response_body.as_deref(), Some("still throttled"));
        }
        other => panic!("expected RateLimitExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn full_window_delays_the_next_request() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(3)
        .mount(&server)
        .await;

    let config =
        ClientConfig::new().with_rate_limit(RateLimitConfig::new(2, Duration::from_millis(500)));
    let client = create_test_client(&server, config);

    let started = Instant::now();
    for _ in 0..3 {
        client
            .find("Contacts", &accept_json(), &QueryParameters::new())
            .await?;
    }

    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(client.rate_limiter().recorded(&TenantId::from(TENANT)), 2);
    Ok(())
}

#[tokio::test]
async fn tenants_have_independent_windows() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("xero-tenant-id", "tenant-b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("b"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a"))
        .expect(1)
        .mount(&server)
        .await;

    let config =
        ClientConfig::new().with_rate_limit(RateLimitConfig::new(1, Duration::from_secs(60)));
    let client = create_test_client(&server, config);
    let other = client.with_tenant("tenant-b");

    let started = Instant::now();
    let a = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await?;
    let b = other
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await?;

    assert_eq!((a.as_slice(), b.as_slice()), (&b"a"[..], &b"b"[..]));
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(client.rate_limiter().recorded(&TenantId::from("tenant-b")), 1);
    Ok(())
}

#[tokio::test]
async fn token_replaced_during_the_window_delay_is_sent() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stale"))
        .mount(&server)
        .await;

    let config =
        ClientConfig::new().with_rate_limit(RateLimitConfig::new(1, Duration::from_millis(800)));
    let client = create_test_client(&server, config);
    let first = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await?;
    assert_eq!(first, b"stale");

    let refresher = client.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        refresher.set_access_token(AccessToken::new("fresh".to_string()));
    });

    let started = Instant::now();
    let second = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await?;

    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(second, b"fresh");
    Ok(())
}

#[tokio::test]
async fn cancellation_interrupts_the_window_delay() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let config =
        ClientConfig::new().with_rate_limit(RateLimitConfig::new(1, Duration::from_secs(60)));
    let client = create_test_client(&server, config);
    client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await?;

    let cancel = CancellationToken::new();
    let cancellable = client.with_cancellation(cancel.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let result = cancellable
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(client.rate_limiter().recorded(&TenantId::from(TENANT)), 1);
    Ok(())
}

#[tokio::test]
async fn cancelled_handle_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let client = create_test_client(&server, ClientConfig::new()).with_cancellation(cancel);

    let result = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(client.rate_limiter().recorded(&TenantId::from(TENANT)), 0);
}

#[tokio::test]
async fn cancellation_interrupts_backoff_sleep() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3600"))
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let client = create_test_client(&server, ClientConfig::new()).with_cancellation(cancel.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let result = client
        .find("Contacts", &accept_json(), &QueryParameters::new())
        .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(client.rate_limiter().recorded(&TenantId::from(TENANT)), 1);
}
