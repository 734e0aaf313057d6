// ABOUTME: Integration tests for the request executor, paginator, and composite orchestrator
// ABOUTME: Exercises retry/backoff, pagination caps, fail-fast fan-out, and revocation against a mock API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use whoop_sync::auth::StaticTokenSource;
use whoop_sync::errors::Error;
use whoop_sync::models::Domain;
use whoop_sync::range::{self, QueryWindow, RangeSelector};
use whoop_sync::{FetchOptions, RetryConfig, WhoopClient};

/// Backoff base shrunk so a full retry ladder runs in tens of milliseconds
const TEST_BASE_DELAY: Duration = Duration::from_millis(20);

fn client_for(server: &MockServer) -> WhoopClient {
    WhoopClient::new(Arc::new(StaticTokenSource::new("test-token")))
        .expect("client builds")
        .with_base_url(server.uri())
        .with_retry(RetryConfig {
            max_retries: 3,
            base_delay: TEST_BASE_DELAY,
        })
}

fn profile_body() -> serde_json::Value {
    json!({
        "user_id": 10129,
        "email": "jane@example.com",
        "first_name": "Jane",
        "last_name": "Doe"
    })
}

fn sleep_record(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": 10129,
        "start": "2024-03-01T23:10:00.000Z",
        "end": "2024-03-02T07:02:00.000Z",
        "timezone_offset": "-05:00",
        "nap": false,
        "score_state": "SCORED",
        "score": {
            "respiratory_rate": 14.2,
            "sleep_performance_percentage": 88.0,
            "sleep_efficiency_percentage": 91.5,
            "stage_summary": {
                "total_in_bed_time_milli": 30_272_735,
                "total_awake_time_milli": 1_403_507,
                "total_light_sleep_time_milli": 14_905_851,
                "total_slow_wave_sleep_time_milli": 6_630_370,
                "total_rem_sleep_time_milli": 7_332_940,
                "sleep_cycle_count": 4,
                "disturbance_count": 12
            }
        }
    })
}

fn seven_day_window() -> QueryWindow {
    range::resolve(&RangeSelector::default(), chrono::Utc::now()).expect("window resolves")
}

#[tokio::test]
async fn transient_failures_are_retried_with_doubling_backoff() {
    let server = MockServer::start().await;

    // 503, then 502, then success; exhausted mocks stop matching
    Mock::given(method("GET"))
        .and(path("/user/profile/basic"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/profile/basic"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/profile/basic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let started = Instant::now();
    let profile = client.get_profile().await.expect("succeeds after retries");
    let elapsed = started.elapsed();

    assert_eq!(profile.user_id, 10129);
    // Two backoff sleeps: base delay, then double it
    assert!(
        elapsed >= TEST_BASE_DELAY * 3,
        "expected at least {:?} of backoff, observed {elapsed:?}",
        TEST_BASE_DELAY * 3
    );
}

#[tokio::test]
async fn auth_failures_are_never_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile/basic"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_profile().await.expect_err("401 is fatal");
    assert!(matches!(err, Error::AuthenticationFailed));
}

#[tokio::test]
async fn persistent_rate_limiting_surfaces_after_exhausted_retries() {
    let server = MockServer::start().await;

    // Initial attempt plus three retries
    Mock::given(method("GET"))
        .and(path("/user/profile/basic"))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_profile().await.expect_err("stays rate limited");
    assert!(matches!(err, Error::RateLimitExceeded));
}

#[tokio::test]
async fn exhausted_retries_report_the_last_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/measurement/body"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_body().await.expect_err("retries exhaust");
    assert!(matches!(err, Error::RequestFailed { status: 503 }));
}

#[tokio::test]
async fn non_retryable_statuses_fail_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile/basic"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_profile().await.expect_err("404 is final");
    assert!(matches!(err, Error::RequestFailed { status: 404 }));
}

#[tokio::test]
async fn bearer_token_and_client_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile/basic"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("User-Agent", "whoop-sync/1.0"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get_profile().await.expect("headers match");
}

#[tokio::test]
async fn paginator_threads_continuation_tokens_in_order() {
    let server = MockServer::start().await;

    // Mounted first so the token-bearing second request matches it
    Mock::given(method("GET"))
        .and(path("/activity/sleep"))
        .and(query_param("nextToken", "token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [sleep_record("sleep-2")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/activity/sleep"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [sleep_record("sleep-1")],
            "next_token": "token-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let records = client
        .get_sleep(&seven_day_window(), true)
        .await
        .expect("two pages");

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["sleep-1", "sleep-2"]);
}

#[tokio::test]
async fn fetch_all_disabled_stops_after_the_first_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activity/sleep"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [sleep_record("sleep-1")],
            "next_token": "token-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let records = client
        .get_sleep(&seven_day_window(), false)
        .await
        .expect("first page");
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn pagination_stops_at_the_hard_cap() {
    let server = MockServer::start().await;

    // Misbehaving backend: always advertises another page
    Mock::given(method("GET"))
        .and(path("/activity/sleep"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [sleep_record("sleep-n")],
            "next_token": "always-more"
        })))
        .expect(50)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let records = client
        .get_sleep(&seven_day_window(), true)
        .await
        .expect("partial result, not an error");

    assert_eq!(records.len(), 50);
}

#[tokio::test]
async fn window_parameters_reach_the_wire() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activity/sleep"))
        .and(query_param("start", "2024-03-01T04:00:00.000Z"))
        .and(query_param("end", "2024-03-02T04:00:00.000Z"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [sleep_record("sleep-1")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let selector = RangeSelector {
        date: Some("2024-03-01".parse().expect("valid date")),
        ..RangeSelector::default()
    };
    let window = range::resolve(&selector, chrono::Utc::now()).expect("window");

    let client = client_for(&server);
    let snapshot = client
        .fetch(&[Domain::Sleep], &window, &FetchOptions::default())
        .await
        .expect("fetch");

    assert_eq!(snapshot.sleep.map(|s| s.len()), Some(1));
}

#[tokio::test]
async fn zero_limit_is_rejected_before_any_request() {
    let server = MockServer::start().await;

    let client = client_for(&server);
    let err = client
        .fetch(
            &[Domain::Sleep],
            &seven_day_window(),
            &FetchOptions {
                limit: 0,
                fetch_all: true,
            },
        )
        .await
        .expect_err("zero limit never reaches the wire");

    assert!(matches!(err, Error::InvalidArgument(_)));
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn composite_fetch_is_fail_fast() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activity/sleep"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [sleep_record("sleep-1")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recovery"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server).with_retry(RetryConfig {
        max_retries: 1,
        base_delay: Duration::from_millis(5),
    });

    let err = client
        .fetch(
            &[Domain::Sleep, Domain::Recovery],
            &seven_day_window(),
            &FetchOptions::default(),
        )
        .await
        .expect_err("one failing domain fails the composite fetch");

    assert!(matches!(err, Error::RequestFailed { status: 500 }));
}

#[tokio::test]
async fn composite_fetch_populates_only_requested_domains() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile/basic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/measurement/body"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "height_meter": 1.78,
            "weight_kilogram": 72.5,
            "max_heart_rate": 192
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let snapshot = client
        .fetch(
            &[Domain::Profile, Domain::Body],
            &seven_day_window(),
            &FetchOptions::default(),
        )
        .await
        .expect("singleton domains fetch");

    assert!(snapshot.profile.is_some());
    assert!(snapshot.body.is_some());
    assert!(snapshot.sleep.is_none());
    assert!(snapshot.recovery.is_none());
    assert!(snapshot.workout.is_none());
    assert!(snapshot.cycle.is_none());
}

#[tokio::test]
async fn revocation_succeeds_on_204_with_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/user/access"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.revoke_access().await.expect("204 is success");
}

#[tokio::test]
async fn revocation_failure_maps_to_request_failed() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/user/access"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.revoke_access().await.expect_err("403 fails");
    assert!(matches!(err, Error::RequestFailed { status: 403 }));
}

#[tokio::test]
async fn single_record_lookups_hit_their_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cycle/93845"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 93845,
            "user_id": 10129,
            "start": "2024-03-01T04:00:00.000Z",
            "end": "2024-03-02T04:00:00.000Z",
            "score_state": "SCORED",
            "score": { "strain": 13.9, "kilojoule": 8200.0 }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cycle/93845/recovery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cycle_id": 93845,
            "sleep_id": "sleep-1",
            "score_state": "SCORED",
            "score": { "recovery_score": 67.0, "hrv_rmssd_milli": 55.2 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cycle = client.get_cycle_by_id(93845).await.expect("cycle");
    assert_eq!(cycle.id, 93845);

    let recovery = client.get_recovery_for_cycle(93845).await.expect("recovery");
    assert_eq!(recovery.cycle_id, 93845);
}

#[tokio::test]
async fn backoff_in_one_domain_does_not_serialize_siblings() {
    let server = MockServer::start().await;

    // Recovery needs two retries; sleep answers immediately
    Mock::given(method("GET"))
        .and(path("/recovery"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recovery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{ "cycle_id": 1, "score_state": "SCORED" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/activity/sleep"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [sleep_record("sleep-1")]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let started = Instant::now();
    let snapshot = client
        .fetch(
            &[Domain::Sleep, Domain::Recovery],
            &seven_day_window(),
            &FetchOptions::default(),
        )
        .await
        .expect("both domains recover");
    let elapsed = started.elapsed();

    assert!(snapshot.sleep.is_some());
    assert!(snapshot.recovery.is_some());
    // Composite time is bounded by the slowest domain, not the sum
    assert!(
        elapsed < TEST_BASE_DELAY * 20,
        "composite fetch took {elapsed:?}"
    );
}
