//! Integration tests for paginated activity retrieval: termination on
//! a short page, the hard scan cap, and the `after` filter.

use chrono::{Duration, TimeZone, Utc};
use weeknotes_core::{ACTIVITIES_PER_PAGE, ACTIVITIES_SCAN_MAX, ActivityClient, ApiError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a page of activity JSON with identifiable distances so order
/// can be asserted after concatenation.
fn page_json(start_index: usize, count: usize) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            let index = start_index + i;
            serde_json::json!({
                "type": "Run",
                "distance": index as f64,
                "elapsed_time": 600,
                "moving_time": 580,
                "max_speed": 4.0,
                "total_elevation_gain": 12.0,
                "start_date": (Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
                    - Duration::hours(index as i64))
                .to_rfc3339(),
            })
        })
        .collect();
    serde_json::Value::Array(items)
}

#[tokio::test]
async fn short_page_terminates_pagination() {
    let server = MockServer::start().await;

    // One full page, then a short one: exactly two requests.
    Mock::given(method("GET"))
        .and(path("/activities"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", ACTIVITIES_PER_PAGE.to_string()))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(0, ACTIVITIES_PER_PAGE)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/activities"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(ACTIVITIES_PER_PAGE, 20)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ActivityClient::with_base_url(server.uri());
    let activities = client.fetch_activities("test-token", None).await.unwrap();

    assert_eq!(activities.len(), ACTIVITIES_PER_PAGE + 20);

    // Received order is preserved across the page boundary.
    for (i, activity) in activities.iter().enumerate() {
        assert_eq!(activity.distance, i as f64);
    }
}

#[tokio::test]
async fn scan_cap_stops_pagination_even_with_full_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activities"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(0, ACTIVITIES_PER_PAGE)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/activities"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(ACTIVITIES_PER_PAGE, ACTIVITIES_PER_PAGE)))
        .expect(1)
        .mount(&server)
        .await;

    // Reaching the cap is a hard stop: page 3 must never be requested.
    Mock::given(method("GET"))
        .and(path("/activities"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(100, ACTIVITIES_PER_PAGE)))
        .expect(0)
        .mount(&server)
        .await;

    let client = ActivityClient::with_base_url(server.uri());
    let activities = client.fetch_activities("test-token", None).await.unwrap();

    assert_eq!(activities.len(), ACTIVITIES_SCAN_MAX);
}

#[tokio::test]
async fn since_filter_is_sent_and_pages_concatenate() {
    let server = MockServer::start().await;
    let since = Utc.with_ymd_and_hms(2024, 3, 3, 18, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/activities"))
        .and(query_param("page", "1"))
        .and(query_param("after", since.timestamp().to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(0, ACTIVITIES_PER_PAGE)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/activities"))
        .and(query_param("page", "2"))
        .and(query_param("after", since.timestamp().to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(ACTIVITIES_PER_PAGE, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ActivityClient::with_base_url(server.uri());
    let activities = client
        .fetch_activities("test-token", Some(since))
        .await
        .unwrap();

    assert_eq!(activities.len(), ACTIVITIES_PER_PAGE + 3);
    assert_eq!(activities.last().unwrap().distance, (ACTIVITIES_PER_PAGE + 2) as f64);
}

#[tokio::test]
async fn non_2xx_aborts_the_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = ActivityClient::with_base_url(server.uri());
    let err = client
        .fetch_activities("test-token", None)
        .await
        .unwrap_err();

    match err {
        ApiError::RemoteRejected { endpoint, status } => {
            assert_eq!(status, 503);
            assert!(endpoint.ends_with("/activities"));
        }
        other => panic!("expected RemoteRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_payload_is_a_decode_error() {
    let server = MockServer::start().await;

    // Records missing required fields must fail decoding loudly.
    Mock::given(method("GET"))
        .and(path("/activities"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"type": "Run", "distance": 1.0}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ActivityClient::with_base_url(server.uri());
    let err = client
        .fetch_activities("test-token", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Decode { page: 1, .. }));
}
