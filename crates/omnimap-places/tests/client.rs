//! Integration tests for `PlacesClient` using wiremock HTTP mocks.

use omnimap_core::{Anchor, HttpSettings, SearchQuery};
use omnimap_places::{
    CursorEnd, CursorOptions, EnrichmentCoordinator, PlacesClient, PlacesError, PlacesProvider,
    ProviderStatus, SearchCursor,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> HttpSettings {
    HttpSettings {
        timeout_secs: 5,
        user_agent: "omnimap-test".to_owned(),
        max_retries: 2,
        backoff_base_ms: 0,
    }
}

fn test_client(base_url: &str) -> PlacesClient {
    PlacesClient::with_base_url("test-key", base_url, &settings())
        .expect("client construction should not fail")
}

fn places(prefix: &str, n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| {
            json!({
                "place_id": format!("{prefix}{i}"),
                "name": format!("Bakery {prefix}{i}"),
                "formatted_address": "Hamburg",
                "rating": 4.5
            })
        })
        .collect()
}

fn bakery_query(target_count: usize) -> SearchQuery {
    SearchQuery {
        text: "bakery".to_owned(),
        anchor: Anchor::from_pin(53.5, 10.0).unwrap(),
        radius_meters: 5000,
        category: Some("bakery".to_owned()),
        target_count,
    }
}

#[tokio::test]
async fn text_search_sends_query_params_and_parses_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("query", "bakery"))
        .and(query_param("location", "53.5,10"))
        .and(query_param("radius", "5000"))
        .and(query_param("type", "bakery"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": places("p", 3),
            "next_page_token": "NEXT"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client
        .text_search(&bakery_query(20), None)
        .await
        .expect("should parse page");

    assert_eq!(page.status, ProviderStatus::Ok);
    assert_eq!(page.results.len(), 3);
    assert_eq!(page.results[0].place_id, "p0");
    assert_eq!(page.results[0].formatted_address.as_deref(), Some("Hamburg"));
    assert_eq!(page.results[0].extra["rating"], json!(4.5));
    assert_eq!(page.next_page_token.as_deref(), Some("NEXT"));
}

#[tokio::test]
async fn provider_error_status_is_returned_not_raised() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "results": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client.text_search(&bakery_query(20), None).await.unwrap();
    assert_eq!(
        page.status,
        ProviderStatus::Other("REQUEST_DENIED".to_owned())
    );
    assert_eq!(
        page.error_message.as_deref(),
        Some("The provided API key is invalid.")
    );
}

#[tokio::test]
async fn server_error_is_retried_then_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.place_details("ChIJ1").await.unwrap_err();
    match err {
        PlacesError::UnexpectedStatus { status, url } => {
            assert_eq!(status, 503);
            assert_eq!(url, "/details/json");
            assert!(!url.contains("test-key"), "key leaked into error");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "ChIJ1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {
                "name": "Backstube",
                "international_phone_number": "+49 40 123456",
                "website": "https://backstube.example"
            }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let resp = client.place_details("ChIJ1").await.expect("retry succeeds");
    assert_eq!(resp.status, ProviderStatus::Ok);
    let details = resp.result.expect("result present");
    assert_eq!(
        details.international_phone_number.as_deref(),
        Some("+49 40 123456")
    );
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.place_details("ChIJ1").await.unwrap_err();
    assert!(matches!(
        err,
        PlacesError::UnexpectedStatus { status: 403, .. }
    ));
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .text_search(&bakery_query(20), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PlacesError::Deserialize { .. }));
}

/// Two real pages: 10 results with a cursor, then 8 without. Runs in real
/// time, so the continuation waits the full 2 s.
#[tokio::test]
async fn cursor_follows_continuation_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("query", "bakery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": places("first", 10),
            "next_page_token": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("pagetoken", "page-2"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": places("second", 8)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let started = std::time::Instant::now();
    let (records, outcome) = SearchCursor::new(&client, bakery_query(15), CursorOptions::default())
        .collect_all()
        .await;

    assert_eq!(records.len(), 18);
    assert_eq!(records[0].place_id, "first0");
    assert_eq!(records[17].place_id, "second7");
    assert_eq!(outcome.end, CursorEnd::Exhausted);
    assert_eq!(outcome.pages, 2);
    assert!(started.elapsed() >= std::time::Duration::from_millis(2000));
}

#[tokio::test]
async fn enrichment_over_http_isolates_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "INVALID_REQUEST"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "B"))
        .and(query_param(
            "fields",
            "name,formatted_phone_number,international_phone_number,website",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {
                "formatted_phone_number": "020 7946 0958",
                "international_phone_number": "+44 20 7946 0958",
                "website": "https://b.example"
            }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let input = vec![
        omnimap_core::PlaceRecord::new("A", "Alpha"),
        omnimap_core::PlaceRecord::new("B", "Beta"),
    ];
    let out = EnrichmentCoordinator::new(&client).enrich(input).await;

    assert_eq!(out.len(), 2);
    assert!(out[0].phone_international.is_none());
    assert!(out[0].website.is_none());
    assert_eq!(out[1].website.as_deref(), Some("https://b.example"));
    assert_eq!(out[1].phone_international.as_deref(), Some("+442079460958"));
    assert_eq!(out[1].phone_local.as_deref(), Some("020 7946 0958"));
}

#[tokio::test]
async fn transport_errors_do_not_echo_the_api_key() {
    let client = PlacesClient::with_base_url(
        "SECRET-KEY-123",
        "http://127.0.0.1:1/",
        &HttpSettings {
            timeout_secs: 2,
            user_agent: "omnimap-test".to_owned(),
            max_retries: 0,
            backoff_base_ms: 0,
        },
    )
    .expect("client construction should not fail");

    let err = client
        .text_search(&bakery_query(20), None)
        .await
        .expect_err("nothing listens on port 1");
    assert!(matches!(err, PlacesError::Http(_)), "got {err:?}");
    assert!(!err.to_string().contains("SECRET-KEY-123"), "{err}");

    let (records, outcome) = SearchCursor::new(&client, bakery_query(20), CursorOptions::default())
        .collect_all()
        .await;
    assert!(records.is_empty());
    let CursorEnd::Transport(detail) = &outcome.end else {
        panic!("expected transport end, got {:?}", outcome.end);
    };
    assert!(!detail.contains("SECRET-KEY-123"), "{detail}");
    let body = serde_json::to_string(&outcome).expect("outcome serializes");
    assert!(!body.contains("SECRET-KEY-123"), "{body}");
}
