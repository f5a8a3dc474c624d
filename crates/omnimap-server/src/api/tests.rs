use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use omnimap_core::HttpSettings;
use omnimap_messaging::GatewayClient;
use omnimap_places::PlacesClient;
use omnimap_session::{
    AccountDirectory, AccountsError, OpenAccounts, SessionDeps, SessionSettings,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

struct NobodyPaid;

#[async_trait]
impl AccountDirectory for NobodyPaid {
    async fn is_paid(&self, _email: &str) -> Result<bool, AccountsError> {
        Ok(false)
    }
}

fn http() -> HttpSettings {
    HttpSettings {
        timeout_secs: 5,
        user_agent: "omnimap-test".to_owned(),
        max_retries: 0,
        backoff_base_ms: 0,
    }
}

fn test_app(server: &MockServer, accounts: Arc<dyn AccountDirectory>) -> Router {
    test_app_limited(server, accounts, default_rate_limit_state())
}

fn test_app_limited(
    server: &MockServer,
    accounts: Arc<dyn AccountDirectory>,
    rate_limit: RateLimitState,
) -> Router {
    let places = PlacesClient::with_base_url("test-key", &server.uri(), &http())
        .expect("places client");
    let gateway =
        GatewayClient::new(&format!("{}/gw", server.uri()), &http()).expect("gateway client");
    let registry = Arc::new(SessionRegistry::new(SessionDeps {
        places: Arc::new(places),
        gateway: Arc::new(gateway),
        accounts,
        settings: SessionSettings::default(),
    }));
    build_app(AppState { registry, pool: None }, rate_limit)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    viewer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(email) = viewer {
        builder = builder.header(VIEWER_HEADER, email);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json parse")
    };
    (status, json)
}

async fn new_session(app: &Router) -> String {
    let (status, json) = call(app, Method::POST, "/api/v1/sessions", None, None).await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_str().expect("session id").to_owned()
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("sign_in_required", StatusCode::UNAUTHORIZED),
        ("upgrade_required", StatusCode::PAYMENT_REQUIRED),
        ("not_found", StatusCode::NOT_FOUND),
        ("busy", StatusCode::CONFLICT),
        ("gateway_error", StatusCode::BAD_GATEWAY),
        ("billing_unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("something_else", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "x").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[test]
fn busy_session_error_is_conflict() {
    let err = map_session_error(
        "req-1".to_owned(),
        &SessionError::Busy {
            phase: omnimap_session::Phase::Searching,
        },
    );
    assert_eq!(err.error.code, "busy");
    assert!(err.error.message.contains("searching"));
}

#[tokio::test]
async fn health_reports_disabled_billing_and_echoes_request_id() {
    let server = MockServer::start().await;
    let app = test_app(&server, Arc::new(OpenAccounts));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").map(|v| v.as_bytes()),
        Some(&b"req-abc"[..])
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json parse");
    assert_eq!(json["data"]["billing"], "disabled");
    assert_eq!(json["meta"]["request_id"], "req-abc");
}

#[tokio::test]
async fn session_lifecycle() {
    let server = MockServer::start().await;
    let app = test_app(&server, Arc::new(OpenAccounts));
    let id = new_session(&app).await;

    let (status, json) = call(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["phase"], "idle");
    assert_eq!(json["data"]["places"], 0);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/v1/sessions/{id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn anchor_routes_validate_input() {
    let server = MockServer::start().await;
    let app = test_app(&server, Arc::new(OpenAccounts));
    let id = new_session(&app).await;
    let anchors = format!("/api/v1/sessions/{id}/anchors");

    let (status, json) = call(
        &app,
        Method::POST,
        &anchors,
        Some(json!({ "url": "https://example.com/no-coordinates" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, json) = call(
        &app,
        Method::POST,
        &anchors,
        Some(json!({ "url": "https://www.google.com/maps/@53.5511,9.9937,14z" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["lat"], 53.5511);

    let (status, _) = call(
        &app,
        Method::POST,
        &anchors,
        Some(json!({ "lat": 53.5511, "lng": 9.9937 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = call(
        &app,
        Method::POST,
        &format!("{anchors}/dedupe"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["removed"], 1);
    assert_eq!(json["data"]["remaining"], 1);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("{anchors}/not-an-anchor"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::DELETE, &anchors, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = call(&app, Method::GET, &anchors, None, None).await;
    assert_eq!(json["data"], json!([]));
}

#[tokio::test]
async fn stage_preconditions_answer_with_documented_codes() {
    let server = MockServer::start().await;
    let app = test_app(&server, Arc::new(NobodyPaid));
    let id = new_session(&app).await;
    let base = format!("/api/v1/sessions/{id}");

    let search = json!({ "text": "bakery", "radius_meters": 5000, "target_count": 20 });
    let (status, json) = call(
        &app,
        Method::POST,
        &format!("{base}/search"),
        Some(search),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");

    let (status, json) = call(&app, Method::POST, &format!("{base}/enrich"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "sign_in_required");

    let (status, json) = call(
        &app,
        Method::POST,
        &format!("{base}/enrich"),
        None,
        Some("free@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(json["error"]["code"], "upgrade_required");

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("{base}/dispatch"),
        Some(json!({ "message": "hi" })),
        Some("free@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("{base}/places/3"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_enrich_dispatch_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("location", "53.5,10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [
                { "place_id": "A", "name": "Backstube A" },
                { "place_id": "B", "name": "Backstube B" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "NOT_FOUND"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {
                "name": "Backstube B",
                "international_phone_number": "+44 20 7946 0958",
                "website": "https://b.example"
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gw/generate-qr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessionID": "gw-1",
            "qrCode": "iVBORw0KGgo="
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gw/validate-session"))
        .and(query_param("sessionID", "gw-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isValid": true })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/gw/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "queued" })))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server, Arc::new(OpenAccounts));
    let id = new_session(&app).await;
    let base = format!("/api/v1/sessions/{id}");
    let viewer = Some("ada@example.com");

    call(
        &app,
        Method::POST,
        &format!("{base}/anchors"),
        Some(json!({ "lat": 53.5, "lng": 10.0 })),
        None,
    )
    .await;

    let (status, json) = call(
        &app,
        Method::POST,
        &format!("{base}/search"),
        Some(json!({
            "text": "bakery",
            "radius_meters": 5000,
            "category": "bakery",
            "target_count": 20
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 2);
    assert_eq!(json["data"]["anchors"][0]["end"]["reason"], "exhausted");

    let (status, json) = call(&app, Method::POST, &format!("{base}/enrich"), None, viewer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["with_phone"], 1);

    let (_, json) = call(&app, Method::GET, &format!("{base}/places?page=1"), None, None).await;
    let items = json["data"]["items"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    assert!(items[0].get("phone_international").is_none());
    assert_eq!(items[1]["phone_international"], "+442079460958");
    assert_eq!(items[1]["website"], "https://b.example");

    let (status, json) = call(&app, Method::POST, &format!("{base}/gateway/qr"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["sessionID"], "gw-1");

    let (status, json) = call(
        &app,
        Method::POST,
        &format!("{base}/dispatch"),
        Some(json!({ "message": "Hello from omnimap" })),
        viewer,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["skipped"], 1);
    assert_eq!(json["data"]["results"][0]["target"], "+442079460958");
    assert_eq!(json["data"]["results"][0]["outcome"], "success");

    let (_, json) = call(&app, Method::GET, &base, None, None).await;
    assert_eq!(json["data"]["phase"], "idle");
    assert_eq!(json["data"]["enriched"], true);
}

#[tokio::test]
async fn rate_limited_requests_get_the_error_envelope() {
    let server = MockServer::start().await;
    let app = test_app_limited(
        &server,
        Arc::new(OpenAccounts),
        RateLimitState::new(1, Duration::from_secs(60)),
    );
    let id = new_session(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/sessions/{id}"))
                .header("x-request-id", "req-429")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json parse");
    assert_eq!(json["error"]["code"], "rate_limited");
    assert_eq!(json["meta"]["request_id"], "req-429");
    assert!(json["meta"]["timestamp"].is_string());
}
