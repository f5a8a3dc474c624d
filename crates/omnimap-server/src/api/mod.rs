mod anchors;
mod gateway;
mod places;
mod sessions;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use omnimap_session::{SessionError, SessionRegistry};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, identify_viewer, request_id, RateLimitState, RequestId, VIEWER_HEADER,
};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    /// Billing database, when configured. Only used by the health check here.
    pub pool: Option<PgPool>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    billing: &'static str,
    sessions: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "sign_in_required" => StatusCode::UNAUTHORIZED,
            "upgrade_required" => StatusCode::PAYMENT_REQUIRED,
            "validation_error" => StatusCode::BAD_REQUEST,
            "busy" | "conflict" | "cancelled" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "gateway_error" => StatusCode::BAD_GATEWAY,
            "billing_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Translates a session failure into the response envelope.
pub(super) fn map_session_error(request_id: String, error: &SessionError) -> ApiError {
    let code = match error {
        SessionError::Busy { .. } => "busy",
        SessionError::SignInRequired => "sign_in_required",
        SessionError::UpgradeRequired => "upgrade_required",
        SessionError::Invalid(_) => "validation_error",
        SessionError::SessionNotFound(_)
        | SessionError::AnchorNotFound(_)
        | SessionError::PlaceNotFound(_) => "not_found",
        SessionError::NotEnriched
        | SessionError::NoAnchors
        | SessionError::NoPlaces
        | SessionError::GatewayNotLinked
        | SessionError::GatewaySessionInvalid
        | SessionError::Conflict(_) => "conflict",
        SessionError::Cancelled => "cancelled",
        SessionError::Gateway(e) => {
            tracing::warn!(error = %e, "messaging gateway call failed");
            "gateway_error"
        }
        SessionError::Accounts(e) => {
            tracing::error!(error = %e, "billing lookup failed");
            return ApiError::new(request_id, "billing_unavailable", "billing lookup failed");
        }
    };
    ApiError::new(request_id, code, error.to_string())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(VIEWER_HEADER),
        ])
}

fn session_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/sessions", post(sessions::create_session))
        .route(
            "/api/v1/sessions/{id}",
            get(sessions::get_session).delete(sessions::close_session),
        )
        .route(
            "/api/v1/sessions/{id}/anchors",
            get(anchors::list_anchors)
                .post(anchors::add_anchor)
                .delete(anchors::clear_anchors),
        )
        .route(
            "/api/v1/sessions/{id}/anchors/dedupe",
            post(anchors::dedupe_anchors),
        )
        .route(
            "/api/v1/sessions/{id}/anchors/{anchor_id}",
            delete(anchors::remove_anchor),
        )
        .route("/api/v1/sessions/{id}/search", post(places::search))
        .route("/api/v1/sessions/{id}/places", get(places::list_places))
        .route(
            "/api/v1/sessions/{id}/places/{index}",
            delete(places::remove_place),
        )
        .route("/api/v1/sessions/{id}/enrich", post(places::enrich))
        .route("/api/v1/sessions/{id}/gateway/qr", post(gateway::link))
        .route("/api/v1/sessions/{id}/gateway/wait", post(gateway::wait))
        .route(
            "/api/v1/sessions/{id}/gateway/contacts",
            get(gateway::contacts),
        )
        .route("/api/v1/sessions/{id}/dispatch", post(gateway::dispatch))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(session_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn(identify_viewer)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let sessions = state.registry.len();
    let Some(pool) = &state.pool else {
        return (
            StatusCode::OK,
            ApiResponse::new(
                HealthData {
                    status: "ok",
                    billing: "disabled",
                    sessions,
                },
                req_id.0,
            ),
        );
    };

    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => (
            StatusCode::OK,
            ApiResponse::new(
                HealthData {
                    status: "ok",
                    billing: "ok",
                    sessions,
                },
                req_id.0,
            ),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: billing database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::new(
                    HealthData {
                        status: "degraded",
                        billing: "unavailable",
                        sessions,
                    },
                    req_id.0,
                ),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests;
