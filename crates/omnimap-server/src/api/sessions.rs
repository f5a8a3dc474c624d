//! Session lifecycle: create, inspect, close.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use omnimap_session::{Session, SessionSummary};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_session_error, ApiError, ApiResponse, AppState};

/// Looks up a live session or answers 404.
pub(super) fn resolve_session(
    state: &AppState,
    id: Uuid,
    request_id: &str,
) -> Result<Arc<Session>, ApiError> {
    state
        .registry
        .get(id)
        .map_err(|e| map_session_error(request_id.to_owned(), &e))
}

/// POST /api/v1/sessions
pub(super) async fn create_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> (StatusCode, Json<ApiResponse<SessionSummary>>) {
    let session = state.registry.create();
    (
        StatusCode::CREATED,
        ApiResponse::new(session.summary(), req_id.0),
    )
}

/// GET /api/v1/sessions/{id}
pub(super) async fn get_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionSummary>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    Ok(ApiResponse::new(session.summary(), req_id.0))
}

/// DELETE /api/v1/sessions/{id}: cancels any running stage and drops the
/// session.
pub(super) async fn close_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    state
        .registry
        .close(id)
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(
        serde_json::json!({ "closed": true }),
        req_id.0,
    ))
}
