//! Anchor list handlers. Anchors are map points that searches run around.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use omnimap_core::Anchor;
use omnimap_session::AnchorInput;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::sessions::resolve_session;
use super::{map_session_error, ApiError, ApiResponse, AppState};

/// GET /api/v1/sessions/{id}/anchors, newest first.
pub(super) async fn list_anchors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Anchor>>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    Ok(ApiResponse::new(session.anchors(), req_id.0))
}

/// POST /api/v1/sessions/{id}/anchors with `{url}` or `{lat, lng}`.
pub(super) async fn add_anchor(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<AnchorInput>,
) -> Result<(StatusCode, Json<ApiResponse<Anchor>>), ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let anchor = session
        .add_anchor(body)
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    Ok((StatusCode::CREATED, ApiResponse::new(anchor, req_id.0)))
}

/// DELETE /api/v1/sessions/{id}/anchors/{anchor_id}
pub(super) async fn remove_anchor(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((id, anchor_id)): Path<(Uuid, String)>,
) -> Result<Json<ApiResponse<Anchor>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let removed = session
        .remove_anchor(&anchor_id)
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(removed, req_id.0))
}

/// DELETE /api/v1/sessions/{id}/anchors
pub(super) async fn clear_anchors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    session.clear_anchors();
    Ok(ApiResponse::new(
        serde_json::json!({ "cleared": true }),
        req_id.0,
    ))
}

/// POST /api/v1/sessions/{id}/anchors/dedupe
pub(super) async fn dedupe_anchors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let removed = session.dedupe_anchors();
    Ok(ApiResponse::new(
        serde_json::json!({ "removed": removed, "remaining": session.anchors().len() }),
        req_id.0,
    ))
}
