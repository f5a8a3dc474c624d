//! Messaging gateway linking and outbound dispatch.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use omnimap_messaging::{AuthStatus, DispatchReport, QrCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{RequestId, Viewer};

use super::sessions::resolve_session;
use super::{map_session_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct DispatchRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(super) struct GatewayAuth {
    pub status: AuthStatus,
    pub authenticated: bool,
}

/// POST /api/v1/sessions/{id}/gateway/qr
pub(super) async fn link(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<QrCode>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let qr = session
        .link_gateway()
        .await
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(qr, req_id.0))
}

/// POST /api/v1/sessions/{id}/gateway/wait
///
/// Blocks until the QR code is scanned, the status stream ends, or the
/// configured wait elapses.
pub(super) async fn wait(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<GatewayAuth>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let status = session
        .wait_for_gateway()
        .await
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    let authenticated = status.is_authenticated();
    Ok(ApiResponse::new(
        GatewayAuth {
            status,
            authenticated,
        },
        req_id.0,
    ))
}

/// GET /api/v1/sessions/{id}/gateway/contacts
pub(super) async fn contacts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let contacts = session
        .gateway_contacts()
        .await
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(contacts, req_id.0))
}

/// POST /api/v1/sessions/{id}/dispatch with `{message}` (signed-in, enriched)
pub(super) async fn dispatch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
    Json(body): Json<DispatchRequest>,
) -> Result<Json<ApiResponse<DispatchReport>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let report = session
        .dispatch(viewer.email(), &body.message)
        .await
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(report, req_id.0))
}
