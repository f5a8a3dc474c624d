//! Search, the aggregated place list, and enrichment.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use omnimap_core::EnrichedPlaceRecord;
use omnimap_session::{EnrichReport, PlacesPage, SearchParams, SearchReport};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{RequestId, Viewer};

use super::sessions::resolve_session;
use super::{map_session_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct PlacesQuery {
    pub page: Option<usize>,
}

/// POST /api/v1/sessions/{id}/search
///
/// Runs to completion before answering; every anchor is searched in turn.
pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<SearchParams>,
) -> Result<Json<ApiResponse<SearchReport>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let report = session
        .search(body)
        .await
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(report, req_id.0))
}

/// GET /api/v1/sessions/{id}/places?page=N (1-based, clamped)
pub(super) async fn list_places(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Query(query): Query<PlacesQuery>,
) -> Result<Json<ApiResponse<PlacesPage>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let page = session.places_page(query.page.unwrap_or(1));
    Ok(ApiResponse::new(page, req_id.0))
}

/// DELETE /api/v1/sessions/{id}/places/{index} (0-based across all pages)
pub(super) async fn remove_place(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<ApiResponse<EnrichedPlaceRecord>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let removed = session
        .remove_place(index)
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(removed, req_id.0))
}

/// POST /api/v1/sessions/{id}/enrich (signed-in, paid)
pub(super) async fn enrich(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EnrichReport>>, ApiError> {
    let session = resolve_session(&state, id, &req_id.0)?;
    let report = session
        .enrich(viewer.email())
        .await
        .map_err(|e| map_session_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(report, req_id.0))
}
