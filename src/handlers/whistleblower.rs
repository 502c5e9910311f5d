// handlers/whistleblower.rs - /api/whistleblower
//
// Submission and tracking are public. Tracking goes by reference number only
// and never returns the report body or the reporter's identity.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{IdPath, JsonBody};
use crate::database::models::WhistleblowerReport;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::whistleblower_service::{ReportStatistics, ReportSummary, TrackedReport};
use crate::services::ReportSubmission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusBody {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NoteBody {
    pub note: Option<String>,
}

/// POST /api/whistleblower/report
pub async fn submit(State(state): State<AppState>, JsonBody(submission): JsonBody<ReportSubmission>) -> ApiResult<Value> {
    let report = state.whistleblower().submit(submission).await?;
    Ok(ApiResponse::created(json!({
        "message": "Report submitted successfully",
        "referenceNumber": report.reference_number,
        "isAnonymous": report.is_anonymous,
    })))
}

/// GET /api/whistleblower/status/:referenceNumber
pub async fn track(State(state): State<AppState>, Path(reference): Path<String>) -> ApiResult<TrackedReport> {
    Ok(ApiResponse::success(state.whistleblower().track(&reference).await?))
}

/// GET /api/whistleblower/reports?status=
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ReportSummary>> {
    let status = query.status.as_deref().filter(|s| !s.is_empty());
    Ok(ApiResponse::success(state.whistleblower().list(status).await?))
}

/// GET /api/whistleblower/reports/:id - includes admin notes
pub async fn show(State(state): State<AppState>, _admin: AdminUser, IdPath(id): IdPath) -> ApiResult<WhistleblowerReport> {
    Ok(ApiResponse::success(state.whistleblower().get(id).await?))
}

/// PUT /api/whistleblower/reports/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<StatusBody>,
) -> ApiResult<Value> {
    let status = state.whistleblower().update_status(id, body.status.as_deref()).await?;
    Ok(ApiResponse::success(json!({
        "message": "Report status updated successfully",
        "status": status.as_str(),
    })))
}

/// POST /api/whistleblower/reports/:id/notes
pub async fn add_note(
    State(state): State<AppState>,
    _admin: AdminUser,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<NoteBody>,
) -> ApiResult<Value> {
    state.whistleblower().add_note(id, body.note.as_deref()).await?;
    Ok(ApiResponse::success(json!({ "message": "Note added successfully" })))
}

/// GET /api/whistleblower/statistics
pub async fn statistics(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<ReportStatistics> {
    Ok(ApiResponse::success(state.whistleblower().statistics().await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/whistleblower/report", post(submit))
        .route("/api/whistleblower/status/:reference", get(track))
        .route("/api/whistleblower/reports", get(list))
        .route("/api/whistleblower/reports/:id", get(show))
        .route("/api/whistleblower/reports/:id/status", put(update_status))
        .route("/api/whistleblower/reports/:id/notes", post(add_note))
        .route("/api/whistleblower/statistics", get(statistics))
}
