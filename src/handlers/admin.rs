// handlers/admin.rs - /api/admin

use axum::{extract::State, routing::get, Router};

use crate::middleware::{ApiResponse, ApiResult, EditorUser};
use crate::services::dashboard_service::DashboardStats;
use crate::state::AppState;

/// GET /api/admin/dashboard/stats
pub async fn dashboard_stats(State(state): State<AppState>, _editor: EditorUser) -> ApiResult<DashboardStats> {
    Ok(ApiResponse::success(state.dashboard().stats().await?))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/admin/dashboard/stats", get(dashboard_stats))
}
