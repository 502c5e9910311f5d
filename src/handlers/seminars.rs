// handlers/seminars.rs - /api/seminars

use axum::{extract::State, routing::get, Router};
use serde_json::{json, Value};

use super::extract::{FormData, IdPath};
use crate::database::models::Seminar;
use crate::error::ApiError;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::SeminarInput;
use crate::state::AppState;

fn seminar_input(form: &mut FormData) -> Result<SeminarInput, ApiError> {
    Ok(SeminarInput {
        title: form.text("title"),
        description: form.text("description"),
        event_date: form.text("event_date"),
        status: form.text("status"),
        seats_available: form.int("seats_available")?,
        location: form.text("location"),
    })
}

/// GET /api/seminars
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Seminar>> {
    Ok(ApiResponse::success(state.seminars().list().await?))
}

/// GET /api/seminars/upcoming - dated today or later, or marked Upcoming
pub async fn upcoming(State(state): State<AppState>) -> ApiResult<Vec<Seminar>> {
    Ok(ApiResponse::success(state.seminars().upcoming().await?))
}

/// GET /api/seminars/past - dated before today, or marked Past
pub async fn past(State(state): State<AppState>) -> ApiResult<Vec<Seminar>> {
    Ok(ApiResponse::success(state.seminars().past().await?))
}

/// GET /api/seminars/:id
pub async fn show(State(state): State<AppState>, IdPath(id): IdPath) -> ApiResult<Seminar> {
    Ok(ApiResponse::success(state.seminars().get(id).await?))
}

/// POST /api/seminars - multipart with optional `image`
pub async fn create(State(state): State<AppState>, _admin: AdminUser, mut form: FormData) -> ApiResult<Value> {
    let input = seminar_input(&mut form)?;
    let seminar = state.seminars().create(input, form.file("image")).await?;
    Ok(ApiResponse::created(json!({
        "message": "Seminar created successfully",
        "id": seminar.id,
        "image_path": seminar.image_path,
        "seminar": seminar,
    })))
}

/// PUT /api/seminars/:id
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    IdPath(id): IdPath,
    mut form: FormData,
) -> ApiResult<Value> {
    let input = seminar_input(&mut form)?;
    let seminar = state.seminars().update(id, input, form.file("image")).await?;
    Ok(ApiResponse::success(json!({
        "message": "Seminar updated successfully",
        "image_path": seminar.image_path,
        "seminar": seminar,
    })))
}

/// DELETE /api/seminars/:id
pub async fn delete(State(state): State<AppState>, _admin: AdminUser, IdPath(id): IdPath) -> ApiResult<Value> {
    state.seminars().delete(id).await?;
    Ok(ApiResponse::success(json!({ "message": "Seminar deleted successfully" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/seminars", get(list).post(create))
        .route("/api/seminars/upcoming", get(upcoming))
        .route("/api/seminars/past", get(past))
        .route("/api/seminars/:id", get(show).put(update).delete(delete))
}
