// handlers/newspapers.rs - /api/newspapers

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{FormData, IdPath};
use crate::database::models::Newspaper;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::{NewspaperFiles, NewspaperInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub year: Option<String>,
}

fn newspaper_parts(form: &mut FormData) -> (NewspaperInput, NewspaperFiles) {
    (
        NewspaperInput {
            title: form.text("title"),
            description: form.text("description"),
            issue_date: form.text("issue_date"),
        },
        NewspaperFiles {
            pdf: form.file("pdf_file"),
            cover: form.file("cover_image"),
        },
    )
}

/// GET /api/newspapers?year= - newest issue first; `All` disables the filter
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Newspaper>> {
    let year = query.year.as_deref().filter(|y| !y.is_empty());
    Ok(ApiResponse::success(state.newspapers().list(year).await?))
}

/// GET /api/newspapers/latest
pub async fn latest(State(state): State<AppState>) -> ApiResult<Newspaper> {
    Ok(ApiResponse::success(state.newspapers().latest().await?))
}

/// GET /api/newspapers/years
pub async fn years(State(state): State<AppState>) -> ApiResult<Vec<i64>> {
    Ok(ApiResponse::success(state.newspapers().years().await?))
}

/// GET /api/newspapers/:id
pub async fn show(State(state): State<AppState>, IdPath(id): IdPath) -> ApiResult<Newspaper> {
    Ok(ApiResponse::success(state.newspapers().get(id).await?))
}

/// POST /api/newspapers - multipart `pdf_file` (required) and `cover_image`
pub async fn create(State(state): State<AppState>, _admin: AdminUser, mut form: FormData) -> ApiResult<Value> {
    let (input, files) = newspaper_parts(&mut form);
    let newspaper = state.newspapers().create(input, files).await?;
    Ok(ApiResponse::created(json!({
        "message": "Newspaper created successfully",
        "id": newspaper.id,
        "pdf_file_path": newspaper.pdf_file_path,
        "cover_image_path": newspaper.cover_image_path,
        "newspaper": newspaper,
    })))
}

/// PUT /api/newspapers/:id
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    IdPath(id): IdPath,
    mut form: FormData,
) -> ApiResult<Value> {
    let (input, files) = newspaper_parts(&mut form);
    let newspaper = state.newspapers().update(id, input, files).await?;
    Ok(ApiResponse::success(json!({
        "message": "Newspaper updated successfully",
        "pdf_file_path": newspaper.pdf_file_path,
        "cover_image_path": newspaper.cover_image_path,
        "newspaper": newspaper,
    })))
}

/// DELETE /api/newspapers/:id
pub async fn delete(State(state): State<AppState>, _admin: AdminUser, IdPath(id): IdPath) -> ApiResult<Value> {
    state.newspapers().delete(id).await?;
    Ok(ApiResponse::success(json!({ "message": "Newspaper deleted successfully" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/newspapers", get(list).post(create))
        .route("/api/newspapers/latest", get(latest))
        .route("/api/newspapers/years", get(years))
        .route("/api/newspapers/:id", get(show).put(update).delete(delete))
}
