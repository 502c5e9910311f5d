// handlers/publications.rs - /api/publications

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{FormData, IdPath};
use crate::database::models::{Category, Publication};
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::PublicationInput;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

fn publication_input(form: &mut FormData) -> Result<PublicationInput, crate::error::ApiError> {
    Ok(PublicationInput {
        title: form.text("title"),
        content: form.text("content"),
        summary: form.text("summary"),
        category_id: form.int("category_id")?,
        published_date: form.text("published_date"),
    })
}

/// GET /api/publications - newest first, optionally one category
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Publication>> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    Ok(ApiResponse::success(state.publications().list(category).await?))
}

/// GET /api/publications/categories
pub async fn categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(ApiResponse::success(state.publications().categories().await?))
}

/// GET /api/publications/:id
pub async fn show(State(state): State<AppState>, IdPath(id): IdPath) -> ApiResult<Publication> {
    Ok(ApiResponse::success(state.publications().get(id).await?))
}

/// POST /api/publications - multipart with optional `pdf_file`
pub async fn create(State(state): State<AppState>, _admin: AdminUser, mut form: FormData) -> ApiResult<Value> {
    let input = publication_input(&mut form)?;
    let publication = state.publications().create(input, form.file("pdf_file")).await?;
    Ok(ApiResponse::created(json!({
        "message": "Publication created successfully",
        "id": publication.id,
        "publication": publication,
    })))
}

/// PUT /api/publications/:id
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    IdPath(id): IdPath,
    mut form: FormData,
) -> ApiResult<Value> {
    let input = publication_input(&mut form)?;
    let publication = state.publications().update(id, input, form.file("pdf_file")).await?;
    Ok(ApiResponse::success(json!({
        "message": "Publication updated successfully",
        "publication": publication,
    })))
}

/// DELETE /api/publications/:id
pub async fn delete(State(state): State<AppState>, _admin: AdminUser, IdPath(id): IdPath) -> ApiResult<Value> {
    state.publications().delete(id).await?;
    Ok(ApiResponse::success(json!({ "message": "Publication deleted successfully" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/publications", get(list).post(create))
        .route("/api/publications/categories", get(categories))
        .route("/api/publications/:id", get(show).put(update).delete(delete))
}
