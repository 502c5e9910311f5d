// handlers/services.rs - /api/services

use axum::{extract::State, routing::{get, post}, Router};
use serde_json::{json, Value};

use super::extract::{IdPath, JsonBody};
use crate::database::models::Service;
use crate::error::ApiError;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::{ServiceInput, ServiceOrder};
use crate::state::AppState;

/// GET /api/services - by order_number
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Service>> {
    Ok(ApiResponse::success(state.services().list().await?))
}

/// GET /api/services/:id
pub async fn show(State(state): State<AppState>, IdPath(id): IdPath) -> ApiResult<Service> {
    Ok(ApiResponse::success(state.services().get(id).await?))
}

/// POST /api/services - appended after the current last service unless order_number is given
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(input): JsonBody<ServiceInput>,
) -> ApiResult<Value> {
    let service = state.services().create(input).await?;
    Ok(ApiResponse::created(json!({
        "message": "Service created successfully",
        "id": service.id,
        "service": service,
    })))
}

/// PUT /api/services/:id
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    IdPath(id): IdPath,
    JsonBody(input): JsonBody<ServiceInput>,
) -> ApiResult<Value> {
    let service = state.services().update(id, input).await?;
    Ok(ApiResponse::success(json!({
        "message": "Service updated successfully",
        "service": service,
    })))
}

/// DELETE /api/services/:id
pub async fn delete(State(state): State<AppState>, _admin: AdminUser, IdPath(id): IdPath) -> ApiResult<Value> {
    state.services().delete(id).await?;
    Ok(ApiResponse::success(json!({ "message": "Service deleted successfully" })))
}

/// POST /api/services/orders - `{ "services": [{ "id", "order_number" }] }`, all or nothing
pub async fn reorder(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(mut body): JsonBody<Value>,
) -> ApiResult<Value> {
    let raw = body.get_mut("services").map(Value::take).unwrap_or_default();
    let entries: Vec<ServiceOrder> = serde_json::from_value(raw)
        .map_err(|_| ApiError::validation_error("Invalid service order data", Some("services")))?;
    state.services().reorder(entries).await?;
    Ok(ApiResponse::success(json!({ "message": "Service order updated successfully" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/services", get(list).post(create))
        .route("/api/services/orders", post(reorder))
        .route("/api/services/:id", get(show).put(update).delete(delete))
}
