// handlers/uploads.rs - /api/uploads (admin only)

use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{FormData, JsonBody};
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::storage::UploadDestination;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DestinationRequest {
    #[serde(alias = "originalName")]
    pub originalname: Option<String>,
    #[serde(rename = "fileType")]
    pub file_type: Option<String>,
    pub folder: Option<String>,
}

/// POST /api/uploads/file - multipart `file`, optional `folder` field
pub async fn upload_file(State(state): State<AppState>, _admin: AdminUser, mut form: FormData) -> ApiResult<Value> {
    let folder = form.text("folder");
    let file = state.uploads().upload_single(form.file("file"), folder.as_deref()).await?;
    Ok(ApiResponse::success(json!({
        "message": "File uploaded successfully",
        "file": file,
    })))
}

/// POST /api/uploads/files - multipart `files`, bounded batch
pub async fn upload_files(State(state): State<AppState>, _admin: AdminUser, mut form: FormData) -> ApiResult<Value> {
    let folder = form.text("folder");
    let files = state.uploads().upload_multiple(form.files("files"), folder.as_deref()).await?;
    Ok(ApiResponse::success(json!({
        "message": format!("{} files uploaded successfully", files.len()),
        "files": files,
    })))
}

/// DELETE /api/uploads/file/:filename
pub async fn delete_file(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(filename): Path<String>,
) -> ApiResult<Value> {
    let path = state.uploads().delete_by_filename(&filename).await?;
    Ok(ApiResponse::success(json!({
        "message": "File deleted successfully",
        "path": path,
    })))
}

/// POST /api/uploads/get-upload-url - nothing is written
pub async fn upload_url(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<DestinationRequest>,
) -> ApiResult<UploadDestination> {
    let destination = state.uploads().upload_destination(
        body.originalname.as_deref(),
        body.file_type.as_deref(),
        body.folder.as_deref(),
    )?;
    Ok(ApiResponse::success(destination))
}

/// POST /api/uploads/direct/:folder/:filename - stored under exactly that name
pub async fn direct_upload(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((folder, filename)): Path<(String, String)>,
    mut form: FormData,
) -> ApiResult<Value> {
    let file = state
        .uploads()
        .direct_upload(&folder, &filename, form.file("file"))
        .await?;
    Ok(ApiResponse::success(json!({
        "message": "File uploaded successfully",
        "file": file,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/uploads/file", post(upload_file))
        .route("/api/uploads/files", post(upload_files))
        .route("/api/uploads/file/:filename", delete(delete_file))
        .route("/api/uploads/get-upload-url", post(upload_url))
        .route("/api/uploads/direct/:folder/:filename", post(direct_upload))
}
