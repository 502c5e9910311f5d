// handlers/auth.rs - /api/auth

use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::JsonBody;
use crate::auth::LoginResponse;
use crate::database::models::user::PublicUser;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// POST /api/auth/login - token and public user view
pub async fn login(State(state): State<AppState>, JsonBody(body): JsonBody<LoginRequest>) -> ApiResult<LoginResponse> {
    Ok(ApiResponse::success(state.auth.login(&body.email, &body.password).await?))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, AuthUser(principal): AuthUser) -> ApiResult<PublicUser> {
    Ok(ApiResponse::success(state.auth.current_user(principal.id).await?))
}

/// PUT /api/auth/password
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    JsonBody(body): JsonBody<PasswordChange>,
) -> ApiResult<Value> {
    state
        .auth
        .change_password(principal.id, &body.current_password, &body.new_password)
        .await?;
    Ok(ApiResponse::success(json!({ "message": "Password updated successfully" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/password", put(change_password))
}
