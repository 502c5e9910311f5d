use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::auth::{require_role, AccessLevel, Principal};
use crate::error::ApiError;
use crate::state::AppState;

/// Any caller holding a valid token.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser(pub Principal);

/// Caller with the editor or admin role.
#[derive(Clone, Copy, Debug)]
pub struct EditorUser(pub Principal);

/// Caller with the admin role.
#[derive(Clone, Copy, Debug)]
pub struct AdminUser(pub Principal);

async fn authorize(parts: &Parts, state: &AppState, level: AccessLevel) -> Result<Principal, ApiError> {
    let token = extract_jwt_from_headers(&parts.headers).map_err(ApiError::unauthorized)?;
    Ok(require_role(&state.auth, &token, level).await?)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authorize(parts, state, AccessLevel::Authenticated).await.map(AuthUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for EditorUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authorize(parts, state, AccessLevel::EditorOrAdmin).await.map(EditorUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authorize(parts, state, AccessLevel::Admin).await.map(AdminUser)
    }
}

/// Extract JWT token from Authorization header
pub fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "No token provided, authorization denied".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
