// HTTP API Error Types
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::storage::StorageError;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Include internal error detail in response bodies. Enabled outside production.
pub fn set_expose_details(expose: bool) {
    EXPOSE_DETAILS.store(expose, Ordering::Relaxed);
}

pub fn expose_details() -> bool {
    EXPOSE_DETAILS.load(Ordering::Relaxed)
}

/// Internal cause of a 5xx response, attached as a response extension for
/// the error logging layer.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field: Option<String>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),
    RouteNotFound(String),

    // 409 Conflict
    Conflict { message: String, detail: Option<String> },

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500 Internal Server Error
    InternalServerError { message: String, detail: Option<String> },

    // 503 Service Unavailable
    ServiceUnavailable { message: String, detail: Option<String> },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::RouteNotFound(_) => 404,
            ApiError::Conflict { .. } => 409,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::InternalServerError { .. } => 500,
            ApiError::ServiceUnavailable { .. } => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::RouteNotFound(msg) => msg,
            ApiError::Conflict { message, .. } => message,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::ServiceUnavailable { message, .. } => message,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }

    /// Internal cause, never shown to clients in production
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Conflict { detail, .. }
            | ApiError::InternalServerError { detail, .. }
            | ApiError::ServiceUnavailable { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "message": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError { field: Some(field), .. } = self {
            error["field"] = json!(field);
        }
        if expose_details() {
            if let Some(detail) = self.detail() {
                error["detail"] = json!(detail);
            }
        }

        json!({
            "message": self.message(),
            "error": error
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field: Option<&str>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn route_not_found(path: &str) -> Self {
        ApiError::RouteNotFound(format!("Route not found: {}", path))
    }

    pub fn conflict(message: impl Into<String>, detail: Option<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            detail,
        }
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn service_unavailable(message: impl Into<String>, detail: Option<String>) -> Self {
        ApiError::ServiceUnavailable {
            message: message.into(),
            detail,
        }
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Constraint(msg) => {
                ApiError::conflict("Request conflicts with existing data", Some(msg))
            }
            DatabaseError::UnsupportedBackend(scheme) => ApiError::service_unavailable(
                "Database temporarily unavailable",
                Some(format!("unsupported database scheme {}", scheme)),
            ),
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) => ApiError::service_unavailable(
                "Database temporarily unavailable",
                Some("connection pool timed out".to_string()),
            ),
            // Don't expose internal SQL errors to clients
            other => ApiError::internal_server_error("Database error occurred", other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedType(msg) => ApiError::validation_error(msg, Some("file")),
            StorageError::TooLarge { .. } => ApiError::payload_too_large(err.to_string()),
            StorageError::InvalidName => ApiError::validation_error("Invalid filename", Some("filename")),
            StorageError::InvalidFolder(_) => ApiError::validation_error(err.to_string(), Some("folder")),
            StorageError::NotFound => ApiError::not_found("File not found"),
            StorageError::Io(e) => ApiError::internal_server_error("File storage error occurred", e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid email or password"),
            AuthError::InvalidToken => ApiError::unauthorized("Invalid or expired token"),
            AuthError::Forbidden => ApiError::forbidden("Access denied. Insufficient permissions."),
            AuthError::NotFound => ApiError::not_found("User not found"),
            AuthError::Validation(msg) => ApiError::validation_error(msg, None),
            AuthError::Database(e) => e.into(),
            AuthError::Password(e) => ApiError::internal_server_error("Authentication failed", e.to_string()),
            AuthError::Token(e) => ApiError::internal_server_error("Authentication failed", e.to_string()),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.to_json())).into_response();
        if status.is_server_error() {
            let detail = self.detail().unwrap_or(self.message()).to_string();
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
