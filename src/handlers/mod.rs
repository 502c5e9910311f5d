// handlers/mod.rs - one module per resource, each exposing `routes()`
//
// Public reads and whistleblower intake need no token; every write goes
// through the AdminUser extractor, the dashboard through EditorUser.

pub mod admin;
pub mod auth;
pub mod extract;
pub mod newspapers;
pub mod publications;
pub mod seminars;
pub mod services;
pub mod uploads;
pub mod whistleblower;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use tracing::error;

use crate::database::clock::timestamp_now;
use crate::state::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Integriting API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth",
            "publications": "/api/publications",
            "services": "/api/services",
            "seminars": "/api/seminars",
            "newspapers": "/api/newspapers",
            "whistleblower": "/api/whistleblower",
            "uploads": "/api/uploads (admin)",
            "admin": "/api/admin/dashboard/stats (editor or admin)",
            "files": "/uploads/:folder/:filename",
        }
    }))
}

/// GET /health - 503 when the store does not answer
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = timestamp_now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            let mut body = json!({
                "status": "degraded",
                "timestamp": now,
                "database": "unavailable"
            });
            if crate::error::expose_details() {
                body["database_error"] = json!(e.to_string());
            }
            (StatusCode::SERVICE_UNAVAILABLE, Json(body))
        }
    }
}
