use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, Uri},
    middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::SecurityConfig;
use crate::error::{set_expose_details, ApiError};
use crate::handlers;
use crate::middleware::log_server_errors;
use crate::state::AppState;
use crate::storage::PUBLIC_PREFIX;

/// Full router with every API group, static uploads and global layers.
pub fn app(state: AppState) -> Router {
    set_expose_details(!state.config.is_production());
    let body_limit = state.config.uploads.max_request_bytes();
    let cors = cors_layer(&state.config.security);
    let uploads = ServeDir::new(state.files.root());

    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(handlers::auth::routes())
        .merge(handlers::publications::routes())
        .merge(handlers::services::routes())
        .merge(handlers::seminars::routes())
        .merge(handlers::newspapers::routes())
        .merge(handlers::whistleblower::routes())
        .merge(handlers::uploads::routes())
        .merge(handlers::admin::routes())
        .nest_service(PUBLIC_PREFIX, uploads)
        .fallback(route_not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(log_server_errors))
                .layer(DefaultBodyLimit::max(body_limit)),
        );

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::route_not_found(uri.path())
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if security.cors_origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    Some(layer.allow_origin(origins))
}
