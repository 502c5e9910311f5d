use axum::{extract::Request, middleware::Next, response::Response};
use tracing::error;

use crate::database::clock::timestamp_now;
use crate::error::ErrorDetail;

/// Logs request context for every 5xx response, including the internal cause
/// the response body may have withheld.
pub async fn log_server_errors(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();

    let response = next.run(request).await;

    let status = response.status();
    if status.is_server_error() {
        let detail = response
            .extensions()
            .get::<ErrorDetail>()
            .map(|d| d.0.as_str())
            .unwrap_or("no detail recorded");
        error!(
            method = %method,
            path = %path,
            query = %query,
            status = status.as_u16(),
            timestamp = %timestamp_now(),
            "Request failed: {}",
            detail
        );
    }
    response
}
