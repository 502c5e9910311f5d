pub mod auth;
pub mod errors;
pub mod response;

pub use auth::{extract_jwt_from_headers, AdminUser, AuthUser, EditorUser};
pub use errors::log_server_errors;
pub use response::{ApiResponse, ApiResult};
