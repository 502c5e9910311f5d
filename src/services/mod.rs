pub mod dashboard_service;
pub mod newspaper_service;
pub mod publication_service;
pub mod service_catalog;
pub mod seminar_service;
pub mod upload_service;
pub mod whistleblower_service;

pub use dashboard_service::DashboardService;
pub use newspaper_service::{NewspaperFiles, NewspaperInput, NewspaperService};
pub use publication_service::{PublicationInput, PublicationService};
pub use service_catalog::{ServiceCatalog, ServiceInput, ServiceOrder};
pub use seminar_service::{SeminarInput, SeminarService};
pub use upload_service::UploadService;
pub use whistleblower_service::{ReportSubmission, WhistleblowerService};

use crate::database::clock::normalize_date;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::storage::StorageError;

/// Failures shared by the resource services.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<&'static str>,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ContentError {
    pub fn validation(message: impl Into<String>, field: Option<&'static str>) -> Self {
        ContentError::Validation {
            message: message.into(),
            field,
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Validation { message, field } => ApiError::validation_error(message, field),
            ContentError::NotFound(_) => ApiError::not_found(err.to_string()),
            ContentError::Database(e) => e.into(),
            ContentError::Storage(e) => e.into(),
        }
    }
}

/// Trimmed, non-empty text or a validation failure naming `field`.
pub(crate) fn required_text(value: Option<String>, field: &'static str) -> Result<String, ContentError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ContentError::validation(format!("{} is required", field), Some(field))),
    }
}

/// Parse an optional `YYYY-MM-DD` (or timestamp) field.
pub(crate) fn optional_date(value: Option<String>, field: &'static str) -> Result<Option<String>, ContentError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => normalize_date(&raw)
            .map(Some)
            .ok_or_else(|| ContentError::validation(format!("{} must be a date (YYYY-MM-DD)", field), Some(field))),
    }
}
