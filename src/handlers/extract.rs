// handlers/extract.rs - request extractors shared by the resource handlers

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{
        multipart::MultipartError,
        rejection::{FormRejection, JsonRejection},
        FromRequest, FromRequestParts, Multipart, Path, Request,
    },
    http::{header::CONTENT_TYPE, request::Parts, StatusCode},
    Form, Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::storage::UploadedFile;

/// Text fields and files of a write request. Accepts multipart, JSON objects
/// and urlencoded bodies so content endpoints work with or without a file.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FormData {
    pub fn text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// Blank values count as absent.
    pub fn int(&mut self, name: &'static str) -> Result<Option<i64>, ApiError> {
        match self.text(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::validation_error(format!("{} must be an integer", name), Some(name))),
        }
    }

    pub fn file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name).and_then(|mut files| {
            if files.is_empty() {
                None
            } else {
                Some(files.remove(0))
            }
        })
    }

    pub fn files(&mut self, name: &str) -> Vec<UploadedFile> {
        self.files.remove(name).unwrap_or_default()
    }

    fn insert_json(&mut self, object: serde_json::Map<String, Value>) {
        for (key, value) in object {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                other => other.to_string(),
            };
            self.fields.insert(key, text);
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut form = FormData::default();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
                let name = field.name().unwrap_or_default().to_string();
                match field.file_name().map(str::to_string) {
                    Some(original_name) => {
                        let content_type = field
                            .content_type()
                            .unwrap_or("application/octet-stream")
                            .to_string();
                        let bytes = field.bytes().await.map_err(multipart_error)?;
                        // Browsers send an empty part for an untouched file input
                        if original_name.is_empty() && bytes.is_empty() {
                            continue;
                        }
                        form.files.entry(name).or_default().push(UploadedFile {
                            original_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        });
                    }
                    None => {
                        let text = field.text().await.map_err(multipart_error)?;
                        form.fields.insert(name, text);
                    }
                }
            }
        } else if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state).await.map_err(json_rejection)?;
            match value {
                Value::Object(object) => form.insert_json(object),
                _ => return Err(ApiError::bad_request("Request body must be a JSON object")),
            }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(form_rejection)?;
            form.fields = fields;
        }

        Ok(form)
    }
}

/// `Json<T>` whose rejections use the API error envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(json_rejection)?;
        Ok(JsonBody(value))
    }
}

/// Numeric `:id` path segment.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        params
            .get("id")
            .and_then(|raw| raw.parse().ok())
            .map(IdPath)
            .ok_or_else(|| ApiError::validation_error("Invalid id", Some("id")))
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Request body too large")
    } else {
        ApiError::bad_request(err.body_text())
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Request body too large")
    } else {
        ApiError::bad_request(rejection.body_text())
    }
}

fn form_rejection(rejection: FormRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Request body too large")
    } else {
        ApiError::bad_request(rejection.body_text())
    }
}
