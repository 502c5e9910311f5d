use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Newspaper {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub pdf_file_path: String,
    pub issue_date: Option<String>,
    pub cover_image_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
