use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub category_id: Option<i64>,
    /// Category name, joined on read.
    #[serde(default)]
    pub category: Option<String>,
    pub pdf_file_path: Option<String>,
    pub file_size: Option<i64>,
    pub published_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
