use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seminar {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub event_date: Option<String>,
    /// `Upcoming`, `Past` or any free-text label.
    pub status: Option<String>,
    pub seats_available: Option<i64>,
    pub location: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
