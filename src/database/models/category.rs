use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: Option<String>,
}

pub const DEFAULT_CATEGORIES: [&str; 4] = ["Governance", "Compliance", "Financial Crimes", "Policy"];
