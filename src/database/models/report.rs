use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::database::store::int_bool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhistleblowerReport {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: String,
    #[serde(deserialize_with = "int_bool")]
    pub is_anonymous: bool,
    pub reference_number: String,
    pub admin_notes: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Pending,
    InProgress,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 3] = [ReportStatus::Pending, ReportStatus::InProgress, ReportStatus::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::InProgress => "In Progress",
            ReportStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid status. Must be one of: {}", Self::ALL.map(|s| s.as_str()).join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_status_labels() {
        assert_eq!("In Progress".parse::<ReportStatus>(), Ok(ReportStatus::InProgress));
        assert!("in progress".parse::<ReportStatus>().is_err());
        assert!("Closed".parse::<ReportStatus>().is_err());
    }
}
