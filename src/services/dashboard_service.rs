use std::sync::Arc;

use serde::Serialize;

use crate::database::clock::timestamp_days_ago;
use crate::database::{record_i64, Record, RelationalStore};
use crate::params;
use crate::services::ContentError;

const RECENT_ACTIVITY: usize = 5;
const PERIOD_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub publications: i64,
    pub publications_change: i64,
    pub services: i64,
    pub services_change: i64,
    pub seminars: i64,
    pub seminars_change: i64,
    pub newspapers: i64,
    pub newspapers_change: i64,
    pub whistleblower_reports: i64,
    pub reports_change: i64,
    pub recent_activity: Vec<Activity>,
}

/// Entity totals and their change over the last period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TableCounts {
    total: i64,
    change: i64,
}

pub struct DashboardService {
    store: Arc<dyn RelationalStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    /// `change` is rows created in the last 30 days minus rows created in the 30 days before.
    async fn counts(&self, table: &str) -> Result<TableCounts, ContentError> {
        let current_start = timestamp_days_ago(PERIOD_DAYS);
        let previous_start = timestamp_days_ago(PERIOD_DAYS * 2);
        let sql = format!(
            "SELECT COUNT(*) AS total, \
             COALESCE(SUM(CASE WHEN created_at >= ? THEN 1 ELSE 0 END), 0) AS current_period, \
             COALESCE(SUM(CASE WHEN created_at >= ? AND created_at < ? THEN 1 ELSE 0 END), 0) AS previous_period \
             FROM {}",
            table
        );
        let row = self
            .store
            .query_one(&sql, &params![current_start.as_str(), previous_start.as_str(), current_start.as_str()])
            .await?
            .unwrap_or_default();

        let get = |column: &str| record_i64(&row, column).unwrap_or(0);
        Ok(TableCounts {
            total: get("total"),
            change: get("current_period") - get("previous_period"),
        })
    }

    async fn recent(&self, sql: &str, kind: &'static str) -> Result<Vec<Activity>, ContentError> {
        let rows = self.store.query_many(sql, &params![RECENT_ACTIVITY as i64]).await?;
        Ok(rows.iter().filter_map(|row| activity(row, kind)).collect())
    }

    pub async fn stats(&self) -> Result<DashboardStats, ContentError> {
        let publications = self.counts("Publications").await?;
        let services = self.counts("Services").await?;
        let seminars = self.counts("Seminars").await?;
        let newspapers = self.counts("Newspapers").await?;
        let reports = self.counts("WhistleblowerReports").await?;

        let mut recent_activity = Vec::new();
        recent_activity.extend(
            self.recent(
                "SELECT id, title, created_at FROM Publications ORDER BY created_at DESC LIMIT ?",
                "publication",
            )
            .await?,
        );
        recent_activity.extend(
            self.recent(
                "SELECT id, title, created_at FROM Seminars ORDER BY created_at DESC LIMIT ?",
                "seminar",
            )
            .await?,
        );
        recent_activity.extend(
            self.recent(
                "SELECT id, title, created_at FROM Newspapers ORDER BY created_at DESC LIMIT ?",
                "newspaper",
            )
            .await?,
        );
        recent_activity.extend(
            self.recent(
                "SELECT id, 'Whistleblower report received' AS title, created_at FROM WhistleblowerReports \
                 ORDER BY created_at DESC LIMIT ?",
                "report",
            )
            .await?,
        );
        recent_activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent_activity.truncate(RECENT_ACTIVITY);

        Ok(DashboardStats {
            publications: publications.total,
            publications_change: publications.change,
            services: services.total,
            services_change: services.change,
            seminars: seminars.total,
            seminars_change: seminars.change,
            newspapers: newspapers.total,
            newspapers_change: newspapers.change,
            whistleblower_reports: reports.total,
            reports_change: reports.change,
            recent_activity,
        })
    }
}

fn activity(row: &Record, kind: &'static str) -> Option<Activity> {
    Some(Activity {
        id: record_i64(row, "id")?,
        kind,
        title: row.get("title")?.as_str()?.to_string(),
        timestamp: row.get("created_at")?.as_str()?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ReportSubmission, ServiceCatalog, ServiceInput, WhistleblowerService};
    use crate::testing::temp_store;

    #[tokio::test]
    async fn counts_recent_rows_and_lists_latest_activity() {
        let fixture = temp_store().await;
        let catalog = ServiceCatalog::new(fixture.store.clone());
        for title in ["A", "B"] {
            catalog
                .create(ServiceInput {
                    title: Some(title.to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        // Created two months ago: counts toward the total, not the change
        fixture
            .store
            .execute(
                "INSERT INTO Publications (title, created_at, updated_at) VALUES ('Old', ?, ?)",
                &params![timestamp_days_ago(45), timestamp_days_ago(45)],
            )
            .await
            .unwrap();
        WhistleblowerService::new(fixture.store.clone())
            .submit(ReportSubmission {
                message: Some("m".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let stats = DashboardService::new(fixture.store.clone()).stats().await.unwrap();
        assert_eq!(stats.services, 2);
        assert_eq!(stats.services_change, 2);
        assert_eq!(stats.publications, 1);
        assert_eq!(stats.publications_change, -1);
        assert_eq!(stats.whistleblower_reports, 1);

        assert_eq!(stats.recent_activity.len(), 2);
        assert_eq!(stats.recent_activity[0].kind, "report");
        assert_eq!(stats.recent_activity[1].title, "Old");
    }
}
