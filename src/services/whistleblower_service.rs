use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::database::clock::{months_ago_start, timestamp_now};
use crate::database::models::{ReportStatus, WhistleblowerReport};
use crate::database::store::int_bool;
use crate::database::{from_record, from_records, record_i64, DatabaseError, RelationalStore};
use crate::params;
use crate::services::ContentError;

const REFERENCE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    /// Absent means identified; name and email are kept as sent.
    #[serde(rename = "isAnonymous")]
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedReport {
    #[serde(rename = "referenceNumber")]
    pub reference_number: String,
    #[serde(rename = "isAnonymous")]
    pub is_anonymous: bool,
}

/// The only view of a report available without authentication.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedReport {
    pub reference_number: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_anonymous: bool,
}

/// Admin list entry; notes are only returned by the single-report view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: String,
    #[serde(deserialize_with = "int_bool")]
    pub is_anonymous: bool,
    pub reference_number: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnonymityCounts {
    pub anonymous: i64,
    pub identified: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatistics {
    pub status_counts: Vec<StatusCount>,
    pub monthly_counts: Vec<MonthlyCount>,
    pub anonymous_data: AnonymityCounts,
}

/// Eight uppercase hex characters from four random bytes.
pub fn generate_reference_number() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

pub struct WhistleblowerService {
    store: Arc<dyn RelationalStore>,
}

impl WhistleblowerService {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    /// Persist a public report. Identity fields are dropped for anonymous
    /// reports before anything is written.
    pub async fn submit(&self, submission: ReportSubmission) -> Result<SubmittedReport, ContentError> {
        let message = match submission.message.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => return Err(ContentError::validation("Report message is required", Some("message"))),
        };
        let is_anonymous = submission.is_anonymous.unwrap_or(false);
        let (name, email) = if is_anonymous {
            (None, None)
        } else {
            (
                submission.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                submission.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            )
        };

        let now = timestamp_now();
        for attempt in 1..=REFERENCE_ATTEMPTS {
            let reference_number = generate_reference_number();
            let result = self
                .store
                .execute(
                    "INSERT INTO WhistleblowerReports \
                     (name, email, message, is_anonymous, reference_number, admin_notes, status, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    &params![
                        name.clone(),
                        email.clone(),
                        message.as_str(),
                        is_anonymous,
                        reference_number.as_str(),
                        None::<String>,
                        ReportStatus::Pending.as_str(),
                        now.as_str(),
                        now.as_str()
                    ],
                )
                .await;

            match result {
                Ok(_) => {
                    info!("Whistleblower report {} submitted", reference_number);
                    return Ok(SubmittedReport {
                        reference_number,
                        is_anonymous,
                    });
                }
                Err(DatabaseError::Constraint(_)) if attempt < REFERENCE_ATTEMPTS => {
                    warn!("Reference number collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DatabaseError::QueryError("could not allocate a unique reference number".to_string()).into())
    }

    pub async fn track(&self, reference_number: &str) -> Result<TrackedReport, ContentError> {
        let row = self
            .store
            .query_one(
                "SELECT reference_number, status, created_at, updated_at, is_anonymous \
                 FROM WhistleblowerReports WHERE reference_number = ?",
                &params![reference_number.trim().to_ascii_uppercase()],
            )
            .await?
            .ok_or(ContentError::NotFound("Report"))?;

        let text = |column: &str| {
            row.get(column)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Ok(TrackedReport {
            reference_number: text("reference_number"),
            status: text("status"),
            created_at: text("created_at"),
            updated_at: text("updated_at"),
            is_anonymous: record_i64(&row, "is_anonymous").unwrap_or(1) != 0,
        })
    }

    /// Newest first, optionally restricted to one status.
    pub async fn list(&self, status: Option<&str>) -> Result<Vec<ReportSummary>, ContentError> {
        let base = "SELECT id, name, email, message, is_anonymous, reference_number, status, created_at, updated_at \
                    FROM WhistleblowerReports";
        let rows = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(status) => {
                let status: ReportStatus = status
                    .parse()
                    .map_err(|msg: String| ContentError::validation(msg, Some("status")))?;
                let sql = format!("{} WHERE status = ? ORDER BY created_at DESC, id DESC", base);
                self.store.query_many(&sql, &params![status.as_str()]).await?
            }
            None => {
                let sql = format!("{} ORDER BY created_at DESC, id DESC", base);
                self.store.query_many(&sql, &[]).await?
            }
        };
        Ok(from_records(rows)?)
    }

    pub async fn get(&self, id: i64) -> Result<WhistleblowerReport, ContentError> {
        self.store
            .query_one(
                "SELECT id, name, email, message, is_anonymous, reference_number, admin_notes, status, \
                 created_at, updated_at FROM WhistleblowerReports WHERE id = ?",
                &params![id],
            )
            .await?
            .map(from_record)
            .transpose()?
            .ok_or(ContentError::NotFound("Report"))
    }

    pub async fn update_status(&self, id: i64, status: Option<&str>) -> Result<ReportStatus, ContentError> {
        let status: ReportStatus = status
            .unwrap_or_default()
            .parse()
            .map_err(|msg: String| ContentError::validation(msg, Some("status")))?;

        let result = self
            .store
            .execute(
                "UPDATE WhistleblowerReports SET status = ?, updated_at = ? WHERE id = ?",
                &params![status.as_str(), timestamp_now(), id],
            )
            .await?;
        if result.rows_affected == 0 {
            return Err(ContentError::NotFound("Report"));
        }
        info!("Report {} moved to {}", id, status);
        Ok(status)
    }

    /// Prepend `[timestamp] note` to the report's notes log. The prepend runs
    /// in the store so concurrent notes never overwrite each other.
    pub async fn add_note(&self, id: i64, note: Option<&str>) -> Result<(), ContentError> {
        let note = match note.map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => return Err(ContentError::validation("Note cannot be empty", Some("note"))),
        };

        let now = timestamp_now();
        let entry = format!("[{}] {}\n\n", now, note);
        let result = self
            .store
            .execute(
                "UPDATE WhistleblowerReports SET admin_notes = ? || COALESCE(admin_notes, ''), updated_at = ? \
                 WHERE id = ?",
                &params![entry, now.as_str(), id],
            )
            .await?;
        if result.rows_affected == 0 {
            return Err(ContentError::NotFound("Report"));
        }
        Ok(())
    }

    pub async fn statistics(&self) -> Result<ReportStatistics, ContentError> {
        let status_counts = from_records(
            self.store
                .query_many(
                    "SELECT status, COUNT(*) AS count FROM WhistleblowerReports GROUP BY status ORDER BY status",
                    &[],
                )
                .await?,
        )?;

        // Current month plus the five before it
        let monthly_counts = from_records(
            self.store
                .query_many(
                    "SELECT SUBSTR(created_at, 1, 7) AS month, COUNT(*) AS count FROM WhistleblowerReports \
                     WHERE created_at >= ? GROUP BY SUBSTR(created_at, 1, 7) ORDER BY month",
                    &params![months_ago_start(5)],
                )
                .await?,
        )?;

        let mut anonymous_data = AnonymityCounts::default();
        let rows = self
            .store
            .query_many(
                "SELECT is_anonymous, COUNT(*) AS count FROM WhistleblowerReports GROUP BY is_anonymous",
                &[],
            )
            .await?;
        for row in &rows {
            let count = record_i64(row, "count").unwrap_or(0);
            if record_i64(row, "is_anonymous").unwrap_or(0) != 0 {
                anonymous_data.anonymous += count;
            } else {
                anonymous_data.identified += count;
            }
        }

        Ok(ReportStatistics {
            status_counts,
            monthly_counts,
            anonymous_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::temp_store;
    use std::collections::HashSet;

    fn submission(message: &str, anonymous: Option<bool>) -> ReportSubmission {
        ReportSubmission {
            name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            message: Some(message.to_string()),
            is_anonymous: anonymous,
        }
    }

    #[test]
    fn reference_numbers_are_eight_uppercase_hex() {
        let reference = generate_reference_number();
        assert_eq!(reference.len(), 8);
        assert!(reference.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[tokio::test]
    async fn anonymous_reports_never_store_identity() {
        let fixture = temp_store().await;
        let service = WhistleblowerService::new(fixture.store.clone());

        let submitted = service.submit(submission("fraud", Some(true))).await.unwrap();
        assert!(submitted.is_anonymous);
        let row = fixture
                .store
            .query_one(
                "SELECT name, email FROM WhistleblowerReports WHERE reference_number = ?",
                &params![submitted.reference_number.as_str()],
            )
            .await
            .unwrap()
            .unwrap();
        assert!(row["name"].is_null());
        assert!(row["email"].is_null());
    }

    #[tokio::test]
    async fn missing_flag_keeps_supplied_identity() {
        let fixture = temp_store().await;
        let service = WhistleblowerService::new(fixture.store.clone());

        for flag in [None, Some(false)] {
            let submitted = service.submit(submission("named", flag)).await.unwrap();
            assert!(!submitted.is_anonymous);
            let row = fixture
                .store
                .query_one(
                    "SELECT name, email, is_anonymous FROM WhistleblowerReports WHERE reference_number = ?",
                    &params![submitted.reference_number.as_str()],
                )
                .await
                .unwrap()
                .unwrap();
            assert_eq!(row["name"], "Jane Doe");
            assert_eq!(row["email"], "jane@example.com");
            assert_eq!(row["is_anonymous"], 0);
        }
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let fixture = temp_store().await;
        let service = WhistleblowerService::new(fixture.store.clone());
        assert!(matches!(
            service.submit(submission("   ", None)).await,
            Err(ContentError::Validation { field: Some("message"), .. })
        ));
    }

    #[tokio::test]
    async fn tracking_hides_report_contents() {
        let fixture = temp_store().await;
        let service = WhistleblowerService::new(fixture.store.clone());
        let submitted = service.submit(submission("secret details", Some(false))).await.unwrap();

        let tracked = service.track(&submitted.reference_number).await.unwrap();
        assert_eq!(tracked.status, "Pending");
        assert!(!tracked.is_anonymous);

        let json = serde_json::to_value(&tracked).unwrap();
        let keys: HashSet<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            HashSet::from(["referenceNumber", "status", "createdAt", "updatedAt", "isAnonymous"])
        );
        assert!(matches!(service.track("00000000").await, Err(ContentError::NotFound(_))));
    }

    #[tokio::test]
    async fn thousand_submissions_get_distinct_references() {
        let fixture = temp_store().await;
        let service = WhistleblowerService::new(fixture.store.clone());
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let submitted = service.submit(submission("bulk", None)).await.unwrap();
            assert!(seen.insert(submitted.reference_number));
        }
        assert_eq!(seen.len(), 1000);
    }

    #[tokio::test]
    async fn status_changes_are_validated() {
        let fixture = temp_store().await;
        let service = WhistleblowerService::new(fixture.store.clone());
        service.submit(submission("x", None)).await.unwrap();
        let id = service.list(None).await.unwrap()[0].id;

        assert_eq!(service.update_status(id, Some("In Progress")).await.unwrap(), ReportStatus::InProgress);
        assert!(matches!(
            service.update_status(id, Some("Closed")).await,
            Err(ContentError::Validation { .. })
        ));
        assert!(matches!(
            service.update_status(id + 50, Some("Resolved")).await,
            Err(ContentError::NotFound(_))
        ));
        assert_eq!(service.list(Some("In Progress")).await.unwrap().len(), 1);
        assert!(service.list(Some("Pending")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn notes_are_prepended_newest_first() {
        let fixture = temp_store().await;
        let service = WhistleblowerService::new(fixture.store.clone());
        service.submit(submission("x", None)).await.unwrap();
        let id = service.list(None).await.unwrap()[0].id;

        service.add_note(id, Some("first")).await.unwrap();
        service.add_note(id, Some("second")).await.unwrap();
        assert!(matches!(service.add_note(id, Some(" ")).await, Err(ContentError::Validation { .. })));

        let notes = service.get(id).await.unwrap().admin_notes.unwrap();
        let second_at = notes.find("] second").unwrap();
        let first_at = notes.find("] first").unwrap();
        assert!(second_at < first_at);
        assert!(notes.starts_with('['));
        assert!(notes.ends_with("first\n\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_notes_are_all_kept() {
        let fixture = temp_store().await;
        let service = Arc::new(WhistleblowerService::new(fixture.store.clone()));
        service.submit(submission("x", Some(true))).await.unwrap();
        let id = service.list(None).await.unwrap()[0].id;

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    let note = format!("note-{}", i);
                    let result = service.add_note(id, Some(&note)).await;
                    result
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let notes = service.get(id).await.unwrap().admin_notes.unwrap();
        for i in 0..20 {
            assert!(notes.contains(&format!("] note-{}\n", i)), "note-{} missing", i);
        }
        assert_eq!(notes.matches("] note-").count(), 20);
        assert!(matches!(service.add_note(id + 50, Some("lost")).await, Err(ContentError::NotFound(_))));
    }

    #[tokio::test]
    async fn statistics_aggregate_by_status_month_and_anonymity() {
        let fixture = temp_store().await;
        let service = WhistleblowerService::new(fixture.store.clone());
        service.submit(submission("a", Some(true))).await.unwrap();
        service.submit(submission("b", None)).await.unwrap();
        let id = service.list(None).await.unwrap()[0].id;
        service.update_status(id, Some("Resolved")).await.unwrap();

        let stats = service.statistics().await.unwrap();
        assert_eq!(stats.anonymous_data, AnonymityCounts { anonymous: 1, identified: 1 });
        assert_eq!(stats.status_counts.iter().map(|s| s.count).sum::<i64>(), 2);
        assert_eq!(stats.monthly_counts.len(), 1);
        assert_eq!(stats.monthly_counts[0].count, 2);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("statusCounts").is_some());
        assert!(json.get("anonymousData").is_some());
    }
}
