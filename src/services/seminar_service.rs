use std::sync::Arc;

use tracing::{error, info};

use crate::database::clock::{timestamp_now, today};
use crate::database::models::Seminar;
use crate::database::{from_record, from_records, returned_id, RelationalStore};
use crate::params;
use crate::services::{optional_date, required_text, ContentError};
use crate::storage::{FileStore, UploadPolicy, UploadedFile};

const SELECT_SEMINAR: &str = "SELECT id, title, description, image_path, event_date, status, seats_available, \
     location, created_at, updated_at FROM Seminars";

#[derive(Debug, Clone, Default)]
pub struct SeminarInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub status: Option<String>,
    pub seats_available: Option<i64>,
    pub location: Option<String>,
}

pub struct SeminarService {
    store: Arc<dyn RelationalStore>,
    files: FileStore,
}

impl SeminarService {
    pub fn new(store: Arc<dyn RelationalStore>, files: FileStore) -> Self {
        Self { store, files }
    }

    pub async fn list(&self) -> Result<Vec<Seminar>, ContentError> {
        let sql = format!("{} ORDER BY event_date DESC, id DESC", SELECT_SEMINAR);
        Ok(from_records(self.store.query_many(&sql, &[]).await?)?)
    }

    /// Dated today or later, or explicitly marked `Upcoming`. Soonest first.
    pub async fn upcoming(&self) -> Result<Vec<Seminar>, ContentError> {
        let sql = format!(
            "{} WHERE event_date >= ? OR status = 'Upcoming' ORDER BY event_date ASC, id ASC",
            SELECT_SEMINAR
        );
        Ok(from_records(self.store.query_many(&sql, &params![today()]).await?)?)
    }

    /// Dated before today, or explicitly marked `Past`. Most recent first.
    pub async fn past(&self) -> Result<Vec<Seminar>, ContentError> {
        let sql = format!(
            "{} WHERE event_date < ? OR status = 'Past' ORDER BY event_date DESC, id DESC",
            SELECT_SEMINAR
        );
        Ok(from_records(self.store.query_many(&sql, &params![today()]).await?)?)
    }

    pub async fn get(&self, id: i64) -> Result<Seminar, ContentError> {
        let sql = format!("{} WHERE id = ?", SELECT_SEMINAR);
        self.store
            .query_one(&sql, &params![id])
            .await?
            .map(from_record)
            .transpose()?
            .ok_or(ContentError::NotFound("Seminar"))
    }

    fn check_seats(seats: Option<i64>) -> Result<(), ContentError> {
        match seats {
            Some(n) if n < 0 => Err(ContentError::validation(
                "seats_available cannot be negative",
                Some("seats_available"),
            )),
            _ => Ok(()),
        }
    }

    pub async fn create(&self, input: SeminarInput, image: Option<UploadedFile>) -> Result<Seminar, ContentError> {
        let title = required_text(input.title, "title")?;
        let event_date = optional_date(input.event_date, "event_date")?;
        Self::check_seats(input.seats_available)?;
        let status = input
            .status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Upcoming".to_string());

        let stored = match image {
            Some(file) => Some(self.files.store(&file, &UploadPolicy::image(self.files.config()), None).await?),
            None => None,
        };

        let now = timestamp_now();
        let inserted = self
            .store
            .query_one(
                "INSERT INTO Seminars \
                 (title, description, image_path, event_date, status, seats_available, location, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
                &params![
                    title,
                    input.description,
                    stored.as_ref().map(|f| f.path.clone()),
                    event_date,
                    status,
                    input.seats_available,
                    input.location,
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .and_then(returned_id);

        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to insert seminar: {}", e);
                self.files.delete_optional(stored.as_ref().map(|f| f.path.as_str())).await;
                return Err(e.into());
            }
        };

        info!("Created seminar {}", id);
        self.get(id).await
    }

    pub async fn update(&self, id: i64, input: SeminarInput, image: Option<UploadedFile>) -> Result<Seminar, ContentError> {
        let current = self.get(id).await?;
        let title = match input.title {
            Some(title) => required_text(Some(title), "title")?,
            None => current.title.clone(),
        };
        let event_date = optional_date(input.event_date, "event_date")?.or(current.event_date.clone());
        Self::check_seats(input.seats_available)?;

        let stored = match image {
            Some(file) => Some(self.files.store(&file, &UploadPolicy::image(self.files.config()), None).await?),
            None => None,
        };
        let image_path = stored
            .as_ref()
            .map(|f| f.path.clone())
            .or(current.image_path.clone());

        let result = self
            .store
            .execute(
                "UPDATE Seminars SET title = ?, description = ?, image_path = ?, event_date = ?, status = ?, \
                 seats_available = ?, location = ?, updated_at = ? WHERE id = ?",
                &params![
                    title,
                    input.description.or(current.description.clone()),
                    image_path,
                    event_date,
                    input.status.filter(|s| !s.trim().is_empty()).or(current.status.clone()),
                    input.seats_available.or(current.seats_available),
                    input.location.or(current.location.clone()),
                    timestamp_now(),
                    id
                ],
            )
            .await;

        let new_path = stored.as_ref().map(|f| f.path.as_str());
        match result {
            Ok(r) if r.rows_affected == 0 => {
                self.files.delete_optional(new_path).await;
                return Err(ContentError::NotFound("Seminar"));
            }
            Ok(_) => {
                if stored.is_some() {
                    self.files.delete_optional(current.image_path.as_deref()).await;
                }
            }
            Err(e) => {
                error!("Failed to update seminar {}: {}", id, e);
                self.files.delete_optional(new_path).await;
                return Err(e.into());
            }
        }

        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        let current = self.get(id).await?;
        let result = self.store.execute("DELETE FROM Seminars WHERE id = ?", &params![id]).await?;
        if result.rows_affected == 0 {
            return Err(ContentError::NotFound("Seminar"));
        }
        self.files.delete_optional(current.image_path.as_deref()).await;
        info!("Deleted seminar {}", id);
        Ok(())
    }
}
