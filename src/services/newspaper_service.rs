use std::sync::Arc;

use tracing::{error, info};

use crate::database::clock::{timestamp_now, today};
use crate::database::models::Newspaper;
use crate::database::{from_record, from_records, record_i64, returned_id, RelationalStore};
use crate::params;
use crate::services::{optional_date, required_text, ContentError};
use crate::storage::{FileStore, StoredFile, UploadPolicy, UploadedFile};

const SELECT_NEWSPAPER: &str = "SELECT id, title, description, pdf_file_path, issue_date, cover_image_path, \
     created_at, updated_at FROM Newspapers";

#[derive(Debug, Clone, Default)]
pub struct NewspaperInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub issue_date: Option<String>,
}

/// Files sent with a newspaper create or update.
#[derive(Debug, Clone, Default)]
pub struct NewspaperFiles {
    pub pdf: Option<UploadedFile>,
    pub cover: Option<UploadedFile>,
}

pub struct NewspaperService {
    store: Arc<dyn RelationalStore>,
    files: FileStore,
}

impl NewspaperService {
    pub fn new(store: Arc<dyn RelationalStore>, files: FileStore) -> Self {
        Self { store, files }
    }

    /// `year` of `None` or `"All"` lists every issue.
    pub async fn list(&self, year: Option<&str>) -> Result<Vec<Newspaper>, ContentError> {
        let rows = match year.map(str::trim).filter(|y| !y.is_empty() && *y != "All") {
            Some(year) => {
                if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ContentError::validation("year must be a four digit year", Some("year")));
                }
                let sql = format!(
                    "{} WHERE SUBSTR(issue_date, 1, 4) = ? ORDER BY issue_date DESC, id DESC",
                    SELECT_NEWSPAPER
                );
                self.store.query_many(&sql, &params![year]).await?
            }
            None => {
                let sql = format!("{} ORDER BY issue_date DESC, id DESC", SELECT_NEWSPAPER);
                self.store.query_many(&sql, &[]).await?
            }
        };
        Ok(from_records(rows)?)
    }

    pub async fn latest(&self) -> Result<Newspaper, ContentError> {
        let sql = format!("{} ORDER BY issue_date DESC, id DESC LIMIT 1", SELECT_NEWSPAPER);
        self.store
            .query_one(&sql, &[])
            .await?
            .map(from_record)
            .transpose()?
            .ok_or(ContentError::NotFound("Newspaper"))
    }

    /// Distinct issue years, newest first.
    pub async fn years(&self) -> Result<Vec<i64>, ContentError> {
        let rows = self
            .store
            .query_many(
                "SELECT DISTINCT CAST(SUBSTR(issue_date, 1, 4) AS INTEGER) AS year FROM Newspapers \
                 WHERE issue_date IS NOT NULL ORDER BY year DESC",
                &[],
            )
            .await?;
        Ok(rows.iter().filter_map(|r| record_i64(r, "year")).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Newspaper, ContentError> {
        let sql = format!("{} WHERE id = ?", SELECT_NEWSPAPER);
        self.store
            .query_one(&sql, &params![id])
            .await?
            .map(from_record)
            .transpose()?
            .ok_or(ContentError::NotFound("Newspaper"))
    }

    /// Store the supplied files, removing any already written if a later one fails.
    async fn store_files(&self, files: NewspaperFiles) -> Result<(Option<StoredFile>, Option<StoredFile>), ContentError> {
        let policy = UploadPolicy::newspaper(self.files.config());
        let pdf = match files.pdf {
            Some(file) => {
                if crate::storage::normalized_mime(&file.content_type) != "application/pdf" {
                    return Err(ContentError::validation("pdf_file must be a PDF document", Some("pdf_file")));
                }
                Some(self.files.store(&file, &policy, None).await?)
            }
            None => None,
        };
        let cover = match files.cover {
            Some(file) => match self.files.store(&file, &policy, None).await {
                Ok(stored) => Some(stored),
                Err(e) => {
                    self.discard(&pdf, &None).await;
                    return Err(e.into());
                }
            },
            None => None,
        };
        Ok((pdf, cover))
    }

    async fn discard(&self, pdf: &Option<StoredFile>, cover: &Option<StoredFile>) {
        self.files.delete_optional(pdf.as_ref().map(|f| f.path.as_str())).await;
        self.files.delete_optional(cover.as_ref().map(|f| f.path.as_str())).await;
    }

    pub async fn create(&self, input: NewspaperInput, files: NewspaperFiles) -> Result<Newspaper, ContentError> {
        if files.pdf.is_none() {
            return Err(ContentError::validation("PDF file is required", Some("pdf_file")));
        }
        let title = required_text(input.title, "title")?;
        let issue_date = optional_date(input.issue_date, "issue_date")?.unwrap_or_else(today);

        let (pdf, cover) = self.store_files(files).await?;
        let Some(pdf_path) = pdf.as_ref().map(|f| f.path.clone()) else {
            return Err(ContentError::validation("PDF file is required", Some("pdf_file")));
        };

        let now = timestamp_now();
        let inserted = self
            .store
            .query_one(
                "INSERT INTO Newspapers (title, description, pdf_file_path, issue_date, cover_image_path, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
                &params![
                    title,
                    input.description,
                    pdf_path,
                    issue_date,
                    cover.as_ref().map(|f| f.path.clone()),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .and_then(returned_id);

        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to insert newspaper: {}", e);
                self.discard(&pdf, &cover).await;
                return Err(e.into());
            }
        };

        info!("Created newspaper {}", id);
        self.get(id).await
    }

    pub async fn update(&self, id: i64, input: NewspaperInput, files: NewspaperFiles) -> Result<Newspaper, ContentError> {
        let current = self.get(id).await?;
        let title = match input.title {
            Some(title) => required_text(Some(title), "title")?,
            None => current.title.clone(),
        };
        let issue_date = optional_date(input.issue_date, "issue_date")?.or(current.issue_date.clone());

        let (pdf, cover) = self.store_files(files).await?;
        let pdf_path = pdf
            .as_ref()
            .map(|f| f.path.clone())
            .unwrap_or_else(|| current.pdf_file_path.clone());
        let cover_path = cover
            .as_ref()
            .map(|f| f.path.clone())
            .or(current.cover_image_path.clone());

        let result = self
            .store
            .execute(
                "UPDATE Newspapers SET title = ?, description = ?, pdf_file_path = ?, issue_date = ?, \
                 cover_image_path = ?, updated_at = ? WHERE id = ?",
                &params![
                    title,
                    input.description.or(current.description.clone()),
                    pdf_path,
                    issue_date,
                    cover_path,
                    timestamp_now(),
                    id
                ],
            )
            .await;

        match result {
            Ok(r) if r.rows_affected == 0 => {
                self.discard(&pdf, &cover).await;
                return Err(ContentError::NotFound("Newspaper"));
            }
            Ok(_) => {
                if pdf.is_some() {
                    self.files.delete(&current.pdf_file_path).await;
                }
                if cover.is_some() {
                    self.files.delete_optional(current.cover_image_path.as_deref()).await;
                }
            }
            Err(e) => {
                error!("Failed to update newspaper {}: {}", id, e);
                self.discard(&pdf, &cover).await;
                return Err(e.into());
            }
        }

        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        let current = self.get(id).await?;
        let result = self.store.execute("DELETE FROM Newspapers WHERE id = ?", &params![id]).await?;
        if result.rows_affected == 0 {
            return Err(ContentError::NotFound("Newspaper"));
        }
        self.files.delete(&current.pdf_file_path).await;
        self.files.delete_optional(current.cover_image_path.as_deref()).await;
        info!("Deleted newspaper {}", id);
        Ok(())
    }
}
