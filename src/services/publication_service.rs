use std::sync::Arc;

use tracing::{error, info};

use crate::database::clock::{timestamp_now, today};
use crate::database::models::{Category, Publication};
use crate::database::{from_record, from_records, returned_id, RelationalStore};
use crate::params;
use crate::services::{optional_date, required_text, ContentError};
use crate::storage::{FileStore, UploadPolicy, UploadedFile};

const SELECT_PUBLICATION: &str = "SELECT p.id, p.title, p.content, p.summary, p.category_id, c.name AS category, \
     p.pdf_file_path, p.file_size, p.published_date, p.created_at, p.updated_at \
     FROM Publications p LEFT JOIN Categories c ON p.category_id = c.id";

/// Fields accepted on create and update. Absent fields keep their current
/// value on update.
#[derive(Debug, Clone, Default)]
pub struct PublicationInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub category_id: Option<i64>,
    pub published_date: Option<String>,
}

pub struct PublicationService {
    store: Arc<dyn RelationalStore>,
    files: FileStore,
}

impl PublicationService {
    pub fn new(store: Arc<dyn RelationalStore>, files: FileStore) -> Self {
        Self { store, files }
    }

    /// Newest first, optionally restricted to one category name.
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Publication>, ContentError> {
        let rows = match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(name) => {
                let sql = format!("{} WHERE c.name = ? ORDER BY p.published_date DESC, p.id DESC", SELECT_PUBLICATION);
                self.store.query_many(&sql, &params![name]).await?
            }
            None => {
                let sql = format!("{} ORDER BY p.published_date DESC, p.id DESC", SELECT_PUBLICATION);
                self.store.query_many(&sql, &[]).await?
            }
        };
        Ok(from_records(rows)?)
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ContentError> {
        let rows = self
            .store
            .query_many("SELECT id, name, created_at FROM Categories ORDER BY name", &[])
            .await?;
        Ok(from_records(rows)?)
    }

    pub async fn get(&self, id: i64) -> Result<Publication, ContentError> {
        let sql = format!("{} WHERE p.id = ?", SELECT_PUBLICATION);
        let row = self.store.query_one(&sql, &params![id]).await?;
        row.map(from_record)
            .transpose()?
            .ok_or(ContentError::NotFound("Publication"))
    }

    async fn ensure_category(&self, category_id: Option<i64>) -> Result<(), ContentError> {
        let Some(id) = category_id else {
            return Ok(());
        };
        let row = self
            .store
            .query_one("SELECT id FROM Categories WHERE id = ?", &params![id])
            .await?;
        match row {
            Some(_) => Ok(()),
            None => Err(ContentError::validation(
                format!("Category {} does not exist", id),
                Some("category_id"),
            )),
        }
    }

    pub async fn create(&self, input: PublicationInput, pdf: Option<UploadedFile>) -> Result<Publication, ContentError> {
        let title = required_text(input.title, "title")?;
        let published_date = optional_date(input.published_date, "published_date")?.unwrap_or_else(today);
        self.ensure_category(input.category_id).await?;

        let stored = match pdf {
            Some(file) => Some(self.files.store(&file, &UploadPolicy::pdf(self.files.config()), None).await?),
            None => None,
        };

        let now = timestamp_now();
        let inserted = self
            .store
            .query_one(
                "INSERT INTO Publications \
                 (title, content, summary, category_id, pdf_file_path, file_size, published_date, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
                &params![
                    title,
                    input.content,
                    input.summary,
                    input.category_id,
                    stored.as_ref().map(|f| f.path.clone()),
                    stored.as_ref().map(|f| f.size as i64),
                    published_date,
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .and_then(returned_id);

        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to insert publication: {}", e);
                self.files.delete_optional(stored.as_ref().map(|f| f.path.as_str())).await;
                return Err(e.into());
            }
        };

        info!("Created publication {}", id);
        self.get(id).await
    }

    pub async fn update(
        &self,
        id: i64,
        input: PublicationInput,
        pdf: Option<UploadedFile>,
    ) -> Result<Publication, ContentError> {
        let current = self.get(id).await?;

        let title = match input.title {
            Some(title) => required_text(Some(title), "title")?,
            None => current.title.clone(),
        };
        let published_date = optional_date(input.published_date, "published_date")?.or(current.published_date.clone());
        let category_id = input.category_id.or(current.category_id);
        if input.category_id.is_some() {
            self.ensure_category(category_id).await?;
        }

        let stored = match pdf {
            Some(file) => Some(self.files.store(&file, &UploadPolicy::pdf(self.files.config()), None).await?),
            None => None,
        };
        let (pdf_path, file_size) = match &stored {
            Some(file) => (Some(file.path.clone()), Some(file.size as i64)),
            None => (current.pdf_file_path.clone(), current.file_size),
        };

        let result = self
            .store
            .execute(
                "UPDATE Publications SET title = ?, content = ?, summary = ?, category_id = ?, \
                 pdf_file_path = ?, file_size = ?, published_date = ?, updated_at = ? WHERE id = ?",
                &params![
                    title,
                    input.content.or(current.content.clone()),
                    input.summary.or(current.summary.clone()),
                    category_id,
                    pdf_path,
                    file_size,
                    published_date,
                    timestamp_now(),
                    id
                ],
            )
            .await;

        let new_path = stored.as_ref().map(|f| f.path.as_str());
        match result {
            Ok(r) if r.rows_affected == 0 => {
                self.files.delete_optional(new_path).await;
                return Err(ContentError::NotFound("Publication"));
            }
            Ok(_) => {
                if stored.is_some() {
                    self.files.delete_optional(current.pdf_file_path.as_deref()).await;
                }
            }
            Err(e) => {
                error!("Failed to update publication {}: {}", id, e);
                self.files.delete_optional(new_path).await;
                return Err(e.into());
            }
        }

        info!("Updated publication {}", id);
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        let current = self.get(id).await?;
        let result = self
            .store
            .execute("DELETE FROM Publications WHERE id = ?", &params![id])
            .await?;
        if result.rows_affected == 0 {
            return Err(ContentError::NotFound("Publication"));
        }
        self.files.delete_optional(current.pdf_file_path.as_deref()).await;
        info!("Deleted publication {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pdf, temp_store, FailingStore};

    fn input(title: &str) -> PublicationInput {
        PublicationInput {
            title: Some(title.to_string()),
            content: Some("Body".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_joins_category_and_filters_by_name() {
        let fixture = temp_store().await;
        let service = PublicationService::new(fixture.store.clone(), fixture.files.clone());
        let categories = service.categories().await.unwrap();
        assert_eq!(categories[0].name, "Compliance");

        let governance = categories.iter().find(|c| c.name == "Governance").unwrap().id;
        let created = service
            .create(PublicationInput { category_id: Some(governance), ..input("Board duties") }, None)
            .await
            .unwrap();
        assert_eq!(created.category.as_deref(), Some("Governance"));
        service.create(input("Uncategorized"), None).await.unwrap();

        assert_eq!(service.list(None).await.unwrap().len(), 2);
        let filtered = service.list(Some("Governance")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Board duties");
    }

    #[tokio::test]
    async fn rejects_unknown_category_before_writing_files() {
        let fixture = temp_store().await;
        let service = PublicationService::new(fixture.store.clone(), fixture.files.clone());
        let result = service
            .create(PublicationInput { category_id: Some(999), ..input("X") }, Some(pdf("a.pdf")))
            .await;
        assert!(matches!(result, Err(ContentError::Validation { field: Some("category_id"), .. })));
        assert!(!fixture.files.root().join("pdfs").exists());
    }

    #[tokio::test]
    async fn get_is_stable_between_reads() {
        let fixture = temp_store().await;
        let service = PublicationService::new(fixture.store.clone(), fixture.files.clone());
        let created = service.create(input("Same"), Some(pdf("same.pdf"))).await.unwrap();
        let first = service.get(created.id).await.unwrap();
        let second = service.get(created.id).await.unwrap();
        assert_eq!(first, second);
        assert!(matches!(service.get(created.id + 100).await, Err(ContentError::NotFound(_))));
    }

    #[tokio::test]
    async fn replacing_pdf_deletes_old_file_after_update() {
        let fixture = temp_store().await;
        let service = PublicationService::new(fixture.store.clone(), fixture.files.clone());
        let created = service.create(input("Report"), Some(pdf("v1.pdf"))).await.unwrap();
        let old_path = created.pdf_file_path.clone().unwrap();

        let updated = service
            .update(created.id, PublicationInput::default(), Some(pdf("v2.pdf")))
            .await
            .unwrap();
        let new_path = updated.pdf_file_path.unwrap();
        assert_ne!(new_path, old_path);
        assert_eq!(updated.title, "Report");
        assert!(fixture.files.exists(&new_path).await);
        assert!(!fixture.files.exists(&old_path).await);
    }

    #[tokio::test]
    async fn failed_update_keeps_old_file_and_discards_new_one() {
        let fixture = temp_store().await;
        let service = PublicationService::new(fixture.store.clone(), fixture.files.clone());
        let created = service.create(input("Report"), Some(pdf("v1.pdf"))).await.unwrap();
        let old_path = created.pdf_file_path.clone().unwrap();

        let failing: Arc<dyn RelationalStore> =
            Arc::new(FailingStore::on_statement(fixture.store.clone(), "UPDATE Publications"));
        let broken = PublicationService::new(failing, fixture.files.clone());
        let result = broken.update(created.id, input("Renamed"), Some(pdf("v2.pdf"))).await;
        assert!(matches!(result, Err(ContentError::Database(_))));

        let row = service.get(created.id).await.unwrap();
        assert_eq!(row.pdf_file_path.as_deref(), Some(old_path.as_str()));
        assert!(fixture.files.exists(&old_path).await);

        let remaining = std::fs::read_dir(fixture.files.root().join("pdfs")).unwrap().count();
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn delete_removes_row_and_file() {
        let fixture = temp_store().await;
        let service = PublicationService::new(fixture.store.clone(), fixture.files.clone());
        let created = service.create(input("Gone"), Some(pdf("gone.pdf"))).await.unwrap();
        let path = created.pdf_file_path.unwrap();

        service.delete(created.id).await.unwrap();
        assert!(!fixture.files.exists(&path).await);
        assert!(matches!(service.delete(created.id).await, Err(ContentError::NotFound(_))));
    }
}
