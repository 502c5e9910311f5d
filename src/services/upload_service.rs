use tracing::info;

use crate::services::ContentError;
use crate::storage::{FileStore, StoredFile, UploadDestination, UploadPolicy, UploadedFile};

/// Generic admin uploads, independent of any content row.
pub struct UploadService {
    files: FileStore,
}

impl UploadService {
    pub fn new(files: FileStore) -> Self {
        Self { files }
    }

    fn policy(&self) -> UploadPolicy {
        UploadPolicy::any(self.files.config())
    }

    pub async fn upload_single(
        &self,
        file: Option<UploadedFile>,
        folder: Option<&str>,
    ) -> Result<StoredFile, ContentError> {
        let file = file.ok_or_else(|| ContentError::validation("No file uploaded", Some("file")))?;
        let stored = self.files.store(&file, &self.policy(), folder).await?;
        info!("Uploaded {}", stored.path);
        Ok(stored)
    }

    /// Every file is checked before any is written; a write failure removes
    /// the files already stored by this batch.
    pub async fn upload_multiple(
        &self,
        files: Vec<UploadedFile>,
        folder: Option<&str>,
    ) -> Result<Vec<StoredFile>, ContentError> {
        if files.is_empty() {
            return Err(ContentError::validation("No files uploaded", Some("files")));
        }
        let max = self.files.config().max_batch_files;
        if files.len() > max {
            return Err(ContentError::validation(
                format!("Too many files; at most {} per upload", max),
                Some("files"),
            ));
        }

        let policy = self.policy();
        for file in &files {
            policy.check(file)?;
        }

        let mut stored: Vec<StoredFile> = Vec::with_capacity(files.len());
        for file in &files {
            match self.files.store(file, &policy, folder).await {
                Ok(s) => stored.push(s),
                Err(e) => {
                    for written in &stored {
                        self.files.delete(&written.path).await;
                    }
                    return Err(e.into());
                }
            }
        }
        info!("Uploaded {} files", stored.len());
        Ok(stored)
    }

    pub async fn delete_by_filename(&self, filename: &str) -> Result<String, ContentError> {
        Ok(self.files.delete_by_filename(filename).await?)
    }

    pub fn upload_destination(
        &self,
        original_name: Option<&str>,
        file_type: Option<&str>,
        folder: Option<&str>,
    ) -> Result<UploadDestination, ContentError> {
        Ok(self
            .files
            .upload_destination(original_name.unwrap_or_default(), file_type, folder)?)
    }

    pub async fn direct_upload(
        &self,
        folder: &str,
        filename: &str,
        file: Option<UploadedFile>,
    ) -> Result<StoredFile, ContentError> {
        let file = file.ok_or_else(|| ContentError::validation("No file uploaded", Some("file")))?;
        Ok(self.files.store_at(folder, filename, &file, &self.policy()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use crate::testing::{pdf, png, temp_store};

    #[tokio::test]
    async fn batch_rejects_disallowed_type_before_writing() {
        let fixture = temp_store().await;
        let uploads = UploadService::new(fixture.files.clone());
        let bad = UploadedFile {
            original_name: "run.exe".to_string(),
            content_type: "application/x-msdownload".to_string(),
            bytes: vec![1, 2, 3],
        };
        let result = uploads.upload_multiple(vec![png("a.png"), bad], None).await;
        assert!(matches!(result, Err(ContentError::Storage(StorageError::UnsupportedType(_)))));
        assert!(!fixture.files.root().join("images").exists());
    }

    #[tokio::test]
    async fn batch_size_is_bounded() {
        let fixture = temp_store().await;
        let uploads = UploadService::new(fixture.files.clone());
        let files = (0..11).map(|i| pdf(&format!("{}.pdf", i))).collect();
        assert!(matches!(
            uploads.upload_multiple(files, None).await,
            Err(ContentError::Validation { .. })
        ));
        assert!(uploads.upload_multiple(vec![], None).await.is_err());
    }

    #[tokio::test]
    async fn direct_upload_lands_at_handed_out_destination() {
        let fixture = temp_store().await;
        let uploads = UploadService::new(fixture.files.clone());
        let dest = uploads
            .upload_destination(Some("scan.pdf"), Some("application/pdf"), None)
            .unwrap();

        let stored = uploads
            .direct_upload("pdfs", &dest.filename, Some(pdf("scan.pdf")))
            .await
            .unwrap();
        assert_eq!(stored.path, dest.file_path);
        assert!(fixture.files.exists(&dest.file_path).await);

        let deleted = uploads.delete_by_filename(&dest.filename).await.unwrap();
        assert_eq!(deleted, dest.file_path);
        assert!(matches!(
            uploads.direct_upload("../", "x.pdf", Some(pdf("x.pdf"))).await,
            Err(ContentError::Storage(StorageError::InvalidFolder(_)))
        ));
    }
}
