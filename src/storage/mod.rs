//! Disk-backed store for uploaded documents and images.
//!
//! Files live under `<root>/<folder>/<filename>` and are addressed by the
//! public path `/uploads/<folder>/<filename>`, which is what the database rows
//! keep. Every write is validated against an [`UploadPolicy`] first.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::UploadConfig;

pub const PUBLIC_PREFIX: &str = "/uploads";

pub const FOLDER_PDFS: &str = "pdfs";
pub const FOLDER_IMAGES: &str = "images";
pub const FOLDER_NEWSPAPERS: &str = "newspapers";
pub const FOLDER_DOCUMENTS: &str = "documents";
pub const FOLDER_TEMP: &str = "temp";

pub const FOLDERS: [&str; 5] = [FOLDER_PDFS, FOLDER_IMAGES, FOLDER_NEWSPAPERS, FOLDER_DOCUMENTS, FOLDER_TEMP];

const OFFICE_TYPES: [&str; 4] = [
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const GENERAL_TYPES: [&str; 8] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "application/pdf",
    "text/plain",
    "text/csv",
];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0}")]
    UnsupportedType(String),
    #[error("File too large: {size} bytes exceeds the {limit} byte limit for {policy} uploads")]
    TooLarge {
        policy: &'static str,
        size: usize,
        limit: usize,
    },
    #[error("Invalid file name")]
    InvalidName,
    #[error("Unknown upload folder: {0}")]
    InvalidFolder(String),
    #[error("File not found")]
    NotFound,
    #[error("File storage failure: {0}")]
    Io(#[from] std::io::Error),
}

/// A file received from a client, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    /// Public path, e.g. `/uploads/pdfs/report-1700000000000-0a1b2c3d4e5f6a7b.pdf`.
    pub path: String,
    pub filename: String,
    #[serde(rename = "originalName")]
    pub original_name: String,
    pub size: usize,
    pub mimetype: String,
}

/// Where a client should send a direct upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadDestination {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    pub filename: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
}

#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub name: &'static str,
    pub max_bytes: usize,
    accepts: fn(&str) -> bool,
}

impl UploadPolicy {
    pub fn pdf(config: &UploadConfig) -> Self {
        Self {
            name: "pdf",
            max_bytes: config.pdf_max_bytes,
            accepts: |mime| mime == "application/pdf",
        }
    }

    pub fn image(config: &UploadConfig) -> Self {
        Self {
            name: "image",
            max_bytes: config.image_max_bytes,
            accepts: |mime| mime.starts_with("image/"),
        }
    }

    pub fn newspaper(config: &UploadConfig) -> Self {
        Self {
            name: "newspaper",
            max_bytes: config.newspaper_max_bytes,
            accepts: |mime| mime == "application/pdf" || mime.starts_with("image/"),
        }
    }

    pub fn any(config: &UploadConfig) -> Self {
        Self {
            name: "general",
            max_bytes: config.any_max_bytes,
            accepts: |mime| GENERAL_TYPES.contains(&mime) || OFFICE_TYPES.contains(&mime),
        }
    }

    pub fn check(&self, file: &UploadedFile) -> Result<(), StorageError> {
        let mime = normalized_mime(&file.content_type);
        if !(self.accepts)(&mime) {
            return Err(StorageError::UnsupportedType(match self.name {
                "pdf" => "Only PDF files are allowed".to_string(),
                "image" => "Only image files are allowed".to_string(),
                "newspaper" => "Only PDF and image files are allowed".to_string(),
                _ => format!("File type {} is not allowed", mime),
            }));
        }
        if file.size() > self.max_bytes {
            return Err(StorageError::TooLarge {
                policy: self.name,
                size: file.size(),
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

pub(crate) fn normalized_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Destination folder for a declared MIME type. Types without a dedicated
/// folder go to `requested` when it names a known folder, else `temp`.
pub fn folder_for(content_type: &str, requested: Option<&str>) -> &'static str {
    let mime = normalized_mime(content_type);
    if mime == "application/pdf" {
        FOLDER_PDFS
    } else if mime.starts_with("image/") {
        FOLDER_IMAGES
    } else if OFFICE_TYPES.contains(&mime.as_str()) {
        FOLDER_DOCUMENTS
    } else {
        requested.and_then(known_folder).unwrap_or(FOLDER_TEMP)
    }
}

pub fn known_folder(name: &str) -> Option<&'static str> {
    FOLDERS.iter().copied().find(|folder| *folder == name)
}

/// A bare file name with no separators, traversal or control characters.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.chars().any(|c| c.is_control())
}

fn slugify(stem: &str) -> String {
    let mut slug = String::with_capacity(stem.len());
    let mut pending_dash = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "file".to_string()
    } else {
        slug.chars().take(60).collect::<String>().trim_end_matches('-').to_string()
    }
}

fn extension_for(original_name: &str, content_type: &str) -> Option<String> {
    let from_name = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.or_else(|| {
        let ext = match normalized_mime(content_type).as_str() {
            "application/pdf" => "pdf",
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            "application/msword" => "doc",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
            "application/vnd.ms-excel" => "xls",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
            "text/plain" => "txt",
            "text/csv" => "csv",
            _ => return None,
        };
        Some(ext.to_string())
    })
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// `<slug>-<unix millis>-<16 hex>.<ext>`
pub fn generate_filename(original_name: &str, content_type: &str) -> String {
    let base = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut name = format!("{}-{}-{}", slugify(base), millis, random_hex(8));
    if let Some(ext) = extension_for(original_name, content_type) {
        name.push('.');
        name.push_str(&ext);
    }
    name
}

pub fn public_path(folder: &str, filename: &str) -> String {
    format!("{}/{}/{}", PUBLIC_PREFIX, folder, filename)
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    config: UploadConfig,
}

impl FileStore {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            root: config.root.clone(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Create the root and every known folder.
    pub async fn ensure_layout(&self) -> Result<(), StorageError> {
        for folder in FOLDERS {
            tokio::fs::create_dir_all(self.root.join(folder)).await?;
        }
        info!("Upload directories ready under {}", self.root.display());
        Ok(())
    }

    /// Validate and write `file` under a generated name.
    pub async fn store(
        &self,
        file: &UploadedFile,
        policy: &UploadPolicy,
        requested_folder: Option<&str>,
    ) -> Result<StoredFile, StorageError> {
        policy.check(file)?;
        let folder = folder_for(&file.content_type, requested_folder);
        let filename = generate_filename(&file.original_name, &file.content_type);
        self.write(folder, &filename, file).await
    }

    /// Write `file` verbatim at a destination handed out by [`Self::upload_destination`].
    pub async fn store_at(
        &self,
        folder: &str,
        filename: &str,
        file: &UploadedFile,
        policy: &UploadPolicy,
    ) -> Result<StoredFile, StorageError> {
        let folder = known_folder(folder).ok_or_else(|| StorageError::InvalidFolder(folder.to_string()))?;
        if !is_safe_filename(filename) {
            return Err(StorageError::InvalidName);
        }
        policy.check(file)?;
        self.write(folder, filename, file).await
    }

    async fn write(&self, folder: &'static str, filename: &str, file: &UploadedFile) -> Result<StoredFile, StorageError> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;
        let target = dir.join(filename);
        tokio::fs::write(&target, &file.bytes).await.map_err(|e| {
            error!("Failed to write upload {}: {}", target.display(), e);
            StorageError::Io(e)
        })?;
        debug!("Stored {} ({} bytes)", target.display(), file.size());

        Ok(StoredFile {
            path: public_path(folder, filename),
            filename: filename.to_string(),
            original_name: file.original_name.clone(),
            size: file.size(),
            mimetype: normalized_mime(&file.content_type),
        })
    }

    /// Compute a destination for a client-driven upload without writing anything.
    pub fn upload_destination(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        requested_folder: Option<&str>,
    ) -> Result<UploadDestination, StorageError> {
        let folder = match requested_folder {
            Some(name) => known_folder(name).ok_or_else(|| StorageError::InvalidFolder(name.to_string()))?,
            None => match content_type {
                Some(mime) if folder_for(mime, None) != FOLDER_TEMP => folder_for(mime, None),
                _ => FOLDER_IMAGES,
            },
        };
        let mut filename = random_hex(16);
        if let Some(ext) = extension_for(original_name, content_type.unwrap_or_default()) {
            filename.push('.');
            filename.push_str(&ext);
        }

        Ok(UploadDestination {
            upload_url: format!("/api/uploads/direct/{}/{}", folder, filename),
            file_path: public_path(folder, &filename),
            filename,
        })
    }

    /// Map a public `/uploads/<folder>/<file>` path to its location on disk.
    pub fn resolve(&self, public: &str) -> Option<PathBuf> {
        let rest = public.strip_prefix(PUBLIC_PREFIX)?.strip_prefix('/')?;
        let (folder, filename) = rest.split_once('/')?;
        let folder = known_folder(folder)?;
        if !is_safe_filename(filename) {
            return None;
        }
        Some(self.root.join(folder).join(filename))
    }

    /// Best-effort removal of a stored file; failures are logged only.
    pub async fn delete(&self, public: &str) {
        let Some(path) = self.resolve(public) else {
            warn!("Refusing to delete file outside upload root: {}", public);
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Deleted {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File already gone: {}", path.display());
            }
            Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
        }
    }

    pub async fn delete_optional(&self, public: Option<&str>) {
        if let Some(path) = public.filter(|p| !p.is_empty()) {
            self.delete(path).await;
        }
    }

    /// Delete a file by bare name, searching every known folder.
    pub async fn delete_by_filename(&self, filename: &str) -> Result<String, StorageError> {
        if !is_safe_filename(filename) {
            warn!("Rejected unsafe file name for deletion: {:?}", filename);
            return Err(StorageError::InvalidName);
        }

        for folder in FOLDERS {
            let path = self.root.join(folder).join(filename);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!("Deleted upload {}", path.display());
                    return Ok(public_path(folder, filename));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            }
        }
        Err(StorageError::NotFound)
    }

    pub async fn exists(&self, public: &str) -> bool {
        match self.resolve(public) {
            Some(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            None => false,
        }
    }
}
