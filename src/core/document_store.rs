//! Document storage backend.
//!
//! Production deployments point at S3-compatible object storage; local
//! development falls back to a directory on disk. Keys look the same
//! either way: `documents/{registration_id}/{uuid}_{filename}`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cred_core::AppError;
use cred_storage::S3Storage;
use tracing::{debug, info};
use uuid::Uuid;

/// Presigned URLs stay valid long enough for a reviewer to click
/// through, not long enough to be worth sharing.
const PRESIGN_TTL: Duration = Duration::from_secs(15 * 60);

/// Where uploaded files live.
#[derive(Debug, Clone)]
pub enum DocumentStore {
    S3(Arc<S3Storage>),
    Local(LocalStore),
}

impl DocumentStore {
    /// Store a file under the given key.
    pub async fn put(&self, key: &str, content_type: &str, body: Vec<u8>) -> Result<(), AppError> {
        match self {
            Self::S3(storage) => storage.put(key, content_type, body).await,
            Self::Local(store) => store.put(key, body).await,
        }
    }

    /// Fetch a file's bytes by key.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
        match self {
            Self::S3(storage) => storage.get(key).await,
            Self::Local(store) => store.get(key).await,
        }
    }

    /// Delete a file by key. Missing files are not an error.
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        match self {
            Self::S3(storage) => storage.delete(key).await,
            Self::Local(store) => store.delete(key).await,
        }
    }

    /// URL a reviewer can fetch the file from. S3 presigns a direct
    /// link; local storage serves the bytes through the API.
    pub async fn download_url(&self, key: &str, doc_id: Uuid) -> Result<String, AppError> {
        match self {
            Self::S3(storage) => storage.presign_get(key, PRESIGN_TTL).await,
            Self::Local(_) => Ok(format!("/api/documents/{doc_id}/file")),
        }
    }

    /// Backend name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::S3(_) => "s3",
            Self::Local(_) => "local",
        }
    }
}

/// Filesystem-backed store rooted at `MEDIA_ROOT`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!(root = %root.display(), "Local document store initialized");
        Self { root }
    }

    /// Resolve a key inside the root, rejecting traversal segments.
    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let traversal = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_))
        });
        if traversal || relative.as_os_str().is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "Invalid storage key: {key}"
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create media dir: {e}")))?;
        }

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store document: {e}")))?;

        debug!(key = %key, "Document stored on disk");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::not_found("Document file", key))
            }
            Err(e) => Err(AppError::Internal(format!("Failed to read document: {e}"))),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "Document deleted from disk");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!(
                "Failed to delete document: {e}"
            ))),
        }
    }
}

/// Strip a client-supplied filename down to a safe key segment.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Build the storage key for a new upload.
#[must_use]
pub fn document_key(registration_id: Uuid, file_id: Uuid, filename: &str) -> String {
    format!(
        "documents/{registration_id}/{file_id}_{}",
        sanitize_filename(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::Local(LocalStore::new(dir.path()));
        let key = "documents/abc/file.pdf";

        store.put(key, "application/pdf", b"%PDF-1.4".to_vec()).await.unwrap();
        assert_eq!(store.get(key).await.unwrap(), b"%PDF-1.4");

        store.delete(key).await.unwrap();
        assert!(store.get(key).await.is_err());
    }

    #[tokio::test]
    async fn deleting_a_missing_key_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::Local(LocalStore::new(dir.path()));
        assert!(store.delete("documents/none/gone.pdf").await.is_ok());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(store.resolve("../outside.pdf").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
    }

    #[tokio::test]
    async fn local_download_url_points_at_the_api() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::Local(LocalStore::new(dir.path()));
        let id = Uuid::new_v4();
        let url = store.download_url("documents/x/y.pdf", id).await.unwrap();
        assert_eq!(url, format!("/api/documents/{id}/file"));
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("diploma final.pdf"), "diploma_final.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("relatório.pdf"), "relat_rio.pdf");
        assert_eq!(sanitize_filename("///"), "file");
    }

    #[test]
    fn document_keys_carry_registration_and_file_ids() {
        let reg = Uuid::new_v4();
        let file = Uuid::new_v4();
        let key = document_key(reg, file, "cv.pdf");
        assert_eq!(key, format!("documents/{reg}/{file}_cv.pdf"));
    }
}
