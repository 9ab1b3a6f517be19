//! Stored uploads (project images).
//!
//! Paths handed to and returned from a [`BlobStore`] are relative, e.g.
//! `projects/<uuid>.png`. `LocalDisk` keeps them under the configured upload
//! directory, which the router also serves under `/storage`.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `dir` with a generated file name and returns the
    /// relative path.
    async fn put(&self, dir: &str, extension: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Removes a stored file. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL for a stored path
    fn url(&self, path: &str) -> String;
}

pub struct LocalDisk {
    root: PathBuf,
    public_url: String,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path under the root, refusing anything that could escape it
    fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(relative);
        let clean = !relative.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io { path: path.display().to_string(), source }
}

#[async_trait]
impl BlobStore for LocalDisk {
    async fn put(&self, dir: &str, extension: &str, bytes: &[u8]) -> Result<String, StorageError> {
        if !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StorageError::InvalidPath(extension.to_string()));
        }

        let relative = if extension.is_empty() {
            format!("{}/{}", dir, Uuid::new_v4().simple())
        } else {
            format!("{}/{}.{}", dir, Uuid::new_v4().simple(), extension)
        };
        let path = self.resolve(&relative)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error(parent))?;
        }

        // Write next to the target then rename, so readers never see a partial file
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&temp_path, bytes).await.map_err(io_error(&temp_path))?;
        tokio::fs::rename(&temp_path, &path).await.map_err(io_error(&path))?;

        debug!(path = %relative, size = bytes.len(), "Stored upload");
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                debug!(path = %path, "Deleted upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path, "Upload already missing");
                Ok(())
            }
            Err(e) => Err(io_error(&full)(e)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/storage/{}", self.public_url, path)
    }
}
