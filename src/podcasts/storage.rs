// src/podcasts/storage.rs
//! Local storage for uploaded podcast source documents

use std::path::{Path, PathBuf};
use tokio::fs as tokio_fs;
use tracing::{error, info, warn};

use crate::common::{generate_raw_id, ApiError};

const SOURCES_DIR: &str = "podcast_sources";

pub struct SourceStorage {
    root: PathBuf,
}

impl SourceStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a document and return its path relative to the storage root
    pub async fn store(&self, extension: &str, data: &[u8]) -> Result<String, ApiError> {
        let dir = self.root.join(SOURCES_DIR);
        tokio_fs::create_dir_all(&dir).await.map_err(|e| {
            error!(error = %e, dir = %dir.display(), "Failed to create sources directory");
            ApiError::InternalServer("Failed to store source file".to_string())
        })?;

        let filename = format!("{}.{}", generate_raw_id(24).to_lowercase(), extension);
        let file_path = dir.join(&filename);
        tokio_fs::write(&file_path, data).await.map_err(|e| {
            error!(error = %e, file_path = %file_path.display(), "Failed to save source file");
            ApiError::InternalServer("Failed to store source file".to_string())
        })?;

        info!(filename = %filename, size = data.len(), "Source file stored");
        Ok(format!("{}/{}", SOURCES_DIR, filename))
    }

    /// Best-effort removal; a missing file is not an error
    pub async fn remove(&self, relative_path: &str) {
        if relative_path.split('/').any(|part| part == "..") {
            warn!(path = %relative_path, "Refusing to remove path outside storage");
            return;
        }
        let path = self.root.join(relative_path);
        if let Err(e) = tokio_fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, path = %path.display(), "Failed to remove source file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("podcast_api_storage_{}", generate_raw_id(10)))
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let storage = SourceStorage::new(temp_root());

        let relative = storage.store("txt", b"hello").await.unwrap();
        assert!(relative.starts_with("podcast_sources/"));
        assert!(relative.ends_with(".txt"));

        let absolute = storage.root().join(&relative);
        assert_eq!(tokio_fs::read(&absolute).await.unwrap(), b"hello");

        storage.remove(&relative).await;
        assert!(!absolute.exists());

        // Second removal is a no-op
        storage.remove(&relative).await;
        let _ = tokio_fs::remove_dir_all(storage.root()).await;
    }
}
