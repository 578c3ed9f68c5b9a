//! Binary storage for images extracted from the notes manuscript.
//!
//! The importer only needs `bytes → id` and `id → url`. [`FsImageStore`]
//! implements that on the local filesystem with content-addressed file
//! names, so storing the same picture twice is a no-op that returns the
//! same id.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;

/// Opaque image storage used by the notes importer.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` (originally named `name` inside the package) and return
    /// the id under which they can be retrieved.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String>;

    /// Public URL for a stored image id.
    fn url(&self, id: &str) -> String;
}

pub struct FsImageStore {
    root: PathBuf,
    base_url: String,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.images_dir, &config.public_base_url)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// `sha256(bytes)` plus the lowercased extension of `name`, if any.
fn content_id(name: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match ext {
        Some(ext) => format!("{}.{}", digest, ext),
        None => digest,
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let id = content_id(name, bytes);
        let path = self.root.join(&id);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(id);
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create image dir: {}", self.root.display()))?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write image: {}", path.display()))?;
        Ok(id)
    }

    fn url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), id)
    }
}
