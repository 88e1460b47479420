//! Object store seam used by the chunk pipeline.

use std::path::Path;

use async_trait::async_trait;

use crate::client::S3Client;
use crate::error::StorageResult;

/// Content type of generated subtitle files.
pub const SUBRIP_CONTENT_TYPE: &str = "application/x-subrip";

/// Minimal object store operations the worker needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download `key` into the file at `dest`, creating parent directories.
    async fn download_file(&self, key: &str, dest: &Path) -> StorageResult<()>;

    /// Upload the file at `src` to `key`.
    async fn upload_file(&self, src: &Path, key: &str) -> StorageResult<()>;
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn download_file(&self, key: &str, dest: &Path) -> StorageResult<()> {
        S3Client::download_file(self, key, dest).await
    }

    async fn upload_file(&self, src: &Path, key: &str) -> StorageResult<()> {
        S3Client::upload_file(self, src, key, SUBRIP_CONTENT_TYPE).await
    }
}
