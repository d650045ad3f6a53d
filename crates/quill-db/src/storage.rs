//! Pluggable blob storage for document version files.
//!
//! The repository layer records a `file_key` per stored version; the backend
//! maps keys to bytes. The filesystem backend is the only one shipped, but
//! the trait keeps S3-style providers possible without touching callers.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use quill_core::Result;

/// Storage backend trait for different storage implementations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data under the given key.
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Read data stored under the given key.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete data stored under the given key. Missing keys are not errors.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether data exists under the given key.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Stable URL under which the blob is served.
    fn url_for(&self, key: &str) -> String;

    /// Provider name recorded on each stored version, e.g. `"filesystem"`.
    fn provider(&self) -> &'static str;
}

/// Filesystem storage backend rooted at a base directory.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    /// Validate that the backend can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (overlayfs quirks, permission errors, missing directories) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(key);
        debug!(key = %key, full_path = %full_path.display(), size = data.len(), "storage: write");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "storage: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "storage: File::create failed");
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "storage: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "storage: rename failed");
            e
        })?;

        // 0644, no execute
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(key);
        Ok(fs::read(full_path).await?)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key);
        if tokio::fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full_path = self.full_path(key);
        Ok(tokio::fs::try_exists(full_path).await?)
    }

    fn url_for(&self, key: &str) -> String {
        format!("/files/{}", key)
    }

    fn provider(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        backend
            .write("documents/abc_v1.0_draft.docx", b"hello")
            .await
            .unwrap();
        assert!(backend.exists("documents/abc_v1.0_draft.docx").await.unwrap());
        assert_eq!(
            backend.read("documents/abc_v1.0_draft.docx").await.unwrap(),
            b"hello"
        );

        backend.delete("documents/abc_v1.0_draft.docx").await.unwrap();
        assert!(!backend.exists("documents/abc_v1.0_draft.docx").await.unwrap());
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        backend.delete("documents/nope.bin").await.unwrap();
    }

    #[tokio::test]
    async fn validate_passes_on_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        backend.validate().await.unwrap();
    }

    #[test]
    fn url_for_prefixes_files_route() {
        let backend = FilesystemBackend::new("/tmp/blobs");
        assert_eq!(backend.url_for("documents/a.docx"), "/files/documents/a.docx");
    }
}
