//! Cloud document repository: versioned file uploads.
//!
//! Every document starts at v1.0 and each upload advances the minor number
//! (v1.9 rolls over to v2.0). Exactly one version per document carries
//! `is_current`; deleting the current version promotes the newest remaining
//! one. Blob bytes live behind [`StorageBackend`]; rows reference them by
//! `file_key`.

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use quill_core::{
    new_v7, CloudDocument, DocumentVersion, DocumentWithVersions, Error, Result, VersionNumber,
};

use crate::storage::StorageBackend;

const VERSION_COLUMNS: &str = "id, document_id, major_version, minor_version, file_key, \
     file_url, storage_provider, uploaded_by, file_size, uploaded_at_utc, is_current";

/// Strip path components and unsafe characters from an uploaded filename
/// before it becomes part of a storage key.
pub fn sanitize_filename(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = basename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "upload.bin".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Storage key for one version's blob.
fn version_key(document_id: Uuid, version: VersionNumber, filename: &str) -> String {
    format!(
        "documents/{}_v{}.{}_{}",
        document_id, version.major, version.minor, filename
    )
}

/// PostgreSQL cloud document repository with pluggable blob storage.
pub struct PgDocumentRepository {
    pool: PgPool,
    backend: Box<dyn StorageBackend>,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool, backend: impl StorageBackend + 'static) -> Self {
        Self {
            pool,
            backend: Box::new(backend),
        }
    }

    /// Create a document from its first upload. The stored version is v1.0
    /// and current.
    pub async fn create_document(
        &self,
        user_id: Uuid,
        title: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<DocumentWithVersions> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Document title is required".to_string()));
        }

        let document_id = new_v7();
        let version = VersionNumber::initial();
        let filename = sanitize_filename(filename);
        let key = version_key(document_id, version, &filename);

        self.backend.write(&key, data).await?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query("INSERT INTO cloud_document (id, user_id, title) VALUES ($1, $2, $3)")
            .bind(document_id)
            .bind(user_id)
            .bind(title)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        self.insert_version_tx(&mut tx, document_id, user_id, version, &key, data.len())
            .await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "documents",
            op = "create_document",
            user_id = %user_id,
            document_id = %document_id,
            "Document created at v1.0"
        );
        self.get(user_id, document_id).await
    }

    /// All of the user's documents with versions, newest version first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<DocumentWithVersions>> {
        let documents = sqlx::query_as::<_, CloudDocument>(
            "SELECT id, user_id, title, created_at_utc FROM cloud_document
             WHERE user_id = $1 ORDER BY created_at_utc DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut out = Vec::with_capacity(documents.len());
        for document in documents {
            let versions = self.versions_of(document.id).await?;
            out.push(DocumentWithVersions {
                id: document.id,
                title: document.title,
                created_at_utc: document.created_at_utc,
                versions,
            });
        }
        Ok(out)
    }

    pub async fn get(&self, user_id: Uuid, document_id: Uuid) -> Result<DocumentWithVersions> {
        let document = self.require_document(user_id, document_id).await?;
        let versions = self.versions_of(document_id).await?;
        Ok(DocumentWithVersions {
            id: document.id,
            title: document.title,
            created_at_utc: document.created_at_utc,
            versions,
        })
    }

    /// Store a new version of an existing document and make it current.
    pub async fn upload_version(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        filename: &str,
        data: &[u8],
    ) -> Result<DocumentVersion> {
        self.require_document(user_id, document_id).await?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let latest = sqlx::query(
            "SELECT major_version, minor_version FROM document_version
             WHERE document_id = $1
             ORDER BY major_version DESC, minor_version DESC LIMIT 1",
        )
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let next = match latest {
            Some(row) => VersionNumber {
                major: row.get("major_version"),
                minor: row.get("minor_version"),
            }
            .next(),
            None => VersionNumber::initial(),
        };

        let filename = sanitize_filename(filename);
        let key = version_key(document_id, next, &filename);
        self.backend.write(&key, data).await?;

        sqlx::query("UPDATE document_version SET is_current = false WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        let version = self
            .insert_version_tx(&mut tx, document_id, user_id, next, &key, data.len())
            .await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "documents",
            op = "upload_version",
            user_id = %user_id,
            document_id = %document_id,
            version = %version.label(),
            "Document version stored"
        );
        Ok(version)
    }

    /// Fetch one version row, checking document ownership.
    pub async fn find_version(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        version_id: Uuid,
    ) -> Result<DocumentVersion> {
        self.require_document(user_id, document_id).await?;
        sqlx::query_as::<_, DocumentVersion>(&format!(
            "SELECT {VERSION_COLUMNS} FROM document_version
             WHERE id = $1 AND document_id = $2"
        ))
        .bind(version_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Version {} not found", version_id)))
    }

    /// Read a version's blob bytes.
    pub async fn download(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        version_id: Uuid,
    ) -> Result<(DocumentVersion, Vec<u8>)> {
        let version = self.find_version(user_id, document_id, version_id).await?;
        let data = self.backend.read(&version.file_key).await?;
        Ok((version, data))
    }

    /// Delete one version. Deleting the current version promotes the newest
    /// remaining one; deleting the last version leaves the document empty.
    pub async fn delete_version(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        version_id: Uuid,
    ) -> Result<()> {
        let version = self.find_version(user_id, document_id, version_id).await?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query("DELETE FROM document_version WHERE id = $1")
            .bind(version_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if version.is_current {
            sqlx::query(
                r#"
                UPDATE document_version SET is_current = true
                WHERE id = (
                    SELECT id FROM document_version WHERE document_id = $1
                    ORDER BY major_version DESC, minor_version DESC LIMIT 1
                )
                "#,
            )
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;

        // Row is gone; a dangling blob is recoverable garbage, not an error.
        if let Err(e) = self.backend.delete(&version.file_key).await {
            warn!(
                subsystem = "db",
                component = "documents",
                document_id = %document_id,
                key = %version.file_key,
                error = %e,
                "Blob cleanup failed after version delete"
            );
        }

        info!(
            subsystem = "db",
            component = "documents",
            op = "delete_version",
            user_id = %user_id,
            document_id = %document_id,
            version = %version.label(),
            "Document version deleted"
        );
        Ok(())
    }

    /// Delete a document, all its versions, and their blobs.
    pub async fn delete_document(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
        self.require_document(user_id, document_id).await?;
        let versions = self.versions_of(document_id).await?;

        // Version rows cascade with the document.
        sqlx::query("DELETE FROM cloud_document WHERE id = $1 AND user_id = $2")
            .bind(document_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        for version in &versions {
            if let Err(e) = self.backend.delete(&version.file_key).await {
                warn!(
                    subsystem = "db",
                    component = "documents",
                    document_id = %document_id,
                    key = %version.file_key,
                    error = %e,
                    "Blob cleanup failed after document delete"
                );
            }
        }

        info!(
            subsystem = "db",
            component = "documents",
            op = "delete_document",
            user_id = %user_id,
            document_id = %document_id,
            count = versions.len(),
            "Document deleted"
        );
        Ok(())
    }

    async fn insert_version_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        uploaded_by: Uuid,
        version: VersionNumber,
        key: &str,
        size: usize,
    ) -> Result<DocumentVersion> {
        sqlx::query_as::<_, DocumentVersion>(&format!(
            r#"
            INSERT INTO document_version
                (id, document_id, major_version, minor_version, file_key, file_url,
                 storage_provider, uploaded_by, file_size, is_current)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, true)
            RETURNING {VERSION_COLUMNS}
            "#
        ))
        .bind(new_v7())
        .bind(document_id)
        .bind(version.major)
        .bind(version.minor)
        .bind(key)
        .bind(self.backend.url_for(key))
        .bind(self.backend.provider())
        .bind(uploaded_by)
        .bind(size as i64)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)
    }

    async fn versions_of(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>> {
        sqlx::query_as::<_, DocumentVersion>(&format!(
            "SELECT {VERSION_COLUMNS} FROM document_version
             WHERE document_id = $1
             ORDER BY major_version DESC, minor_version DESC"
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }

    async fn require_document(&self, user_id: Uuid, document_id: Uuid) -> Result<CloudDocument> {
        sqlx::query_as::<_, CloudDocument>(
            "SELECT id, user_id, title, created_at_utc FROM cloud_document
             WHERE id = $1 AND user_id = $2",
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Document {} not found", document_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\secret.docx"), "secret.docx");
        assert_eq!(sanitize_filename("draft v2.docx"), "draft_v2.docx");
        assert_eq!(sanitize_filename("thesis.pdf"), "thesis.pdf");
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize_filename(""), "upload.bin");
        assert_eq!(sanitize_filename("..."), "upload.bin");
    }

    #[test]
    fn version_key_format() {
        let id = Uuid::nil();
        let key = version_key(id, VersionNumber { major: 1, minor: 2 }, "draft.docx");
        assert_eq!(
            key,
            "documents/00000000-0000-0000-0000-000000000000_v1.2_draft.docx"
        );
    }
}
