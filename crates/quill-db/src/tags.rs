//! Tag repository for the reference board.
//!
//! Tags are owner-scoped; names are unique per owner and matched
//! case-sensitively. Assignment rows live in `reference_tag`.

use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use quill_core::{new_v7, Error, ReferenceWithTags, Result, Tag, TagStat};

/// Validate a tag name: non-empty after trimming, at most 50 characters.
pub fn validate_tag_name(name: &str) -> std::result::Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if name.len() > 50 {
        return Err("Tag name must be 50 characters or less".to_string());
    }
    Ok(name.to_string())
}

/// PostgreSQL tag repository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: PgPool,
}

impl PgTagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the user's tag by name, creating it if absent.
    pub async fn get_or_create(&self, user_id: Uuid, name: &str) -> Result<Tag> {
        let name = validate_tag_name(name).map_err(Error::InvalidInput)?;

        // ON CONFLICT DO NOTHING returns no row for the existing-tag case,
        // so fall through to a plain select.
        let inserted = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tag (id, user_id, name) VALUES ($1, $2, $3)
            ON CONFLICT (user_id, name) DO NOTHING
            RETURNING id, user_id, name
            "#,
        )
        .bind(new_v7())
        .bind(user_id)
        .bind(&name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match inserted {
            Some(tag) => Ok(tag),
            None => sqlx::query_as::<_, Tag>(
                "SELECT id, user_id, name FROM tag WHERE user_id = $1 AND name = $2",
            )
            .bind(user_id)
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database),
        }
    }

    /// All of the user's tags, alphabetical.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Tag>> {
        sqlx::query_as::<_, Tag>(
            "SELECT id, user_id, name FROM tag WHERE user_id = $1 ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }

    /// Usage counts per tag name, most used first.
    pub async fn stats(&self, user_id: Uuid) -> Result<Vec<TagStat>> {
        sqlx::query_as::<_, TagStat>(
            r#"
            SELECT t.name AS tag, COUNT(rt.id) AS count
            FROM tag t
            LEFT JOIN reference_tag rt ON rt.tag_id = t.id
            WHERE t.user_id = $1
            GROUP BY t.id, t.name
            ORDER BY count DESC, t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }

    /// Attach a tag (created on demand) to one of the user's references.
    /// Re-assigning an already attached tag is a no-op.
    pub async fn assign(&self, user_id: Uuid, reference_id: Uuid, name: &str) -> Result<Tag> {
        self.require_reference(user_id, reference_id).await?;
        let tag = self.get_or_create(user_id, name).await?;

        sqlx::query(
            "INSERT INTO reference_tag (id, reference_id, tag_id) VALUES ($1, $2, $3)
             ON CONFLICT (reference_id, tag_id) DO NOTHING",
        )
        .bind(new_v7())
        .bind(reference_id)
        .bind(tag.id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(tag)
    }

    /// Detach a tag from a reference. The tag row itself survives.
    pub async fn remove(&self, user_id: Uuid, reference_id: Uuid, name: &str) -> Result<()> {
        self.require_reference(user_id, reference_id).await?;

        let result = sqlx::query(
            r#"
            DELETE FROM reference_tag rt
            USING tag t
            WHERE rt.tag_id = t.id AND rt.reference_id = $1
              AND t.user_id = $2 AND t.name = $3
            "#,
        )
        .bind(reference_id)
        .bind(user_id)
        .bind(name.trim())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::InvalidInput(format!(
                "Tag '{}' is not attached to this reference",
                name.trim()
            )));
        }
        Ok(())
    }

    /// Rename a tag, keeping its assignments.
    pub async fn rename(&self, user_id: Uuid, tag_id: Uuid, new_name: &str) -> Result<Tag> {
        let new_name = validate_tag_name(new_name).map_err(Error::InvalidInput)?;

        let clash = sqlx::query(
            "SELECT 1 AS hit FROM tag WHERE user_id = $1 AND name = $2 AND id <> $3",
        )
        .bind(user_id)
        .bind(&new_name)
        .bind(tag_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        if clash.is_some() {
            return Err(Error::Conflict(format!(
                "Tag '{}' already exists",
                new_name
            )));
        }

        let tag = sqlx::query_as::<_, Tag>(
            "UPDATE tag SET name = $3 WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, name",
        )
        .bind(tag_id)
        .bind(user_id)
        .bind(&new_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        tag.ok_or_else(|| Error::NotFound(format!("Tag {} not found", tag_id)))
    }

    /// Delete a tag and all its assignments.
    pub async fn delete(&self, user_id: Uuid, tag_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tag WHERE id = $1 AND user_id = $2")
            .bind(tag_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Tag {} not found", tag_id)));
        }

        info!(
            subsystem = "db",
            component = "tags",
            op = "delete_tag",
            user_id = %user_id,
            "Tag deleted"
        );
        Ok(())
    }

    /// Every reference of the user with its tags attached (tag board view).
    pub async fn references_with_tags(&self, user_id: Uuid) -> Result<Vec<ReferenceWithTags>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id AS reference_id, r.title, r.completed,
                   t.id AS tag_id, t.name AS tag_name
            FROM reference r
            LEFT JOIN reference_tag rt ON rt.reference_id = r.id
            LEFT JOIN tag t ON t.id = rt.tag_id
            WHERE r.user_id = $1
            ORDER BY r.created_at_utc DESC, t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut out: Vec<ReferenceWithTags> = Vec::new();
        for row in rows {
            let reference_id: Uuid = row.get("reference_id");
            if out.last().map(|r| r.id) != Some(reference_id) {
                out.push(ReferenceWithTags {
                    id: reference_id,
                    title: row.get("title"),
                    completed: row.get("completed"),
                    tags: Vec::new(),
                });
            }
            let tag_id: Option<Uuid> = row.get("tag_id");
            if let Some(tag_id) = tag_id {
                if let Some(current) = out.last_mut() {
                    current.tags.push(Tag {
                        id: tag_id,
                        user_id,
                        name: row.get("tag_name"),
                    });
                }
            }
        }
        Ok(out)
    }

    async fn require_reference(&self, user_id: Uuid, reference_id: Uuid) -> Result<()> {
        let found = sqlx::query("SELECT 1 AS hit FROM reference WHERE id = $1 AND user_id = $2")
            .bind(reference_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        if found.is_none() {
            return Err(Error::NotFound(format!(
                "Reference {} not found",
                reference_id
            )));
        }
        Ok(())
    }
}
