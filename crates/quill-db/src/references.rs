//! Bibliographic reference repository.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use quill_core::{
    new_v7, CreateReferenceRequest, Error, Reference, Result, UpdateReferenceRequest,
};

const REFERENCE_COLUMNS: &str =
    "id, user_id, title, authors, year, source, doi, url, completed, created_at_utc";

/// Sort order for reference listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceSort {
    /// Newest first. The default.
    #[default]
    Created,
    Title,
    Year,
}

impl ReferenceSort {
    /// Parse a sort name; unknown names fall back to the default.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "title" => ReferenceSort::Title,
            "year" => ReferenceSort::Year,
            _ => ReferenceSort::Created,
        }
    }

    fn order_clause(self) -> &'static str {
        match self {
            ReferenceSort::Created => "created_at_utc DESC",
            ReferenceSort::Title => "LOWER(title), created_at_utc DESC",
            ReferenceSort::Year => "year DESC, created_at_utc DESC",
        }
    }
}

/// PostgreSQL reference repository.
#[derive(Clone)]
pub struct PgReferenceRepository {
    pool: PgPool,
}

impl PgReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        request: &CreateReferenceRequest,
    ) -> Result<Reference> {
        if request.title.trim().is_empty() {
            return Err(Error::InvalidInput("Title is required".to_string()));
        }

        let reference = sqlx::query_as::<_, Reference>(&format!(
            r#"
            INSERT INTO reference (id, user_id, title, authors, year, source, doi, url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {REFERENCE_COLUMNS}
            "#
        ))
        .bind(new_v7())
        .bind(user_id)
        .bind(request.title.trim())
        .bind(&request.authors)
        .bind(&request.year)
        .bind(&request.source)
        .bind(&request.doi)
        .bind(&request.url)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(reference)
    }

    /// Bulk insert (the BibTeX import path). All rows commit together;
    /// returns the created records.
    pub async fn create_many(
        &self,
        user_id: Uuid,
        requests: &[CreateReferenceRequest],
    ) -> Result<Vec<Reference>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO reference (id, user_id, title, authors, year, source, doi, url) ",
        );
        builder.push_values(requests, |mut row, request| {
            row.push_bind(new_v7())
                .push_bind(user_id)
                .push_bind(request.title.trim())
                .push_bind(&request.authors)
                .push_bind(&request.year)
                .push_bind(&request.source)
                .push_bind(&request.doi)
                .push_bind(&request.url);
        });
        builder.push(format!(" RETURNING {REFERENCE_COLUMNS}"));
        let created = builder
            .build_query_as::<Reference>()
            .fetch_all(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "references",
            op = "bulk_import",
            user_id = %user_id,
            count = created.len(),
            "References imported"
        );
        Ok(created)
    }

    pub async fn list(&self, user_id: Uuid, sort: ReferenceSort) -> Result<Vec<Reference>> {
        // order_clause is a fixed string chosen from the enum, never input.
        let sql = format!(
            "SELECT {REFERENCE_COLUMNS} FROM reference WHERE user_id = $1 ORDER BY {}",
            sort.order_clause()
        );
        sqlx::query_as::<_, Reference>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    pub async fn get(&self, user_id: Uuid, reference_id: Uuid) -> Result<Reference> {
        sqlx::query_as::<_, Reference>(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM reference WHERE id = $1 AND user_id = $2"
        ))
        .bind(reference_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Reference {} not found", reference_id)))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        reference_id: Uuid,
        request: &UpdateReferenceRequest,
    ) -> Result<Reference> {
        let reference = sqlx::query_as::<_, Reference>(&format!(
            r#"
            UPDATE reference
            SET title = COALESCE($3, title),
                authors = COALESCE($4, authors),
                year = COALESCE($5, year),
                source = COALESCE($6, source),
                doi = COALESCE($7, doi),
                url = COALESCE($8, url),
                completed = COALESCE($9, completed)
            WHERE id = $1 AND user_id = $2
            RETURNING {REFERENCE_COLUMNS}
            "#
        ))
        .bind(reference_id)
        .bind(user_id)
        .bind(&request.title)
        .bind(&request.authors)
        .bind(&request.year)
        .bind(&request.source)
        .bind(&request.doi)
        .bind(&request.url)
        .bind(request.completed)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        reference.ok_or_else(|| Error::NotFound(format!("Reference {} not found", reference_id)))
    }

    /// Delete a reference; its tag assignments cascade.
    pub async fn delete(&self, user_id: Uuid, reference_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM reference WHERE id = $1 AND user_id = $2")
            .bind(reference_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "Reference {} not found",
                reference_id
            )));
        }
        Ok(())
    }

    /// Set the read/processed flag directly.
    pub async fn set_completed(
        &self,
        user_id: Uuid,
        reference_id: Uuid,
        completed: bool,
    ) -> Result<Reference> {
        let reference = sqlx::query_as::<_, Reference>(&format!(
            "UPDATE reference SET completed = $3 WHERE id = $1 AND user_id = $2
             RETURNING {REFERENCE_COLUMNS}"
        ))
        .bind(reference_id)
        .bind(user_id)
        .bind(completed)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        reference.ok_or_else(|| Error::NotFound(format!("Reference {} not found", reference_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_parse_falls_back_to_created() {
        assert_eq!(ReferenceSort::parse("title"), ReferenceSort::Title);
        assert_eq!(ReferenceSort::parse("YEAR"), ReferenceSort::Year);
        assert_eq!(ReferenceSort::parse("whatever"), ReferenceSort::Created);
        assert_eq!(ReferenceSort::parse(""), ReferenceSort::Created);
    }
}
