//! Brainstorm session repository.
//!
//! Each save appends a new entry; "load" always means the latest entry for
//! the user. The planning milestone hook fires from the Database facade,
//! not here, so a save and its milestone commit together.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use quill_core::{new_v7, BrainEntry, Error, Result, SaveBrainEntryRequest};

const ENTRY_COLUMNS: &str = "id, user_id, why, what, where_, when_, who, messages, \
     overall_feedback, completed, created_at_utc, updated_at_utc";

/// PostgreSQL brainstorm repository.
#[derive(Clone)]
pub struct PgBrainstormRepository {
    pool: PgPool,
}

impl PgBrainstormRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new brainstorm entry inside an open transaction.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        request: &SaveBrainEntryRequest,
    ) -> Result<BrainEntry> {
        let messages = serde_json::Value::Array(request.messages.clone());
        let entry = sqlx::query_as::<_, BrainEntry>(&format!(
            r#"
            INSERT INTO brain_entry
                (id, user_id, why, what, where_, when_, who, messages,
                 overall_feedback, completed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(new_v7())
        .bind(user_id)
        .bind(&request.five_w.why)
        .bind(&request.five_w.what)
        .bind(&request.five_w.where_)
        .bind(&request.five_w.when_)
        .bind(&request.five_w.who)
        .bind(&messages)
        .bind(&request.overall_feedback)
        .bind(request.completed)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(entry)
    }

    /// The most recently touched entry for the user, if any.
    pub async fn latest(&self, user_id: Uuid) -> Result<Option<BrainEntry>> {
        let entry = sqlx::query_as::<_, BrainEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM brain_entry
             WHERE user_id = $1 ORDER BY updated_at_utc DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(entry)
    }

    /// Mark the latest entry's progress flag without touching its content.
    pub async fn set_progress(&self, user_id: Uuid, completed: bool) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE brain_entry SET completed = $2, updated_at_utc = now()
            WHERE id = (
                SELECT id FROM brain_entry WHERE user_id = $1
                ORDER BY updated_at_utc DESC LIMIT 1
            )
            "#,
        )
        .bind(user_id)
        .bind(completed)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(
                "No brainstorm session to update".to_string(),
            ));
        }
        Ok(())
    }
}
