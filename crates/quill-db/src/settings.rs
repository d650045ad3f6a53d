//! Per-user settings repository.

use sqlx::PgPool;
use uuid::Uuid;

use quill_core::{new_v7, Error, Result, UpdateSettingsRequest, UserSettings};

/// PostgreSQL settings repository.
///
/// A settings row is created lazily with defaults the first time it is read,
/// so callers never see a missing row for a valid account.
#[derive(Clone)]
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the user's settings, creating the default row if absent.
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<UserSettings> {
        let existing = sqlx::query_as::<_, UserSettings>(
            "SELECT id, user_id, language, theme, email_notifications,
                    created_at_utc, updated_at_utc
             FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if let Some(settings) = existing {
            return Ok(settings);
        }

        // Concurrent first reads can race; the UNIQUE(user_id) constraint
        // makes the loser re-read the winner's row.
        let inserted = sqlx::query_as::<_, UserSettings>(
            r#"
            INSERT INTO user_settings (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, language, theme, email_notifications,
                      created_at_utc, updated_at_utc
            "#,
        )
        .bind(new_v7())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match inserted {
            Some(settings) => Ok(settings),
            None => {
                sqlx::query_as::<_, UserSettings>(
                    "SELECT id, user_id, language, theme, email_notifications,
                            created_at_utc, updated_at_utc
                     FROM user_settings WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)
            }
        }
    }

    /// Apply a partial update; absent fields keep their current values.
    pub async fn update(
        &self,
        user_id: Uuid,
        request: UpdateSettingsRequest,
    ) -> Result<UserSettings> {
        // Ensure the row exists before updating.
        let current = self.get_or_create(user_id).await?;

        let language = request.language.unwrap_or(current.language);
        let theme = request.theme.unwrap_or(current.theme);
        let email_notifications = request
            .email_notifications
            .unwrap_or(current.email_notifications);

        let settings = sqlx::query_as::<_, UserSettings>(
            r#"
            UPDATE user_settings
            SET language = $2, theme = $3, email_notifications = $4,
                updated_at_utc = now()
            WHERE user_id = $1
            RETURNING id, user_id, language, theme, email_notifications,
                      created_at_utc, updated_at_utc
            "#,
        )
        .bind(user_id)
        .bind(&language)
        .bind(&theme)
        .bind(email_notifications)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(settings)
    }
}
