//! Account repository: registration, login lookup, captcha-backed resets.

use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use quill_core::{new_v7, password, Error, Result, User};

/// How long an emailed captcha code stays valid.
pub const CAPTCHA_TTL_MINUTES: i64 = 10;

/// Generate a 6-digit numeric captcha code.
pub fn generate_captcha_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// PostgreSQL account repository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new account. The password is hashed here; callers pass the
    /// plaintext exactly once.
    pub async fn register(&self, username: &str, email: &str, plain_password: &str) -> Result<User> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() {
            return Err(Error::InvalidInput(
                "Username and email are required".to_string(),
            ));
        }

        let taken = sqlx::query(
            "SELECT username = $1 AS by_name FROM app_user WHERE username = $1 OR email = $2 LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if let Some(row) = taken {
            let by_name: bool = row.get("by_name");
            return Err(Error::Conflict(if by_name {
                "Username already exists".to_string()
            } else {
                "Email already registered".to_string()
            }));
        }

        let hash = password::hash_password(plain_password)?;
        let id = new_v7();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO app_user (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, created_at_utc
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(user)
    }

    /// Look up an account by username, verifying the password.
    ///
    /// Both an unknown username and a wrong password yield the same
    /// [`Error::Unauthorized`] so login probing cannot enumerate accounts.
    pub async fn authenticate(&self, username: &str, plain_password: &str) -> Result<User> {
        let user = self.find_by_username(username).await?;
        match user {
            Some(user) if password::verify_password(plain_password, &user.password_hash) => {
                Ok(user)
            }
            _ => Err(Error::Unauthorized(
                "Invalid username or password".to_string(),
            )),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at_utc FROM app_user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("User {} not found", id)))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at_utc
             FROM app_user WHERE username = $1",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at_utc
             FROM app_user WHERE email = $1",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(user)
    }

    /// Update username and/or email. Uniqueness conflicts with other accounts
    /// surface as [`Error::Conflict`].
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<User> {
        let current = self.get(user_id).await?;
        let username = username.map(str::trim).unwrap_or(&current.username);
        let email = email.map(str::trim).unwrap_or(&current.email);
        if username.is_empty() || email.is_empty() {
            return Err(Error::InvalidInput(
                "Username and email cannot be empty".to_string(),
            ));
        }

        let clash = sqlx::query(
            "SELECT 1 AS hit FROM app_user
             WHERE (username = $1 OR email = $2) AND id <> $3 LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        if clash.is_some() {
            return Err(Error::Conflict(
                "Username or email already in use".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE app_user SET username = $2, email = $3
            WHERE id = $1
            RETURNING id, username, email, password_hash, created_at_utc
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(user)
    }

    /// Change an account's password after verifying the old one.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.get(user_id).await?;
        if !password::verify_password(old_password, &user.password_hash) {
            return Err(Error::InvalidInput(
                "Current password is incorrect".to_string(),
            ));
        }
        self.set_password(user_id, new_password).await
    }

    async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<()> {
        let hash = password::hash_password(new_password)?;
        let result = sqlx::query("UPDATE app_user SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(&hash)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    /// Issue a fresh captcha code for the email, replacing any prior codes.
    /// Returns the code so the caller can deliver it.
    pub async fn issue_captcha(&self, email: &str) -> Result<String> {
        let email = email.trim();
        if self.find_by_email(email).await?.is_none() {
            return Err(Error::NotFound("Email not registered".to_string()));
        }

        let code = generate_captcha_code();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query("DELETE FROM email_captcha WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query("INSERT INTO email_captcha (id, email, code) VALUES ($1, $2, $3)")
            .bind(new_v7())
            .bind(email)
            .bind(&code)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(code)
    }

    /// Reset an account's password, consuming a valid captcha code.
    pub async fn reset_password(
        &self,
        email: &str,
        captcha_code: &str,
        new_password: &str,
    ) -> Result<()> {
        let email = email.trim();
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| Error::NotFound("Email not registered".to_string()))?;

        let cutoff = Utc::now() - Duration::minutes(CAPTCHA_TTL_MINUTES);
        let valid = sqlx::query(
            "SELECT id FROM email_captcha
             WHERE email = $1 AND code = $2 AND created_at_utc > $3",
        )
        .bind(email)
        .bind(captcha_code.trim())
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = valid else {
            return Err(Error::InvalidInput(
                "Invalid or expired verification code".to_string(),
            ));
        };
        let captcha_id: Uuid = row.get("id");

        self.set_password(user.id, new_password).await?;

        // One code, one reset.
        sqlx::query("DELETE FROM email_captcha WHERE id = $1")
            .bind(captcha_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captcha_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_captcha_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
