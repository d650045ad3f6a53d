//! # quill-db
//!
//! PostgreSQL database layer for quill.
//!
//! This crate provides:
//! - Connection pool management
//! - One repository per aggregate (accounts, outline, planning, brainstorm,
//!   references, tags, cloud documents)
//! - A [`Database`] facade bundling the repositories and the cross-aggregate
//!   transactional operations
//! - Pluggable blob storage for document versions
//!
//! ## Example
//!
//! ```rust,ignore
//! use quill_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/quill").await?;
//!     let user = db.users.register("ada", "ada@example.org", "hunter22").await?;
//!     let outline = db.sections.list_forest(user.id).await?;
//!     println!("{} root sections", outline.len());
//!     Ok(())
//! }
//! ```

pub mod brainstorm;
pub mod documents;
pub mod planning;
pub mod pool;
pub mod references;
pub mod sections;
pub mod settings;
pub mod storage;
pub mod tags;
pub mod users;

#[cfg(test)]
mod tests;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use quill_core::*;

pub use brainstorm::PgBrainstormRepository;
pub use documents::{sanitize_filename, PgDocumentRepository};
pub use planning::PgPlanningRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use references::{PgReferenceRepository, ReferenceSort};
pub use sections::{build_forest, collect_postorder, PgSectionRepository};
pub use settings::PgSettingsRepository;
pub use storage::{FilesystemBackend, StorageBackend};
pub use tags::PgTagRepository;
pub use users::{generate_captcha_code, PgUserRepository, CAPTCHA_TTL_MINUTES};

use uuid::Uuid;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Account repository: registration, login, captcha resets.
    pub users: PgUserRepository,
    /// Per-user settings repository.
    pub settings: PgSettingsRepository,
    /// Outline section repository.
    pub sections: PgSectionRepository,
    /// Planning repository: phases, tasks, dashboard overview.
    pub planning: PgPlanningRepository,
    /// Brainstorm session repository.
    pub brainstorm: PgBrainstormRepository,
    /// Tag repository for the reference board.
    pub tags: PgTagRepository,
    /// Bibliographic reference repository.
    pub references: PgReferenceRepository,
    /// Cloud document repository (requires storage configuration).
    /// Use `with_storage` to configure.
    pub documents: Option<PgDocumentRepository>,
    /// Storage base path, kept so Clone can reconstruct the backend.
    storage_path: Option<String>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            settings: PgSettingsRepository::new(pool.clone()),
            sections: PgSectionRepository::new(pool.clone()),
            planning: PgPlanningRepository::new(pool.clone()),
            brainstorm: PgBrainstormRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            references: PgReferenceRepository::new(pool.clone()),
            documents: None,
            storage_path: None,
            pool,
        }
    }

    /// Configure document blob storage with a filesystem backend path.
    pub fn with_storage(mut self, path: &str) -> Self {
        self.documents = Some(PgDocumentRepository::new(
            self.pool.clone(),
            FilesystemBackend::new(path),
        ));
        self.storage_path = Some(path.to_string());
        self
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Replace the user's whole plan, sections and timeline together.
    ///
    /// One transaction: existing phases (tasks cascade) and sections are
    /// deleted and both are recreated from the payload. Unlike the outline
    /// save, empty lists are legal here; sending nothing clears the plan.
    pub async fn replace_planning(
        &self,
        user_id: Uuid,
        trees: &[SectionDescriptor],
        phases: &[PhaseDescriptor],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.sections.replace_all_tx(&mut tx, user_id, trees).await?;
        self.planning
            .replace_timeline_tx(&mut tx, user_id, phases)
            .await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    /// Store a brainstorm entry, firing the planning milestone hook when all
    /// five W answers are present. Entry and milestone commit together.
    pub async fn save_brainstorm(
        &self,
        user_id: Uuid,
        request: &SaveBrainEntryRequest,
    ) -> Result<BrainEntry> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let entry = self.brainstorm.insert_tx(&mut tx, user_id, request).await?;
        if entry.five_w_complete() {
            self.planning
                .record_brainstorm_completion_tx(&mut tx, user_id)
                .await?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(entry)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            users: PgUserRepository::new(self.pool.clone()),
            settings: PgSettingsRepository::new(self.pool.clone()),
            sections: PgSectionRepository::new(self.pool.clone()),
            planning: PgPlanningRepository::new(self.pool.clone()),
            brainstorm: PgBrainstormRepository::new(self.pool.clone()),
            tags: PgTagRepository::new(self.pool.clone()),
            references: PgReferenceRepository::new(self.pool.clone()),
            documents: self.storage_path.as_ref().map(|path| {
                PgDocumentRepository::new(self.pool.clone(), FilesystemBackend::new(path))
            }),
            storage_path: self.storage_path.clone(),
        }
    }
}
