//! Planning repository: phases, tasks, and the dashboard overview.

use chrono::{DateTime, FixedOffset};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;
use uuid::Uuid;

use quill_core::{
    new_v7, phase_overview, Error, Phase, PhaseDescriptor, PhaseFacts, PhaseOverviewEntry,
    PhaseWithTasks, Result, Task, CANONICAL_PHASE_TITLES,
};

/// Title of the milestone phase the brainstorm hook writes into.
const TOPIC_PHASE_TITLE: &str = CANONICAL_PHASE_TITLES[0];

/// Description of the task recorded when a brainstorm completes.
const BRAINSTORM_MILESTONE: &str = "Brainstorm Complete";

/// PostgreSQL planning repository.
#[derive(Clone)]
pub struct PgPlanningRepository {
    pool: PgPool,
}

impl PgPlanningRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the user's whole timeline (phases and their tasks) in one
    /// transaction.
    pub async fn replace_timeline(
        &self,
        user_id: Uuid,
        phases: &[PhaseDescriptor],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let count = self.replace_timeline_tx(&mut tx, user_id, phases).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "planning",
            op = "replace_timeline",
            user_id = %user_id,
            count = count,
            "Timeline replaced"
        );
        Ok(count)
    }

    /// Transaction variant of [`replace_timeline`](Self::replace_timeline).
    pub async fn replace_timeline_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        phases: &[PhaseDescriptor],
    ) -> Result<usize> {
        // Tasks go with their phases via ON DELETE CASCADE.
        sqlx::query("DELETE FROM phase WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        for descriptor in phases {
            let phase_id = new_v7();
            sqlx::query(
                "INSERT INTO phase (id, user_id, title, start_date, end_date, deadline)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(phase_id)
            .bind(user_id)
            .bind(&descriptor.title)
            .bind(descriptor.start_date)
            .bind(descriptor.end_date)
            .bind(descriptor.deadline)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

            for task in &descriptor.tasks {
                sqlx::query(
                    "INSERT INTO task (id, phase_id, user_id, description, completed)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(new_v7())
                .bind(phase_id)
                .bind(user_id)
                .bind(&task.description)
                .bind(task.completed)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
            }
        }

        Ok(phases.len())
    }

    /// Load the user's timeline, phases in creation order with their tasks
    /// and completion counts.
    pub async fn fetch_timeline(&self, user_id: Uuid) -> Result<Vec<PhaseWithTasks>> {
        let phases = sqlx::query_as::<_, Phase>(
            "SELECT id, user_id, title, start_date, end_date, deadline, created_at_utc
             FROM phase WHERE user_id = $1 ORDER BY created_at_utc",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tasks = sqlx::query_as::<_, Task>(
            "SELECT id, phase_id, user_id, description, completed, created_at_utc
             FROM task WHERE user_id = $1 ORDER BY created_at_utc",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let timeline = phases
            .into_iter()
            .map(|phase| {
                let phase_tasks: Vec<Task> = tasks
                    .iter()
                    .filter(|t| t.phase_id == phase.id)
                    .cloned()
                    .collect();
                let completed_tasks = phase_tasks.iter().filter(|t| t.completed).count();
                PhaseWithTasks {
                    id: phase.id,
                    title: phase.title,
                    start_date: phase.start_date,
                    end_date: phase.end_date,
                    deadline: phase.deadline,
                    total_tasks: phase_tasks.len(),
                    completed_tasks,
                    tasks: phase_tasks,
                }
            })
            .collect();

        Ok(timeline)
    }

    /// Delete one phase; its tasks cascade.
    pub async fn delete_phase(&self, user_id: Uuid, phase_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM phase WHERE id = $1 AND user_id = $2")
            .bind(phase_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Phase {} not found", phase_id)));
        }

        info!(
            subsystem = "db",
            component = "planning",
            op = "delete_phase",
            user_id = %user_id,
            phase_id = %phase_id,
            "Phase deleted"
        );
        Ok(())
    }

    /// Flip a task's completion flag, returning the new state.
    ///
    /// The task must belong to both the phase and the user, so a guessed
    /// task id under someone else's phase cannot be toggled.
    pub async fn toggle_task(&self, user_id: Uuid, phase_id: Uuid, task_id: Uuid) -> Result<bool> {
        let row = sqlx::query(
            "UPDATE task SET completed = NOT completed
             WHERE id = $1 AND phase_id = $2 AND user_id = $3
             RETURNING completed",
        )
        .bind(task_id)
        .bind(phase_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => Ok(row.get("completed")),
            None => Err(Error::NotFound(format!("Task {} not found", task_id))),
        }
    }

    /// Build the five-entry dashboard overview for a user at the given time.
    pub async fn overview(
        &self,
        user_id: Uuid,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<PhaseOverviewEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT p.title, p.deadline, p.created_at_utc,
                   COALESCE(array_agg(t.completed) FILTER (WHERE t.id IS NOT NULL), '{}')
                       AS task_flags
            FROM phase p
            LEFT JOIN task t ON t.phase_id = p.id
            WHERE p.user_id = $1
            GROUP BY p.id, p.title, p.deadline, p.created_at_utc
            ORDER BY p.created_at_utc
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let facts: Vec<PhaseFacts> = rows
            .into_iter()
            .map(|row| PhaseFacts {
                title: row.get("title"),
                deadline: row.get("deadline"),
                task_flags: row.get("task_flags"),
            })
            .collect();

        Ok(phase_overview(&facts, now))
    }

    /// Record the planning milestone for a completed brainstorm.
    ///
    /// Ensures the user has a phase titled [`TOPIC_PHASE_TITLE`] (creating
    /// one when absent) and adds a completed milestone task to it, once.
    pub async fn record_brainstorm_completion_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<()> {
        let phase = sqlx::query(
            "SELECT id FROM phase WHERE user_id = $1 AND title = $2
             ORDER BY created_at_utc LIMIT 1",
        )
        .bind(user_id)
        .bind(TOPIC_PHASE_TITLE)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let phase_id: Uuid = match phase {
            Some(row) => row.get("id"),
            None => {
                let id = new_v7();
                sqlx::query("INSERT INTO phase (id, user_id, title) VALUES ($1, $2, $3)")
                    .bind(id)
                    .bind(user_id)
                    .bind(TOPIC_PHASE_TITLE)
                    .execute(&mut **tx)
                    .await
                    .map_err(Error::Database)?;
                id
            }
        };

        let existing = sqlx::query(
            "SELECT id FROM task WHERE phase_id = $1 AND description = $2 LIMIT 1",
        )
        .bind(phase_id)
        .bind(BRAINSTORM_MILESTONE)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        if existing.is_none() {
            sqlx::query(
                "INSERT INTO task (id, phase_id, user_id, description, completed)
                 VALUES ($1, $2, $3, $4, true)",
            )
            .bind(new_v7())
            .bind(phase_id)
            .bind(user_id)
            .bind(BRAINSTORM_MILESTONE)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

            info!(
                subsystem = "db",
                component = "planning",
                op = "brainstorm_milestone",
                user_id = %user_id,
                phase_id = %phase_id,
                "Brainstorm milestone recorded"
            );
        }

        Ok(())
    }
}
