//! Job repository implementation.
//!
//! Enqueue runs on the caller's transaction so jobs from rolled-back
//! requests are never visible. Claiming uses `FOR UPDATE SKIP LOCKED` so
//! concurrent workers never double-claim.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::job::Job;

use super::db_err;

/// Repository for the background job table.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a job on the given transaction.
    pub async fn enqueue(
        &self,
        conn: &mut PgConnection,
        name: &str,
        payload: &serde_json::Value,
        scheduled_at: Option<DateTime<Utc>>,
        max_attempts: i32,
    ) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO job (name, payload, scheduled_at, max_attempts) \
             VALUES ($1, $2, COALESCE($3, NOW()), $4) RETURNING *",
        )
        .bind(name)
        .bind(payload)
        .bind(scheduled_at)
        .bind(max_attempts)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Claim the next runnable job, marking it running.
    pub async fn claim_next(&self) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE job SET status = 'running', attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM job \
                 WHERE status = 'pending' AND scheduled_at <= NOW() \
                 ORDER BY scheduled_at \
                 FOR UPDATE SKIP LOCKED \
                 LIMIT 1 \
             ) RETURNING *",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Mark a job handled successfully.
    pub async fn mark_completed(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE job SET status = 'completed', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Record a handler failure: requeue with backoff while attempts remain,
    /// park as failed otherwise.
    pub async fn mark_failed(&self, id: Uuid, error: &str, retry_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE job SET \
                 status = CASE WHEN attempts >= max_attempts THEN 'failed'::job_status \
                               ELSE 'pending'::job_status END, \
                 scheduled_at = CASE WHEN attempts >= max_attempts THEN scheduled_at ELSE $3 END, \
                 last_error = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(retry_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Whether a pending job with this name exists. Used to seed recurring
    /// jobs exactly once.
    pub async fn has_pending(&self, name: &str) -> AppResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job WHERE name = $1 AND status = 'pending'")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Jobs enqueued under a name, newest first. Test and ops helper.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM job WHERE name = $1 ORDER BY created_at DESC")
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }
}
