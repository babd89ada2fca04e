//! Daily purge of transient management users.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;

use lightbase_core::AppError;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::job::JobRepository;
use lightbase_database::repositories::user::UserRepository;
use lightbase_entity::job::Job;

use crate::runner::JobHandler;

use super::MANAGEMENT_CLEANUP_JOB;

/// Deletes management users older than their TTL. Their sessions, logins,
/// and role assignments cascade with the user row.
pub struct ManagementCleanupJob {
    pool: PgPool,
    users: UserRepository,
    jobs: JobRepository,
    ttl_hours: i64,
}

impl ManagementCleanupJob {
    /// Creates the handler.
    pub fn new(pool: PgPool, users: UserRepository, jobs: JobRepository, ttl_hours: i64) -> Self {
        Self {
            pool,
            users,
            jobs,
            ttl_hours,
        }
    }
}

#[async_trait]
impl JobHandler for ManagementCleanupJob {
    async fn handle(&self, _job: &Job) -> AppResult<()> {
        let cutoff = Utc::now() - Duration::hours(self.ttl_hours);
        let stale = self.users.find_transient_management_users(cutoff).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(Box::new(e)))?;

        for user in &stale {
            self.users.delete(&mut *tx, user.id).await?;
        }

        // Re-arm tomorrow's run on the same transaction.
        self.jobs
            .enqueue(
                &mut *tx,
                MANAGEMENT_CLEANUP_JOB,
                &serde_json::json!({}),
                Some(Utc::now() + Duration::hours(24)),
                5,
            )
            .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(Box::new(e)))?;

        if !stale.is_empty() {
            info!(purged = stale.len(), "Transient management users purged");
        }
        Ok(())
    }
}
