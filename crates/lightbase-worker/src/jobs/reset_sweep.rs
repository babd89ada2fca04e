//! Daily sweep of expired password verify/reset tokens.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;

use lightbase_core::AppError;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::job::JobRepository;
use lightbase_database::repositories::password_login::PasswordLoginRepository;
use lightbase_entity::job::Job;

use crate::runner::JobHandler;

use super::RESET_SWEEP_JOB;

/// Deletes expired `password_login_reset` rows.
pub struct ResetSweepJob {
    pool: PgPool,
    logins: PasswordLoginRepository,
    jobs: JobRepository,
}

impl ResetSweepJob {
    /// Creates the handler.
    pub fn new(pool: PgPool, logins: PasswordLoginRepository, jobs: JobRepository) -> Self {
        Self { pool, logins, jobs }
    }
}

#[async_trait]
impl JobHandler for ResetSweepJob {
    async fn handle(&self, _job: &Job) -> AppResult<()> {
        let swept = self.logins.sweep_expired_resets().await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(Box::new(e)))?;
        self.jobs
            .enqueue(
                &mut *tx,
                RESET_SWEEP_JOB,
                &serde_json::json!({}),
                Some(Utc::now() + Duration::hours(24)),
                5,
            )
            .await?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(Box::new(e)))?;

        if swept > 0 {
            info!(swept, "Expired password reset tokens swept");
        }
        Ok(())
    }
}
