//! Built-in maintenance job handlers.

mod management_cleanup;
mod reset_sweep;

pub use management_cleanup::ManagementCleanupJob;
pub use reset_sweep::ResetSweepJob;

use chrono::Utc;
use sqlx::PgPool;

use lightbase_core::result::AppResult;
use lightbase_database::repositories::job::JobRepository;

/// Name of the daily transient-management-user purge.
pub const MANAGEMENT_CLEANUP_JOB: &str = "lightbase.management.cleanup";

/// Name of the daily expired password-reset sweep.
pub const RESET_SWEEP_JOB: &str = "lightbase.passwordLoginReset.sweep";

/// Seed the recurring maintenance jobs if no pending instance exists.
/// Handlers re-arm themselves a day ahead after each run.
pub async fn seed_recurring_jobs(pool: &PgPool, jobs: &JobRepository) -> AppResult<()> {
    for name in [MANAGEMENT_CLEANUP_JOB, RESET_SWEEP_JOB] {
        if jobs.has_pending(name).await? {
            continue;
        }
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| lightbase_core::AppError::database(Box::new(e)))?;
        jobs.enqueue(&mut *tx, name, &serde_json::json!({}), Some(Utc::now()), 5)
            .await?;
        tx.commit()
            .await
            .map_err(|e| lightbase_core::AppError::database(Box::new(e)))?;
    }
    Ok(())
}
