//! Job worker pool: claim, dispatch, retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use lightbase_core::config::WorkerConfig;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::job::JobRepository;
use lightbase_entity::job::Job;

/// A background job handler.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Handle one delivery of the job.
    async fn handle(&self, job: &Job) -> AppResult<()>;
}

/// Claims jobs from the queue and dispatches them to handlers.
#[derive(Clone)]
pub struct JobRunner {
    repo: JobRepository,
    handlers: Arc<HashMap<String, Arc<dyn JobHandler>>>,
    config: WorkerConfig,
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl JobRunner {
    /// Creates a runner over the registered handlers.
    pub fn new(
        repo: JobRepository,
        handlers: HashMap<String, Arc<dyn JobHandler>>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            repo,
            handlers: Arc::new(handlers),
            config,
        }
    }

    /// Spawn the worker pool; returns one task handle per worker.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        (0..self.config.worker_count)
            .map(|index| {
                let runner = self.clone();
                tokio::spawn(async move {
                    info!(worker = index, "Job worker started");
                    runner.run_loop().await;
                })
            })
            .collect()
    }

    async fn run_loop(&self) {
        let idle = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            match self.tick().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(idle).await,
                Err(e) => {
                    error!(error = %e, "Job worker tick failed");
                    tokio::time::sleep(idle).await;
                }
            }
        }
    }

    /// Claim and process one job. Returns whether a job was handled.
    pub async fn tick(&self) -> AppResult<bool> {
        let Some(job) = self.repo.claim_next().await? else {
            return Ok(false);
        };

        match self.handlers.get(&job.name) {
            Some(handler) => match handler.handle(&job).await {
                Ok(()) => {
                    self.repo.mark_completed(job.id).await?;
                    debug!(job_id = %job.id, name = %job.name, "Job completed");
                }
                Err(e) => {
                    let retry_at = Utc::now() + backoff(job.attempts);
                    self.repo
                        .mark_failed(job.id, &e.to_string(), retry_at)
                        .await?;
                    error!(job_id = %job.id, name = %job.name, error = %e, "Job failed");
                }
            },
            None => {
                // Event jobs for external consumers (mail, push) complete
                // untouched here.
                self.repo.mark_completed(job.id).await?;
                debug!(job_id = %job.id, name = %job.name, "Job completed without handler");
            }
        }

        Ok(true)
    }
}

/// Exponential backoff per attempt, capped at 15 minutes.
fn backoff(attempts: i32) -> chrono::Duration {
    let seconds = 30i64.saturating_mul(2i64.saturating_pow(attempts.max(0) as u32));
    chrono::Duration::seconds(seconds.min(900))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff(0), chrono::Duration::seconds(30));
        assert_eq!(backoff(1), chrono::Duration::seconds(60));
        assert_eq!(backoff(10), chrono::Duration::seconds(900));
    }
}
