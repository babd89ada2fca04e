//! Lightbase — multi-tenant identity, session, and authorization core.
//!
//! Main entry point that wires all crates together and starts the server
//! plus the background worker pool.

use std::collections::HashMap;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use lightbase_core::config::{AppConfig, DeployEnvironment, deploy_environment};
use lightbase_core::error::AppError;
use lightbase_database::repositories::job::JobRepository;
use lightbase_database::repositories::password_login::PasswordLoginRepository;
use lightbase_database::repositories::user::UserRepository;
use lightbase_worker::jobs::{
    MANAGEMENT_CLEANUP_JOB, ManagementCleanupJob, RESET_SWEEP_JOB, ResetSweepJob,
    seed_recurring_jobs,
};
use lightbase_worker::runner::{JobHandler, JobRunner};

#[tokio::main]
async fn main() {
    let environment = match deploy_environment() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("Invalid deployment environment: {e}");
            std::process::exit(1);
        }
    };

    let config = match AppConfig::load(environment) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config, environment).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig, environment: DeployEnvironment) -> Result<(), AppError> {
    // ── Step 1: Database ─────────────────────────────────────────
    tracing::info!("Connecting to database...");
    let db_pool = lightbase_database::DatabasePool::connect(&config.database).await?;

    lightbase_database::migration::run_migrations(db_pool.pool()).await?;

    // ── Step 2: State + advisory-locked startup sync ─────────────
    let pool = db_pool.into_pool();
    let state = lightbase_api::app::build_state(config, environment, pool.clone())?;

    lightbase_api::app::run_startup_sync(&state).await?;

    // ── Step 3: Background workers ───────────────────────────────
    let jobs = JobRepository::new(pool.clone());
    seed_recurring_jobs(&pool, &jobs).await?;

    let mut handlers: HashMap<String, Arc<dyn JobHandler>> = HashMap::new();
    handlers.insert(
        RESET_SWEEP_JOB.to_string(),
        Arc::new(ResetSweepJob::new(
            pool.clone(),
            PasswordLoginRepository::new(pool.clone()),
            jobs.clone(),
        )),
    );
    if let Some(management) = &state.management {
        handlers.insert(
            MANAGEMENT_CLEANUP_JOB.to_string(),
            Arc::new(ManagementCleanupJob::new(
                pool.clone(),
                UserRepository::new(pool.clone()),
                jobs.clone(),
                management.transient_user_ttl_hours(),
            )),
        );
    }

    let runner = JobRunner::new(jobs, handlers, state.config.worker.clone());
    let _workers = runner.spawn();

    // ── Step 4: Serve ────────────────────────────────────────────
    lightbase_api::app::run_server(state).await
}
