//! Background job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Delivery status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be claimed.
    Pending,
    /// Claimed by a worker.
    Running,
    /// Handled successfully.
    Completed,
    /// Exhausted its attempts.
    Failed,
}

/// A queued background job.
///
/// Jobs are inserted on the transaction that produced the triggering state
/// change, so rolled-back requests leave no jobs behind.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Job name, e.g. `auth.passwordBased.requestOtp`.
    pub name: String,
    /// JSON payload handed to the handler.
    pub payload: serde_json::Value,
    /// Delivery status.
    pub status: JobStatus,
    /// Delivery attempts so far.
    pub attempts: i32,
    /// Maximum delivery attempts.
    pub max_attempts: i32,
    /// Do not deliver before this time.
    pub scheduled_at: DateTime<Utc>,
    /// Last handler error, if any.
    pub last_error: Option<String>,
    /// When the job was enqueued.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}
