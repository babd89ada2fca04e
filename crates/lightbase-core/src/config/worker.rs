//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Job worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent job workers.
    #[serde(default = "default_workers")]
    pub worker_count: usize,
    /// Poll interval in milliseconds when the queue is empty.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Maximum delivery attempts before a job is parked as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_workers(),
            poll_interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_workers() -> usize {
    3
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_attempts() -> i32 {
    5
}
