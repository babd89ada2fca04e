//! Password-route rate limiting configuration.

use serde::{Deserialize, Serialize};

/// Token-bucket settings for the password route family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the limiter is applied at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bucket capacity per window.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Window length in seconds over which the bucket refills.
    #[serde(default = "default_window")]
    pub window_seconds: u64,
    /// Block duration after exhausting the bucket, in seconds.
    #[serde(default = "default_block")]
    pub block_seconds: u64,
    /// Shared secret verifying the `X-SSR-Ip` header; absent disables the
    /// header entirely.
    #[serde(default)]
    pub ssr_verification_key: Option<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_capacity(),
            window_seconds: default_window(),
            block_seconds: default_block(),
            ssr_verification_key: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_capacity() -> u32 {
    11
}

fn default_window() -> u64 {
    60
}

fn default_block() -> u64 {
    600
}
