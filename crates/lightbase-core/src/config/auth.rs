//! Token, session, and password policy configuration.

use serde::{Deserialize, Serialize};

/// Token signing and password policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: i64,
    /// Refresh token TTL in hours.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_hours: i64,
    /// Password-provider policy.
    #[serde(default)]
    pub password: PasswordConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_minutes: default_access_ttl(),
            refresh_token_ttl_hours: default_refresh_ttl(),
            password: PasswordConfig::default(),
        }
    }
}

/// Password-provider behavior toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Count login attempts in a rolling 5-minute window and block after 10.
    #[serde(default = "default_true")]
    pub rolling_attempt_blocking: bool,
    /// Force a password rotation when the stored hash is older than 6 months.
    #[serde(default)]
    pub force_rotation_after_six_months: bool,
    /// On password update, also remove the session performing the update.
    /// When false, every session except the caller's is removed.
    #[serde(default = "default_true")]
    pub remove_current_session_on_password_update: bool,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            rolling_attempt_blocking: true,
            force_rotation_after_six_months: false,
            remove_current_session_on_password_update: true,
        }
    }
}

/// Session and device binding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Reject logins that do not carry a device object.
    #[serde(default)]
    pub require_device: bool,
    /// Cap on concurrent sessions bound to mobile (apple/android) devices.
    /// `None` disables the cap.
    #[serde(default)]
    pub max_mobile_sessions: Option<i64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            require_device: false,
            max_mobile_sessions: None,
        }
    }
}

fn default_access_ttl() -> i64 {
    15
}

fn default_refresh_ttl() -> i64 {
    48
}

fn default_true() -> bool {
    true
}
