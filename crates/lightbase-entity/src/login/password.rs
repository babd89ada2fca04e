//! Password provider entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Email + password credentials for a user.
///
/// The (email, tenant) pair is unique across every tenant the user belongs
/// to. An absent `verified_at` denies login.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordLogin {
    /// Unique identifier.
    pub id: Uuid,
    /// The owning user (1:1).
    pub user_id: Uuid,
    /// Login email address.
    pub email: String,
    /// Argon2id password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// When the email address was verified; absent denies login.
    pub verified_at: Option<DateTime<Utc>>,
    /// When email-OTP two-step was enabled for this login.
    pub otp_enabled_at: Option<DateTime<Utc>>,
    /// Base32 OTP secret, generated on first OTP login.
    #[serde(skip_serializing)]
    pub otp_secret: Option<String>,
    /// When the login was created.
    pub created_at: DateTime<Utc>,
    /// When the login was last updated. Also the reference point for the
    /// six-month forced password rotation.
    pub updated_at: DateTime<Utc>,
}

impl PasswordLogin {
    /// Whether email-OTP two-step verification is active.
    pub fn otp_enabled(&self) -> bool {
        self.otp_enabled_at.is_some()
    }
}

/// A single-use verify or reset token for a password login.
///
/// `should_set_password = true` marks a reset token, `false` a verify
/// token. Expired rows are swept by a background job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordLoginReset {
    /// Unique identifier.
    pub id: Uuid,
    /// The owning password login.
    pub password_login_id: Uuid,
    /// Opaque single-use token.
    pub reset_token: String,
    /// Whether consuming the token sets a new password (reset flow) rather
    /// than verifying the email (verify flow).
    pub should_set_password: bool,
    /// Expiry; tokens live 24 hours.
    pub expires_at: DateTime<Utc>,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
}

impl PasswordLoginReset {
    /// Whether the token is still usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Append-only login attempt, used for rolling-window rate counting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordLoginAttempt {
    /// Unique identifier.
    pub id: Uuid,
    /// The login attempted against.
    pub password_login_id: Uuid,
    /// When the attempt happened.
    pub created_at: DateTime<Utc>,
}
