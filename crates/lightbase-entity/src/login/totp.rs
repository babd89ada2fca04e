//! TOTP second-factor entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Authenticator-app TOTP settings for a user.
///
/// An unverified setup may be overwritten by a new setup call; a verified
/// one is protected and must be removed explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TotpSettings {
    /// Unique identifier.
    pub id: Uuid,
    /// The owning user (1:1).
    pub user_id: Uuid,
    /// Base32-encoded shared secret.
    #[serde(skip_serializing)]
    pub secret: String,
    /// When setup was verified; absent means setup is pending.
    pub verified_at: Option<DateTime<Utc>>,
    /// When the settings were created.
    pub created_at: DateTime<Utc>,
    /// When the settings were last updated.
    pub updated_at: DateTime<Utc>,
}

impl TotpSettings {
    /// Whether the setup has been verified.
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }
}
