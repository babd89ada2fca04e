//! DigiD provider entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// BSN credentials for a user, established out-of-band.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DigidLogin {
    /// Unique identifier.
    pub id: Uuid,
    /// The owning user (1:1).
    pub user_id: Uuid,
    /// Citizen service number, zero-padded to 9 characters, unique.
    pub bsn: String,
    /// When the login was created.
    pub created_at: DateTime<Utc>,
    /// When the login was last updated.
    pub updated_at: DateTime<Utc>,
}
