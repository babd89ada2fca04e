//! Anonymous provider entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Opaque-token credentials for a user.
///
/// When `is_allowed_to_login` is false the token cannot be used through the
/// login endpoint; sessions can still be created internally (magic links).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnonymousLogin {
    /// Unique identifier.
    pub id: Uuid,
    /// The owning user (1:1).
    pub user_id: Uuid,
    /// Opaque login token, `auth-anonymous-<uuid>`.
    #[serde(skip_serializing)]
    pub login_token: String,
    /// Whether the token is accepted at the login endpoint.
    pub is_allowed_to_login: bool,
    /// When the login was created.
    pub created_at: DateTime<Utc>,
    /// When the login was last updated.
    pub updated_at: DateTime<Utc>,
}
