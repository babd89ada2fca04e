//! Session token chain entities and the issued pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row backing one signed bearer token.
///
/// Access-token rows carry `refresh_token_id` pointing at their paired
/// refresh row; refresh rows form a linear chain through rotation. Replay
/// of a revoked refresh row revokes the whole chain.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionToken {
    /// Unique token identifier, the only payload of the signed string
    /// besides expiry.
    pub id: Uuid,
    /// The parent session.
    pub session_id: Uuid,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
    /// For access tokens: the paired refresh-token row.
    pub refresh_token_id: Option<Uuid>,
    /// Revocation marker; set on rotation or session invalidation.
    pub revoked_at: Option<DateTime<Utc>>,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
}

impl SessionToken {
    /// Whether the token row is usable at `now`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// The signed pair returned on login and rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived signed access token.
    pub access_token: String,
    /// Longer-lived signed refresh token.
    pub refresh_token: String,
}
