//! Keycloak provider entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Federated OIDC credentials for a user.
///
/// The (email, tenant) pair is unique, mirroring the password login rule.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KeycloakLogin {
    /// Unique identifier.
    pub id: Uuid,
    /// The owning user (1:1).
    pub user_id: Uuid,
    /// Email address as reported by the identity provider.
    pub email: String,
    /// When the login was created.
    pub created_at: DateTime<Utc>,
    /// When the login was last updated.
    pub updated_at: DateTime<Utc>,
}
