//! Tenant entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A logical customer of the platform.
///
/// Tenants are declared in configuration and synchronized to storage at
/// startup; the url-config lives in configuration only and is resolved per
/// request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    /// Unique tenant identifier.
    pub id: Uuid,
    /// Unique tenant name, the key of the configuration document.
    pub name: String,
    /// Free-form tenant data from configuration.
    pub data: serde_json::Value,
    /// When the tenant was first synchronized.
    pub created_at: DateTime<Utc>,
    /// When the tenant was last synchronized.
    pub updated_at: DateTime<Utc>,
}

/// Membership of a user in a tenant. The pair is unique; deletion cascades
/// from either side.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserTenant {
    /// The member user.
    pub user_id: Uuid,
    /// The tenant joined.
    pub tenant_id: Uuid,
    /// When the membership was created.
    pub created_at: DateTime<Utc>,
}
