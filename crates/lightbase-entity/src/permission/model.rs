//! Role and permission entity models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A named set of permissions.
///
/// `tenant_id = None` declares a global role. (identifier, tenant) is
/// unique, and tenant-less identifiers are unique among themselves.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    /// Unique role identifier.
    pub id: Uuid,
    /// Role identifier string, e.g. `admin`.
    pub identifier: String,
    /// Owning tenant; absent for global roles.
    pub tenant_id: Option<Uuid>,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Whether the role is global (not scoped to a tenant).
    pub fn is_global(&self) -> bool {
        self.tenant_id.is_none()
    }
}

/// An entry of the global permission catalog, e.g. `auth:user:manage`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: Uuid,
    /// Unique permission identifier string.
    pub identifier: String,
}

/// Grant of a permission to a role. The pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RolePermission {
    /// The granting role.
    pub role_id: Uuid,
    /// The granted permission.
    pub permission_id: Uuid,
}

/// Assignment of a role to a user. The pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRole {
    /// The assigned user.
    pub user_id: Uuid,
    /// The assigned role.
    pub role_id: Uuid,
    /// When the assignment was created.
    pub created_at: DateTime<Utc>,
}
