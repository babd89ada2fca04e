//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::login::{AnonymousLogin, DigidLogin, KeycloakLogin, PasswordLogin, TotpSettings};

/// A registered user.
///
/// A user owns its provider logins, TOTP settings, and role memberships;
/// all cascade-delete with the user. Soft deletion sets `deleted_at` and
/// blocks authentication while preserving role rows for audit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Optional display name.
    pub name: Option<String>,
    /// Last successful login through any provider.
    pub last_login: Option<DateTime<Utc>>,
    /// Soft-delete marker; set means the user cannot authenticate.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user may authenticate at all.
    pub fn can_authenticate(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// A user loaded with all provider attachments and memberships, the shape
/// `requireUser` and the summary view operate on.
#[derive(Debug, Clone)]
pub struct UserWithLogins {
    /// The base user row.
    pub user: User,
    /// Password provider attachment, at most one.
    pub password_login: Option<PasswordLogin>,
    /// Anonymous provider attachment, at most one.
    pub anonymous_login: Option<AnonymousLogin>,
    /// DigiD provider attachment, at most one.
    pub digid_login: Option<DigidLogin>,
    /// Keycloak provider attachment, at most one.
    pub keycloak_login: Option<KeycloakLogin>,
    /// TOTP settings, at most one.
    pub totp_settings: Option<TotpSettings>,
    /// Tenant ids the user belongs to.
    pub tenant_ids: Vec<Uuid>,
    /// Role ids assigned to the user.
    pub role_ids: Vec<Uuid>,
}

impl UserWithLogins {
    /// Whether the user is a member of the given tenant.
    pub fn is_member_of(&self, tenant_id: Uuid) -> bool {
        self.tenant_ids.contains(&tenant_id)
    }
}
