//! Keycloak login repository implementation.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::login::KeycloakLogin;

use super::db_err;

/// Repository for federated OIDC logins.
#[derive(Debug, Clone)]
pub struct KeycloakLoginRepository {
    pool: PgPool,
}

impl KeycloakLoginRepository {
    /// Create a new Keycloak login repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the login for (tenant, email) among non-deleted members.
    pub async fn find_by_email_in_tenant(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> AppResult<Option<KeycloakLogin>> {
        sqlx::query_as::<_, KeycloakLogin>(
            "SELECT kl.* FROM keycloak_login kl \
             JOIN users u ON u.id = kl.user_id AND u.deleted_at IS NULL \
             JOIN user_tenant ut ON ut.user_id = u.id \
             WHERE ut.tenant_id = $1 AND LOWER(kl.email) = LOWER($2)",
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Find the login for an email among non-deleted users in any tenant.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<KeycloakLogin>> {
        sqlx::query_as::<_, KeycloakLogin>(
            "SELECT kl.* FROM keycloak_login kl \
             JOIN users u ON u.id = kl.user_id AND u.deleted_at IS NULL \
             WHERE LOWER(kl.email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Find the login owned by a user.
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<KeycloakLogin>> {
        sqlx::query_as::<_, KeycloakLogin>("SELECT * FROM keycloak_login WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Find the login owned by a user on the given transaction.
    pub async fn find_by_user_tx(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> AppResult<Option<KeycloakLogin>> {
        sqlx::query_as::<_, KeycloakLogin>("SELECT * FROM keycloak_login WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(conn)
            .await
            .map_err(db_err)
    }

    /// Insert a login row on the given transaction.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        email: &str,
    ) -> AppResult<KeycloakLogin> {
        sqlx::query_as::<_, KeycloakLogin>(
            "INSERT INTO keycloak_login (user_id, email) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(email)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Rewrite the email address of a user's login.
    pub async fn set_email(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        email: &str,
    ) -> AppResult<()> {
        sqlx::query("UPDATE keycloak_login SET email = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .bind(email)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Count non-deleted members of a tenant holding this email, excluding
    /// one user. Drives the cross-tenant uniqueness check; runs on the
    /// transaction so it sees the state being built up.
    pub async fn count_duplicates_in_tenant(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        email: &str,
        exclude_user_id: Uuid,
    ) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM keycloak_login kl \
             JOIN users u ON u.id = kl.user_id AND u.deleted_at IS NULL \
             JOIN user_tenant ut ON ut.user_id = u.id \
             WHERE ut.tenant_id = $1 AND LOWER(kl.email) = LOWER($2) AND kl.user_id <> $3",
        )
        .bind(tenant_id)
        .bind(email)
        .bind(exclude_user_id)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }
}
