//! Anonymous login repository implementation.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::login::AnonymousLogin;

use super::db_err;

/// Repository for anonymous token logins.
#[derive(Debug, Clone)]
pub struct AnonymousLoginRepository {
    pool: PgPool,
}

impl AnonymousLoginRepository {
    /// Create a new anonymous login repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the login for (tenant, token) among non-deleted members.
    pub async fn find_by_token_in_tenant(
        &self,
        tenant_id: Uuid,
        login_token: &str,
    ) -> AppResult<Option<AnonymousLogin>> {
        sqlx::query_as::<_, AnonymousLogin>(
            "SELECT al.* FROM anonymous_login al \
             JOIN users u ON u.id = al.user_id AND u.deleted_at IS NULL \
             JOIN user_tenant ut ON ut.user_id = u.id \
             WHERE ut.tenant_id = $1 AND al.login_token = $2",
        )
        .bind(tenant_id)
        .bind(login_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Find the login owned by a user.
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<AnonymousLogin>> {
        sqlx::query_as::<_, AnonymousLogin>("SELECT * FROM anonymous_login WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Insert a login row on the given transaction.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        login_token: &str,
        is_allowed_to_login: bool,
    ) -> AppResult<AnonymousLogin> {
        sqlx::query_as::<_, AnonymousLogin>(
            "INSERT INTO anonymous_login (user_id, login_token, is_allowed_to_login) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(login_token)
        .bind(is_allowed_to_login)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }
}
