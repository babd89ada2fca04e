//! DigiD login repository implementation.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::login::DigidLogin;

use super::db_err;

/// Repository for BSN logins.
#[derive(Debug, Clone)]
pub struct DigidLoginRepository {
    pool: PgPool,
}

impl DigidLoginRepository {
    /// Create a new DigiD login repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the login for (tenant, bsn) among non-deleted members.
    pub async fn find_by_bsn_in_tenant(
        &self,
        tenant_id: Uuid,
        bsn: &str,
    ) -> AppResult<Option<DigidLogin>> {
        sqlx::query_as::<_, DigidLogin>(
            "SELECT dl.* FROM digid_login dl \
             JOIN users u ON u.id = dl.user_id AND u.deleted_at IS NULL \
             JOIN user_tenant ut ON ut.user_id = u.id \
             WHERE ut.tenant_id = $1 AND dl.bsn = $2",
        )
        .bind(tenant_id)
        .bind(bsn)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Find the login owned by a user.
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<DigidLogin>> {
        sqlx::query_as::<_, DigidLogin>("SELECT * FROM digid_login WHERE user_id = $1")
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
        bsn: &str,
    ) -> AppResult<DigidLogin> {
        sqlx::query_as::<_, DigidLogin>(
            "INSERT INTO digid_login (user_id, bsn) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(bsn)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }
}
