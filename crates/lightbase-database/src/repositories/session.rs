//! Session repository implementation.
//!
//! The session data blob carries `userId`; per-user queries go through the
//! expression index on `data ->> 'userId'`.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::session::Session;

use super::db_err;

/// Repository for session rows.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a session on the given transaction.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        checksum: &str,
        data: &serde_json::Value,
    ) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO session (checksum, data) VALUES ($1, $2) RETURNING *",
        )
        .bind(checksum)
        .bind(data)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Find a session by id.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM session WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Rewrite the data blob and its checksum.
    pub async fn update_data(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        checksum: &str,
        data: &serde_json::Value,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE session SET checksum = $2, data = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(checksum)
        .bind(data)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Soft-revoke a session.
    pub async fn revoke(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE session SET revoked_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Hard-delete a session; tokens and device cascade.
    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM session WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Non-revoked sessions of a user, newest first.
    pub async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM session \
             WHERE data ->> 'userId' = $1 AND revoked_at IS NULL \
             ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Hard-delete every session of a user, optionally keeping one.
    pub async fn delete_all_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        keep_session_id: Option<Uuid>,
    ) -> AppResult<u64> {
        let result = match keep_session_id {
            Some(keep) => {
                sqlx::query("DELETE FROM session WHERE data ->> 'userId' = $1 AND id <> $2")
                    .bind(user_id.to_string())
                    .bind(keep)
                    .execute(conn)
                    .await
            }
            None => {
                sqlx::query("DELETE FROM session WHERE data ->> 'userId' = $1")
                    .bind(user_id.to_string())
                    .execute(conn)
                    .await
            }
        }
        .map_err(db_err)?;

        Ok(result.rows_affected())
    }

    /// Count non-revoked sessions of a user bound to a mobile device.
    pub async fn count_active_mobile_for_user(&self, user_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM session s \
             JOIN device d ON d.session_id = s.id \
             WHERE s.data ->> 'userId' = $1 AND s.revoked_at IS NULL \
             AND d.platform IN ('apple', 'android')",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}
