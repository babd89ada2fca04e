//! Session token repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::session::SessionToken;

use super::db_err;

/// Repository for the token rows backing signed bearer strings.
#[derive(Debug, Clone)]
pub struct SessionTokenRepository {
    pool: PgPool,
}

impl SessionTokenRepository {
    /// Create a new session token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a token row on the given transaction.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        session_id: Uuid,
        expires_at: DateTime<Utc>,
        refresh_token_id: Option<Uuid>,
    ) -> AppResult<SessionToken> {
        sqlx::query_as::<_, SessionToken>(
            "INSERT INTO session_token (session_id, expires_at, refresh_token_id) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(session_id)
        .bind(expires_at)
        .bind(refresh_token_id)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Find a token row by id.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SessionToken>> {
        sqlx::query_as::<_, SessionToken>("SELECT * FROM session_token WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Revoke a single token row.
    pub async fn revoke(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE session_token SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Revoke every token of a session.
    pub async fn revoke_chain(&self, conn: &mut PgConnection, session_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE session_token SET revoked_at = NOW() \
             WHERE session_id = $1 AND revoked_at IS NULL",
        )
        .bind(session_id)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    /// Revoke every token of a session on the pool, outside any caller
    /// transaction. This is the replay response: a reused refresh token
    /// burns the whole chain, and the revocation must survive the failing
    /// request's rollback.
    pub async fn revoke_chain_detached(&self, session_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE session_token SET revoked_at = NOW() \
             WHERE session_id = $1 AND revoked_at IS NULL",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}
