//! TOTP settings repository implementation.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::login::TotpSettings;

use super::db_err;

/// Repository for authenticator TOTP settings.
#[derive(Debug, Clone)]
pub struct TotpSettingsRepository {
    pool: PgPool,
}

impl TotpSettingsRepository {
    /// Create a new TOTP settings repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the settings owned by a user.
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<TotpSettings>> {
        sqlx::query_as::<_, TotpSettings>("SELECT * FROM totp_settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Insert settings, overwriting an unverified prior setup. A verified
    /// row is protected by the guard in the provider.
    pub async fn upsert_unverified(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        secret: &str,
    ) -> AppResult<TotpSettings> {
        sqlx::query_as::<_, TotpSettings>(
            "INSERT INTO totp_settings (user_id, secret) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE \
             SET secret = EXCLUDED.secret, verified_at = NULL, updated_at = NOW() \
             RETURNING *",
        )
        .bind(user_id)
        .bind(secret)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Mark the setup verified.
    pub async fn set_verified(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE totp_settings SET verified_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Remove the settings row for a user. Returns whether a row existed.
    pub async fn delete_for_user(&self, conn: &mut PgConnection, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM totp_settings WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
