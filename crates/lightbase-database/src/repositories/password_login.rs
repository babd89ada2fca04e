//! Password login repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::login::{PasswordLogin, PasswordLoginReset};

use super::db_err;

/// Repository for password logins, reset tokens, and login attempts.
#[derive(Debug, Clone)]
pub struct PasswordLoginRepository {
    pool: PgPool,
}

impl PasswordLoginRepository {
    /// Create a new password login repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the login for (tenant, email) among non-deleted members.
    pub async fn find_by_email_in_tenant(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> AppResult<Option<PasswordLogin>> {
        sqlx::query_as::<_, PasswordLogin>(
            "SELECT pl.* FROM password_login pl \
             JOIN users u ON u.id = pl.user_id AND u.deleted_at IS NULL \
             JOIN user_tenant ut ON ut.user_id = u.id \
             WHERE ut.tenant_id = $1 AND LOWER(pl.email) = LOWER($2)",
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Find the login owned by a user.
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<PasswordLogin>> {
        sqlx::query_as::<_, PasswordLogin>("SELECT * FROM password_login WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Find the login owned by a user on the given transaction, so rows
    /// inserted earlier in the same transaction are visible.
    pub async fn find_by_user_tx(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> AppResult<Option<PasswordLogin>> {
        sqlx::query_as::<_, PasswordLogin>("SELECT * FROM password_login WHERE user_id = $1")
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
        password_hash: &str,
        verified_at: Option<DateTime<Utc>>,
    ) -> AppResult<PasswordLogin> {
        sqlx::query_as::<_, PasswordLogin>(
            "INSERT INTO password_login (user_id, email, password_hash, verified_at) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(user_id)
        .bind(email)
        .bind(password_hash)
        .bind(verified_at)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Replace the password hash. Bumps `updated_at`, the reference point
    /// for forced rotation.
    pub async fn set_password_hash(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        password_hash: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE password_login SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Rewrite the email address and clear the verification marker.
    pub async fn set_email(&self, conn: &mut PgConnection, id: Uuid, email: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE password_login \
             SET email = $2, verified_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(email)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Mark the email verified if it is not already.
    pub async fn set_verified(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE password_login \
             SET verified_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND verified_at IS NULL",
        )
        .bind(id)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Store the generated OTP secret.
    pub async fn set_otp_secret(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        secret: &str,
    ) -> AppResult<()> {
        sqlx::query("UPDATE password_login SET otp_secret = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(secret)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Count attempts since the rolling-window cutoff.
    pub async fn count_recent_attempts(
        &self,
        password_login_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM password_login_attempt \
             WHERE password_login_id = $1 AND created_at > $2",
        )
        .bind(password_login_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Record a failed (or blocked) attempt.
    ///
    /// Runs on the pool rather than the login transaction: the attempt row
    /// must survive the rollback of the failed login it records.
    pub async fn insert_attempt(&self, password_login_id: Uuid) -> AppResult<()> {
        sqlx::query("INSERT INTO password_login_attempt (password_login_id) VALUES ($1)")
            .bind(password_login_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Issue a verify or reset token on the given transaction.
    pub async fn create_reset(
        &self,
        conn: &mut PgConnection,
        password_login_id: Uuid,
        reset_token: &str,
        should_set_password: bool,
        expires_at: DateTime<Utc>,
    ) -> AppResult<PasswordLoginReset> {
        sqlx::query_as::<_, PasswordLoginReset>(
            "INSERT INTO password_login_reset \
             (password_login_id, reset_token, should_set_password, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(password_login_id)
        .bind(reset_token)
        .bind(should_set_password)
        .bind(expires_at)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Find a non-expired token of the given kind.
    pub async fn find_valid_reset(
        &self,
        reset_token: &str,
        should_set_password: bool,
    ) -> AppResult<Option<PasswordLoginReset>> {
        sqlx::query_as::<_, PasswordLoginReset>(
            "SELECT * FROM password_login_reset \
             WHERE reset_token = $1 AND should_set_password = $2 AND expires_at > NOW()",
        )
        .bind(reset_token)
        .bind(should_set_password)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Find a login by its primary key.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PasswordLogin>> {
        sqlx::query_as::<_, PasswordLogin>("SELECT * FROM password_login WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Consume a token: single use.
    pub async fn delete_reset(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM password_login_reset WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Sweep expired tokens; returns the number removed.
    pub async fn sweep_expired_resets(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM password_login_reset WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
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
            "SELECT COUNT(*) FROM password_login pl \
             JOIN users u ON u.id = pl.user_id AND u.deleted_at IS NULL \
             JOIN user_tenant ut ON ut.user_id = u.id \
             WHERE ut.tenant_id = $1 AND LOWER(pl.email) = LOWER($2) AND pl.user_id <> $3",
        )
        .bind(tenant_id)
        .bind(email)
        .bind(exclude_user_id)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }
}
