//! User repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::login::{
    AnonymousLogin, DigidLogin, KeycloakLogin, PasswordLogin, TotpSettings,
};
use lightbase_entity::user::{User, UserWithLogins};

use super::db_err;

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    /// Restrict to members of this tenant.
    pub tenant_id: Option<Uuid>,
    /// Require (true) or exclude (false) a password login.
    pub has_password_login: Option<bool>,
    /// Require or exclude an anonymous login.
    pub has_anonymous_login: Option<bool>,
    /// Require or exclude a DigiD login.
    pub has_digid_login: Option<bool>,
    /// Require or exclude a Keycloak login.
    pub has_keycloak_login: Option<bool>,
    /// Include soft-deleted users.
    pub include_deleted: bool,
}

/// Repository for user rows, memberships, and the joined login view.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a fresh user row on the given transaction.
    pub async fn create(&self, conn: &mut PgConnection, name: Option<&str>) -> AppResult<User> {
        sqlx::query_as::<_, User>("INSERT INTO users (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(conn)
            .await
            .map_err(db_err)
    }

    /// Find a user by id.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Load a user with all provider attachments, tenant memberships, and
    /// role assignments — the shape `requireUser` operates on.
    pub async fn find_with_logins(&self, id: Uuid) -> AppResult<Option<UserWithLogins>> {
        let Some(user) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let password_login = sqlx::query_as::<_, PasswordLogin>(
            "SELECT * FROM password_login WHERE user_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let anonymous_login = sqlx::query_as::<_, AnonymousLogin>(
            "SELECT * FROM anonymous_login WHERE user_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let digid_login =
            sqlx::query_as::<_, DigidLogin>("SELECT * FROM digid_login WHERE user_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        let keycloak_login = sqlx::query_as::<_, KeycloakLogin>(
            "SELECT * FROM keycloak_login WHERE user_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let totp_settings =
            sqlx::query_as::<_, TotpSettings>("SELECT * FROM totp_settings WHERE user_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        let tenant_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT tenant_id FROM user_tenant WHERE user_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        let role_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT role_id FROM user_role WHERE user_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(Some(UserWithLogins {
            user,
            password_login,
            anonymous_login,
            digid_login,
            keycloak_login,
            totp_settings,
            tenant_ids,
            role_ids,
        }))
    }

    /// Update the display name.
    pub async fn update_name(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        name: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET name = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Record a successful login.
    pub async fn set_last_login(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Toggle the soft-delete marker. Returns whether the row changed state.
    pub async fn set_deleted(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        deleted: bool,
    ) -> AppResult<bool> {
        let result = if deleted {
            sqlx::query(
                "UPDATE users SET deleted_at = NOW(), updated_at = NOW() \
                 WHERE id = $1 AND deleted_at IS NULL",
            )
        } else {
            sqlx::query(
                "UPDATE users SET deleted_at = NULL, updated_at = NOW() \
                 WHERE id = $1 AND deleted_at IS NOT NULL",
            )
        }
        .bind(id)
        .execute(conn)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete a user; provider attachments and memberships cascade.
    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Tenant ids of a user, read on the given transaction.
    pub async fn tenant_ids_tx(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT tenant_id FROM user_tenant WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(conn)
            .await
            .map_err(db_err)
    }

    /// Insert a tenant membership.
    pub async fn add_tenant(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO user_tenant (user_id, tenant_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(tenant_id)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// List users matching the admin filter.
    pub async fn list(&self, filter: &UserListFilter) -> AppResult<Vec<User>> {
        let mut sql = String::from("SELECT u.* FROM users u WHERE TRUE");

        if !filter.include_deleted {
            sql.push_str(" AND u.deleted_at IS NULL");
        }
        if filter.tenant_id.is_some() {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM user_tenant ut \
                 WHERE ut.user_id = u.id AND ut.tenant_id = $1)",
            );
        }

        for (flag, table) in [
            (filter.has_password_login, "password_login"),
            (filter.has_anonymous_login, "anonymous_login"),
            (filter.has_digid_login, "digid_login"),
            (filter.has_keycloak_login, "keycloak_login"),
        ] {
            match flag {
                Some(true) => {
                    sql.push_str(&format!(
                        " AND EXISTS (SELECT 1 FROM {table} l WHERE l.user_id = u.id)"
                    ));
                }
                Some(false) => {
                    sql.push_str(&format!(
                        " AND NOT EXISTS (SELECT 1 FROM {table} l WHERE l.user_id = u.id)"
                    ));
                }
                None => {}
            }
        }

        sql.push_str(" ORDER BY u.created_at");

        let mut query = sqlx::query_as::<_, User>(&sql);
        if let Some(tenant_id) = filter.tenant_id {
            query = query.bind(tenant_id);
        }

        query.fetch_all(&self.pool).await.map_err(db_err)
    }

    /// Transient management users created before the cutoff, matched by the
    /// `management-` name prefix and an anonymous login.
    pub async fn find_transient_management_users(
        &self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u \
             JOIN anonymous_login al ON al.user_id = u.id \
             WHERE u.name LIKE 'management-%' AND u.created_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Rewrite a foreign key column from one user id to another. Used by the
    /// merge flow for every allowlisted (table, column) pair.
    pub async fn retarget_column(
        &self,
        conn: &mut PgConnection,
        table: &str,
        column: &str,
        from: Uuid,
        to: Uuid,
    ) -> AppResult<u64> {
        // Table and column names come from the compiled-in allowlist, never
        // from request input.
        let sql = format!("UPDATE {table} SET {column} = $2 WHERE {column} = $1");
        let result = sqlx::query(&sql)
            .bind(from)
            .bind(to)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}
