//! Role and permission repository implementation.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::permission::{Permission, Role};

use super::db_err;

/// Repository for the permission catalog, roles, and their links.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Create a new role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ── Permission catalog ───────────────────────────────────────

    /// Delete permissions absent from the declared list and insert the
    /// missing ones. Runs on the startup-sync transaction.
    pub async fn sync_permissions(
        &self,
        conn: &mut PgConnection,
        identifiers: &[String],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM permission WHERE identifier <> ALL($1)")
            .bind(identifiers)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;

        sqlx::query(
            "INSERT INTO permission (identifier) \
             SELECT UNNEST($1::TEXT[]) ON CONFLICT (identifier) DO NOTHING",
        )
        .bind(identifiers)
        .execute(conn)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    /// List the whole permission catalog.
    pub async fn all_permissions(&self) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permission ORDER BY identifier")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Fetch permissions by identifier on the given connection.
    pub async fn permissions_by_identifiers(
        &self,
        conn: &mut PgConnection,
        identifiers: &[String],
    ) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permission WHERE identifier = ANY($1)")
            .bind(identifiers)
            .fetch_all(conn)
            .await
            .map_err(db_err)
    }

    // ── Roles ────────────────────────────────────────────────────

    /// Find a role by (identifier, tenant); tenant `None` matches globals.
    pub async fn find_by_identifier(
        &self,
        conn: &mut PgConnection,
        identifier: &str,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT * FROM role WHERE identifier = $1 AND tenant_id IS NOT DISTINCT FROM $2",
        )
        .bind(identifier)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await
        .map_err(db_err)
    }

    /// Find a role by id.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM role WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Insert a role on the given connection.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        identifier: &str,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Role> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO role (identifier, tenant_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(identifier)
        .bind(tenant_id)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Delete a role; permission links and user assignments cascade.
    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM role WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Roles visible to a tenant: its own plus the globals.
    pub async fn visible_to_tenant(&self, tenant_id: Uuid) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT * FROM role WHERE tenant_id = $1 OR tenant_id IS NULL ORDER BY identifier",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    // ── Role-permission links ────────────────────────────────────

    /// Drop every permission link of a role.
    pub async fn clear_role_permissions(
        &self,
        conn: &mut PgConnection,
        role_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM role_permission WHERE role_id = $1")
            .bind(role_id)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Link permissions to a role; duplicates are ignored.
    pub async fn add_role_permissions(
        &self,
        conn: &mut PgConnection,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO role_permission (role_id, permission_id) \
             SELECT $1, UNNEST($2::UUID[]) ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Unlink permissions from a role; returns how many rows were removed.
    pub async fn remove_role_permissions(
        &self,
        conn: &mut PgConnection,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM role_permission WHERE role_id = $1 AND permission_id = ANY($2)",
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    /// Permission identifiers granted to a role.
    pub async fn role_permission_identifiers(&self, role_id: Uuid) -> AppResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT p.identifier FROM role_permission rp \
             JOIN permission p ON p.id = rp.permission_id \
             WHERE rp.role_id = $1 ORDER BY p.identifier",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    // ── User-role assignments ────────────────────────────────────

    /// Roles assigned to a user.
    pub async fn roles_of_user(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT r.* FROM user_role ur \
             JOIN role r ON r.id = ur.role_id \
             WHERE ur.user_id = $1 ORDER BY r.identifier",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Assign a role to a user. Returns false when the pair already exists.
    pub async fn assign_to_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_role (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a role from a user. Returns false when no pair existed.
    pub async fn remove_from_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM user_role WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// The distinct permission identifiers a user holds within a tenant
    /// scope: union over roles with `tenant ∈ {null, tenant}`.
    pub async fn user_permission_identifiers(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> AppResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT p.identifier FROM user_role ur \
             JOIN role r ON r.id = ur.role_id AND (r.tenant_id IS NULL OR r.tenant_id = $2) \
             JOIN role_permission rp ON rp.role_id = r.id \
             JOIN permission p ON p.id = rp.permission_id \
             WHERE ur.user_id = $1 ORDER BY p.identifier",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}
