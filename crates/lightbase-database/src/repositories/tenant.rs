//! Tenant repository implementation.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::tenant::Tenant;

use super::db_err;

/// Repository for tenant rows and memberships.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    /// Create a new tenant repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a tenant from its configuration declaration.
    ///
    /// `updated_at` is bumped on every sync so cache freshness sampling has
    /// something to compare against.
    pub async fn sync_from_config(
        &self,
        conn: &mut PgConnection,
        name: &str,
        data: &serde_json::Value,
    ) -> AppResult<Tenant> {
        sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenant (name, data) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW() \
             RETURNING *",
        )
        .bind(name)
        .bind(data)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Find a tenant by id.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Tenant>> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenant WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Find a tenant by unique name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Tenant>> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenant WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// List all synchronized tenants.
    pub async fn find_all(&self) -> AppResult<Vec<Tenant>> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenant ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    /// The `updated_at` of a tenant, used by cache freshness sampling.
    pub async fn updated_at(&self, id: Uuid) -> AppResult<Option<chrono::DateTime<chrono::Utc>>> {
        sqlx::query_scalar("SELECT updated_at FROM tenant WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }
}
