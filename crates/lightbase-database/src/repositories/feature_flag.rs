//! Feature flag repository implementation.

use sqlx::{PgConnection, PgPool};

use lightbase_core::result::AppResult;
use lightbase_entity::feature_flag::FeatureFlag;

use super::db_err;

/// Repository for feature flag rows.
#[derive(Debug, Clone)]
pub struct FeatureFlagRepository {
    pool: PgPool,
}

impl FeatureFlagRepository {
    /// Create a new feature flag repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete flags no longer declared and insert the missing declarations.
    /// Runs on the startup-sync transaction.
    pub async fn sync_declared(
        &self,
        conn: &mut PgConnection,
        names: &[String],
        descriptions: &[String],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM feature_flag WHERE name <> ALL($1)")
            .bind(names)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;

        sqlx::query(
            "INSERT INTO feature_flag (name, description) \
             SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[]) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(names)
        .bind(descriptions)
        .execute(conn)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    /// List all stored flags.
    pub async fn find_all(&self) -> AppResult<Vec<FeatureFlag>> {
        sqlx::query_as::<_, FeatureFlag>("SELECT * FROM feature_flag ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Find a flag by unique name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<FeatureFlag>> {
        sqlx::query_as::<_, FeatureFlag>("SELECT * FROM feature_flag WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Update the global value and merge tenant overrides.
    pub async fn set_values(
        &self,
        name: &str,
        global_value: Option<bool>,
        tenant_values: Option<&serde_json::Value>,
    ) -> AppResult<Option<FeatureFlag>> {
        sqlx::query_as::<_, FeatureFlag>(
            "UPDATE feature_flag \
             SET global_value = COALESCE($2, global_value), \
                 tenant_values = tenant_values || COALESCE($3, '{}'::JSONB), \
                 updated_at = NOW() \
             WHERE name = $1 RETURNING *",
        )
        .bind(name)
        .bind(global_value)
        .bind(tenant_values)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }
}
