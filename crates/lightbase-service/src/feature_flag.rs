//! Feature flag engine: startup sync of declared flags, per-tenant
//! resolution with a short-TTL pull-through cache, and dynamic updates.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sqlx::PgConnection;
use tracing::info;

use lightbase_core::config::FeatureFlagConfig;
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::feature_flag::FeatureFlagRepository;
use lightbase_entity::feature_flag::FeatureFlag;

/// Cache TTL; flags are read on almost every request, so this stays short.
const CACHE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct CachedFlags {
    flags: Vec<FeatureFlag>,
    loaded_at: Instant,
}

/// The feature flag engine.
#[derive(Debug)]
pub struct FeatureFlagService {
    repo: FeatureFlagRepository,
    config: FeatureFlagConfig,
    cache: Mutex<Option<CachedFlags>>,
}

impl FeatureFlagService {
    /// Creates the engine.
    pub fn new(repo: FeatureFlagRepository, config: FeatureFlagConfig) -> Self {
        Self {
            repo,
            config,
            cache: Mutex::new(None),
        }
    }

    /// Synchronize storage to the declared flag set: names no longer
    /// declared are deleted, missing declarations inserted. Runs on the
    /// advisory-locked startup transaction.
    pub async fn sync(&self, conn: &mut PgConnection) -> AppResult<()> {
        let names = self.config.declared_names();
        let descriptions: Vec<String> = names
            .iter()
            .map(|name| self.config.description_for(name))
            .collect();

        self.repo.sync_declared(conn, &names, &descriptions).await?;
        info!(flags = names.len(), "Feature flags synchronized");
        Ok(())
    }

    /// Resolve the full declared set for a tenant:
    /// `tenantValues[tenant] ?? globalValue`, with flags declared but not
    /// yet in storage defaulting to false and unknown stored names
    /// filtered out.
    pub async fn current_for_tenant(&self, tenant_name: &str) -> AppResult<BTreeMap<String, bool>> {
        let stored = self.load_cached().await?;
        let declared = self.config.declared_names();

        let mut resolved = BTreeMap::new();
        for name in declared {
            let value = stored
                .iter()
                .find(|flag| flag.name == name)
                .map(|flag| flag.value_for_tenant(tenant_name))
                .unwrap_or(false);
            resolved.insert(name, value);
        }
        Ok(resolved)
    }

    /// Resolve one flag for a tenant. An undeclared identifier is a
    /// programmer error.
    pub async fn get_dynamic(&self, name: &str, tenant_name: &str) -> AppResult<bool> {
        if !self.config.declared_names().iter().any(|n| n == name) {
            return Err(AppError::server("featureFlag.getDynamic.unknownFlag")
                .with_info(serde_json::json!({ "name": name })));
        }

        let stored = self.load_cached().await?;
        Ok(stored
            .iter()
            .find(|flag| flag.name == name)
            .map(|flag| flag.value_for_tenant(tenant_name))
            .unwrap_or(false))
    }

    /// Update the global and/or per-tenant values of a declared flag and
    /// clear the cache.
    pub async fn set_dynamic(
        &self,
        name: &str,
        global_value: Option<bool>,
        tenant_values: Option<&serde_json::Value>,
    ) -> AppResult<FeatureFlag> {
        if !self.config.declared_names().iter().any(|n| n == name) {
            return Err(AppError::validation("featureFlag.setDynamic.unknownFlag")
                .with_info(serde_json::json!({ "name": name })));
        }

        let flag = self
            .repo
            .set_values(name, global_value, tenant_values)
            .await?
            .ok_or_else(|| AppError::validation("featureFlag.setDynamic.unknownFlag"))?;

        self.clear_cache();
        info!(flag = %name, "Feature flag updated");
        Ok(flag)
    }

    /// List all stored flags, bypassing the cache. Management surface.
    pub async fn list(&self) -> AppResult<Vec<FeatureFlag>> {
        self.repo.find_all().await
    }

    /// Drop the cached set.
    pub fn clear_cache(&self) {
        if let Ok(mut guard) = self.cache.lock() {
            *guard = None;
        }
    }

    /// Fetching once warms the whole set; entries live for [`CACHE_TTL`].
    async fn load_cached(&self) -> AppResult<Vec<FeatureFlag>> {
        if let Ok(guard) = self.cache.lock() {
            if let Some(cached) = guard.as_ref() {
                if cached.loaded_at.elapsed() < CACHE_TTL {
                    return Ok(cached.flags.clone());
                }
            }
        }

        let flags = self.repo.find_all().await?;
        if let Ok(mut guard) = self.cache.lock() {
            *guard = Some(CachedFlags {
                flags: flags.clone(),
                loaded_at: Instant::now(),
            });
        }
        Ok(flags)
    }
}
