//! Pull-through tenant cache with freshness sampling.
//!
//! Entries are keyed by id or name. Every N reads the stored `updated_at`
//! is re-checked against the database and the entry evicted when stale;
//! in between, reads are lock-free map hits.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use lightbase_core::result::AppResult;
use lightbase_database::repositories::tenant::TenantRepository;
use lightbase_entity::tenant::Tenant;

/// Reads between freshness samples.
const SAMPLE_EVERY: u64 = 100;

#[derive(Debug, Clone)]
struct CacheEntry {
    tenant: Tenant,
    cached_updated_at: DateTime<Utc>,
    reads: u64,
}

/// Pull-through cache over [`TenantRepository`].
#[derive(Debug)]
pub struct TenantCache {
    repo: TenantRepository,
    entries: DashMap<String, CacheEntry>,
}

impl TenantCache {
    /// Creates an empty cache backed by the repository.
    pub fn new(repo: TenantRepository) -> Self {
        Self {
            repo,
            entries: DashMap::new(),
        }
    }

    /// Get a tenant by unique name.
    pub async fn get_by_name(&self, name: &str) -> AppResult<Option<Tenant>> {
        let key = format!("name:{name}");

        if let Some(tenant) = self.read_fresh(&key).await? {
            return Ok(Some(tenant));
        }

        let Some(tenant) = self.repo.find_by_name(name).await? else {
            return Ok(None);
        };
        self.insert(&key, &tenant);
        Ok(Some(tenant))
    }

    /// Get a tenant by id.
    pub async fn get_by_id(&self, id: uuid::Uuid) -> AppResult<Option<Tenant>> {
        let key = format!("id:{id}");

        if let Some(tenant) = self.read_fresh(&key).await? {
            return Ok(Some(tenant));
        }

        let Some(tenant) = self.repo.find_by_id(id).await? else {
            return Ok(None);
        };
        self.insert(&key, &tenant);
        Ok(Some(tenant))
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    async fn read_fresh(&self, key: &str) -> AppResult<Option<Tenant>> {
        let sampled = {
            let Some(mut entry) = self.entries.get_mut(key) else {
                return Ok(None);
            };
            entry.reads += 1;
            if entry.reads % SAMPLE_EVERY != 0 {
                return Ok(Some(entry.tenant.clone()));
            }
            entry.clone()
        };

        // Freshness sample outside the map guard.
        let current = self.repo.updated_at(sampled.tenant.id).await?;
        if current == Some(sampled.cached_updated_at) {
            return Ok(Some(sampled.tenant));
        }

        self.entries.remove(key);
        Ok(None)
    }

    fn insert(&self, key: &str, tenant: &Tenant) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                tenant: tenant.clone(),
                cached_updated_at: tenant.updated_at,
                reads: 0,
            },
        );
    }
}
