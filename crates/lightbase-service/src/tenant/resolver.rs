//! Per-request tenant resolution.

use std::sync::Arc;

use tracing::debug;

use lightbase_core::config::DeployEnvironment;
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_entity::tenant::Tenant;

use super::cache::TenantCache;
use super::index::{TenantIndex, normalize_url};

/// The headers feeding resolution, extracted by the API layer.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    /// `Host` header; mandatory.
    pub host: Option<String>,
    /// `Origin` header.
    pub origin: Option<String>,
    /// `x-lpc-tenant-origin` override, honored outside production.
    pub tenant_origin_override: Option<String>,
}

/// The tenant a request resolved to, with its derived URLs.
#[derive(Debug, Clone)]
pub struct ResolvedTenant {
    /// The tenant entity.
    pub tenant: Tenant,
    /// Public URL serving the requesting frontend.
    pub public_url: String,
    /// API URL the request targets.
    pub api_url: String,
}

/// Resolves tenants from request context or by id/name for background work.
#[derive(Debug)]
pub struct TenantService {
    index: TenantIndex,
    cache: Arc<TenantCache>,
    environment: DeployEnvironment,
}

impl TenantService {
    /// Creates the service over the validated index.
    pub fn new(index: TenantIndex, cache: Arc<TenantCache>, environment: DeployEnvironment) -> Self {
        Self {
            index,
            cache,
            environment,
        }
    }

    /// The validated startup index.
    pub fn index(&self) -> &TenantIndex {
        &self.index
    }

    /// Resolve the tenant for an inbound request.
    ///
    /// 1. In development/acceptance an `x-lpc-tenant-origin` override wins;
    ///    the api URL becomes the request host.
    /// 2. With unique api URLs the request host is the api URL.
    /// 3. Otherwise the origin (or override) is the public URL.
    pub async fn resolve_request(&self, request: &RequestOrigin) -> AppResult<ResolvedTenant> {
        let Some(host) = request.host.as_deref() else {
            return Err(invalid_tenant());
        };
        let host = normalize_url(host);

        if self.environment.allows_tenant_origin_override() {
            if let Some(override_origin) = request.tenant_origin_override.as_deref() {
                let (name, _config_api_url) = self
                    .index
                    .by_public_url(override_origin)
                    .ok_or_else(invalid_tenant)?;
                let tenant = self.load(name).await?;
                debug!(tenant = %tenant.name, "Tenant resolved via origin override");
                return Ok(ResolvedTenant {
                    tenant,
                    public_url: normalize_url(override_origin),
                    api_url: host,
                });
            }
        }

        if self.index.has_unique_api_urls() {
            let (name, config_public_url) =
                self.index.by_api_url(&host).ok_or_else(invalid_tenant)?;
            let public_url = request
                .origin
                .as_deref()
                .map(normalize_url)
                .unwrap_or_else(|| config_public_url.clone());
            let tenant = self.load(name).await?;
            return Ok(ResolvedTenant {
                tenant,
                public_url,
                api_url: host,
            });
        }

        let origin = request
            .origin
            .as_deref()
            .or(request.tenant_origin_override.as_deref())
            .ok_or_else(invalid_tenant)?;
        let (name, api_url) = self
            .index
            .by_public_url(origin)
            .ok_or_else(invalid_tenant)?;
        let tenant = self.load(name).await?;
        Ok(ResolvedTenant {
            tenant,
            public_url: normalize_url(origin),
            api_url: api_url.clone(),
        })
    }

    /// Resolve a tenant by name for background contexts.
    pub async fn resolve_by_name(&self, name: &str) -> AppResult<ResolvedTenant> {
        let indexed = self.index.tenants().get(name).ok_or_else(invalid_tenant)?;
        let urls = indexed.urls.first().ok_or_else(invalid_tenant)?;
        let tenant = self.load(name).await?;
        Ok(ResolvedTenant {
            tenant,
            public_url: urls.public_url.clone(),
            api_url: urls.api_url.clone(),
        })
    }

    /// Resolve a tenant by id for background contexts.
    pub async fn resolve_by_id(&self, id: uuid::Uuid) -> AppResult<ResolvedTenant> {
        let tenant = self
            .cache
            .get_by_id(id)
            .await?
            .ok_or_else(invalid_tenant)?;
        let name = tenant.name.clone();
        let indexed = self.index.tenants().get(&name).ok_or_else(invalid_tenant)?;
        let urls = indexed.urls.first().ok_or_else(invalid_tenant)?;
        Ok(ResolvedTenant {
            tenant,
            public_url: urls.public_url.clone(),
            api_url: urls.api_url.clone(),
        })
    }

    async fn load(&self, name: &str) -> AppResult<Tenant> {
        self.cache
            .get_by_name(name)
            .await?
            .ok_or_else(invalid_tenant)
    }
}

fn invalid_tenant() -> AppError {
    AppError::validation("multitenant.require.invalidTenant")
}
