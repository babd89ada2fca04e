//! Tenant declarations and multi-tenant behavior.
//!
//! The tenant document is static: entries whose url-config environment does
//! not match the deployment are dropped at startup, and a tenant with no
//! remaining url-config entries is disabled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Multi-tenant settings and the static tenant document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultitenantConfig {
    /// Insert a tenant membership for every tenant when a user is created.
    #[serde(default)]
    pub sync_users_across_all_tenants: bool,
    /// Tenant declarations keyed by unique tenant name.
    pub tenants: BTreeMap<String, TenantDeclaration>,
}

/// A single declared tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantDeclaration {
    /// Free-form tenant data, persisted verbatim.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Url-config entries keyed by public URL.
    pub url_config: BTreeMap<String, UrlConfigEntry>,
}

/// One public-URL entry of a tenant's url-config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfigEntry {
    /// Deployment environment this entry applies to.
    pub environment: String,
    /// API URL serving this public URL.
    pub api_url: String,
}
