//! Validated tenant configuration index.
//!
//! Built once at startup: url-config entries whose environment does not
//! match the deployment are dropped, tenants with no remaining entries are
//! disabled, and fewer than one surviving tenant aborts startup.

use std::collections::{BTreeMap, HashMap};

use lightbase_core::config::{DeployEnvironment, MultitenantConfig};
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;

/// One enabled public-URL/API-URL pair of a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantUrls {
    /// Public (frontend) URL, normalized without scheme.
    pub public_url: String,
    /// API URL serving it, normalized without scheme.
    pub api_url: String,
}

/// An enabled tenant with its surviving url-config.
#[derive(Debug, Clone)]
pub struct IndexedTenant {
    /// Free-form tenant data from configuration.
    pub data: serde_json::Value,
    /// Enabled url-config entries.
    pub urls: Vec<TenantUrls>,
}

/// Precomputed lookup structures over the enabled tenants.
#[derive(Debug, Clone)]
pub struct TenantIndex {
    tenants: BTreeMap<String, IndexedTenant>,
    by_public_url: HashMap<String, (String, String)>,
    by_api_url: HashMap<String, (String, String)>,
    has_unique_api_urls: bool,
}

/// Strip the scheme and any trailing slash so config keys and header
/// values compare equal.
pub(crate) fn normalize_url(url: &str) -> String {
    url.trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

impl TenantIndex {
    /// Validate the configuration document for this deployment environment.
    pub fn from_config(
        config: &MultitenantConfig,
        environment: DeployEnvironment,
    ) -> AppResult<Self> {
        let mut tenants = BTreeMap::new();
        let mut by_public_url = HashMap::new();
        let mut api_url_counts: HashMap<String, usize> = HashMap::new();
        let mut by_api_url = HashMap::new();

        for (name, declaration) in &config.tenants {
            let mut urls = Vec::new();

            for (public_url, entry) in &declaration.url_config {
                if entry.environment != environment.as_str() {
                    continue;
                }
                let pair = TenantUrls {
                    public_url: normalize_url(public_url),
                    api_url: normalize_url(&entry.api_url),
                };

                if by_public_url
                    .insert(
                        pair.public_url.clone(),
                        (name.clone(), pair.api_url.clone()),
                    )
                    .is_some()
                {
                    return Err(AppError::configuration(format!(
                        "public url '{}' is declared by multiple tenants",
                        pair.public_url
                    )));
                }
                *api_url_counts.entry(pair.api_url.clone()).or_default() += 1;
                by_api_url.insert(
                    pair.api_url.clone(),
                    (name.clone(), pair.public_url.clone()),
                );
                urls.push(pair);
            }

            if urls.is_empty() {
                // Disabled for this environment.
                continue;
            }

            tenants.insert(
                name.clone(),
                IndexedTenant {
                    data: declaration.data.clone(),
                    urls,
                },
            );
        }

        if tenants.is_empty() {
            return Err(AppError::configuration(format!(
                "no tenant has a url-config entry for environment '{environment}'"
            )));
        }

        let has_unique_api_urls = api_url_counts.values().all(|count| *count == 1);

        Ok(Self {
            tenants,
            by_public_url,
            by_api_url,
            has_unique_api_urls,
        })
    }

    /// Whether every enabled api URL appears exactly once across tenants.
    pub fn has_unique_api_urls(&self) -> bool {
        self.has_unique_api_urls
    }

    /// The enabled tenants, keyed by name.
    pub fn tenants(&self) -> &BTreeMap<String, IndexedTenant> {
        &self.tenants
    }

    /// Look up (tenant name, api url) by normalized public URL.
    pub fn by_public_url(&self, public_url: &str) -> Option<&(String, String)> {
        self.by_public_url.get(&normalize_url(public_url))
    }

    /// Look up (tenant name, public url) by normalized api URL.
    pub fn by_api_url(&self, api_url: &str) -> Option<&(String, String)> {
        self.by_api_url.get(&normalize_url(api_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightbase_core::config::multitenant::{TenantDeclaration, UrlConfigEntry};

    fn config(entries: &[(&str, &str, &str, &str)]) -> MultitenantConfig {
        let mut tenants: BTreeMap<String, TenantDeclaration> = BTreeMap::new();
        for (tenant, public_url, environment, api_url) in entries {
            tenants
                .entry((*tenant).to_string())
                .or_insert_with(|| TenantDeclaration {
                    data: serde_json::json!({}),
                    url_config: BTreeMap::new(),
                })
                .url_config
                .insert(
                    (*public_url).to_string(),
                    UrlConfigEntry {
                        environment: (*environment).to_string(),
                        api_url: (*api_url).to_string(),
                    },
                );
        }
        MultitenantConfig {
            sync_users_across_all_tenants: false,
            tenants,
        }
    }

    #[test]
    fn environment_mismatches_are_dropped() {
        let index = TenantIndex::from_config(
            &config(&[
                ("acme", "app.acme.example", "production", "api.acme.example"),
                ("acme", "acc.acme.example", "acceptance", "api.acc.acme.example"),
                ("globex", "app.globex.example", "acceptance", "api.globex.example"),
            ]),
            DeployEnvironment::Production,
        )
        .unwrap();

        assert_eq!(index.tenants().len(), 1);
        assert!(index.by_public_url("app.acme.example").is_some());
        assert!(index.by_public_url("acc.acme.example").is_none());
    }

    #[test]
    fn startup_fails_without_enabled_tenants() {
        let err = TenantIndex::from_config(
            &config(&[("acme", "app.acme.example", "acceptance", "api.acme.example")]),
            DeployEnvironment::Production,
        )
        .unwrap_err();
        assert!(err.is_server_error());
    }

    #[test]
    fn api_url_uniqueness_is_detected() {
        let unique = TenantIndex::from_config(
            &config(&[
                ("acme", "app.acme.example", "production", "api.acme.example"),
                ("globex", "app.globex.example", "production", "api.globex.example"),
            ]),
            DeployEnvironment::Production,
        )
        .unwrap();
        assert!(unique.has_unique_api_urls());

        let shared = TenantIndex::from_config(
            &config(&[
                ("acme", "app.acme.example", "production", "api.shared.example"),
                ("globex", "app.globex.example", "production", "api.shared.example"),
            ]),
            DeployEnvironment::Production,
        )
        .unwrap();
        assert!(!shared.has_unique_api_urls());
    }

    #[test]
    fn urls_are_normalized() {
        let index = TenantIndex::from_config(
            &config(&[(
                "acme",
                "https://app.acme.example/",
                "production",
                "https://api.acme.example",
            )]),
            DeployEnvironment::Production,
        )
        .unwrap();

        assert!(index.by_public_url("app.acme.example").is_some());
        assert!(index.by_api_url("api.acme.example").is_some());
    }
}
